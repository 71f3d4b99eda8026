use anyhow::Result;
use chrono::Utc;
use clap::Subcommand;
use smartdo_core::{ExpandError, Task, TaskId, TaskStorage, TaskStore, families};
use std::collections::HashMap;

use crate::config::{Config, load_config};
use crate::llm;
use crate::state::{open_store, tasks_path};
use crate::time::format_local;

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Show the list, families indented
    List,

    /// Show one task with its metadata
    Show { id: TaskId },

    /// Add a task at the top of the list
    Add {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Subtask to create along with it (repeatable)
        #[arg(short, long = "sub")]
        subtasks: Vec<String>,
    },

    /// Add a task and ask the model to break it into subtasks
    Magic {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Ask the model for subtasks of an existing task
    Expand { id: TaskId },

    /// Add a subtask at the end of a task's family
    Sub {
        parent: TaskId,
        /// Optional text; without it the subtask starts empty
        text: Vec<String>,
    },

    /// Replace a task's text
    Edit {
        id: TaskId,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Flip completion (cascades to subtasks and back up to the parent)
    Toggle { id: TaskId },

    /// Delete a task and all of its subtasks
    Rm { id: TaskId },

    /// Move a task onto another one, as if dragged there
    Mv {
        active: TaskId,
        /// Drop target; omitted means the drop is cancelled
        over: Option<TaskId>,
    },
}

pub async fn run(cmd: TaskCommand) -> Result<()> {
    let mut store = open_store()?;
    let now = Utc::now();

    match cmd {
        TaskCommand::List => print!("{}", render_list(store.tasks())),
        TaskCommand::Show { id } => show(&store, id, &load_config()?)?,
        TaskCommand::Add { text, subtasks } => {
            let text = text.join(" ");
            let added = if subtasks.is_empty() {
                store.add_task(&text, now)?
            } else {
                store.add_parent_with_subtasks(&text, &subtasks, now)?
            };
            match added {
                Some(id) => println!("Added {id}"),
                None => println!("Nothing to add."),
            }
        }
        TaskCommand::Magic { text } => {
            let title = text.join(" ");
            let Some(id) = store.add_task(&title, now)? else {
                println!("Nothing to add.");
                return Ok(());
            };
            println!("Added {id}");
            expand(&mut store, id, &load_config()?).await?;
        }
        TaskCommand::Expand { id } => expand(&mut store, id, &load_config()?).await?,
        TaskCommand::Sub { parent, text } => match store.add_subtask(parent, now)? {
            Some(id) => {
                let text = text.join(" ");
                if !text.trim().is_empty() {
                    store.edit_task(id, &text)?;
                }
                println!("Added subtask {id} under {parent}");
            }
            None => println!("No parent task {parent}."),
        },
        TaskCommand::Edit { id, text } => {
            if !store.edit_task(id, &text.join(" "))? {
                println!("Nothing changed.");
            }
        }
        TaskCommand::Toggle { id } => {
            if store.toggle_task(id)? {
                if let Some(t) = store.get(id) {
                    println!("{} {}", checkbox(t), t.text);
                }
            } else {
                println!("No task {id}.");
            }
        }
        TaskCommand::Rm { id } => match store.delete_task(id)? {
            0 => println!("No task {id}."),
            1 => println!("Deleted {id}"),
            n => println!("Deleted {id} and {} subtasks", n - 1),
        },
        TaskCommand::Mv { active, over } => {
            if !store.reorder(active, over)? {
                println!("Order unchanged.");
            } else {
                print!("{}", render_list(store.tasks()));
            }
        }
    }

    Ok(())
}

async fn expand<S: TaskStorage>(store: &mut TaskStore<S>, id: TaskId, cfg: &Config) -> Result<()> {
    let ticket = match store.begin_expansion(id) {
        Ok(t) => t,
        Err(ExpandError::Storage(e)) => return Err(e.context(format!("expand {id}"))),
        Err(e) => {
            tracing::debug!(code = e.to_error_code(), "expansion refused");
            println!("{e}");
            return Ok(());
        }
    };
    let title = store.get(id).map(|t| t.text.clone()).unwrap_or_default();

    println!("Asking {} for subtasks…", cfg.llm.provider.label());
    let suggestions = llm::suggest_subtasks(cfg, &title).await;

    if let Some(msg) = &suggestions.error {
        store.cancel_expansion(ticket)?;
        // The parent stays, with whatever subtasks it already had.
        println!("{msg}");
        return Ok(());
    }

    let added = store.finish_expansion(ticket, &suggestions.subtasks, Utc::now())?;
    if added.is_empty() {
        println!("No subtasks suggested.");
    } else {
        print!("{}", render_list(store.tasks()));
    }
    Ok(())
}

fn show<S: TaskStorage>(store: &TaskStore<S>, id: TaskId, cfg: &Config) -> Result<()> {
    let Some(t) = store.get(id) else {
        println!("No task {id}.");
        return Ok(());
    };

    println!("{}\n", if t.text.is_empty() { "(untitled)" } else { &t.text });
    println!("ID:         {}", t.id);
    println!(
        "Status:     {}",
        if t.completed { "Completed" } else { "Pending" }
    );
    println!(
        "Created at: {}",
        format_local(t.created_at, &cfg.display.timezone)?
    );
    match t.parent_id() {
        Some(p) => println!(
            "Parent:     {} {}",
            p,
            store.get(p).map(|pt| pt.text.as_str()).unwrap_or("(missing)")
        ),
        None => {
            let subs: Vec<&Task> = store.tasks().iter().filter(|s| s.is_child_of(id)).collect();
            if !subs.is_empty() {
                println!("\nSubtasks:");
                for s in subs {
                    println!("  {} {} {}", checkbox(s), s.id, s.text);
                }
            }
        }
    }
    Ok(())
}

fn checkbox(t: &Task) -> &'static str {
    if t.completed { "[x]" } else { "[ ]" }
}

/// Flat list in stored order, subtasks indented, parents with a done count.
pub fn render_list(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "No tasks yet. Add one: smartdo add <text>\n".to_string();
    }

    let progress: HashMap<TaskId, (usize, usize)> = families(tasks)
        .into_iter()
        .filter(|f| !f.subtasks.is_empty())
        .map(|f| (f.parent.id, (f.done_count(), f.subtasks.len())))
        .collect();

    let mut out = String::new();
    for t in tasks {
        let indent = if t.is_subtask() { "    " } else { "" };
        let text = if t.text.is_empty() { "(untitled)" } else { t.text.as_str() };
        out.push_str(&format!("{indent}{} {:<14} {text}", checkbox(t), t.id.0));
        if let Some((done, total)) = progress.get(&t.id) {
            out.push_str(&format!("  ({done}/{total})"));
        }
        out.push('\n');
    }
    out
}

/// Path shown by `about`.
pub fn store_location() -> Result<String> {
    Ok(tasks_path()?.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn render_indents_subtasks_and_counts_progress() {
        let now = Utc::now();
        let tasks = vec![
            Task::new(TaskId(1), "Trip", now),
            Task::subtask(TaskId(2), TaskId(1), "Pack", now).with_completed(true),
            Task::subtask(TaskId(3), TaskId(1), "", now),
            Task::new(TaskId(4), "Laundry", now),
        ];
        let out = render_list(&tasks);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("[ ] 1"));
        assert!(lines[0].ends_with("Trip  (1/2)"));
        assert!(lines[1].starts_with("    [x] 2"));
        assert!(lines[2].ends_with("(untitled)"));
        assert!(lines[3].ends_with("Laundry"));
    }

    #[test]
    fn add_accepts_repeated_subtasks() {
        use clap::Parser;

        #[derive(Parser)]
        struct Cli {
            #[command(subcommand)]
            cmd: TaskCommand,
        }

        let args = ["smartdo", "add", "Plan", "trip", "--sub", "Pack", "-s", "Book"];
        let cli = Cli::try_parse_from(args).unwrap();
        let TaskCommand::Add { text, subtasks } = cli.cmd else {
            panic!("expected add");
        };
        assert_eq!(text, vec!["Plan", "trip"]);
        assert_eq!(subtasks, vec!["Pack", "Book"]);
    }

    #[test]
    fn empty_list_has_a_hint() {
        assert!(render_list(&[]).contains("smartdo add"));
    }
}
