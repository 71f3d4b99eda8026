use anyhow::Result;
use chrono::Utc;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph},
};
use smartdo_core::{
    Direction, ExpandError, ExpansionTicket, TaskId, TaskStorage, TaskStore, neighbor_move,
};
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use crate::config::Config;
use crate::llm::{self, Suggestions};
use crate::state::{open_store, theme_path};
use crate::theme::{Theme, load_theme, write_theme_at};

const HELP: &str = "j/k move  space done  J/K reorder  a add  s subtask  e edit  m magic  \
                    d delete  t theme  q quit";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    Normal,
    Input { target: InputTarget, buf: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputTarget {
    Add,
    Edit(TaskId),
}

/// Everything the board draws from, independent of the terminal.
struct Board<S: TaskStorage> {
    store: TaskStore<S>,
    cfg: Config,
    theme: Theme,
    theme_file: PathBuf,
    selected: usize,
    mode: Mode,
    status: Option<String>,
    pending: Option<ExpansionTicket>,
    results_tx: Sender<(u64, Suggestions)>,
    results_rx: Receiver<(u64, Suggestions)>,
}

pub fn run_board(cfg: Config) -> Result<()> {
    let store = open_store()?;
    let board = Board::new(store, cfg, load_theme()?, theme_path()?);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = board_loop(&mut terminal, board);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn board_loop<S: TaskStorage>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    mut board: Board<S>,
) -> Result<()> {
    tracing::info!(tasks = board.store.len(), "board opened");
    loop {
        board.drain_results()?;
        terminal.draw(|f| board.draw(f))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if board.handle_key(key.code)? {
                    break;
                }
            }
        }
    }
    tracing::info!("board closed");
    Ok(())
}

impl<S: TaskStorage> Board<S> {
    fn new(store: TaskStore<S>, cfg: Config, theme: Theme, theme_file: PathBuf) -> Self {
        let (results_tx, results_rx) = mpsc::channel();
        Self {
            store,
            cfg,
            theme,
            theme_file,
            selected: 0,
            mode: Mode::Normal,
            status: None,
            pending: None,
            results_tx,
            results_rx,
        }
    }

    fn selected_id(&self) -> Option<TaskId> {
        self.store.tasks().get(self.selected).map(|t| t.id)
    }

    fn select_id(&mut self, id: TaskId) {
        if let Some(idx) = self.store.tasks().iter().position(|t| t.id == id) {
            self.selected = idx;
        }
    }

    fn clamp_selection(&mut self) {
        self.selected = self.selected.min(self.store.len().saturating_sub(1));
    }

    fn step(&mut self, down: bool) {
        if down {
            self.selected = (self.selected + 1).min(self.store.len().saturating_sub(1));
        } else {
            self.selected = self.selected.saturating_sub(1);
        }
    }

    /// Returns `true` when the board should close.
    fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        if matches!(self.mode, Mode::Input { .. }) {
            self.handle_input_key(code)?;
            return Ok(false);
        }

        self.status = None;
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
            KeyCode::Char('j') | KeyCode::Down => self.step(true),
            KeyCode::Char('k') | KeyCode::Up => self.step(false),
            KeyCode::Char('J') => self.move_selected(Direction::Down)?,
            KeyCode::Char('K') => self.move_selected(Direction::Up)?,
            KeyCode::Char(' ') => {
                if let Some(id) = self.selected_id() {
                    self.store.toggle_task(id)?;
                }
            }
            KeyCode::Char('d') => {
                if let Some(id) = self.selected_id() {
                    self.store.delete_task(id)?;
                    self.clamp_selection();
                }
            }
            KeyCode::Char('a') => {
                self.mode = Mode::Input {
                    target: InputTarget::Add,
                    buf: String::new(),
                };
            }
            KeyCode::Char('e') => {
                if let Some(t) = self.store.tasks().get(self.selected) {
                    self.mode = Mode::Input {
                        target: InputTarget::Edit(t.id),
                        buf: t.text.clone(),
                    };
                }
            }
            KeyCode::Char('s') => self.add_subtask()?,
            KeyCode::Char('m') => self.start_expansion(),
            KeyCode::Char('t') => {
                self.theme = self.theme.toggled();
                write_theme_at(&self.theme_file, self.theme)?;
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_input_key(&mut self, code: KeyCode) -> Result<()> {
        let Mode::Input { target, buf } = &mut self.mode else {
            return Ok(());
        };
        match code {
            KeyCode::Esc => self.mode = Mode::Normal,
            KeyCode::Backspace => {
                buf.pop();
            }
            KeyCode::Char(c) => buf.push(c),
            KeyCode::Enter => {
                let target = *target;
                let text = std::mem::take(buf);
                self.mode = Mode::Normal;
                match target {
                    InputTarget::Add => {
                        if self.store.add_task(&text, Utc::now())?.is_some() {
                            self.selected = 0;
                        }
                    }
                    InputTarget::Edit(id) => {
                        self.store.edit_task(id, &text)?;
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn move_selected(&mut self, dir: Direction) -> Result<()> {
        let Some(id) = self.selected_id() else {
            return Ok(());
        };
        let Some((active, over)) = neighbor_move(self.store.tasks(), id, dir) else {
            return Ok(());
        };
        if self.store.reorder(active, Some(over))? {
            self.select_id(id);
        }
        Ok(())
    }

    /// The selected task's family head.
    fn selected_parent(&self) -> Option<TaskId> {
        let t = self.store.tasks().get(self.selected)?;
        Some(t.parent_id().unwrap_or(t.id))
    }

    fn add_subtask(&mut self) -> Result<()> {
        let Some(parent) = self.selected_parent() else {
            return Ok(());
        };
        if let Some(id) = self.store.add_subtask(parent, Utc::now())? {
            self.select_id(id);
            self.mode = Mode::Input {
                target: InputTarget::Edit(id),
                buf: String::new(),
            };
        }
        Ok(())
    }

    fn start_expansion(&mut self) {
        let Some(id) = self.selected_id() else {
            return;
        };
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(h) => h,
            Err(e) => {
                tracing::warn!(error = %e, "no runtime for expansion");
                self.status = Some(llm::EXPAND_FAILED.to_string());
                return;
            }
        };

        let ticket = match self.store.begin_expansion(id) {
            Ok(t) => t,
            Err(e) => {
                tracing::debug!(code = e.to_error_code(), "expansion refused");
                self.status = Some(match e {
                    ExpandError::InFlight(_) => "Still generating subtasks…".to_string(),
                    other => other.to_string(),
                });
                return;
            }
        };

        let title = self.store.get(id).map(|t| t.text.clone()).unwrap_or_default();
        let cfg = self.cfg.clone();
        let tx = self.results_tx.clone();
        let token = ticket.token();
        handle.spawn(async move {
            let out = llm::suggest_subtasks(&cfg, &title).await;
            // Receiver gone means the board closed; nothing to deliver.
            let _ = tx.send((token, out));
        });

        self.pending = Some(ticket);
        self.status = Some("Generating subtasks…".to_string());
    }

    fn drain_results(&mut self) -> Result<()> {
        while let Ok((token, out)) = self.results_rx.try_recv() {
            self.deliver(token, out)?;
        }
        Ok(())
    }

    fn deliver(&mut self, token: u64, out: Suggestions) -> Result<()> {
        let Some(ticket) = self.pending.take_if(|t| t.token() == token) else {
            tracing::debug!(token, "dropping result for an old request");
            return Ok(());
        };

        if let Some(msg) = out.error {
            self.store.cancel_expansion(ticket)?;
            self.status = Some(msg);
            return Ok(());
        }

        let added = self.store.finish_expansion(ticket, &out.subtasks, Utc::now())?;
        self.status = Some(match added.len() {
            0 => "No subtasks suggested.".to_string(),
            n => format!("Added {n} subtasks."),
        });
        Ok(())
    }

    fn draw(&self, f: &mut Frame) {
        let pal = self.theme.palette();
        let base = Style::default().fg(pal.fg).bg(pal.bg);

        let chunks = Layout::vertical([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(3),
        ])
        .split(f.area());

        let open = self.store.tasks().iter().filter(|t| !t.completed).count();
        let header = Paragraph::new(Line::from(vec![
            Span::styled(
                "smartdo",
                Style::default().fg(pal.accent).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  {open} open · {} theme", self.theme),
                Style::default().fg(pal.muted),
            ),
        ]))
        .style(base)
        .block(Block::default().borders(Borders::ALL));
        f.render_widget(header, chunks[0]);

        f.render_widget(
            Paragraph::new(self.rows())
                .style(base)
                .block(Block::default().borders(Borders::ALL).title("tasks")),
            chunks[1],
        );

        let footer = match &self.mode {
            Mode::Input { target, buf } => {
                let title = match target {
                    InputTarget::Add => "new task",
                    InputTarget::Edit(_) => "edit",
                };
                Paragraph::new(format!("{buf}_"))
                    .block(Block::default().borders(Borders::ALL).title(title))
            }
            Mode::Normal => {
                let msg = self.status.as_deref().unwrap_or(HELP);
                Paragraph::new(Span::styled(msg.to_string(), Style::default().fg(pal.muted)))
                    .block(Block::default().borders(Borders::ALL))
            }
        };
        f.render_widget(footer.style(base), chunks[2]);
    }

    fn rows(&self) -> Text<'static> {
        let pal = self.theme.palette();
        let in_flight = self.store.expansion_in_flight();
        let counts: Vec<(TaskId, usize, usize)> = self
            .store
            .families()
            .iter()
            .map(|f| (f.parent.id, f.done_count(), f.subtasks.len()))
            .collect();

        if self.store.is_empty() {
            return Text::from(Line::styled(
                "Nothing here yet. Press a to add a task.",
                Style::default().fg(pal.muted),
            ));
        }

        let lines = self
            .store
            .tasks()
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let mut style = Style::default().fg(pal.fg);
                if t.completed {
                    style = style.fg(pal.done).add_modifier(Modifier::CROSSED_OUT);
                }
                if i == self.selected {
                    style = style.add_modifier(Modifier::REVERSED);
                }

                let indent = if t.is_subtask() { "    " } else { "" };
                let mark = if t.completed { "[x]" } else { "[ ]" };
                let text = if t.text.is_empty() { "…" } else { t.text.as_str() };
                let mut spans = vec![Span::styled(format!("{indent}{mark} {text}"), style)];

                let progress = counts.iter().find(|(id, _, n)| *id == t.id && *n > 0);
                if let Some((_, done, total)) = progress {
                    spans.push(Span::styled(
                        format!("  {done}/{total}"),
                        Style::default().fg(pal.muted),
                    ));
                }
                if in_flight == Some(t.id) {
                    spans.push(Span::styled("  ✦ thinking", Style::default().fg(pal.accent)));
                }
                Line::from(spans)
            })
            .collect::<Vec<_>>();
        Text::from(lines)
    }
}
