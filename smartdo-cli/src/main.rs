use anyhow::Result;
use clap::{Parser, Subcommand};

mod auth;
mod board;
mod config;
mod llm;
mod logging;
mod state;
mod tasks_cmd;
mod theme;
mod time;

use llm::Provider;
use logging::LogTarget;
use tasks_cmd::TaskCommand;

#[derive(Parser, Debug)]
#[command(name = "smartdo", version, about = "To-do list with AI-generated subtasks")]
struct Cli {
    /// Debug-level logs (overridden by SMARTDO_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(flatten)]
    Task(TaskCommand),

    /// Full-screen board (keyboard driven)
    Board,

    /// Light/dark preference used by the board
    Theme {
        #[command(subcommand)]
        command: Option<ThemeCommand>,
    },

    /// Store API keys for subtask generation
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },

    /// Inspect or create ~/.smartdo/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Version, build and storage location
    About,
}

#[derive(Subcommand, Debug)]
enum ThemeCommand {
    Show,
    Toggle,
}

#[derive(Subcommand, Debug)]
enum AuthCommand {
    /// Save a Gemini API key to ~/.smartdo/auth.json
    PasteGeminiApiKey,

    /// Save an OpenAI API key (sk-...)
    PasteOpenaiApiKey,

    /// Save an Anthropic API key (sk-ant-...)
    PasteAnthropicApiKey,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default config if none exists
    Init,

    /// Print the effective config
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let target = match cli.command {
        Some(Command::Board) => LogTarget::File(state::log_path()?),
        _ => LogTarget::Stderr,
    };
    logging::init_logging(cli.verbose, target)?;

    match cli.command.unwrap_or(Command::Task(TaskCommand::List)) {
        Command::Task(cmd) => tasks_cmd::run(cmd).await?,

        Command::Board => {
            let cfg = config::load_config()?;
            tokio::task::block_in_place(|| board::run_board(cfg))?;
        }

        Command::Theme { command } => match command.unwrap_or(ThemeCommand::Show) {
            ThemeCommand::Show => println!("{}", theme::load_theme()?),
            ThemeCommand::Toggle => println!("{}", theme::toggle_theme()?),
        },

        Command::Auth { command } => match command {
            AuthCommand::PasteGeminiApiKey => auth::paste_key(Provider::Gemini)?,
            AuthCommand::PasteOpenaiApiKey => auth::paste_key(Provider::OpenAI)?,
            AuthCommand::PasteAnthropicApiKey => auth::paste_key(Provider::Anthropic)?,
        },

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => config::show_config()?,
        },

        Command::About => {
            println!(
                "smartdo {} ({})",
                env!("CARGO_PKG_VERSION"),
                env!("SMARTDO_BUILD_SHA")
            );
            println!("Tasks: {}", tasks_cmd::store_location()?);
        }
    }

    Ok(())
}
