//! Log setup: stderr for one-shot commands, a file for the board so the
//! terminal UI is not drawn over.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "SMARTDO_LOG";

#[derive(Debug, Clone)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

fn filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "smartdo=debug,smartdo_core=debug"
        } else {
            "warn"
        })
    })
}

pub fn init_logging(verbose: bool, target: LogTarget) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter(verbose))
        .with_target(verbose);

    let res = match target {
        LogTarget::Stderr => builder.with_writer(std::io::stderr).try_init(),
        LogTarget::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("open {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).try_init()
        }
    };

    // A second init (tests, re-entry) keeps the first subscriber.
    if let Err(e) = res {
        tracing::debug!("logging already initialised: {e}");
    }
    Ok(())
}
