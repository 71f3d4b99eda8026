use anyhow::{Context, Result};
use smartdo_core::{JsonFileStorage, TaskStore};
use std::fs;
use std::path::PathBuf;

/// `$SMARTDO_HOME`, else `~/.smartdo`.
pub fn smartdo_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("SMARTDO_HOME") {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".smartdo"))
}

pub fn ensure_smartdo_home() -> Result<PathBuf> {
    let dir = smartdo_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn tasks_path() -> Result<PathBuf> {
    Ok(ensure_smartdo_home()?.join("tasks.json"))
}

pub fn theme_path() -> Result<PathBuf> {
    Ok(ensure_smartdo_home()?.join("theme"))
}

pub fn log_path() -> Result<PathBuf> {
    Ok(ensure_smartdo_home()?.join("smartdo.log"))
}

pub fn open_store() -> Result<TaskStore<JsonFileStorage>> {
    let p = tasks_path()?;
    TaskStore::open(JsonFileStorage::new(&p)).with_context(|| format!("open {}", p.display()))
}
