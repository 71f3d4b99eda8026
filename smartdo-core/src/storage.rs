//! Persistence backends for the task list.
//!
//! The whole list is one JSON array, written wholesale after every change.
//! There is no schema version; loading goes through [`resolve_records`] so
//! older shapes still read.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::task::{Task, TaskRecord, resolve_records};

pub trait TaskStorage {
    /// Read the full list. A store that has never been written loads empty.
    fn load(&mut self) -> Result<Vec<Task>>;

    /// Replace the full list.
    fn save(&mut self, tasks: &[Task]) -> Result<()>;
}

pub fn encode_tasks(tasks: &[Task]) -> Result<String> {
    serde_json::to_string(tasks).context("serialize tasks")
}

pub fn decode_tasks(json: &str) -> Result<Vec<Task>> {
    if json.trim().is_empty() {
        return Ok(vec![]);
    }
    let records: Vec<TaskRecord> = serde_json::from_str(json).context("parse tasks json")?;
    Ok(resolve_records(records))
}

/// Keeps the serialized blob in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    blob: Option<String>,
    saves: usize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(json: impl Into<String>) -> Self {
        Self {
            blob: Some(json.into()),
            saves: 0,
        }
    }

    pub fn blob(&self) -> Option<&str> {
        self.blob.as_deref()
    }

    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl TaskStorage for MemoryStorage {
    fn load(&mut self) -> Result<Vec<Task>> {
        match &self.blob {
            Some(s) => decode_tasks(s),
            None => Ok(vec![]),
        }
    }

    fn save(&mut self, tasks: &[Task]) -> Result<()> {
        self.blob = Some(encode_tasks(tasks)?);
        self.saves += 1;
        Ok(())
    }
}

/// One JSON file on disk, e.g. `~/.smartdo/tasks.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TaskStorage for JsonFileStorage {
    fn load(&mut self) -> Result<Vec<Task>> {
        if !self.path.exists() {
            return Ok(vec![]);
        }
        let s = fs::read_to_string(&self.path)
            .with_context(|| format!("read {}", self.path.display()))?;
        decode_tasks(&s).with_context(|| format!("load {}", self.path.display()))
    }

    fn save(&mut self, tasks: &[Task]) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        }
        let json = encode_tasks(tasks)?;
        fs::write(&self.path, json).with_context(|| format!("write {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskId;
    use chrono::{TimeZone, Utc};

    fn sample() -> Vec<Task> {
        let at = Utc.with_ymd_and_hms(2026, 1, 5, 9, 30, 0).unwrap();
        vec![
            Task::new(TaskId(1), "Plan trip", at),
            Task::subtask(TaskId(2), TaskId(1), "Book flights", at).with_completed(true),
            Task::subtask(TaskId(3), TaskId(1), "", at),
            Task::new(TaskId(4), "Laundry", at).with_completed(true),
        ]
    }

    #[test]
    fn memory_round_trip_is_lossless() {
        let mut s = MemoryStorage::new();
        assert!(s.load().unwrap().is_empty());
        s.save(&sample()).unwrap();
        assert_eq!(s.load().unwrap(), sample());
        assert_eq!(s.save_count(), 1);
    }

    #[test]
    fn file_round_trip_is_lossless() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = JsonFileStorage::new(dir.path().join("nested").join("tasks.json"));
        assert!(s.load().unwrap().is_empty());
        s.save(&sample()).unwrap();
        assert_eq!(s.load().unwrap(), sample());
    }

    #[test]
    fn reads_a_browser_export() {
        let json = r#"[
            {"id":1700000000000,"text":"Write report","completed":false,"createdAt":"2024-11-14T22:13:20.000Z","isParent":true},
            {"id":1700000000001,"text":"Outline","completed":true,"isSubtask":true,"createdAt":"2024-11-14T22:13:21.000Z"},
            {"id":1699999999000,"text":"Call mom","completed":false,"createdAt":"2024-11-14T22:00:00.000Z"}
        ]"#;
        let tasks = MemoryStorage::with_blob(json).load().unwrap();
        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[1].parent_id(), Some(TaskId(1_700_000_000_000)));
        assert!(tasks[2].is_parent());
    }

    #[test]
    fn garbage_is_an_error_not_an_empty_list() {
        let mut s = MemoryStorage::with_blob("{not json");
        assert!(s.load().is_err());
    }
}
