//! Task model: one flat record per task, parents and subtasks alike.
//!
//! The persisted shape is the browser app's `my-tasks` blob (camelCase keys,
//! `isParent`/`isSubtask` flags). In memory the two flags collapse into one
//! [`TaskRole`], so a parent id exists exactly when the task is a subtask.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::RecordError;

/// Opaque task id. Persisted as a plain JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(TaskId)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRole {
    /// Standalone task, or the head of a family.
    Parent,
    Subtask { parent_id: TaskId },
}

/// Core task type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "TaskRecord", try_from = "TaskRecord")]
pub struct Task {
    pub id: TaskId,
    /// Empty while the user is still composing it.
    pub text: String,
    pub completed: bool,
    pub role: TaskRole,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(id: TaskId, text: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            text: text.into(),
            completed: false,
            role: TaskRole::Parent,
            created_at,
        }
    }

    pub fn subtask(
        id: TaskId,
        parent_id: TaskId,
        text: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            role: TaskRole::Subtask { parent_id },
            ..Self::new(id, text, created_at)
        }
    }

    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    pub fn is_parent(&self) -> bool {
        self.role == TaskRole::Parent
    }

    pub fn is_subtask(&self) -> bool {
        !self.is_parent()
    }

    pub fn parent_id(&self) -> Option<TaskId> {
        match self.role {
            TaskRole::Parent => None,
            TaskRole::Subtask { parent_id } => Some(parent_id),
        }
    }

    pub fn is_child_of(&self, id: TaskId) -> bool {
        self.parent_id() == Some(id)
    }
}

/// Wire shape of one task, as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: TaskId,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub is_parent: bool,
    #[serde(default)]
    pub is_subtask: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<TaskId>,
    pub created_at: DateTime<Utc>,
}

impl From<Task> for TaskRecord {
    fn from(t: Task) -> Self {
        let parent_id = t.parent_id();
        Self {
            id: t.id,
            text: t.text,
            completed: t.completed,
            is_parent: parent_id.is_none(),
            is_subtask: parent_id.is_some(),
            parent_id,
            created_at: t.created_at,
        }
    }
}

impl TryFrom<TaskRecord> for Task {
    type Error = RecordError;

    fn try_from(r: TaskRecord) -> Result<Self, Self::Error> {
        if r.is_parent && r.is_subtask {
            return Err(RecordError::ConflictingRole(r.id));
        }
        let role = if r.is_subtask {
            let parent_id = r.parent_id.ok_or(RecordError::MissingParent(r.id))?;
            TaskRole::Subtask { parent_id }
        } else {
            TaskRole::Parent
        };
        Ok(Self {
            id: r.id,
            text: r.text,
            completed: r.completed,
            role,
            created_at: r.created_at,
        })
    }
}

/// Turn a loaded record list into tasks, tolerating the older shapes the
/// browser app wrote.
///
/// - neither flag set: a plain parent (directly added tasks never had flags)
/// - `isSubtask` without `parentId`: adopted by the nearest preceding parent
/// - subtask whose parent is missing, is itself a subtask, or only appears
///   later in the list: promoted to parent
/// - repeated ids: later copies are dropped
///
/// Order is never changed.
pub fn resolve_records(records: Vec<TaskRecord>) -> Vec<Task> {
    let mut seen = HashSet::new();
    let mut parents_so_far: HashSet<TaskId> = HashSet::new();
    let mut last_parent: Option<TaskId> = None;
    let mut out = Vec::with_capacity(records.len());

    for r in records {
        if !seen.insert(r.id) {
            tracing::warn!(id = %r.id, "dropping duplicate task id");
            continue;
        }

        let is_child = r.is_subtask && !r.is_parent;
        let parent = if is_child {
            r.parent_id.or(last_parent)
        } else {
            None
        };

        let role = match parent {
            Some(pid) if parents_so_far.contains(&pid) => TaskRole::Subtask { parent_id: pid },
            Some(pid) => {
                tracing::warn!(
                    id = %r.id,
                    parent = %pid,
                    "promoting subtask with no earlier parent"
                );
                TaskRole::Parent
            }
            None => {
                if is_child {
                    tracing::warn!(id = %r.id, "promoting subtask with no preceding parent");
                }
                TaskRole::Parent
            }
        };

        if role == TaskRole::Parent {
            parents_so_far.insert(r.id);
            last_parent = Some(r.id);
        }

        out.push(Task {
            id: r.id,
            text: r.text,
            completed: r.completed,
            role,
            created_at: r.created_at,
        });
    }

    out
}

/// First of `count` consecutive free ids: time-ordered like the browser's
/// `Date.now()` ids, but always above every id already in use.
///
/// `None` when the range would run past `u64::MAX`.
pub fn next_ids(tasks: &[Task], now: DateTime<Utc>, count: usize) -> Option<TaskId> {
    let floor = u64::try_from(now.timestamp_millis()).unwrap_or(0);
    let above = match tasks.iter().map(|t| t.id.0).max() {
        Some(max) => max.checked_add(1)?,
        None => 0,
    };
    let first = floor.max(above);
    let span = u64::try_from(count.saturating_sub(1)).ok()?;
    first.checked_add(span)?;
    Some(TaskId(first))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 19, 12, 0, 0).unwrap()
    }

    fn rec(id: u64) -> TaskRecord {
        TaskRecord {
            id: TaskId(id),
            text: format!("t{id}"),
            completed: false,
            is_parent: false,
            is_subtask: false,
            parent_id: None,
            created_at: ts(),
        }
    }

    #[test]
    fn subtask_serializes_with_flags_and_parent_id() {
        let t = Task::subtask(TaskId(2), TaskId(1), "buy milk", ts());
        let v = serde_json::to_value(&t).unwrap();
        assert_eq!(v["id"], 2);
        assert_eq!(v["isSubtask"], true);
        assert_eq!(v["isParent"], false);
        assert_eq!(v["parentId"], 1);
        assert_eq!(v["createdAt"], "2026-02-19T12:00:00Z");
    }

    #[test]
    fn parent_omits_parent_id() {
        let v = serde_json::to_value(Task::new(TaskId(1), "groceries", ts())).unwrap();
        assert_eq!(v["isParent"], true);
        assert!(v.get("parentId").is_none());
    }

    #[test]
    fn reads_browser_iso_timestamps() {
        let json = r#"{"id":1708344000000,"text":"x","completed":true,"createdAt":"2024-02-19T12:00:00.000Z"}"#;
        let t: Task = serde_json::from_str(json).unwrap();
        assert!(t.is_parent());
        assert!(t.completed);
        assert_eq!(t.id, TaskId(1_708_344_000_000));
    }

    #[test]
    fn conflicting_flags_are_rejected() {
        let mut r = rec(1);
        r.is_parent = true;
        r.is_subtask = true;
        assert_eq!(Task::try_from(r), Err(RecordError::ConflictingRole(TaskId(1))));
    }

    #[test]
    fn legacy_subtasks_adopt_preceding_parent() {
        let mut a = rec(1);
        a.is_parent = true;
        let mut s1 = rec(2);
        s1.is_subtask = true;
        let mut s2 = rec(3);
        s2.is_subtask = true;
        let plain = rec(4);

        let tasks = resolve_records(vec![a, s1, s2, plain]);
        assert_eq!(tasks[1].parent_id(), Some(TaskId(1)));
        assert_eq!(tasks[2].parent_id(), Some(TaskId(1)));
        assert!(tasks[3].is_parent());
    }

    #[test]
    fn dangling_subtask_is_promoted_and_duplicates_dropped() {
        let mut s = rec(2);
        s.is_subtask = true;
        s.parent_id = Some(TaskId(99));
        let tasks = resolve_records(vec![s, rec(5), rec(5)]);
        assert_eq!(tasks.len(), 2);
        assert!(tasks[0].is_parent());
    }

    #[test]
    fn next_id_never_collides() {
        let millis = u64::try_from(ts().timestamp_millis()).unwrap();
        let tasks = vec![Task::new(TaskId(millis + 5), "x", ts())];
        let id = next_ids(&tasks, ts(), 1).unwrap();
        assert!(tasks.iter().all(|t| t.id < id));
        assert_eq!(next_ids(&[], ts(), 1), Some(TaskId(millis)));
    }

    #[test]
    fn id_space_exhaustion_yields_none() {
        let tasks = vec![Task::new(TaskId(u64::MAX), "last", ts())];
        assert_eq!(next_ids(&tasks, ts(), 1), None);

        let tasks = vec![Task::new(TaskId(u64::MAX - 2), "near", ts())];
        assert_eq!(next_ids(&tasks, ts(), 2), Some(TaskId(u64::MAX - 1)));
        assert_eq!(next_ids(&tasks, ts(), 3), None);
    }

    #[test]
    fn subtask_listed_before_its_parent_is_promoted() {
        let mut early = rec(2);
        early.is_subtask = true;
        early.parent_id = Some(TaskId(1));
        let mut parent = rec(1);
        parent.is_parent = true;
        let mut late = rec(3);
        late.is_subtask = true;
        late.parent_id = Some(TaskId(1));

        let tasks = resolve_records(vec![early, parent, late]);
        assert!(tasks[0].is_parent());
        assert!(tasks[1].is_parent());
        assert_eq!(tasks[2].parent_id(), Some(TaskId(1)));
    }
}
