//! The ordered task list plus write-through persistence.
//!
//! Every mutation builds the next list, swaps it in, and saves the whole list
//! once. Missing ids and blank text are no-ops, never errors; the only errors
//! a mutation returns come from the storage backend.
//!
//! AI expansion is split into begin/finish so the network call can happen in
//! between without holding the store. Only one expansion may be outstanding.

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::cascade::{delete_with_cascade, toggle_with_cascade};
use crate::error::ExpandError;
use crate::family::{Family, check_containment, families, family_end};
use crate::reorder::reorder;
use crate::storage::TaskStorage;
use crate::task::{Task, TaskId, next_ids};

/// Proof that the holder owns the single in-flight expansion slot.
///
/// Not `Clone`: finishing or cancelling consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct ExpansionTicket {
    token: u64,
    parent_id: TaskId,
}

impl ExpansionTicket {
    pub fn parent_id(&self) -> TaskId {
        self.parent_id
    }

    pub fn token(&self) -> u64 {
        self.token
    }
}

#[derive(Debug)]
pub struct TaskStore<S: TaskStorage> {
    tasks: Vec<Task>,
    storage: S,
    in_flight: Option<(u64, TaskId)>,
    last_token: u64,
}

impl<S: TaskStorage> TaskStore<S> {
    pub fn open(mut storage: S) -> Result<Self> {
        let tasks = storage.load()?;
        if let Some(id) = check_containment(&tasks) {
            tracing::warn!(parent = %id, "loaded list has a split family; leaving order as stored");
        }
        tracing::debug!(count = tasks.len(), "task store opened");
        Ok(Self {
            tasks,
            storage,
            in_flight: None,
            last_token: 0,
        })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn families(&self) -> Vec<Family<'_>> {
        families(&self.tasks)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Prepend a new parent-role task. Blank text adds nothing.
    pub fn add_task(&mut self, text: &str, now: DateTime<Utc>) -> Result<Option<TaskId>> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let Some(id) = self.reserve_ids(1, now) else {
            return Ok(None);
        };
        let mut next = Vec::with_capacity(self.tasks.len() + 1);
        next.push(Task::new(id, text, now));
        next.extend_from_slice(&self.tasks);
        self.commit(next)?;
        tracing::debug!(%id, "added task");
        Ok(Some(id))
    }

    /// Prepend a parent and its subtasks as one batch.
    pub fn add_parent_with_subtasks(
        &mut self,
        text: &str,
        subtasks: &[String],
        now: DateTime<Utc>,
    ) -> Result<Option<TaskId>> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let subtasks: Vec<&str> = subtasks
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();
        let Some(parent_id) = self.reserve_ids(subtasks.len() + 1, now) else {
            return Ok(None);
        };

        let mut batch = vec![Task::new(parent_id, text, now)];
        for (i, s) in subtasks.iter().enumerate() {
            // In range: reserve_ids checked parent_id + subtasks.len().
            let id = TaskId(parent_id.0 + 1 + i as u64);
            batch.push(Task::subtask(id, parent_id, *s, now));
        }
        batch.extend_from_slice(&self.tasks);
        self.commit(batch)?;
        tracing::debug!(%parent_id, subtasks = subtasks.len(), "added family");
        Ok(Some(parent_id))
    }

    /// Insert an empty subtask at the end of `parent_id`'s family.
    ///
    /// No-op when the parent is missing or is itself a subtask.
    pub fn add_subtask(&mut self, parent_id: TaskId, now: DateTime<Utc>) -> Result<Option<TaskId>> {
        let Some(ids) = self.insert_subtasks(parent_id, &[String::new()], now)? else {
            return Ok(None);
        };
        Ok(ids.first().copied())
    }

    pub fn edit_task(&mut self, id: TaskId, text: &str) -> Result<bool> {
        let Some(idx) = self.position(id) else {
            return Ok(false);
        };
        if self.tasks[idx].text == text {
            return Ok(false);
        }
        let mut next = self.tasks.clone();
        next[idx].text = text.to_string();
        self.commit(next)?;
        tracing::debug!(%id, "edited task");
        Ok(true)
    }

    pub fn toggle_task(&mut self, id: TaskId) -> Result<bool> {
        let Some(next) = toggle_with_cascade(&self.tasks, id) else {
            return Ok(false);
        };
        self.commit(next)?;
        tracing::debug!(%id, "toggled task");
        Ok(true)
    }

    /// Remove `id` and its subtasks. Returns how many tasks went away.
    pub fn delete_task(&mut self, id: TaskId) -> Result<usize> {
        let Some(next) = delete_with_cascade(&self.tasks, id) else {
            return Ok(0);
        };
        let removed = self.tasks.len() - next.len();
        self.commit(next)?;
        tracing::debug!(%id, removed, "deleted task");
        Ok(removed)
    }

    /// Commit a drag-and-drop of `active` onto `over`.
    ///
    /// Returns `false` when the order did not change.
    pub fn reorder(&mut self, active: TaskId, over: Option<TaskId>) -> Result<bool> {
        let Some(next) = reorder(&self.tasks, active, over) else {
            return Ok(false);
        };
        if same_order(&next, &self.tasks) {
            return Ok(false);
        }
        self.commit(next)?;
        tracing::debug!(%active, over = ?over, "reordered");
        Ok(true)
    }

    /// Claim the expansion slot for `parent_id`.
    pub fn begin_expansion(&mut self, parent_id: TaskId) -> Result<ExpansionTicket, ExpandError> {
        if let Some((_, pending)) = self.in_flight {
            return Err(ExpandError::InFlight(pending));
        }
        let parent = self.get(parent_id).ok_or(ExpandError::ParentNotFound(parent_id))?;
        if !parent.is_parent() {
            return Err(ExpandError::NotAParent(parent_id));
        }

        self.last_token += 1;
        self.in_flight = Some((self.last_token, parent_id));
        tracing::debug!(%parent_id, token = self.last_token, "expansion started");
        Ok(ExpansionTicket {
            token: self.last_token,
            parent_id,
        })
    }

    pub fn expansion_in_flight(&self) -> Option<TaskId> {
        self.in_flight.map(|(_, id)| id)
    }

    /// Insert the generated subtasks after the parent's existing ones and
    /// release the slot.
    ///
    /// If the parent was deleted while the call was out, the result is
    /// discarded and an empty list returned.
    pub fn finish_expansion(
        &mut self,
        ticket: ExpansionTicket,
        texts: &[String],
        now: DateTime<Utc>,
    ) -> Result<Vec<TaskId>, ExpandError> {
        self.release(&ticket)?;
        let texts: Vec<String> = texts
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if texts.is_empty() {
            return Ok(vec![]);
        }
        match self.insert_subtasks(ticket.parent_id, &texts, now)? {
            Some(ids) => Ok(ids),
            None => {
                tracing::debug!(parent = %ticket.parent_id, "parent gone; discarding expansion");
                Ok(vec![])
            }
        }
    }

    /// Release the slot without touching the list.
    pub fn cancel_expansion(&mut self, ticket: ExpansionTicket) -> Result<(), ExpandError> {
        self.release(&ticket)
    }

    fn release(&mut self, ticket: &ExpansionTicket) -> Result<(), ExpandError> {
        match self.in_flight {
            Some((token, _)) if token == ticket.token => {
                self.in_flight = None;
                Ok(())
            }
            _ => Err(ExpandError::StaleTicket(ticket.token)),
        }
    }

    fn insert_subtasks(
        &mut self,
        parent_id: TaskId,
        texts: &[String],
        now: DateTime<Utc>,
    ) -> Result<Option<Vec<TaskId>>> {
        let Some(parent_idx) = self.position(parent_id) else {
            return Ok(None);
        };
        if !self.tasks[parent_idx].is_parent() {
            return Ok(None);
        }

        let at = family_end(&self.tasks, parent_idx);
        let Some(first) = self.reserve_ids(texts.len(), now) else {
            return Ok(None);
        };
        let batch: Vec<Task> = texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                Task::subtask(TaskId(first.0 + i as u64), parent_id, text.as_str(), now)
            })
            .collect();
        let ids = batch.iter().map(|t| t.id).collect();

        let mut next = self.tasks.clone();
        next.splice(at..at, batch);
        self.commit(next)?;
        tracing::debug!(%parent_id, count = texts.len(), at, "inserted subtasks");
        Ok(Some(ids))
    }

    /// First of `count` fresh ids, or `None` (logged) when the id space is used up.
    fn reserve_ids(&self, count: usize, now: DateTime<Utc>) -> Option<TaskId> {
        let first = next_ids(&self.tasks, now, count);
        if first.is_none() {
            tracing::warn!(count, "no free task ids left; ignoring add");
        }
        first
    }

    fn position(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    fn commit(&mut self, next: Vec<Task>) -> Result<()> {
        self.tasks = next;
        self.storage.save(&self.tasks)
    }
}

fn same_order(a: &[Task], b: &[Task]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.id == y.id)
}
