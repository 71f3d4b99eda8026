//! Family view: a parent plus its subtasks, derived from the flat list.
//!
//! The flat sequence stays canonical (it is what gets persisted and what
//! drag-and-drop operates on). This module gives callers the owned-children
//! shape for rendering, and the checks that keep the two views in agreement.

use crate::task::{Task, TaskId};

#[derive(Debug, Clone, PartialEq)]
pub struct Family<'a> {
    pub parent: &'a Task,
    pub subtasks: Vec<&'a Task>,
}

impl Family<'_> {
    pub fn done_count(&self) -> usize {
        self.subtasks.iter().filter(|t| t.completed).count()
    }
}

/// Group the list into families, in parent order.
///
/// Subtasks whose parent is not in the list are skipped.
pub fn families(tasks: &[Task]) -> Vec<Family<'_>> {
    tasks
        .iter()
        .filter(|t| t.is_parent())
        .map(|parent| Family {
            parent,
            subtasks: subtasks_of(tasks, parent.id).collect(),
        })
        .collect()
}

pub fn subtasks_of(tasks: &[Task], parent_id: TaskId) -> impl Iterator<Item = &Task> {
    tasks.iter().filter(move |t| t.is_child_of(parent_id))
}

/// Index one past the contiguous run of `parent_idx`'s subtasks.
///
/// This is where a new subtask of that parent belongs.
pub fn family_end(tasks: &[Task], parent_idx: usize) -> usize {
    let parent_id = tasks[parent_idx].id;
    let mut end = parent_idx + 1;
    while end < tasks.len() && tasks[end].is_child_of(parent_id) {
        end += 1;
    }
    end
}

/// First parent whose family is not one contiguous run directly after it.
///
/// `None` means the containment invariant holds for the whole list.
pub fn check_containment(tasks: &[Task]) -> Option<TaskId> {
    for (i, t) in tasks.iter().enumerate() {
        if !t.is_parent() {
            continue;
        }
        let run = family_end(tasks, i) - i - 1;
        let total = subtasks_of(tasks, t.id).count();
        if run != total {
            return Some(t.id);
        }
    }
    None
}
