//! Completion and deletion cascades over the flat task list.
//!
//! Both functions work on a copy and hand back the next list, so the store
//! can commit (and persist) in one step.

use std::collections::HashMap;

use crate::task::{Task, TaskId, TaskRole};

/// Flip `id`'s completion and reconcile the hierarchy.
///
/// 1) cascade down: a toggled parent pushes its new value onto every subtask
/// 2) bubble up: every parent with at least one subtask becomes the AND of
///    its subtasks; childless parents keep whatever the toggle set
///
/// Returns `None` when `id` is not in the list.
pub fn toggle_with_cascade(tasks: &[Task], id: TaskId) -> Option<Vec<Task>> {
    let target = tasks.iter().find(|t| t.id == id)?;
    let value = !target.completed;
    let toggled_parent = target.is_parent();

    let mut next = tasks.to_vec();
    for t in next.iter_mut() {
        if t.id == id || (toggled_parent && t.is_child_of(id)) {
            t.completed = value;
        }
    }

    bubble_up(&mut next);
    Some(next)
}

/// Recompute every parent's completion from its subtasks.
pub fn bubble_up(tasks: &mut [Task]) {
    let order: Vec<TaskId> = tasks.iter().filter(|t| t.is_parent()).map(|t| t.id).collect();
    bubble_up_in_order(tasks, &order);
}

// Each parent reads only its own subtasks, so `parent_order` cannot change
// the outcome.
fn bubble_up_in_order(tasks: &mut [Task], parent_order: &[TaskId]) {
    // parent id -> all subtasks completed
    let mut rollup: HashMap<TaskId, bool> = HashMap::new();
    for t in tasks.iter() {
        if let TaskRole::Subtask { parent_id } = t.role {
            *rollup.entry(parent_id).or_insert(true) &= t.completed;
        }
    }

    let index: HashMap<TaskId, usize> = tasks
        .iter()
        .enumerate()
        .filter(|(_, t)| t.is_parent())
        .map(|(i, t)| (t.id, i))
        .collect();

    for pid in parent_order {
        let (Some(&done), Some(&i)) = (rollup.get(pid), index.get(pid)) else {
            continue;
        };
        tasks[i].completed = done;
    }
}

/// Remove `id` and every task whose parent is `id`, in one pass.
///
/// Depth is fixed at two, so there are no grandchildren to chase. Returns
/// `None` when `id` is not in the list.
pub fn delete_with_cascade(tasks: &[Task], id: TaskId) -> Option<Vec<Task>> {
    if !tasks.iter().any(|t| t.id == id) {
        return None;
    }
    Some(
        tasks
            .iter()
            .filter(|t| t.id != id && !t.is_child_of(id))
            .cloned()
            .collect(),
    )
}
