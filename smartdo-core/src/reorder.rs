//! Drag-and-drop commit: move one task onto another without breaking families.
//!
//! Subtasks move alone, and only within their own family. Parents move as a
//! block together with all of their subtasks, and the insertion point is
//! pushed past any family it would otherwise land inside of.

use crate::family::family_end;
use crate::task::{Task, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Result of dropping `active` onto `over`.
///
/// `None` means the drop is a no-op: no target, a target equal to `active`,
/// an id that is not in the list, or a subtask dropped outside its family.
pub fn reorder(tasks: &[Task], active: TaskId, over: Option<TaskId>) -> Option<Vec<Task>> {
    let over = over.filter(|o| *o != active)?;
    let active_idx = tasks.iter().position(|t| t.id == active)?;
    let over_idx = tasks.iter().position(|t| t.id == over)?;

    match tasks[active_idx].parent_id() {
        Some(parent_id) => move_subtask(tasks, active_idx, over_idx, parent_id),
        None => move_family(tasks, active_idx, over_idx),
    }
}

fn move_subtask(
    tasks: &[Task],
    active_idx: usize,
    over_idx: usize,
    parent_id: TaskId,
) -> Option<Vec<Task>> {
    let over_task = &tasks[over_idx];
    let to = if over_task.id == parent_id {
        // Dropping onto the parent: first slot of the family.
        let parent_idx = over_idx;
        if active_idx > parent_idx {
            parent_idx + 1
        } else {
            parent_idx
        }
    } else if over_task.is_child_of(parent_id) {
        over_idx
    } else {
        return None;
    };
    Some(array_move(tasks, active_idx, to))
}

/// The block lands where `over` sits in the remainder, so a family dropped onto
/// the task right after it stays put.
fn move_family(tasks: &[Task], active_idx: usize, over_idx: usize) -> Option<Vec<Task>> {
    let active = tasks[active_idx].id;
    let over = tasks[over_idx].id;

    let (block, remainder): (Vec<Task>, Vec<Task>) = tasks
        .iter()
        .cloned()
        .partition(|t| t.id == active || t.is_child_of(active));

    // Dropped onto one of its own subtasks.
    if block.iter().any(|t| t.id == over) {
        return None;
    }

    let mut point = remainder.iter().position(|t| t.id == over)?;

    // Containment repair: never split another parent from its subtasks.
    while point < remainder.len() && remainder[point].is_subtask() {
        point += 1;
    }

    let mut out = Vec::with_capacity(tasks.len());
    out.extend_from_slice(&remainder[..point]);
    out.extend(block);
    out.extend_from_slice(&remainder[point..]);
    Some(out)
}

/// Single-element move by index, same semantics as dnd-kit's `arrayMove`.
fn array_move(tasks: &[Task], from: usize, to: usize) -> Vec<Task> {
    let mut out = tasks.to_vec();
    let item = out.remove(from);
    out.insert(to.min(out.len()), item);
    out
}

/// The `(active, over)` drag that moves `id` one step in `dir`, as a keyboard
/// substitute for dragging.
///
/// Parents step over whole neighbouring families; subtasks step over
/// siblings. A parent moving down is expressed as the next family being
/// dropped onto it. `None` at either edge.
pub fn neighbor_move(tasks: &[Task], id: TaskId, dir: Direction) -> Option<(TaskId, TaskId)> {
    let idx = tasks.iter().position(|t| t.id == id)?;
    let task = &tasks[idx];

    if let Some(parent_id) = task.parent_id() {
        let sibling = match dir {
            Direction::Up => tasks[..idx].last()?,
            Direction::Down => tasks.get(idx + 1)?,
        };
        return sibling.is_child_of(parent_id).then_some((id, sibling.id));
    }

    match dir {
        Direction::Up => {
            let prev = tasks[..idx].iter().rev().find(|t| t.is_parent())?;
            Some((id, prev.id))
        }
        Direction::Down => {
            let next = tasks.get(family_end(tasks, idx))?;
            Some((next.id, id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::check_containment;
    use chrono::Utc;

    // [A(1), A1(2), A2(3), B(4)]
    fn sample() -> Vec<Task> {
        let now = Utc::now();
        vec![
            Task::new(TaskId(1), "A", now),
            Task::subtask(TaskId(2), TaskId(1), "A1", now),
            Task::subtask(TaskId(3), TaskId(1), "A2", now),
            Task::new(TaskId(4), "B", now),
        ]
    }

    fn ids(tasks: &[Task]) -> Vec<u64> {
        tasks.iter().map(|t| t.id.0).collect()
    }

    #[test]
    fn no_op_drops() {
        let tasks = sample();
        assert!(reorder(&tasks, TaskId(4), None).is_none());
        assert!(reorder(&tasks, TaskId(4), Some(TaskId(4))).is_none());
        assert!(reorder(&tasks, TaskId(4), Some(TaskId(42))).is_none());
        assert!(reorder(&tasks, TaskId(42), Some(TaskId(1))).is_none());
    }

    #[test]
    fn parent_dropped_onto_subtask_lands_after_the_family() {
        let out = reorder(&sample(), TaskId(4), Some(TaskId(2))).unwrap();
        assert_eq!(ids(&out), vec![1, 2, 3, 4]);
    }

    #[test]
    fn parent_dropped_onto_parent_moves_whole_family() {
        let out = reorder(&sample(), TaskId(4), Some(TaskId(1))).unwrap();
        assert_eq!(ids(&out), vec![4, 1, 2, 3]);

        let out = reorder(&sample(), TaskId(1), Some(TaskId(4))).unwrap();
        assert_eq!(ids(&out), vec![1, 2, 3, 4]);
    }

    #[test]
    fn moving_down_lands_before_the_target() {
        let now = Utc::now();
        let tasks = vec![
            Task::new(TaskId(1), "A", now),
            Task::new(TaskId(2), "B", now),
            Task::new(TaskId(3), "C", now),
        ];
        let out = reorder(&tasks, TaskId(1), Some(TaskId(3))).unwrap();
        assert_eq!(ids(&out), vec![2, 1, 3]);
    }

    #[test]
    fn parent_dropped_onto_own_subtask_is_a_no_op() {
        assert!(reorder(&sample(), TaskId(1), Some(TaskId(3))).is_none());
    }

    #[test]
    fn moving_down_into_a_family_skips_past_it() {
        let now = Utc::now();
        let tasks = vec![
            Task::new(TaskId(1), "A", now),
            Task::new(TaskId(2), "B", now),
            Task::subtask(TaskId(3), TaskId(2), "B1", now),
            Task::subtask(TaskId(4), TaskId(2), "B2", now),
            Task::new(TaskId(5), "C", now),
        ];
        let out = reorder(&tasks, TaskId(1), Some(TaskId(3))).unwrap();
        assert_eq!(ids(&out), vec![2, 3, 4, 1, 5]);

        let out = reorder(&tasks, TaskId(1), Some(TaskId(5))).unwrap();
        assert_eq!(ids(&out), vec![2, 3, 4, 1, 5]);
    }

    #[test]
    fn subtask_moves_within_family_only() {
        let tasks = sample();
        let out = reorder(&tasks, TaskId(3), Some(TaskId(2))).unwrap();
        assert_eq!(ids(&out), vec![1, 3, 2, 4]);

        let out = reorder(&tasks, TaskId(3), Some(TaskId(1))).unwrap();
        assert_eq!(ids(&out), vec![1, 3, 2, 4]);

        assert!(reorder(&tasks, TaskId(2), Some(TaskId(4))).is_none());
    }

    #[test]
    fn parent_moves_never_split_any_family() {
        let now = Utc::now();
        let mut tasks = Vec::new();
        for p in 1..=4u64 {
            tasks.push(Task::new(TaskId(p * 10), "P", now));
            for s in 1..p {
                tasks.push(Task::subtask(TaskId(p * 10 + s), TaskId(p * 10), "S", now));
            }
        }
        let all: Vec<TaskId> = tasks.iter().map(|t| t.id).collect();
        for active in tasks.iter().filter(|t| t.is_parent()).map(|t| t.id) {
            for over in &all {
                if let Some(out) = reorder(&tasks, active, Some(*over)) {
                    assert_eq!(check_containment(&out), None, "{active} onto {over}");
                    assert_eq!(out.len(), tasks.len());
                }
            }
        }
    }

    #[test]
    fn neighbor_moves_step_over_families() {
        let tasks = sample();
        let down = neighbor_move(&tasks, TaskId(1), Direction::Down);
        assert_eq!(down, Some((TaskId(4), TaskId(1))));
        let up = neighbor_move(&tasks, TaskId(4), Direction::Up);
        assert_eq!(up, Some((TaskId(4), TaskId(1))));
        assert_eq!(neighbor_move(&tasks, TaskId(1), Direction::Up), None);
        assert_eq!(neighbor_move(&tasks, TaskId(4), Direction::Down), None);
        let sibling = neighbor_move(&tasks, TaskId(2), Direction::Down);
        assert_eq!(sibling, Some((TaskId(2), TaskId(3))));
        assert_eq!(neighbor_move(&tasks, TaskId(2), Direction::Up), None);
        assert_eq!(neighbor_move(&tasks, TaskId(3), Direction::Down), None);

        let (active, over) = down.unwrap();
        let out = reorder(&tasks, active, Some(over)).unwrap();
        assert_eq!(ids(&out), vec![4, 1, 2, 3]);
    }
}
