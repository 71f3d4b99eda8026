//! smartdo-core: task list model, cascades, drag-and-drop reorder, and the store

pub mod cascade;
pub mod error;
pub mod family;
pub mod reorder;
pub mod storage;
pub mod store;
pub mod suggest;
pub mod task;

pub use cascade::{bubble_up, delete_with_cascade, toggle_with_cascade};
pub use error::{ExpandError, RecordError};
pub use family::{Family, check_containment, families, family_end, subtasks_of};
pub use reorder::{Direction, neighbor_move, reorder};
pub use storage::{JsonFileStorage, MemoryStorage, TaskStorage, decode_tasks, encode_tasks};
pub use store::{ExpansionTicket, TaskStore};
pub use suggest::{DEFAULT_SUBTASK_COUNT, parse_subtask_lines, subtask_prompt};
pub use task::{Task, TaskId, TaskRecord, TaskRole, next_ids, resolve_records};
