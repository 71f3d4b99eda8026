//! Typed errors for the parts of the store callers need to match on.
//!
//! Everything else (file I/O, JSON) travels as `anyhow::Error`.

use thiserror::Error;

use crate::task::TaskId;

/// Why a persisted record could not become a [`crate::Task`] on its own.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("task {0} is flagged as both parent and subtask")]
    ConflictingRole(TaskId),

    #[error("subtask {0} has no parentId")]
    MissingParent(TaskId),
}

/// Failures of the single-flight subtask expansion protocol.
#[derive(Error, Debug)]
pub enum ExpandError {
    #[error("an expansion for task {0} is already in flight")]
    InFlight(TaskId),

    #[error("task not found: {0}")]
    ParentNotFound(TaskId),

    #[error("task {0} is a subtask and cannot own subtasks")]
    NotAParent(TaskId),

    #[error("expansion ticket {0} is no longer current")]
    StaleTicket(u64),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl ExpandError {
    pub fn to_error_code(&self) -> &'static str {
        match self {
            ExpandError::InFlight(_) => "EXPANSION_IN_FLIGHT",
            ExpandError::ParentNotFound(_) => "TASK_NOT_FOUND",
            ExpandError::NotAParent(_) => "NOT_A_PARENT",
            ExpandError::StaleTicket(_) => "STALE_TICKET",
            ExpandError::Storage(_) => "STORAGE_ERROR",
        }
    }
}
