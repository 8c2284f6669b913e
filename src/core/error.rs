use thiserror::Error;

use super::bucket::Bucket;

/// Errors surfaced to the caller by task store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("task not found: {0}")]
    NotFound(String),

    #[error("task is not flagged: {0}")]
    NotFlagged(String),

    #[error("invalid task: {0}")]
    Validation(String),
}

/// Failure to create the next instance of a recurring task.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpawnError {
    #[error("next occurrence of {title:?} is outside the supported date range")]
    DateOutOfRange { title: String },

    #[error(transparent)]
    Task(#[from] TaskError),
}

/// Per-task failure while advancing day buckets.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdvanceError {
    #[error("no calendar date for bucket {0}")]
    NoBucketDate(Bucket),
}
