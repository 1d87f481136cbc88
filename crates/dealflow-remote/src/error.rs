//! Errors crossing the remote boundary

use dealflow_model::TaskId;

/// Failure of a persist call
///
/// Persist failures are terminal for the attempt: the engine rolls the
/// affected field back and notifies, it never retries on its own.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PersistError {
    /// Network-level failure, nothing reached the server
    #[error("transport failure: {0}")]
    Transport(String),

    /// Session rejected by the server
    #[error("not authorized: {0}")]
    Unauthorized(String),

    /// Server understood and refused the update
    #[error("update rejected: {0}")]
    Rejected(String),

    /// No task record with this id
    #[error("unknown task {0}")]
    UnknownTask(TaskId),
}

/// Failure of a candidate lookup
///
/// Lookup failures only degrade display data; they are logged and the link
/// stays id-only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// Network-level failure
    #[error("transport failure: {0}")]
    Transport(String),

    /// Server refused the lookup
    #[error("lookup rejected: {0}")]
    Rejected(String),
}
