//! Engine-level errors
//!
//! Only operations the caller awaits directly return errors. Debounced
//! persist failures surface through rollback plus the notification sink,
//! never through a `Result`.

use dealflow_model::ValidationError;
use dealflow_remote::PersistError;

/// Errors returned by engine entry points
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum AutosaveError {
    /// Edit rejected before any optimistic apply
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Engine already tore down; the snapshot is gone
    #[error("autosave engine is closed")]
    Closed,

    /// Only one attachment batch may be uploading at a time
    #[error("an attachment upload is already in flight")]
    UploadInFlight,

    /// A directly-awaited persist call failed
    #[error("persist failed: {0}")]
    Persist(#[from] PersistError),
}
