//! Sync client seam
//!
//! The engine talks to the backend exclusively through [`SyncClient`]. Every
//! call returns the full refreshed task snapshot on success so the caller
//! can reconcile optimistic state against what the server actually stored.

use crate::error::PersistError;
use dealflow_model::{ClientId, PropertyId, TaskId, TaskPatch, TaskSnapshot};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which companion relation a relation update targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    /// Linked client record
    Client,
    /// Linked property record
    Property,
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelationKind::Client => write!(f, "client"),
            RelationKind::Property => write!(f, "property"),
        }
    }
}

/// Untyped record id as it travels over the relation endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelatedId(pub Uuid);

impl From<ClientId> for RelatedId {
    fn from(id: ClientId) -> Self {
        Self(id.0)
    }
}

impl From<PropertyId> for RelatedId {
    fn from(id: PropertyId) -> Self {
        Self(id.0)
    }
}

impl std::fmt::Display for RelatedId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One file queued for upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentUpload {
    /// File name shown in the record
    pub file_name: String,
    /// MIME type
    pub media_type: String,
    /// Raw file content
    pub bytes: Vec<u8>,
}

impl AttachmentUpload {
    /// Create an upload payload
    #[inline]
    #[must_use]
    pub fn new(
        file_name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }
}

/// Persistence boundary for task records
///
/// Implementations are expected to be cheap to clone behind an `Arc` and
/// safe to call concurrently; the engine issues one call per field lane at
/// a time but lanes overlap freely.
#[async_trait::async_trait]
pub trait SyncClient: Send + Sync {
    /// Persist a partial field update
    ///
    /// # Errors
    /// Returns [`PersistError`] when the update did not take effect
    async fn update_fields(
        &self,
        task: TaskId,
        patch: TaskPatch,
    ) -> Result<TaskSnapshot, PersistError>;

    /// Upload attachments to a task record
    ///
    /// # Errors
    /// Returns [`PersistError`] when the upload did not complete
    async fn upload_attachments(
        &self,
        task: TaskId,
        files: Vec<AttachmentUpload>,
    ) -> Result<TaskSnapshot, PersistError>;

    /// Replace the id set of one companion relation
    ///
    /// An empty `ids` clears the relation. Current relations hold at most
    /// one id.
    ///
    /// # Errors
    /// Returns [`PersistError`] when the update did not take effect
    async fn set_related_ids(
        &self,
        task: TaskId,
        kind: RelationKind,
        ids: Vec<RelatedId>,
    ) -> Result<TaskSnapshot, PersistError>;
}
