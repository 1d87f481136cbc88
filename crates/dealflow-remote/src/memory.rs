//! In-memory reference backend
//!
//! Honest implementation of [`SyncClient`] and [`LookupService`] over
//! `DashMap`, used by tests and demos. It applies patches the way the real
//! server does: full replacement per field, server clock on every write.

use crate::client::{AttachmentUpload, RelatedId, RelationKind, SyncClient};
use crate::error::{LookupError, PersistError};
use crate::lookup::{Candidate, LookupService};
use chrono::Utc;
use dashmap::DashMap;
use dealflow_model::{ClientId, ClientLink, PropertyId, PropertyLink, TaskId, TaskPatch, TaskSnapshot};

/// Backend state held entirely in memory
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    tasks: DashMap<TaskId, TaskSnapshot>,
    candidates: DashMap<RelationKind, Vec<Candidate>>,
}

impl InMemoryBackend {
    /// Empty backend
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a task record
    pub fn insert_task(&self, snapshot: TaskSnapshot) {
        self.tasks.insert(snapshot.id, snapshot);
    }

    /// Current server-side state of a task
    #[must_use]
    pub fn task(&self, id: TaskId) -> Option<TaskSnapshot> {
        self.tasks.get(&id).map(|entry| entry.clone())
    }

    /// Seed the candidate list for one relation kind
    pub fn seed_candidates(&self, kind: RelationKind, candidates: Vec<Candidate>) {
        self.candidates.insert(kind, candidates);
    }
}

#[async_trait::async_trait]
impl SyncClient for InMemoryBackend {
    async fn update_fields(
        &self,
        task: TaskId,
        patch: TaskPatch,
    ) -> Result<TaskSnapshot, PersistError> {
        let mut entry = self
            .tasks
            .get_mut(&task)
            .ok_or(PersistError::UnknownTask(task))?;
        patch.apply_to(&mut entry);
        entry.updated_at = Utc::now();
        tracing::debug!("applied field update to task {task}");
        Ok(entry.clone())
    }

    async fn upload_attachments(
        &self,
        task: TaskId,
        files: Vec<AttachmentUpload>,
    ) -> Result<TaskSnapshot, PersistError> {
        if files.is_empty() {
            return Err(PersistError::Rejected("no files in upload".to_string()));
        }
        let mut entry = self
            .tasks
            .get_mut(&task)
            .ok_or(PersistError::UnknownTask(task))?;
        for file in files {
            entry.attachments.push(file.file_name);
        }
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    async fn set_related_ids(
        &self,
        task: TaskId,
        kind: RelationKind,
        ids: Vec<RelatedId>,
    ) -> Result<TaskSnapshot, PersistError> {
        if ids.len() > 1 {
            return Err(PersistError::Rejected(format!(
                "{kind} relation accepts at most one id"
            )));
        }
        let mut entry = self
            .tasks
            .get_mut(&task)
            .ok_or(PersistError::UnknownTask(task))?;
        let id = ids.first().copied();
        match kind {
            RelationKind::Client => {
                entry.linked_client = match id {
                    Some(related) => ClientLink::IdOnly(ClientId(related.0)),
                    None => ClientLink::Unset,
                };
            }
            RelationKind::Property => {
                entry.linked_property = match id {
                    Some(related) => PropertyLink::IdOnly(PropertyId(related.0)),
                    None => PropertyLink::Unset,
                };
            }
        }
        entry.updated_at = Utc::now();
        tracing::debug!("set {kind} relation on task {task}");
        Ok(entry.clone())
    }
}

#[async_trait::async_trait]
impl LookupService for InMemoryBackend {
    async fn fetch_candidates(
        &self,
        kind: RelationKind,
        search: Option<&str>,
    ) -> Result<Vec<Candidate>, LookupError> {
        let all = self
            .candidates
            .get(&kind)
            .map(|entry| entry.clone())
            .unwrap_or_default();
        match search {
            None => Ok(all),
            Some(term) => {
                let needle = term.to_lowercase();
                Ok(all
                    .into_iter()
                    .filter(|c| c.label.to_lowercase().contains(&needle))
                    .collect())
            }
        }
    }
}
