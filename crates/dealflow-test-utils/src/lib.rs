//! Testing utilities for the dealflow workspace
//!
//! Shared fixtures plus scripted boundary doubles: a [`ScriptedClient`]
//! that records every persistence call, injects failures per endpoint, and
//! holds calls open behind release gates so tests can pin down exact
//! interleavings; and a [`RecordingSink`] that captures notifications.

#![allow(missing_docs)]

use dealflow_model::{CustomValue, Money, Priority, TaskId, TaskPatch, TaskSnapshot};
use dealflow_remote::{
    AttachmentUpload, Candidate, InMemoryBackend, LookupError, LookupService, NotificationSink,
    PersistError, RelatedId, RelationKind, SyncClient,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Once;
use tokio::sync::oneshot;

/// Initialize tracing once for the whole test binary
///
/// Honors `RUST_LOG`; output goes through the test writer so it only shows
/// for failing tests.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A representative task record for tests
#[must_use]
pub fn sample_task() -> TaskSnapshot {
    TaskSnapshot::new(TaskId::new(), "Schedule viewing at Storgatan 12")
        .with_description("Buyer wants a morning slot")
        .with_priority(Priority::Medium)
        .with_tag("hot")
        .with_monetary_value(Money::from_major_units(2_450_000).expect("non-negative"))
        .with_custom("deal_stage", CustomValue::Text("intake".into()))
}

/// Yield repeatedly so spawned tasks can run to their next suspension
pub async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}

/// One recorded persistence or lookup call
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    UpdateFields(TaskPatch),
    SetRelated(RelationKind, Vec<RelatedId>),
    UploadAttachments(usize),
    FetchCandidates(RelationKind, Option<String>),
}

/// Handle that releases one held call
///
/// Dropping the gate releases the call too; a held call never deadlocks a
/// panicking test.
#[derive(Debug)]
pub struct Gate(oneshot::Sender<()>);

impl Gate {
    pub fn release(self) {
        let _ = self.0.send(());
    }
}

#[derive(Debug, Default)]
struct Script {
    failures: Mutex<VecDeque<PersistError>>,
    gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
}

impl Script {
    fn fail_next(&self, err: PersistError) {
        self.failures.lock().push_back(err);
    }

    fn hold_next(&self) -> Gate {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().push_back(rx);
        Gate(tx)
    }

    async fn wait(&self) {
        let gate = self.gates.lock().pop_front();
        if let Some(rx) = gate {
            // A dropped sender also counts as released.
            let _ = rx.await;
        }
    }

    fn take_failure(&self) -> Option<PersistError> {
        self.failures.lock().pop_front()
    }
}

/// Sync client and lookup double wrapping the in-memory backend
///
/// Calls pass through to the backend unless a scripted failure is queued
/// for the endpoint; a held gate parks the call before either outcome.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    backend: InMemoryBackend,
    calls: Mutex<Vec<RecordedCall>>,
    updates: Script,
    relations: Script,
    uploads: Script,
    lookup_failures: Mutex<VecDeque<LookupError>>,
    lookup_gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
}

impl ScriptedClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_task(&self, snapshot: TaskSnapshot) {
        self.backend.insert_task(snapshot);
    }

    #[must_use]
    pub fn task(&self, id: TaskId) -> Option<TaskSnapshot> {
        self.backend.task(id)
    }

    pub fn seed_candidates(&self, kind: RelationKind, candidates: Vec<Candidate>) {
        self.backend.seed_candidates(kind, candidates);
    }

    /// Every call recorded so far, in arrival order
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Field-update calls only, in arrival order
    #[must_use]
    pub fn update_calls(&self) -> Vec<TaskPatch> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                RecordedCall::UpdateFields(patch) => Some(patch.clone()),
                _ => None,
            })
            .collect()
    }

    /// Relation-update calls only, in arrival order
    #[must_use]
    pub fn relation_calls(&self) -> Vec<(RelationKind, Vec<RelatedId>)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                RecordedCall::SetRelated(kind, ids) => Some((*kind, ids.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn fail_next_update(&self, err: PersistError) {
        self.updates.fail_next(err);
    }

    pub fn fail_next_relation(&self, err: PersistError) {
        self.relations.fail_next(err);
    }

    pub fn fail_next_upload(&self, err: PersistError) {
        self.uploads.fail_next(err);
    }

    pub fn fail_next_lookup(&self, err: LookupError) {
        self.lookup_failures.lock().push_back(err);
    }

    /// Park the next field-update call until released
    #[must_use]
    pub fn hold_next_update(&self) -> Gate {
        self.updates.hold_next()
    }

    /// Park the next relation-update call until released
    #[must_use]
    pub fn hold_next_relation(&self) -> Gate {
        self.relations.hold_next()
    }

    /// Park the next upload call until released
    #[must_use]
    pub fn hold_next_upload(&self) -> Gate {
        self.uploads.hold_next()
    }

    /// Park the next candidate lookup until released
    #[must_use]
    pub fn hold_next_lookup(&self) -> Gate {
        let (tx, rx) = oneshot::channel();
        self.lookup_gates.lock().push_back(rx);
        Gate(tx)
    }

    fn record(&self, call: RecordedCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait::async_trait]
impl SyncClient for ScriptedClient {
    async fn update_fields(
        &self,
        task: TaskId,
        patch: TaskPatch,
    ) -> Result<TaskSnapshot, PersistError> {
        self.record(RecordedCall::UpdateFields(patch.clone()));
        self.updates.wait().await;
        if let Some(err) = self.updates.take_failure() {
            return Err(err);
        }
        self.backend.update_fields(task, patch).await
    }

    async fn upload_attachments(
        &self,
        task: TaskId,
        files: Vec<AttachmentUpload>,
    ) -> Result<TaskSnapshot, PersistError> {
        self.record(RecordedCall::UploadAttachments(files.len()));
        self.uploads.wait().await;
        if let Some(err) = self.uploads.take_failure() {
            return Err(err);
        }
        self.backend.upload_attachments(task, files).await
    }

    async fn set_related_ids(
        &self,
        task: TaskId,
        kind: RelationKind,
        ids: Vec<RelatedId>,
    ) -> Result<TaskSnapshot, PersistError> {
        self.record(RecordedCall::SetRelated(kind, ids.clone()));
        self.relations.wait().await;
        if let Some(err) = self.relations.take_failure() {
            return Err(err);
        }
        self.backend.set_related_ids(task, kind, ids).await
    }
}

#[async_trait::async_trait]
impl LookupService for ScriptedClient {
    async fn fetch_candidates(
        &self,
        kind: RelationKind,
        search: Option<&str>,
    ) -> Result<Vec<Candidate>, LookupError> {
        self.record(RecordedCall::FetchCandidates(
            kind,
            search.map(str::to_string),
        ));
        let gate = self.lookup_gates.lock().pop_front();
        if let Some(rx) = gate {
            let _ = rx.await;
        }
        if let Some(err) = self.lookup_failures.lock().pop_front() {
            return Err(err);
        }
        self.backend.fetch_candidates(kind, search).await
    }
}

/// Notification sink that captures every message
#[derive(Debug, Default)]
pub struct RecordingSink {
    errors: Mutex<Vec<String>>,
    successes: Mutex<Vec<String>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }

    #[must_use]
    pub fn successes(&self) -> Vec<String> {
        self.successes.lock().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn notify_error(&self, message: &str) {
        self.errors.lock().push(message.to_string());
    }

    fn notify_success(&self, message: &str) {
        self.successes.lock().push(message.to_string());
    }
}
