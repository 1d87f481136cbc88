//! Autosave engine facade
//!
//! One engine per open task record. Edits are applied to the observable
//! snapshot immediately, staged in the pending-change ledger, and persisted
//! after their settle window through the [`SyncClient`] boundary. A failed
//! persist rolls the field back to its last confirmed value and notifies;
//! a successful one merges the server's confirmed state without clobbering
//! other fields' pending edits.
//!
//! # Workflow
//! 1. Validate the staged value, reject before any side effect
//! 2. Apply optimistically and notify snapshot observers
//! 3. Stage in the ledger: schedule, commit now, or queue behind a flight
//! 4. On timer fire, persist; coalesced edits sent as one call
//! 5. Confirmation merge on success, field-scoped rollback on failure

use crate::config::EngineConfig;
use crate::error::AutosaveError;
use crate::ledger::{FailurePlan, PendingLedger, SaveState, StagePlan, SuccessPlan};
use crate::references::ReferenceResolver;
use crate::scheduler::{self, SettleClass};
use dealflow_model::{
    ClientId, CustomFieldSchema, FieldKey, FieldValue, PropertyId, TaskId, TaskPatch, TaskSnapshot,
};
use dealflow_remote::{
    AttachmentUpload, Candidate, LookupService, NotificationSink, PersistError, RelatedId,
    RelationKind, SessionState, SyncClient,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// External collaborators the engine drives
///
/// All four seams are owned by the host; the engine only calls through
/// them. Cloning shares the underlying implementations.
#[derive(Clone)]
pub struct Collaborators {
    /// Persistence boundary
    pub sync: Arc<dyn SyncClient>,
    /// Candidate search and card resolution
    pub lookup: Arc<dyn LookupService>,
    /// Consulted before exit-time flushes
    pub session: Arc<dyn SessionState>,
    /// User-visible notices
    pub notify: Arc<dyn NotificationSink>,
}

impl Collaborators {
    /// Bundle the four collaborator seams
    #[inline]
    #[must_use]
    pub fn new(
        sync: Arc<dyn SyncClient>,
        lookup: Arc<dyn LookupService>,
        session: Arc<dyn SessionState>,
        notify: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            sync,
            lookup,
            session,
            notify,
        }
    }
}

/// Builder for [`AutosaveEngine`]
#[derive(Debug)]
pub struct EngineBuilder {
    initial: TaskSnapshot,
    config: EngineConfig,
    schema: CustomFieldSchema,
}

impl EngineBuilder {
    /// With engine configuration
    #[inline]
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// With the workspace custom-field schema
    #[inline]
    #[must_use]
    pub fn schema(mut self, schema: CustomFieldSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Build the engine around the given collaborators
    #[must_use]
    pub fn build(self, collaborators: Collaborators) -> AutosaveEngine {
        let refs = ReferenceResolver::new(&self.config);
        let task_id = self.initial.id;
        let (snapshot, _) = watch::channel(self.initial);
        tracing::info!("autosave engine opened for task {task_id}");
        AutosaveEngine {
            inner: Arc::new(EngineInner {
                config: self.config,
                schema: self.schema,
                task_id,
                snapshot,
                ledger: Mutex::new(PendingLedger::new()),
                refs,
                sync: collaborators.sync,
                lookup: collaborators.lookup,
                session: collaborators.session,
                notify: collaborators.notify,
                closed: AtomicBool::new(false),
                upload_in_flight: AtomicBool::new(false),
            }),
        }
    }
}

/// Optimistic mutation and debounced autosave engine for one task record
///
/// Cheap to clone; clones drive the same record. Must be used inside a
/// tokio runtime, since timers and persists run as spawned tasks.
#[derive(Clone)]
pub struct AutosaveEngine {
    pub(crate) inner: Arc<EngineInner>,
}

pub(crate) struct EngineInner {
    pub(crate) config: EngineConfig,
    schema: CustomFieldSchema,
    task_id: TaskId,
    /// The single authoritative snapshot; every send is a fully-applied value
    pub(crate) snapshot: watch::Sender<TaskSnapshot>,
    /// Pending work per field key; mutates without observer notification
    pub(crate) ledger: Mutex<PendingLedger>,
    pub(crate) refs: ReferenceResolver,
    pub(crate) sync: Arc<dyn SyncClient>,
    pub(crate) lookup: Arc<dyn LookupService>,
    pub(crate) session: Arc<dyn SessionState>,
    pub(crate) notify: Arc<dyn NotificationSink>,
    pub(crate) closed: AtomicBool,
    upload_in_flight: AtomicBool,
}

impl AutosaveEngine {
    /// Start building an engine around the loaded record state
    #[must_use]
    pub fn builder(initial: TaskSnapshot) -> EngineBuilder {
        EngineBuilder {
            initial,
            config: EngineConfig::default(),
            schema: CustomFieldSchema::new(),
        }
    }

    /// Engine with default configuration and an empty schema
    #[must_use]
    pub fn new(initial: TaskSnapshot, collaborators: Collaborators) -> Self {
        Self::builder(initial).build(collaborators)
    }

    /// Id of the record this engine drives
    #[inline]
    #[must_use]
    pub fn task_id(&self) -> TaskId {
        self.inner.task_id
    }

    /// Current snapshot, cloned out
    #[must_use]
    pub fn snapshot(&self) -> TaskSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    /// Observe snapshot changes
    ///
    /// The receiver sees every optimistic apply, confirmation merge, and
    /// rollback as one atomic value.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TaskSnapshot> {
        self.inner.snapshot.subscribe()
    }

    /// Save lifecycle of one field key
    #[must_use]
    pub fn save_state(&self, key: &FieldKey) -> SaveState {
        self.inner.ledger.lock().save_state(key)
    }

    /// Whether any field has unconfirmed work
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inner.ledger.lock().is_dirty()
    }

    /// Stage one field edit
    ///
    /// Applies the value to the snapshot synchronously, then schedules the
    /// persist according to the key's settle class. Edits to a key with an
    /// armed timer coalesce; edits to a key with an in-flight persist queue
    /// behind it. Linked-reference clears skip the settle window.
    ///
    /// # Errors
    /// [`AutosaveError::Validation`] when the value is rejected before any
    /// effect, [`AutosaveError::Closed`] after teardown
    pub fn edit(&self, value: FieldValue) -> Result<(), AutosaveError> {
        let inner = &self.inner;
        if inner.closed.load(Ordering::SeqCst) {
            return Err(AutosaveError::Closed);
        }
        value.validate(&inner.schema)?;

        let key = value.key();
        let class = SettleClass::for_key(&key);
        // Clearing a link is the only edit that skips its settle window.
        let immediate = match &value {
            FieldValue::LinkedClient(link) => link.is_unset(),
            FieldValue::LinkedProperty(link) => link.is_unset(),
            _ => false,
        };

        // Any link application supersedes outstanding card fetches for its
        // kind; an id without a card also starts a fresh fetch.
        let hydration = match &value {
            FieldValue::LinkedClient(link) => {
                let generation = inner.refs.bump(RelationKind::Client);
                link.id()
                    .filter(|_| link.card().is_none())
                    .map(|id| (RelationKind::Client, RelatedId::from(id), generation))
            }
            FieldValue::LinkedProperty(link) => {
                let generation = inner.refs.bump(RelationKind::Property);
                link.id()
                    .filter(|_| link.card().is_none())
                    .map(|id| (RelationKind::Property, RelatedId::from(id), generation))
            }
            _ => None,
        };

        let plan = {
            let mut ledger = inner.ledger.lock();
            let baseline = inner.snapshot.borrow().field(&key);
            inner.snapshot.send_modify(|snap| snap.apply(value.clone()));
            ledger.stage(&key, value, &baseline, immediate)
        };
        tracing::debug!("optimistic apply for {key}");

        match plan {
            StagePlan::Schedule { generation } => {
                let delay = inner.config.delay_for(class);
                let fire_inner = Arc::clone(inner);
                let fire_key = key.clone();
                let handle = scheduler::spawn_debounce(delay, move || async move {
                    fire_inner.fire(fire_key, generation).await;
                });
                inner.ledger.lock().attach_timer(&key, generation, handle);
                tracing::debug!("debounce armed for {key} ({class}, generation {generation})");
            }
            StagePlan::CommitNow { value } => {
                tracing::debug!("committing {key} without settle window");
                let commit_inner = Arc::clone(inner);
                let commit_key = key.clone();
                tokio::spawn(async move {
                    commit_inner.commit(commit_key, value).await;
                });
            }
            StagePlan::Queued => {
                tracing::debug!("edit to {key} queued behind in-flight persist");
            }
        }

        if let Some((kind, id, generation)) = hydration {
            let hydrate_inner = Arc::clone(inner);
            tokio::spawn(async move {
                hydrate_inner
                    .refs
                    .hydrate(
                        &*hydrate_inner.lookup,
                        &hydrate_inner.snapshot,
                        kind,
                        id,
                        generation,
                    )
                    .await;
            });
        }
        Ok(())
    }

    /// Link (or clear) the client record
    ///
    /// Convenience over [`edit`](Self::edit): re-targets the current link,
    /// keeping an already-known card when the id did not change.
    ///
    /// # Errors
    /// Same contract as [`edit`](Self::edit)
    pub fn set_linked_client(&self, id: Option<ClientId>) -> Result<(), AutosaveError> {
        let link = self.inner.snapshot.borrow().linked_client.clone();
        self.edit(FieldValue::LinkedClient(link.with_id(id)))
    }

    /// Link (or clear) the property record
    ///
    /// # Errors
    /// Same contract as [`edit`](Self::edit)
    pub fn set_linked_property(&self, id: Option<PropertyId>) -> Result<(), AutosaveError> {
        let link = self.inner.snapshot.borrow().linked_property.clone();
        self.edit(FieldValue::LinkedProperty(link.with_id(id)))
    }

    /// Upload attachments, awaited
    ///
    /// No debounce and no optimistic snapshot change; the confirmed record
    /// is merged on success. One batch at a time per record.
    ///
    /// # Errors
    /// [`AutosaveError::UploadInFlight`] while a batch is outstanding,
    /// [`AutosaveError::Persist`] when the upload failed,
    /// [`AutosaveError::Closed`] after teardown
    pub async fn upload_attachments(
        &self,
        files: Vec<AttachmentUpload>,
    ) -> Result<TaskSnapshot, AutosaveError> {
        let inner = &self.inner;
        if inner.closed.load(Ordering::SeqCst) {
            return Err(AutosaveError::Closed);
        }
        if inner.upload_in_flight.swap(true, Ordering::SeqCst) {
            return Err(AutosaveError::UploadInFlight);
        }
        let count = files.len();
        let result = inner.sync.upload_attachments(inner.task_id, files).await;
        inner.upload_in_flight.store(false, Ordering::SeqCst);

        match result {
            Ok(confirmed) => {
                {
                    let ledger = inner.ledger.lock();
                    let protected = ledger.protected_keys();
                    inner
                        .snapshot
                        .send_modify(|snap| snap.merge_confirmed(&confirmed, &protected));
                }
                tracing::info!("uploaded {count} attachment(s)");
                inner
                    .notify
                    .notify_success(&format!("{count} attachment(s) uploaded"));
                Ok(self.snapshot())
            }
            Err(err) => {
                tracing::warn!("attachment upload failed: {err}");
                inner
                    .notify
                    .notify_error(&format!("attachment upload failed: {err}"));
                Err(AutosaveError::Persist(err))
            }
        }
    }

    /// Search linkable records for a picker
    ///
    /// Failures degrade to an empty list; they never notify and never touch
    /// the record.
    pub async fn fetch_candidates(
        &self,
        kind: RelationKind,
        search: Option<&str>,
    ) -> Vec<Candidate> {
        match self.inner.lookup.fetch_candidates(kind, search).await {
            Ok(candidates) => candidates,
            Err(err) => {
                tracing::warn!("candidate search for {kind} failed: {err}");
                Vec::new()
            }
        }
    }
}

impl EngineInner {
    /// Debounce expiry for `key` at `generation`
    pub(crate) async fn fire(self: Arc<Self>, key: FieldKey, generation: u64) {
        let staged = self.ledger.lock().fire(&key, generation);
        match staged {
            Some(value) => self.commit(key, value).await,
            None => tracing::debug!("debounce for {key} superseded (generation {generation})"),
        }
    }

    /// Persist `first` and every queued successor for `key`, in order
    pub(crate) async fn commit(&self, key: FieldKey, first: FieldValue) {
        let mut outgoing = Some(first);
        while let Some(value) = outgoing.take() {
            tracing::debug!("persisting {key}");
            match self.persist(&key, value).await {
                Ok(confirmed) => {
                    let plan = {
                        let mut ledger = self.ledger.lock();
                        let plan = ledger.resolve_success(&key, &confirmed.field(&key));
                        // Merge under the ledger lock so no edit can slip in
                        // between computing the protected set and the merge.
                        let protected = ledger.protected_keys();
                        self.snapshot
                            .send_modify(|snap| snap.merge_confirmed(&confirmed, &protected));
                        plan
                    };
                    match plan {
                        SuccessPlan::Done => tracing::debug!("{key} confirmed"),
                        SuccessPlan::FollowUp { value } => {
                            tracing::debug!("{key} confirmed, sending queued follow-up");
                            outgoing = Some(value);
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!("persist for {key} failed: {err}");
                    let plan = self.ledger.lock().resolve_failure(&key);
                    match plan {
                        Some(FailurePlan::Rollback { baseline }) => {
                            self.snapshot.send_modify(|snap| snap.apply(baseline));
                            tracing::info!("rolled {key} back to its confirmed value");
                            self.notify
                                .notify_error(&format!("could not save {key}: {err}"));
                        }
                        Some(FailurePlan::FollowUp { value }) => {
                            // The newer optimistic value stays visible and
                            // heads to the server next; still report.
                            self.notify
                                .notify_error(&format!("could not save {key}: {err}"));
                            outgoing = Some(value);
                        }
                        None => {}
                    }
                }
            }
        }
    }

    /// Route one staged value to the right endpoint
    async fn persist(
        &self,
        key: &FieldKey,
        value: FieldValue,
    ) -> Result<TaskSnapshot, PersistError> {
        match value {
            FieldValue::LinkedClient(link) => {
                let ids: Vec<RelatedId> = link.id().map(RelatedId::from).into_iter().collect();
                self.sync
                    .set_related_ids(self.task_id, RelationKind::Client, ids)
                    .await
            }
            FieldValue::LinkedProperty(link) => {
                let ids: Vec<RelatedId> = link.id().map(RelatedId::from).into_iter().collect();
                self.sync
                    .set_related_ids(self.task_id, RelationKind::Property, ids)
                    .await
            }
            other => match TaskPatch::for_field(&other) {
                Some(patch) => self.sync.update_fields(self.task_id, patch).await,
                None => unreachable!("linked values are routed above; {key} is not one"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealflow_model::{CustomFieldKind, CustomValue, Money, Priority};
    use dealflow_remote::{InMemoryBackend, LogSink, StaticSession};
    use dealflow_test_utils::ScriptedClient;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn engine_over(backend: Arc<InMemoryBackend>, initial: TaskSnapshot) -> AutosaveEngine {
        backend.insert_task(initial.clone());
        AutosaveEngine::builder(initial)
            .config(
                EngineConfig::new()
                    .with_standard_debounce_ms(100)
                    .with_slow_debounce_ms(300),
            )
            .schema(CustomFieldSchema::new().declare("deal_stage", CustomFieldKind::Text, false))
            .build(Collaborators::new(
                Arc::clone(&backend) as Arc<dyn SyncClient>,
                backend as Arc<dyn LookupService>,
                Arc::new(StaticSession::active()),
                Arc::new(LogSink),
            ))
    }

    async fn settle() {
        for _ in 0..64 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn edit_is_visible_before_any_persist() {
        let backend = Arc::new(InMemoryBackend::new());
        let engine = engine_over(
            Arc::clone(&backend),
            TaskSnapshot::new(TaskId::new(), "Viewing"),
        );

        engine
            .edit(FieldValue::Description("call before noon".into()))
            .unwrap();
        assert_eq!(engine.snapshot().description, "call before noon");
        // Server untouched until the window elapses.
        assert_eq!(backend.task(engine.task_id()).unwrap().description, "");

        tokio::time::sleep(Duration::from_millis(150)).await;
        settle().await;
        assert_eq!(
            backend.task(engine.task_id()).unwrap().description,
            "call before noon"
        );
        assert!(!engine.is_dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn validation_failure_has_no_effect() {
        let backend = Arc::new(InMemoryBackend::new());
        let engine = engine_over(
            Arc::clone(&backend),
            TaskSnapshot::new(TaskId::new(), "Viewing"),
        );

        let err = engine.edit(FieldValue::Title("   ".into())).unwrap_err();
        assert!(matches!(err, AutosaveError::Validation(_)));
        assert_eq!(engine.snapshot().title, "Viewing");
        assert!(!engine.is_dirty());

        let err = engine
            .edit(FieldValue::Custom(
                "deal_stage".into(),
                Some(CustomValue::Number(4.0)),
            ))
            .unwrap_err();
        assert!(matches!(err, AutosaveError::Validation(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn selections_persist_after_the_short_window() {
        let backend = Arc::new(InMemoryBackend::new());
        let engine = engine_over(
            Arc::clone(&backend),
            TaskSnapshot::new(TaskId::new(), "Viewing"),
        );

        engine.edit(FieldValue::Priority(Priority::Urgent)).unwrap();
        settle().await;
        assert_eq!(
            backend.task(engine.task_id()).unwrap().priority,
            Priority::Medium
        );

        tokio::time::sleep(Duration::from_millis(60)).await;
        settle().await;
        assert_eq!(
            backend.task(engine.task_id()).unwrap().priority,
            Priority::Urgent
        );
    }

    #[tokio::test(start_paused = true)]
    async fn slow_fields_outlast_the_standard_window() {
        let backend = Arc::new(InMemoryBackend::new());
        let engine = engine_over(
            Arc::clone(&backend),
            TaskSnapshot::new(TaskId::new(), "Viewing"),
        );

        let amount = Money::parse("1.234,56").unwrap();
        engine
            .edit(FieldValue::MonetaryValue(Some(amount)))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        settle().await;
        assert_eq!(backend.task(engine.task_id()).unwrap().monetary_value, None);

        tokio::time::sleep(Duration::from_millis(200)).await;
        settle().await;
        assert_eq!(
            backend.task(engine.task_id()).unwrap().monetary_value,
            Some(amount)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_upload_is_rejected_while_one_is_outstanding() {
        let client = Arc::new(ScriptedClient::new());
        let initial = TaskSnapshot::new(TaskId::new(), "Viewing");
        client.insert_task(initial.clone());
        let engine = AutosaveEngine::builder(initial).build(Collaborators::new(
            Arc::clone(&client) as Arc<dyn SyncClient>,
            Arc::clone(&client) as Arc<dyn LookupService>,
            Arc::new(StaticSession::active()),
            Arc::new(LogSink),
        ));
        let gate = client.hold_next_upload();

        let first = {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine
                    .upload_attachments(vec![AttachmentUpload::new(
                        "a.pdf",
                        "application/pdf",
                        vec![1],
                    )])
                    .await
            })
        };
        settle().await;

        // First batch is parked at the boundary; a second one bounces off
        // the guard.
        let err = engine
            .upload_attachments(vec![AttachmentUpload::new("b.pdf", "application/pdf", vec![2])])
            .await
            .unwrap_err();
        assert_eq!(err, AutosaveError::UploadInFlight);

        gate.release();
        let confirmed = first.await.expect("join").unwrap();
        assert_eq!(confirmed.attachments, vec!["a.pdf".to_string()]);

        // The guard clears once the batch resolves.
        let again = engine
            .upload_attachments(vec![AttachmentUpload::new("b.pdf", "application/pdf", vec![2])])
            .await
            .unwrap();
        assert_eq!(
            again.attachments,
            vec!["a.pdf".to_string(), "b.pdf".to_string()]
        );
    }
}
