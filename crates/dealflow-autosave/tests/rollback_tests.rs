//! Rollback fidelity and queue-not-merge under persist failures

use dealflow_autosave::{AutosaveEngine, Collaborators, EngineConfig};
use dealflow_model::{FieldValue, Money, Patch};
use dealflow_remote::{LookupService, PersistError, StaticSession, SyncClient};
use dealflow_test_utils::{init_tracing, sample_task, settle, RecordingSink, ScriptedClient};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    engine: AutosaveEngine,
    client: Arc<ScriptedClient>,
    sink: Arc<RecordingSink>,
}

fn harness() -> Harness {
    init_tracing();
    let client = Arc::new(ScriptedClient::new());
    let sink = Arc::new(RecordingSink::new());
    let initial = sample_task();
    client.insert_task(initial.clone());
    let engine = AutosaveEngine::builder(initial)
        .config(
            EngineConfig::new()
                .with_standard_debounce_ms(100)
                .with_slow_debounce_ms(300),
        )
        .build(Collaborators::new(
            Arc::clone(&client) as Arc<dyn SyncClient>,
            Arc::clone(&client) as Arc<dyn LookupService>,
            Arc::new(StaticSession::active()),
            Arc::clone(&sink) as _,
        ));
    Harness {
        engine,
        client,
        sink,
    }
}

#[tokio::test(start_paused = true)]
async fn failed_persist_reverts_the_field_and_notifies() {
    let h = harness();
    let before = h.engine.snapshot().description;
    h.client
        .fail_next_update(PersistError::Transport("wire down".into()));

    h.engine
        .edit(FieldValue::Description("will not stick".into()))
        .unwrap();
    assert_eq!(h.engine.snapshot().description, "will not stick");

    tokio::time::sleep(Duration::from_millis(150)).await;
    settle().await;

    assert_eq!(h.engine.snapshot().description, before);
    assert_eq!(h.client.task(h.engine.task_id()).unwrap().description, before);
    let errors = h.sink.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("description"));
    assert!(!h.engine.is_dirty());
}

#[tokio::test(start_paused = true)]
async fn rollback_restores_the_value_from_before_the_whole_cycle() {
    let h = harness();
    let before = h.engine.snapshot().description;
    h.client
        .fail_next_update(PersistError::Rejected("validation".into()));

    // Several coalesced edits form one cycle; rollback goes to the value
    // before the first of them.
    h.engine.edit(FieldValue::Description("a".into())).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    h.engine.edit(FieldValue::Description("ab".into())).unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    settle().await;

    assert_eq!(h.engine.snapshot().description, before);
}

#[tokio::test(start_paused = true)]
async fn rollback_is_scoped_to_the_failing_field() {
    let h = harness();
    let before = h.engine.snapshot().description;
    h.client
        .fail_next_update(PersistError::Transport("wire down".into()));

    // Description fires at 100ms and fails; the deal value fires at 300ms
    // and lands.
    h.engine
        .edit(FieldValue::Description("doomed".into()))
        .unwrap();
    let amount = Money::parse("980000").unwrap();
    h.engine
        .edit(FieldValue::MonetaryValue(Some(amount)))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(350)).await;
    settle().await;

    assert_eq!(h.engine.snapshot().description, before);
    assert_eq!(h.engine.snapshot().monetary_value, Some(amount));
    assert_eq!(
        h.client.task(h.engine.task_id()).unwrap().monetary_value,
        Some(amount)
    );
}

#[tokio::test(start_paused = true)]
async fn edit_during_flight_yields_exactly_one_follow_up() {
    let h = harness();
    let gate = h.client.hold_next_update();

    h.engine.edit(FieldValue::Title("first".into())).unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    settle().await;
    // First persist is parked in flight; these two coalesce in the queue.
    h.engine.edit(FieldValue::Title("second".into())).unwrap();
    h.engine.edit(FieldValue::Title("third".into())).unwrap();
    gate.release();
    settle().await;

    let updates = h.client.update_calls();
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0].title, Patch::Set("first".into()));
    assert_eq!(updates[1].title, Patch::Set("third".into()));
    assert_eq!(h.client.task(h.engine.task_id()).unwrap().title, "third");
    assert!(!h.engine.is_dirty());
}

#[tokio::test(start_paused = true)]
async fn failure_with_a_queued_successor_keeps_the_newest_value_visible() {
    let h = harness();
    let gate = h.client.hold_next_update();

    h.engine.edit(FieldValue::Title("doomed".into())).unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    settle().await;
    h.client
        .fail_next_update(PersistError::Transport("wire down".into()));
    h.engine.edit(FieldValue::Title("newest".into())).unwrap();
    gate.release();
    settle().await;

    // The failed value is superseded, never shown again; the follow-up
    // carries the newest value to the server.
    assert_eq!(h.engine.snapshot().title, "newest");
    assert_eq!(h.client.task(h.engine.task_id()).unwrap().title, "newest");
    assert_eq!(h.sink.errors().len(), 1);
    assert_eq!(h.client.update_calls().len(), 2);
    assert!(!h.engine.is_dirty());
}

#[tokio::test(start_paused = true)]
async fn confirmation_merge_never_clobbers_other_pending_fields() {
    let h = harness();

    // Title persists at 100ms while the deal value is still settling; the
    // confirmed snapshot from the title save must not erase the optimistic
    // deal value.
    h.engine.edit(FieldValue::Title("confirmed".into())).unwrap();
    let amount = Money::parse("555000").unwrap();
    h.engine
        .edit(FieldValue::MonetaryValue(Some(amount)))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    settle().await;

    assert_eq!(h.engine.snapshot().title, "confirmed");
    assert_eq!(h.engine.snapshot().monetary_value, Some(amount));

    tokio::time::sleep(Duration::from_millis(200)).await;
    settle().await;
    assert_eq!(
        h.client.task(h.engine.task_id()).unwrap().monetary_value,
        Some(amount)
    );
    assert!(!h.engine.is_dirty());
}
