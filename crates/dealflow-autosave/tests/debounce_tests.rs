//! Coalescing and per-field independence of the debounce scheduler

use dealflow_autosave::{AutosaveEngine, Collaborators, EngineConfig};
use dealflow_model::{FieldValue, Money, Patch, Priority};
use dealflow_remote::{LookupService, StaticSession, SyncClient};
use dealflow_test_utils::{init_tracing, sample_task, settle, RecordingSink, ScriptedClient};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    engine: AutosaveEngine,
    client: Arc<ScriptedClient>,
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
            sink,
        ));
    Harness { engine, client }
}

#[tokio::test(start_paused = true)]
async fn rapid_title_edits_coalesce_into_one_persist() {
    let h = harness();

    for text in ["R", "Re", "Renegotiate price"] {
        h.engine.edit(FieldValue::Title(text.into())).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    tokio::time::sleep(Duration::from_millis(150)).await;
    settle().await;

    let updates = h.client.update_calls();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].title, Patch::Set("Renegotiate price".into()));
    assert_eq!(
        h.client.task(h.engine.task_id()).unwrap().title,
        "Renegotiate price"
    );
    assert!(!h.engine.is_dirty());
}

#[tokio::test(start_paused = true)]
async fn monetary_set_then_clear_sends_only_the_clear() {
    let h = harness();

    let amount = Money::parse("1.234,56").unwrap();
    h.engine
        .edit(FieldValue::MonetaryValue(Some(amount)))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    h.engine.edit(FieldValue::MonetaryValue(None)).unwrap();
    tokio::time::sleep(Duration::from_millis(350)).await;
    settle().await;

    let updates = h.client.update_calls();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].monetary_value, Patch::Clear);
    assert_eq!(
        h.client.task(h.engine.task_id()).unwrap().monetary_value,
        None
    );
}

#[tokio::test(start_paused = true)]
async fn distinct_fields_persist_independently() {
    let h = harness();

    h.engine.edit(FieldValue::Title("New title".into())).unwrap();
    h.engine
        .edit(FieldValue::Description("New notes".into()))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    settle().await;

    assert_eq!(h.client.update_calls().len(), 2);
    let server = h.client.task(h.engine.task_id()).unwrap();
    assert_eq!(server.title, "New title");
    assert_eq!(server.description, "New notes");
}

#[tokio::test(start_paused = true)]
async fn editing_one_field_is_not_blocked_by_anothers_flight() {
    let h = harness();
    let gate = h.client.hold_next_update();

    h.engine.edit(FieldValue::Title("Parked".into())).unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    settle().await;
    // Title persist is parked behind the gate; description proceeds anyway.
    h.engine
        .edit(FieldValue::Description("Flows freely".into()))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    settle().await;

    assert_eq!(
        h.client.task(h.engine.task_id()).unwrap().description,
        "Flows freely"
    );
    assert_ne!(h.client.task(h.engine.task_id()).unwrap().title, "Parked");

    gate.release();
    settle().await;
    assert_eq!(h.client.task(h.engine.task_id()).unwrap().title, "Parked");
    assert!(!h.engine.is_dirty());
}

#[tokio::test(start_paused = true)]
async fn rapid_priority_changes_end_on_the_last_value() {
    let h = harness();

    // Arrowing through the dropdown within the short selection window
    // coalesces into a single persist of the final choice.
    h.engine.edit(FieldValue::Priority(Priority::Urgent)).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    h.engine.edit(FieldValue::Priority(Priority::High)).unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;
    settle().await;

    let updates = h.client.update_calls();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].priority, Patch::Set(Priority::High));
    assert_eq!(
        h.client.task(h.engine.task_id()).unwrap().priority,
        Priority::High
    );
    assert!(!h.engine.is_dirty());
}
