//! Debounce scheduling
//!
//! Every field key belongs to a settle class that decides how long the
//! engine waits after the last keystroke before persisting. Timers are
//! plain spawned sleeps; the [`AbortHandle`](tokio::task::AbortHandle) goes
//! into the ledger entry and doubles as the cancellation token, so
//! coalescing is abort-and-respawn plus a generation check at fire time.

use dealflow_model::FieldKey;
use std::future::Future;
use std::time::Duration;
use tokio::task::AbortHandle;

/// How long a field waits for input to settle before persisting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettleClass {
    /// Discrete selections settle on a very short window
    Selection,
    /// Ordinary text and date entry
    Standard,
    /// Free-text numeric entry needs a longer quiet period
    Slow,
}

impl SettleClass {
    /// Settle class for a field key
    ///
    /// Priority and assignee are picked from closed lists and get a window
    /// just long enough to coalesce arrowing through the options. Deal
    /// value and custom fields are typed digit by digit, so they get the
    /// long window. Everything else settles on the standard window.
    /// Linked-reference *clears* are special-cased by the engine and bypass
    /// the class entirely.
    #[must_use]
    pub fn for_key(key: &FieldKey) -> Self {
        match key {
            FieldKey::Priority | FieldKey::Assignee => SettleClass::Selection,
            FieldKey::MonetaryValue | FieldKey::Custom(_) => SettleClass::Slow,
            FieldKey::Title
            | FieldKey::Description
            | FieldKey::DueDate
            | FieldKey::Tags
            | FieldKey::LinkedClient
            | FieldKey::LinkedProperty => SettleClass::Standard,
        }
    }
}

impl std::fmt::Display for SettleClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SettleClass::Selection => "selection",
            SettleClass::Standard => "standard",
            SettleClass::Slow => "slow",
        };
        write!(f, "{label}")
    }
}

/// Arm a debounce timer
///
/// Sleeps `delay`, then runs `on_fire`. The returned handle aborts the
/// whole task, which is safe at any point: before the sleep ends nothing
/// has happened yet, and once `on_fire` reaches the ledger a stale
/// generation makes it a no-op.
pub(crate) fn spawn_debounce<F, Fut>(delay: Duration, on_fire: F) -> AbortHandle
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        on_fire().await;
    })
    .abort_handle()
}
