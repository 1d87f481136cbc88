//! Exit-time flushing
//!
//! The host delivers two lifecycle signals: component teardown (the detail
//! screen unmounts, results can still be awaited) and page hide (the tab is
//! about to go away, nothing will observe the outcome). Either way, every
//! armed-but-unfired timer is cancelled and its value persisted now.
//! In-flight persists are left to resolve on their own.
//!
//! The session gate comes first: with no active session the flush is
//! skipped, so a logout never produces a trailing burst of unauthorized
//! writes.

use crate::engine::AutosaveEngine;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Lifecycle signal delivered by the hosting UI runtime
///
/// The engine registers against nothing itself; the host forwards these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The detail screen unmounted; the flush is awaited and the engine
    /// closes to further edits
    Teardown,
    /// The page or tab is about to close; flush fire-and-forget
    PageHide,
}

impl AutosaveEngine {
    /// React to a host lifecycle signal
    ///
    /// On [`LifecycleEvent::Teardown`] the engine closes first, so edits
    /// racing the unmount get [`Closed`](crate::AutosaveError::Closed)
    /// instead of silently vanishing, then awaits one persist per pending
    /// scheduled field. On [`LifecycleEvent::PageHide`] the persists are
    /// spawned and the call returns immediately.
    pub async fn handle_lifecycle(&self, event: LifecycleEvent) {
        let inner = &self.inner;
        let closing = matches!(event, LifecycleEvent::Teardown);
        if closing {
            inner.closed.store(true, Ordering::SeqCst);
            tracing::info!("autosave engine closing for task {}", self.task_id());
        }

        if !inner.session.has_active_session() {
            if closing {
                let dropped = inner.ledger.lock().discard_scheduled();
                if dropped > 0 {
                    tracing::info!("discarded {dropped} pending save(s), session expired");
                }
            } else {
                tracing::info!("skipping exit flush, no active session");
            }
            return;
        }

        let drained = inner.ledger.lock().drain_scheduled();
        if drained.is_empty() {
            return;
        }
        tracing::info!("exit flush of {} pending save(s)", drained.len());

        match event {
            LifecycleEvent::Teardown => {
                let commits = drained.into_iter().map(|(key, value)| {
                    let commit_inner = Arc::clone(inner);
                    async move { commit_inner.commit(key, value).await }
                });
                futures::future::join_all(commits).await;
            }
            LifecycleEvent::PageHide => {
                for (key, value) in drained {
                    let commit_inner = Arc::clone(inner);
                    tokio::spawn(async move {
                        commit_inner.commit(key, value).await;
                    });
                }
            }
        }
    }
}
