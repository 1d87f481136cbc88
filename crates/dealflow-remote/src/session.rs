//! Session gate
//!
//! Exit-time flushes consult the session before sending anything; a flush
//! fired after logout would only produce authorization noise.

use std::sync::atomic::{AtomicBool, Ordering};

/// Source of truth for "is anyone logged in right now"
pub trait SessionState: Send + Sync {
    /// Whether an authenticated session is currently active
    fn has_active_session(&self) -> bool;
}

/// Simple flag-backed session, flipped by the host application
#[derive(Debug)]
pub struct StaticSession {
    active: AtomicBool,
}

impl StaticSession {
    /// Session that is logged in
    #[inline]
    #[must_use]
    pub fn active() -> Self {
        Self {
            active: AtomicBool::new(true),
        }
    }

    /// Session that is logged out
    #[inline]
    #[must_use]
    pub fn expired() -> Self {
        Self {
            active: AtomicBool::new(false),
        }
    }

    /// Flip the session state
    #[inline]
    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }
}

impl SessionState for StaticSession {
    fn has_active_session(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}
