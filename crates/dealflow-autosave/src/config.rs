//! Engine configuration

use crate::scheduler::SettleClass;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning knobs for the autosave engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Settle window for discrete selections (priority, assignee) in ms
    pub selection_debounce_ms: u64,
    /// Settle window for ordinary text fields in ms
    pub standard_debounce_ms: u64,
    /// Settle window for free-text numeric entry (deal value, custom
    /// fields) in ms
    pub slow_debounce_ms: u64,
    /// Maximum entries in the display-card cache
    pub card_cache_capacity: u64,
    /// Time-to-live for cached display cards in seconds
    pub card_cache_ttl_secs: u64,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With selection settle window
    #[inline]
    #[must_use]
    pub fn with_selection_debounce_ms(mut self, ms: u64) -> Self {
        self.selection_debounce_ms = ms;
        self
    }

    /// With standard settle window
    #[inline]
    #[must_use]
    pub fn with_standard_debounce_ms(mut self, ms: u64) -> Self {
        self.standard_debounce_ms = ms;
        self
    }

    /// With slow settle window
    #[inline]
    #[must_use]
    pub fn with_slow_debounce_ms(mut self, ms: u64) -> Self {
        self.slow_debounce_ms = ms;
        self
    }

    /// With display-card cache capacity
    #[inline]
    #[must_use]
    pub fn with_card_cache_capacity(mut self, capacity: u64) -> Self {
        self.card_cache_capacity = capacity;
        self
    }

    /// Settle delay for a class
    #[must_use]
    pub fn delay_for(&self, class: SettleClass) -> Duration {
        match class {
            SettleClass::Selection => Duration::from_millis(self.selection_debounce_ms),
            SettleClass::Standard => Duration::from_millis(self.standard_debounce_ms),
            SettleClass::Slow => Duration::from_millis(self.slow_debounce_ms),
        }
    }

    /// Display-card cache time-to-live
    #[must_use]
    pub fn card_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.card_cache_ttl_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            selection_debounce_ms: 50,
            standard_debounce_ms: 600,
            slow_debounce_ms: 1500,
            card_cache_capacity: 256,
            card_cache_ttl_secs: 300,
        }
    }
}
