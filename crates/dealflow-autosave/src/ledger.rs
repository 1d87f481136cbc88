//! Pending-change ledger
//!
//! One entry per field key tracks the staged value, the rollback baseline,
//! and where the key sits in its save lifecycle. The ledger is pure state:
//! timers and network calls live elsewhere and act on the plans returned
//! from here.
//!
//! # Invariants
//!
//! - At most one entry per field key, so at most one armed timer and at
//!   most one in-flight persist per key
//! - `baseline` holds the last confirmed value for the key and is the
//!   rollback target for the whole cycle, no matter how many staged values
//!   superseded each other in between
//! - An entry exists exactly while the key is not [`SaveState::Idle`]

use dealflow_model::{FieldKey, FieldValue};
use std::collections::{HashMap, HashSet};
use tokio::task::AbortHandle;
use tokio::time::Instant;

/// Save lifecycle of one field lane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaveState {
    /// No pending work for the key
    Idle,
    /// Debounce timer armed, a value is staged
    Scheduled,
    /// Persist call outstanding
    InFlight,
    /// Persist outstanding with a newer value staged behind it
    InFlightQueued,
}

impl SaveState {
    /// Whether moving from `self` to `to` is a legal lifecycle step
    #[must_use]
    pub fn can_transition(self, to: SaveState) -> bool {
        use SaveState::{Idle, InFlight, InFlightQueued, Scheduled};
        match self {
            Idle => matches!(to, Scheduled | InFlight),
            Scheduled => matches!(to, Scheduled | InFlight | Idle),
            InFlight => matches!(to, InFlightQueued | Idle),
            InFlightQueued => matches!(to, InFlightQueued | InFlight),
        }
    }
}

impl std::fmt::Display for SaveState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SaveState::Idle => "idle",
            SaveState::Scheduled => "scheduled",
            SaveState::InFlight => "in-flight",
            SaveState::InFlightQueued => "in-flight+queued",
        };
        write!(f, "{label}")
    }
}

/// What the engine must do after staging an edit
#[derive(Debug)]
pub(crate) enum StagePlan {
    /// Arm (or re-arm) the debounce timer for this generation
    Schedule {
        /// Token the timer must present when it fires
        generation: u64,
    },
    /// Skip the timer and persist the value right away
    CommitNow {
        /// Value to send
        value: FieldValue,
    },
    /// A persist is outstanding; the value waits behind it
    Queued,
}

/// What the engine must do after a persist succeeded
#[derive(Debug)]
pub(crate) enum SuccessPlan {
    /// Lane complete, entry removed
    Done,
    /// A queued value follows immediately, no extra debounce
    FollowUp {
        /// Value to send next
        value: FieldValue,
    },
}

/// What the engine must do after a persist failed
#[derive(Debug)]
pub(crate) enum FailurePlan {
    /// Restore this value in the snapshot and drop the lane
    Rollback {
        /// Last confirmed value for the key
        baseline: FieldValue,
    },
    /// A newer staged value supersedes the failed one; the visible value
    /// stays optimistic and the baseline carries over
    FollowUp {
        /// Value to send next
        value: FieldValue,
    },
}

/// Ledger entry for one field key
#[derive(Debug)]
struct PendingEntry {
    /// Value waiting to be sent (`Scheduled` / `InFlightQueued`)
    staged: Option<FieldValue>,
    /// Last confirmed value, the rollback target
    baseline: FieldValue,
    /// Lifecycle state, never `Idle` while the entry exists
    state: SaveState,
    /// Token identifying the currently-armed timer
    generation: u64,
    /// Abort handle of the armed timer task
    timer: Option<AbortHandle>,
    /// When the current timer was armed
    scheduled_at: Option<Instant>,
}

impl PendingEntry {
    fn set_state(&mut self, to: SaveState) {
        debug_assert!(
            self.state.can_transition(to),
            "illegal save-state transition: {} -> {}",
            self.state,
            to
        );
        self.state = to;
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.scheduled_at = None;
    }
}

/// All pending work, keyed by field
#[derive(Debug, Default)]
pub(crate) struct PendingLedger {
    entries: HashMap<FieldKey, PendingEntry>,
    generations: u64,
}

impl PendingLedger {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn next_generation(&mut self) -> u64 {
        self.generations += 1;
        self.generations
    }

    /// Record a staged edit and decide how it proceeds
    ///
    /// `current` is the snapshot value as it was before the optimistic
    /// apply; it becomes the baseline when this edit opens a new cycle.
    pub(crate) fn stage(
        &mut self,
        key: &FieldKey,
        value: FieldValue,
        current: &FieldValue,
        immediate: bool,
    ) -> StagePlan {
        match self.entries.get_mut(key) {
            None => {
                let generation = self.next_generation();
                if immediate {
                    self.entries.insert(
                        key.clone(),
                        PendingEntry {
                            staged: None,
                            baseline: current.clone(),
                            state: SaveState::InFlight,
                            generation,
                            timer: None,
                            scheduled_at: None,
                        },
                    );
                    StagePlan::CommitNow { value }
                } else {
                    self.entries.insert(
                        key.clone(),
                        PendingEntry {
                            staged: Some(value),
                            baseline: current.clone(),
                            state: SaveState::Scheduled,
                            generation,
                            timer: None,
                            scheduled_at: Some(Instant::now()),
                        },
                    );
                    StagePlan::Schedule { generation }
                }
            }
            Some(entry) => match entry.state {
                SaveState::Scheduled => {
                    // Coalesce: supersede the armed timer, keep the baseline
                    // from the start of the cycle.
                    entry.cancel_timer();
                    self.generations += 1;
                    entry.generation = self.generations;
                    if immediate {
                        entry.staged = None;
                        entry.set_state(SaveState::InFlight);
                        StagePlan::CommitNow { value }
                    } else {
                        entry.staged = Some(value);
                        entry.scheduled_at = Some(Instant::now());
                        StagePlan::Schedule {
                            generation: entry.generation,
                        }
                    }
                }
                SaveState::InFlight => {
                    entry.staged = Some(value);
                    entry.set_state(SaveState::InFlightQueued);
                    StagePlan::Queued
                }
                SaveState::InFlightQueued => {
                    // Queue coalesces the same way the timer does.
                    entry.staged = Some(value);
                    StagePlan::Queued
                }
                SaveState::Idle => unreachable!("idle keys have no entry"),
            },
        }
    }

    /// Attach the armed timer's abort handle
    ///
    /// A handle presented with a stale generation is aborted on the spot;
    /// its timer was superseded between spawn and attach. A matching
    /// generation whose lane already left `Scheduled` means the timer fired
    /// in that same window and its task is mid-persist now, so the handle
    /// is dropped without aborting.
    pub(crate) fn attach_timer(&mut self, key: &FieldKey, generation: u64, handle: AbortHandle) {
        match self.entries.get_mut(key) {
            Some(entry) if entry.generation == generation => {
                if entry.state == SaveState::Scheduled {
                    entry.timer = Some(handle);
                }
            }
            _ => handle.abort(),
        }
    }

    /// Timer expiry: take the staged value for sending
    ///
    /// Returns `None` when the timer was superseded (stale generation) or
    /// the lane moved on (flush beat the timer to it).
    pub(crate) fn fire(&mut self, key: &FieldKey, generation: u64) -> Option<FieldValue> {
        let entry = self.entries.get_mut(key)?;
        if entry.state != SaveState::Scheduled || entry.generation != generation {
            return None;
        }
        debug_assert!(entry.staged.is_some(), "scheduled entry without a value");
        let value = entry.staged.take()?;
        entry.timer = None;
        entry.scheduled_at = None;
        entry.set_state(SaveState::InFlight);
        Some(value)
    }

    /// Persist resolved successfully
    ///
    /// `confirmed` is the server's value for the key; it becomes the new
    /// baseline when a queued value keeps the lane open.
    pub(crate) fn resolve_success(&mut self, key: &FieldKey, confirmed: &FieldValue) -> SuccessPlan {
        if let Some(entry) = self.entries.get_mut(key) {
            if entry.state == SaveState::InFlightQueued {
                if let Some(value) = entry.staged.take() {
                    entry.baseline = confirmed.clone();
                    entry.set_state(SaveState::InFlight);
                    return SuccessPlan::FollowUp { value };
                }
            }
        }
        self.entries.remove(key);
        SuccessPlan::Done
    }

    /// Persist failed
    ///
    /// Without a queued successor the lane rolls back to its baseline. With
    /// one, the failed value is simply superseded: the snapshot keeps the
    /// newest optimistic value and the baseline carries over so a later
    /// failure still rolls back to confirmed state. Returns `None` when the
    /// lane vanished already.
    pub(crate) fn resolve_failure(&mut self, key: &FieldKey) -> Option<FailurePlan> {
        {
            let entry = self.entries.get_mut(key)?;
            if entry.state == SaveState::InFlightQueued {
                if let Some(value) = entry.staged.take() {
                    entry.set_state(SaveState::InFlight);
                    return Some(FailurePlan::FollowUp { value });
                }
            }
        }
        let entry = self.entries.remove(key)?;
        Some(FailurePlan::Rollback {
            baseline: entry.baseline,
        })
    }

    /// Take every scheduled-but-unfired value for an exit flush
    ///
    /// Timers are cancelled; the lanes move to in-flight so late edits
    /// queue behind the flush persists like any other in-flight save.
    pub(crate) fn drain_scheduled(&mut self) -> Vec<(FieldKey, FieldValue)> {
        let mut drained = Vec::new();
        for (key, entry) in &mut self.entries {
            if entry.state != SaveState::Scheduled {
                continue;
            }
            entry.cancel_timer();
            if let Some(value) = entry.staged.take() {
                entry.set_state(SaveState::InFlight);
                drained.push((key.clone(), value));
            }
        }
        drained
    }

    /// Drop every scheduled-but-unfired entry without sending anything
    ///
    /// Used when the session expired before teardown. Returns how many
    /// saves were discarded.
    pub(crate) fn discard_scheduled(&mut self) -> usize {
        let keys: Vec<FieldKey> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.state == SaveState::Scheduled)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &keys {
            if let Some(mut entry) = self.entries.remove(key) {
                entry.cancel_timer();
            }
        }
        keys.len()
    }

    /// Lifecycle state of one key
    pub(crate) fn save_state(&self, key: &FieldKey) -> SaveState {
        self.entries
            .get(key)
            .map_or(SaveState::Idle, |entry| entry.state)
    }

    /// Keys with any pending work
    pub(crate) fn pending_keys(&self) -> Vec<FieldKey> {
        self.entries.keys().cloned().collect()
    }

    /// Keys a confirmation merge must not overwrite
    pub(crate) fn protected_keys(&self) -> HashSet<FieldKey> {
        self.entries.keys().cloned().collect()
    }

    /// Whether any lane has pending work
    pub(crate) fn is_dirty(&self) -> bool {
        !self.entries.is_empty()
    }
}
