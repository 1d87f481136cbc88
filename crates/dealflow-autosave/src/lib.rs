//! Dealflow Autosave Engine
//!
//! Optimistic mutation and debounced autosave for one open task record.
//!
//! # Core Concepts
//!
//! - [`AutosaveEngine`]: Facade over snapshot, ledger, timers, and persists
//! - [`SaveState`]: Per-field lifecycle (idle, scheduled, in-flight, queued)
//! - [`SettleClass`]: How long a field waits for input to settle
//! - [`LifecycleEvent`]: Exit signals that force pending saves out
//! - [`EngineConfig`]: Settle windows and card-cache tuning
//!
//! # Example
//!
//! ```rust,ignore
//! use dealflow_autosave::{AutosaveEngine, Collaborators};
//! use dealflow_model::FieldValue;
//!
//! let engine = AutosaveEngine::new(initial_snapshot, collaborators);
//! engine.edit(FieldValue::Title("Renegotiate price".into()))?;
//! // Snapshot reflects the edit immediately; the persist follows after
//! // the field's settle window.
//! ```
//!
//! # Guarantees
//!
//! - Edits to one key coalesce while scheduled and queue (never merge)
//!   while in flight, so the server eventually holds the last value per key
//! - Distinct keys never serialize against each other
//! - A failed persist rolls only its own field back, to the exact value
//!   captured before the failing cycle began
//! - The snapshot never rests on a sent-but-unconfirmed value

#![warn(unreachable_pub)]

// Core modules
mod config;
mod engine;
mod error;
mod flush;
mod ledger;
mod references;
mod scheduler;

// Re-exports
pub use config::EngineConfig;
pub use engine::{AutosaveEngine, Collaborators, EngineBuilder};
pub use error::AutosaveError;
pub use flush::LifecycleEvent;
pub use ledger::SaveState;
pub use scheduler::SettleClass;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
