//! Dealflow Remote Boundary
//!
//! Seams between the autosave engine and the outside world.
//!
//! # Core Concepts
//!
//! - [`SyncClient`]: Persistence calls, each returning the refreshed record
//! - [`LookupService`]: Candidate search and display-data resolution
//! - [`SessionState`]: Gate consulted before exit-time flushes
//! - [`NotificationSink`]: User-visible error/success notices
//! - [`InMemoryBackend`]: Reference implementation for tests and demos
//!
//! The engine owns retry-free failure semantics: a failed persist is rolled
//! back and reported, never retried here.

#![warn(unreachable_pub)]

// Core modules
mod client;
mod error;
mod lookup;
mod memory;
mod notify;
mod session;

// Re-exports
pub use client::{AttachmentUpload, RelatedId, RelationKind, SyncClient};
pub use error::{LookupError, PersistError};
pub use lookup::{Candidate, LookupService};
pub use memory::InMemoryBackend;
pub use notify::{LogSink, NotificationSink};
pub use session::{SessionState, StaticSession};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
