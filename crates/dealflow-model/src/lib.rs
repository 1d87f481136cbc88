//! Dealflow Task Record Model
//!
//! Data types shared by the autosave engine and the remote boundary.
//!
//! # Core Concepts
//!
//! - [`TaskSnapshot`]: Complete state of one task record, the render source
//! - [`FieldKey`] / [`FieldValue`]: Per-field addressing, last-write-wins
//! - [`TaskPatch`]: Partial update payload with keep/set/clear slots
//! - [`LinkedRef`]: Companion-record link with lazy display data
//! - [`Money`]: Exact minor-unit amounts with free-text parsing
//! - [`CustomFieldSchema`]: Optional workspace schema for custom fields
//!
//! # Example
//!
//! ```rust,ignore
//! use dealflow_model::{FieldValue, TaskId, TaskSnapshot};
//!
//! let mut snapshot = TaskSnapshot::new(TaskId::new(), "Schedule viewing");
//! let rollback = snapshot.field(&FieldKey::Title);
//! snapshot.apply(FieldValue::Title("Renegotiate price".into()));
//! ```

#![warn(unreachable_pub)]

// Core modules
mod custom;
mod error;
mod field;
mod ids;
mod money;
mod patch;
mod priority;
mod reference;
mod snapshot;

// Re-exports
pub use custom::{CustomFieldDecl, CustomFieldKind, CustomFieldSchema, CustomValue};
pub use error::ValidationError;
pub use field::{FieldKey, FieldValue};
pub use ids::{ClientId, PropertyId, TaskId, UserId};
pub use money::Money;
pub use patch::{Patch, TaskPatch};
pub use priority::Priority;
pub use reference::{
    ClientCard, ClientLink, LinkCard, LinkedRef, PropertyCard, PropertyLink, UserRef,
};
pub use snapshot::TaskSnapshot;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
