//! Field addressing and staged field values
//!
//! Every editable slot of a task record is addressed by a [`FieldKey`].
//! Debounce coalescing, in-flight tracking, and rollback are all scoped to
//! one key, so the key doubles as the identity of a save lane. A staged
//! edit travels as a [`FieldValue`], the full replacement value for one key.

use crate::custom::{CustomFieldSchema, CustomValue};
use crate::error::ValidationError;
use crate::money::Money;
use crate::priority::Priority;
use crate::reference::{ClientLink, PropertyLink, UserRef};
use chrono::{Datelike, NaiveDate};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Earliest year accepted for due dates
const MIN_DUE_YEAR: i32 = 1900;
/// Latest year accepted for due dates
const MAX_DUE_YEAR: i32 = 2100;

/// Address of one editable field on a task record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    /// Task title
    Title,
    /// Long-form description
    Description,
    /// Assigned user
    Assignee,
    /// Priority bucket
    Priority,
    /// Due date
    DueDate,
    /// Deal value
    MonetaryValue,
    /// Tag set
    Tags,
    /// Linked client record
    LinkedClient,
    /// Linked property record
    LinkedProperty,
    /// Workspace-defined custom field, addressed by key
    Custom(String),
}

impl std::fmt::Display for FieldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldKey::Title => write!(f, "title"),
            FieldKey::Description => write!(f, "description"),
            FieldKey::Assignee => write!(f, "assignee"),
            FieldKey::Priority => write!(f, "priority"),
            FieldKey::DueDate => write!(f, "due date"),
            FieldKey::MonetaryValue => write!(f, "deal value"),
            FieldKey::Tags => write!(f, "tags"),
            FieldKey::LinkedClient => write!(f, "linked client"),
            FieldKey::LinkedProperty => write!(f, "linked property"),
            FieldKey::Custom(name) => write!(f, "custom field '{name}'"),
        }
    }
}

/// Full replacement value for one field
///
/// Last-write-wins per key: a later `FieldValue` for the same key fully
/// supersedes an earlier one, there is no intra-field merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    /// Task title
    Title(String),
    /// Long-form description (empty string allowed)
    Description(String),
    /// Assigned user, `None` unassigns
    Assignee(Option<UserRef>),
    /// Priority bucket
    Priority(Priority),
    /// Due date, `None` clears
    DueDate(Option<NaiveDate>),
    /// Deal value, `None` clears
    MonetaryValue(Option<Money>),
    /// Complete tag set, replaces the previous set
    Tags(IndexSet<String>),
    /// Linked client state
    LinkedClient(ClientLink),
    /// Linked property state
    LinkedProperty(PropertyLink),
    /// Custom field value, `None` clears the key
    Custom(String, Option<CustomValue>),
}

impl FieldValue {
    /// Key this value belongs to
    #[must_use]
    pub fn key(&self) -> FieldKey {
        match self {
            FieldValue::Title(_) => FieldKey::Title,
            FieldValue::Description(_) => FieldKey::Description,
            FieldValue::Assignee(_) => FieldKey::Assignee,
            FieldValue::Priority(_) => FieldKey::Priority,
            FieldValue::DueDate(_) => FieldKey::DueDate,
            FieldValue::MonetaryValue(_) => FieldKey::MonetaryValue,
            FieldValue::Tags(_) => FieldKey::Tags,
            FieldValue::LinkedClient(_) => FieldKey::LinkedClient,
            FieldValue::LinkedProperty(_) => FieldKey::LinkedProperty,
            FieldValue::Custom(name, _) => FieldKey::Custom(name.clone()),
        }
    }

    /// Validate this value against model invariants
    ///
    /// # Errors
    /// Returns a [`ValidationError`] when the value cannot be accepted;
    /// rejected values must reach neither the snapshot nor the wire
    pub fn validate(&self, schema: &CustomFieldSchema) -> Result<(), ValidationError> {
        match self {
            FieldValue::Title(title) if title.trim().is_empty() => {
                Err(ValidationError::EmptyTitle)
            }
            FieldValue::DueDate(Some(date))
                if date.year() < MIN_DUE_YEAR || date.year() > MAX_DUE_YEAR =>
            {
                Err(ValidationError::DueDateOutOfRange(*date))
            }
            FieldValue::Tags(tags) if tags.iter().any(|t| t.trim().is_empty()) => {
                Err(ValidationError::EmptyTag)
            }
            FieldValue::Custom(key, value) => schema.validate(key, value.as_ref()),
            _ => Ok(()),
        }
    }
}
