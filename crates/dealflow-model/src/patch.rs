//! Partial update payloads
//!
//! A persist call carries only the fields it intends to change. [`Patch`]
//! distinguishes "leave alone" from "set" from "clear", so an absent field
//! is never confused with an explicit null.

use crate::custom::CustomValue;
use crate::field::{FieldKey, FieldValue};
use crate::money::Money;
use crate::priority::Priority;
use crate::reference::UserRef;
use crate::snapshot::TaskSnapshot;
use chrono::NaiveDate;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// One field slot in a partial update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Patch<T> {
    /// Leave the field untouched
    #[default]
    Keep,
    /// Replace the field with this value
    Set(T),
    /// Clear the field
    Clear,
}

impl<T> Patch<T> {
    /// Whether this slot changes anything
    #[inline]
    #[must_use]
    pub fn is_keep(&self) -> bool {
        matches!(self, Patch::Keep)
    }

    /// Set value, if any
    #[inline]
    #[must_use]
    pub fn as_set(&self) -> Option<&T> {
        match self {
            Patch::Set(value) => Some(value),
            _ => None,
        }
    }

    /// Build from an optional value: `Some` sets, `None` clears
    #[inline]
    #[must_use]
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => Patch::Set(v),
            None => Patch::Clear,
        }
    }
}

/// Partial update for one task record
///
/// Every slot defaults to [`Patch::Keep`]; the payload for a single-field
/// save touches exactly one slot. Linked references do not travel here,
/// they go through the relation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TaskPatch {
    /// Title slot
    pub title: Patch<String>,
    /// Description slot
    pub description: Patch<String>,
    /// Assignee slot
    pub assignee: Patch<UserRef>,
    /// Priority slot
    pub priority: Patch<Priority>,
    /// Due date slot
    pub due_date: Patch<NaiveDate>,
    /// Deal value slot
    pub monetary_value: Patch<Money>,
    /// Tag set slot
    pub tags: Patch<IndexSet<String>>,
    /// Custom field slots, keyed by field name
    pub custom_fields: IndexMap<String, Patch<CustomValue>>,
}

impl TaskPatch {
    /// Empty patch, touches nothing
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the patch changes anything
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_keep()
            && self.description.is_keep()
            && self.assignee.is_keep()
            && self.priority.is_keep()
            && self.due_date.is_keep()
            && self.monetary_value.is_keep()
            && self.tags.is_keep()
            && self.custom_fields.values().all(Patch::is_keep)
    }

    /// Single-field patch for a staged value
    ///
    /// Returns `None` for linked-reference values; those are persisted
    /// through the relation endpoint, not as a field patch.
    #[must_use]
    pub fn for_field(value: &FieldValue) -> Option<Self> {
        let mut patch = Self::new();
        match value {
            FieldValue::Title(v) => patch.title = Patch::Set(v.clone()),
            FieldValue::Description(v) => patch.description = Patch::Set(v.clone()),
            FieldValue::Assignee(v) => patch.assignee = Patch::from_option(v.clone()),
            FieldValue::Priority(v) => patch.priority = Patch::Set(*v),
            FieldValue::DueDate(v) => patch.due_date = Patch::from_option(*v),
            FieldValue::MonetaryValue(v) => patch.monetary_value = Patch::from_option(*v),
            FieldValue::Tags(v) => patch.tags = Patch::Set(v.clone()),
            FieldValue::Custom(key, v) => {
                patch
                    .custom_fields
                    .insert(key.clone(), Patch::from_option(v.clone()));
            }
            FieldValue::LinkedClient(_) | FieldValue::LinkedProperty(_) => return None,
        }
        Some(patch)
    }

    /// Keys this patch touches
    #[must_use]
    pub fn touched_keys(&self) -> Vec<FieldKey> {
        let mut keys = Vec::new();
        if !self.title.is_keep() {
            keys.push(FieldKey::Title);
        }
        if !self.description.is_keep() {
            keys.push(FieldKey::Description);
        }
        if !self.assignee.is_keep() {
            keys.push(FieldKey::Assignee);
        }
        if !self.priority.is_keep() {
            keys.push(FieldKey::Priority);
        }
        if !self.due_date.is_keep() {
            keys.push(FieldKey::DueDate);
        }
        if !self.monetary_value.is_keep() {
            keys.push(FieldKey::MonetaryValue);
        }
        if !self.tags.is_keep() {
            keys.push(FieldKey::Tags);
        }
        for (name, slot) in &self.custom_fields {
            if !slot.is_keep() {
                keys.push(FieldKey::Custom(name.clone()));
            }
        }
        keys
    }

    /// Apply this patch to a snapshot, server-side semantics
    ///
    /// `Clear` empties text fields and removes optional ones. Clearing the
    /// non-optional priority slot is a no-op.
    pub fn apply_to(&self, snapshot: &mut TaskSnapshot) {
        match &self.title {
            Patch::Set(v) => snapshot.title = v.clone(),
            Patch::Clear => snapshot.title.clear(),
            Patch::Keep => {}
        }
        match &self.description {
            Patch::Set(v) => snapshot.description = v.clone(),
            Patch::Clear => snapshot.description.clear(),
            Patch::Keep => {}
        }
        match &self.assignee {
            Patch::Set(v) => snapshot.assignee = Some(v.clone()),
            Patch::Clear => snapshot.assignee = None,
            Patch::Keep => {}
        }
        match &self.priority {
            Patch::Set(v) => snapshot.priority = *v,
            Patch::Keep | Patch::Clear => {}
        }
        match &self.due_date {
            Patch::Set(v) => snapshot.due_date = Some(*v),
            Patch::Clear => snapshot.due_date = None,
            Patch::Keep => {}
        }
        match &self.monetary_value {
            Patch::Set(v) => snapshot.monetary_value = Some(*v),
            Patch::Clear => snapshot.monetary_value = None,
            Patch::Keep => {}
        }
        match &self.tags {
            Patch::Set(v) => snapshot.tags = v.clone(),
            Patch::Clear => snapshot.tags.clear(),
            Patch::Keep => {}
        }
        for (name, slot) in &self.custom_fields {
            match slot {
                Patch::Set(v) => {
                    snapshot.custom_fields.insert(name.clone(), v.clone());
                }
                Patch::Clear => {
                    snapshot.custom_fields.shift_remove(name);
                }
                Patch::Keep => {}
            }
        }
    }
}
