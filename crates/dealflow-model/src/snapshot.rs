//! In-memory snapshot of one task record
//!
//! The snapshot is the single source of truth the UI renders from. It always
//! reflects either confirmed server state or an optimistic local edit, never
//! a half-applied mix within one field.

use crate::custom::CustomValue;
use crate::field::{FieldKey, FieldValue};
use crate::ids::TaskId;
use crate::money::Money;
use crate::priority::Priority;
use crate::reference::{ClientLink, PropertyLink, UserRef};
use chrono::{DateTime, NaiveDate, Utc};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Complete state of one task record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    /// Record id
    pub id: TaskId,
    /// Title
    pub title: String,
    /// Long-form description
    pub description: String,
    /// Assigned user
    pub assignee: Option<UserRef>,
    /// Priority bucket
    pub priority: Priority,
    /// Due date
    pub due_date: Option<NaiveDate>,
    /// Deal value
    pub monetary_value: Option<Money>,
    /// Tags, insertion-ordered and deduplicated
    pub tags: IndexSet<String>,
    /// Linked client record
    pub linked_client: ClientLink,
    /// Linked property record
    pub linked_property: PropertyLink,
    /// Custom field values keyed by field name
    pub custom_fields: IndexMap<String, CustomValue>,
    /// Uploaded attachment file names, server-managed
    pub attachments: Vec<String>,
    /// Server-side modification time
    pub updated_at: DateTime<Utc>,
}

impl TaskSnapshot {
    /// Create a snapshot with defaults for everything but id and title
    #[must_use]
    pub fn new(id: TaskId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: String::new(),
            assignee: None,
            priority: Priority::default(),
            due_date: None,
            monetary_value: None,
            tags: IndexSet::new(),
            linked_client: ClientLink::Unset,
            linked_property: PropertyLink::Unset,
            custom_fields: IndexMap::new(),
            attachments: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// With priority
    #[inline]
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// With assignee
    #[inline]
    #[must_use]
    pub fn with_assignee(mut self, assignee: UserRef) -> Self {
        self.assignee = Some(assignee);
        self
    }

    /// With due date
    #[inline]
    #[must_use]
    pub fn with_due_date(mut self, due: NaiveDate) -> Self {
        self.due_date = Some(due);
        self
    }

    /// With deal value
    #[inline]
    #[must_use]
    pub fn with_monetary_value(mut self, value: Money) -> Self {
        self.monetary_value = Some(value);
        self
    }

    /// With an extra tag
    #[inline]
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// With a custom field value
    #[inline]
    #[must_use]
    pub fn with_custom(mut self, key: impl Into<String>, value: CustomValue) -> Self {
        self.custom_fields.insert(key.into(), value);
        self
    }

    /// Current value of one field, cloned out
    ///
    /// Absent custom keys come back as `Custom(key, None)` so a rollback can
    /// restore "the key was not set".
    #[must_use]
    pub fn field(&self, key: &FieldKey) -> FieldValue {
        match key {
            FieldKey::Title => FieldValue::Title(self.title.clone()),
            FieldKey::Description => FieldValue::Description(self.description.clone()),
            FieldKey::Assignee => FieldValue::Assignee(self.assignee.clone()),
            FieldKey::Priority => FieldValue::Priority(self.priority),
            FieldKey::DueDate => FieldValue::DueDate(self.due_date),
            FieldKey::MonetaryValue => FieldValue::MonetaryValue(self.monetary_value),
            FieldKey::Tags => FieldValue::Tags(self.tags.clone()),
            FieldKey::LinkedClient => FieldValue::LinkedClient(self.linked_client.clone()),
            FieldKey::LinkedProperty => FieldValue::LinkedProperty(self.linked_property.clone()),
            FieldKey::Custom(name) => {
                FieldValue::Custom(name.clone(), self.custom_fields.get(name).cloned())
            }
        }
    }

    /// Replace one field with `value`
    pub fn apply(&mut self, value: FieldValue) {
        match value {
            FieldValue::Title(v) => self.title = v,
            FieldValue::Description(v) => self.description = v,
            FieldValue::Assignee(v) => self.assignee = v,
            FieldValue::Priority(v) => self.priority = v,
            FieldValue::DueDate(v) => self.due_date = v,
            FieldValue::MonetaryValue(v) => self.monetary_value = v,
            FieldValue::Tags(v) => self.tags = v,
            FieldValue::LinkedClient(v) => self.linked_client = v,
            FieldValue::LinkedProperty(v) => self.linked_property = v,
            FieldValue::Custom(key, Some(v)) => {
                self.custom_fields.insert(key, v);
            }
            FieldValue::Custom(key, None) => {
                self.custom_fields.shift_remove(&key);
            }
        }
    }

    /// Merge a confirmed server snapshot into this one
    ///
    /// Fields named in `protected` keep their local (optimistic) value; a
    /// confirmation for one field must never clobber another field's pending
    /// edit. Linked references adopt previously-fetched display cards when
    /// the confirmed state carries only the id.
    pub fn merge_confirmed(&mut self, confirmed: &TaskSnapshot, protected: &HashSet<FieldKey>) {
        if !protected.contains(&FieldKey::Title) {
            self.title = confirmed.title.clone();
        }
        if !protected.contains(&FieldKey::Description) {
            self.description = confirmed.description.clone();
        }
        if !protected.contains(&FieldKey::Assignee) {
            self.assignee = confirmed.assignee.clone();
        }
        if !protected.contains(&FieldKey::Priority) {
            self.priority = confirmed.priority;
        }
        if !protected.contains(&FieldKey::DueDate) {
            self.due_date = confirmed.due_date;
        }
        if !protected.contains(&FieldKey::MonetaryValue) {
            self.monetary_value = confirmed.monetary_value;
        }
        if !protected.contains(&FieldKey::Tags) {
            self.tags = confirmed.tags.clone();
        }
        if !protected.contains(&FieldKey::LinkedClient) {
            self.linked_client = confirmed
                .linked_client
                .clone()
                .adopting_card_from(&self.linked_client);
        }
        if !protected.contains(&FieldKey::LinkedProperty) {
            self.linked_property = confirmed
                .linked_property
                .clone()
                .adopting_card_from(&self.linked_property);
        }

        // Custom fields: server state wins except for protected keys, which
        // keep their local value or local absence.
        let mut merged = confirmed.custom_fields.clone();
        for key in protected {
            if let FieldKey::Custom(name) = key {
                match self.custom_fields.get(name) {
                    Some(value) => {
                        merged.insert(name.clone(), value.clone());
                    }
                    None => {
                        merged.shift_remove(name);
                    }
                }
            }
        }
        self.custom_fields = merged;
        // Attachments have no edit lane, server state always wins.
        self.attachments = confirmed.attachments.clone();
        self.updated_at = confirmed.updated_at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ClientId;
    use crate::reference::ClientCard;
    use pretty_assertions::assert_eq;

    fn snapshot() -> TaskSnapshot {
        TaskSnapshot::new(TaskId::new(), "Schedule viewing")
            .with_priority(Priority::Medium)
            .with_tag("hot")
            .with_custom("deal_stage", CustomValue::Text("intake".into()))
    }

    #[test]
    fn field_and_apply_round_trip() {
        let mut snap = snapshot();
        let before = snap.field(&FieldKey::Title);
        snap.apply(FieldValue::Title("Renegotiate".into()));
        assert_eq!(snap.title, "Renegotiate");
        snap.apply(before);
        assert_eq!(snap.title, "Schedule viewing");
    }

    #[test]
    fn absent_custom_field_reads_as_none() {
        let snap = snapshot();
        assert_eq!(
            snap.field(&FieldKey::Custom("missing".into())),
            FieldValue::Custom("missing".into(), None)
        );
    }

    #[test]
    fn applying_custom_none_removes_the_key() {
        let mut snap = snapshot();
        snap.apply(FieldValue::Custom("deal_stage".into(), None));
        assert!(snap.custom_fields.is_empty());
    }

    #[test]
    fn merge_adopts_unprotected_fields() {
        let mut local = snapshot();
        let mut confirmed = local.clone();
        confirmed.title = "Server title".to_string();
        confirmed.priority = Priority::Urgent;

        local.merge_confirmed(&confirmed, &HashSet::new());
        assert_eq!(local.title, "Server title");
        assert_eq!(local.priority, Priority::Urgent);
    }

    #[test]
    fn merge_keeps_protected_fields_local() {
        let mut local = snapshot();
        local.title = "Optimistic title".to_string();
        let mut confirmed = snapshot();
        confirmed.title = "Server title".to_string();

        let protected = HashSet::from([FieldKey::Title]);
        local.merge_confirmed(&confirmed, &protected);
        assert_eq!(local.title, "Optimistic title");
    }

    #[test]
    fn merge_keeps_protected_custom_absence() {
        let mut local = snapshot();
        local.custom_fields.shift_remove("deal_stage");
        let confirmed = snapshot();

        let protected = HashSet::from([FieldKey::Custom("deal_stage".into())]);
        local.merge_confirmed(&confirmed, &protected);
        assert!(!local.custom_fields.contains_key("deal_stage"));
    }

    #[test]
    fn merge_preserves_hydrated_card_when_server_sends_id_only() {
        let card = ClientCard::new(ClientId::new(), "Arvid Falk");
        let mut local = snapshot();
        local.linked_client = ClientLink::Hydrated(card.clone());
        let mut confirmed = snapshot();
        confirmed.linked_client = ClientLink::IdOnly(card.id);

        local.merge_confirmed(&confirmed, &HashSet::new());
        assert_eq!(local.linked_client, ClientLink::Hydrated(card));
    }
}
