//! Custom field values and the optional schema that constrains them
//!
//! Workspaces can declare custom fields (kind + required flag). Declared
//! keys are validated on edit; undeclared keys are accepted as-is so older
//! clients keep working when the workspace configuration moves ahead.

use crate::error::ValidationError;
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Value held by a single custom field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum CustomValue {
    /// Free text
    Text(String),
    /// Numeric value
    Number(f64),
    /// Yes/no toggle
    Flag(bool),
    /// Calendar date
    Date(NaiveDate),
}

impl CustomValue {
    /// Kind of this value
    #[inline]
    #[must_use]
    pub fn kind(&self) -> CustomFieldKind {
        match self {
            CustomValue::Text(_) => CustomFieldKind::Text,
            CustomValue::Number(_) => CustomFieldKind::Number,
            CustomValue::Flag(_) => CustomFieldKind::Flag,
            CustomValue::Date(_) => CustomFieldKind::Date,
        }
    }

    /// Render as the bare JSON scalar used on the wire
    ///
    /// Dates travel as ISO strings; the kind tag is carried separately by
    /// the declared schema, not the payload.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CustomValue::Text(text) => serde_json::Value::String(text.clone()),
            CustomValue::Number(number) => serde_json::Number::from_f64(*number)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            CustomValue::Flag(flag) => serde_json::Value::Bool(*flag),
            CustomValue::Date(date) => serde_json::Value::String(date.to_string()),
        }
    }

    /// Read back a bare JSON scalar
    ///
    /// A string that parses as an ISO date comes back as [`Date`]; every
    /// other string stays [`Text`]. `None` for nulls, arrays, and objects,
    /// which have no custom-field representation.
    ///
    /// [`Date`]: CustomValue::Date
    /// [`Text`]: CustomValue::Text
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(text) => Some(
                text.parse::<NaiveDate>()
                    .map_or_else(|_| CustomValue::Text(text.clone()), CustomValue::Date),
            ),
            serde_json::Value::Number(number) => number.as_f64().map(CustomValue::Number),
            serde_json::Value::Bool(flag) => Some(CustomValue::Flag(*flag)),
            serde_json::Value::Null | serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                None
            }
        }
    }
}

/// Kind tag for custom field declarations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomFieldKind {
    /// Free text
    Text,
    /// Numeric value
    Number,
    /// Yes/no toggle
    Flag,
    /// Calendar date
    Date,
}

impl CustomFieldKind {
    /// Stable lowercase name, used in error messages
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            CustomFieldKind::Text => "text",
            CustomFieldKind::Number => "number",
            CustomFieldKind::Flag => "flag",
            CustomFieldKind::Date => "date",
        }
    }
}

/// Declaration for one custom field key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFieldDecl {
    /// Expected value kind
    pub kind: CustomFieldKind,
    /// Whether the field may be cleared
    pub required: bool,
}

/// Workspace-level custom field declarations
///
/// Keys keep declaration order for stable rendering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomFieldSchema {
    fields: IndexMap<String, CustomFieldDecl>,
}

impl CustomFieldSchema {
    /// Empty schema, accepts any key and kind
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a custom field
    #[inline]
    #[must_use]
    pub fn declare(mut self, key: impl Into<String>, kind: CustomFieldKind, required: bool) -> Self {
        self.fields
            .insert(key.into(), CustomFieldDecl { kind, required });
        self
    }

    /// Declaration for a key, if any
    #[inline]
    #[must_use]
    pub fn declaration(&self, key: &str) -> Option<&CustomFieldDecl> {
        self.fields.get(key)
    }

    /// Declared keys in declaration order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Validate a staged value (or a clear, when `value` is `None`)
    ///
    /// Undeclared keys always pass.
    ///
    /// # Errors
    /// Returns [`ValidationError::CustomKindMismatch`] on a kind clash and
    /// [`ValidationError::RequiredCustomField`] when clearing a required key
    pub fn validate(&self, key: &str, value: Option<&CustomValue>) -> Result<(), ValidationError> {
        let Some(decl) = self.fields.get(key) else {
            return Ok(());
        };
        match value {
            Some(v) if v.kind() != decl.kind => Err(ValidationError::CustomKindMismatch {
                field: key.to_string(),
                expected: decl.kind.name(),
                actual: v.kind().name(),
            }),
            Some(_) => Ok(()),
            None if decl.required => Err(ValidationError::RequiredCustomField(key.to_string())),
            None => Ok(()),
        }
    }
}
