//! Validation errors for field-level edits
//!
//! Every edit is validated before it is applied optimistically. A failed
//! validation never reaches the snapshot or the wire.

/// Errors produced when a staged field value violates a model invariant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Title must contain at least one non-whitespace character
    #[error("title cannot be empty")]
    EmptyTitle,

    /// Monetary input could not be parsed
    #[error("invalid monetary amount: {0}")]
    InvalidMoney(String),

    /// Monetary amounts are stored non-negative
    #[error("monetary amount cannot be negative")]
    NegativeMoney,

    /// More than two fraction digits in a monetary amount
    #[error("monetary amount has more than two fraction digits: {0}")]
    TooPreciseMoney(String),

    /// Monetary amount exceeds the representable range
    #[error("monetary amount out of range: {0}")]
    MoneyOutOfRange(String),

    /// Due date outside the plausible planning window
    #[error("due date {0} is outside the supported range")]
    DueDateOutOfRange(chrono::NaiveDate),

    /// Tags must contain at least one non-whitespace character
    #[error("tag cannot be empty")]
    EmptyTag,

    /// Priority token not in the scale
    #[error("unknown priority '{0}'")]
    UnknownPriority(String),

    /// Declared custom field received a value of the wrong kind
    #[error("custom field '{field}' expects {expected}, got {actual}")]
    CustomKindMismatch {
        /// Custom field key
        field: String,
        /// Kind declared in the schema
        expected: &'static str,
        /// Kind of the staged value
        actual: &'static str,
    },

    /// Required custom field cannot be cleared
    #[error("custom field '{0}' is required and cannot be cleared")]
    RequiredCustomField(String),
}
