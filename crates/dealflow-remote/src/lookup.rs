//! Candidate lookup seam
//!
//! One endpoint serves two purposes: type-ahead search in the link pickers
//! (with a search term) and display-data resolution for an already-linked id
//! (without one). Either way the result is a flat candidate list.

use crate::client::{RelationKind, RelatedId};
use crate::error::LookupError;
use dealflow_model::{ClientCard, ClientId, PropertyCard, PropertyId};
use serde::{Deserialize, Serialize};

/// One selectable record in a link picker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Record id
    pub id: RelatedId,
    /// Primary display label (client name, listing title)
    pub label: String,
    /// Secondary display line (email, street address)
    pub detail: Option<String>,
}

impl Candidate {
    /// Create a candidate
    #[inline]
    #[must_use]
    pub fn new(id: RelatedId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            detail: None,
        }
    }

    /// With secondary display line
    #[inline]
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// View as a client display card
    #[must_use]
    pub fn to_client_card(&self) -> ClientCard {
        let mut card = ClientCard::new(ClientId(self.id.0), self.label.clone());
        if let Some(detail) = &self.detail {
            card = card.with_email(detail.clone());
        }
        card
    }

    /// View as a property display card
    #[must_use]
    pub fn to_property_card(&self) -> PropertyCard {
        let mut card = PropertyCard::new(PropertyId(self.id.0), self.label.clone());
        if let Some(detail) = &self.detail {
            card = card.with_address(detail.clone());
        }
        card
    }
}

/// Read-only lookup for linkable records
#[async_trait::async_trait]
pub trait LookupService: Send + Sync {
    /// Fetch candidates for one relation kind
    ///
    /// # Arguments
    /// * `kind` - Which relation the candidates are for
    /// * `search` - Optional case-insensitive filter on the label
    ///
    /// # Errors
    /// Returns [`LookupError`] when the candidate list could not be fetched
    async fn fetch_candidates(
        &self,
        kind: RelationKind,
        search: Option<&str>,
    ) -> Result<Vec<Candidate>, LookupError>;
}
