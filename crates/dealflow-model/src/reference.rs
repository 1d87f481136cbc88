//! Linked companion records and their denormalized display cards
//!
//! A task can point at one client and one property. The link is stored as an
//! id; display data (the "card") arrives later from a lookup and is purely
//! cosmetic. [`LinkedRef`] tracks the three states a link moves through:
//!
//! - `Unset` - no companion record
//! - `IdOnly` - id known, display data not fetched yet
//! - `Hydrated` - id known and display card attached

use crate::ids::{ClientId, PropertyId, UserId};
use serde::{Deserialize, Serialize};

/// Display card for a record a task can link to
pub trait LinkCard: Clone + std::fmt::Debug + PartialEq + Send + Sync + 'static {
    /// Identifier type for the record
    type Id: Copy + PartialEq + Eq + std::hash::Hash + std::fmt::Debug + Send + Sync + 'static;

    /// Record id this card describes
    fn id(&self) -> Self::Id;

    /// Short human label for the record
    fn label(&self) -> &str;
}

/// Reference to a user (assignee)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    /// User id
    pub id: UserId,
    /// Display name
    pub name: String,
}

impl UserRef {
    /// Create a user reference
    #[inline]
    #[must_use]
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Denormalized display data for a linked client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCard {
    /// Client id
    pub id: ClientId,
    /// Client name
    pub name: String,
    /// Contact email, when known
    pub email: Option<String>,
}

impl ClientCard {
    /// Create a client card
    #[inline]
    #[must_use]
    pub fn new(id: ClientId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: None,
        }
    }

    /// With contact email
    #[inline]
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

impl LinkCard for ClientCard {
    type Id = ClientId;

    fn id(&self) -> ClientId {
        self.id
    }

    fn label(&self) -> &str {
        &self.name
    }
}

/// Denormalized display data for a linked property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyCard {
    /// Property id
    pub id: PropertyId,
    /// Listing title
    pub title: String,
    /// Street address, when known
    pub address: Option<String>,
}

impl PropertyCard {
    /// Create a property card
    #[inline]
    #[must_use]
    pub fn new(id: PropertyId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            address: None,
        }
    }

    /// With street address
    #[inline]
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
}

impl LinkCard for PropertyCard {
    type Id = PropertyId;

    fn id(&self) -> PropertyId {
        self.id
    }

    fn label(&self) -> &str {
        &self.title
    }
}

/// Link from a task to a companion record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    bound(
        serialize = "C: Serialize, C::Id: Serialize",
        deserialize = "C: Deserialize<'de>, C::Id: Deserialize<'de>"
    ),
    rename_all = "lowercase"
)]
pub enum LinkedRef<C: LinkCard> {
    /// No companion record linked
    Unset,
    /// Record chosen, display data not fetched yet
    IdOnly(C::Id),
    /// Record linked with display data attached
    Hydrated(C),
}

/// Link to a client record
pub type ClientLink = LinkedRef<ClientCard>;
/// Link to a property record
pub type PropertyLink = LinkedRef<PropertyCard>;

impl<C: LinkCard> LinkedRef<C> {
    /// Linked record id, if any
    #[inline]
    #[must_use]
    pub fn id(&self) -> Option<C::Id> {
        match self {
            LinkedRef::Unset => None,
            LinkedRef::IdOnly(id) => Some(*id),
            LinkedRef::Hydrated(card) => Some(card.id()),
        }
    }

    /// Attached display card, if hydrated
    #[inline]
    #[must_use]
    pub fn card(&self) -> Option<&C> {
        match self {
            LinkedRef::Hydrated(card) => Some(card),
            _ => None,
        }
    }

    /// Whether no record is linked
    #[inline]
    #[must_use]
    pub fn is_unset(&self) -> bool {
        matches!(self, LinkedRef::Unset)
    }

    /// Re-target the link at `id`
    ///
    /// Setting the same id keeps an already-attached card; setting a
    /// different id drops it; `None` clears the link entirely.
    #[must_use]
    pub fn with_id(self, id: Option<C::Id>) -> Self {
        match id {
            None => LinkedRef::Unset,
            Some(new_id) => match self {
                LinkedRef::Hydrated(card) if card.id() == new_id => LinkedRef::Hydrated(card),
                _ => LinkedRef::IdOnly(new_id),
            },
        }
    }

    /// Attach a display card
    ///
    /// The card only sticks when it describes the currently-linked id;
    /// otherwise the link is returned unchanged.
    #[must_use]
    pub fn with_card(self, card: C) -> Self {
        match self.id() {
            Some(id) if id == card.id() => LinkedRef::Hydrated(card),
            _ => self,
        }
    }

    /// Adopt display data from `prior` when the id did not change
    ///
    /// Used when merging a confirmed server state that carries only the id:
    /// an id-only confirmation must not erase display data the client
    /// already fetched.
    #[must_use]
    pub fn adopting_card_from(self, prior: &Self) -> Self {
        match (&self, prior) {
            (LinkedRef::IdOnly(id), LinkedRef::Hydrated(card)) if *id == card.id() => {
                LinkedRef::Hydrated(card.clone())
            }
            _ => self,
        }
    }
}

impl<C: LinkCard> Default for LinkedRef<C> {
    fn default() -> Self {
        LinkedRef::Unset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn card() -> ClientCard {
        ClientCard::new(ClientId::new(), "Arvid Falk").with_email("arvid@example.com")
    }

    #[test]
    fn with_id_none_clears() {
        let link = ClientLink::Hydrated(card());
        assert_eq!(link.with_id(None), ClientLink::Unset);
    }

    #[test]
    fn with_id_same_keeps_card() {
        let c = card();
        let id = c.id;
        let link = ClientLink::Hydrated(c.clone());
        assert_eq!(link.with_id(Some(id)), ClientLink::Hydrated(c));
    }

    #[test]
    fn with_id_different_drops_card() {
        let other = ClientId::new();
        let link = ClientLink::Hydrated(card());
        assert_eq!(link.with_id(Some(other)), ClientLink::IdOnly(other));
    }

    #[test]
    fn with_card_ignores_mismatched_id() {
        let link = ClientLink::IdOnly(ClientId::new());
        let stale = card();
        assert_eq!(link.clone().with_card(stale), link);
    }

    #[test]
    fn with_card_attaches_on_match() {
        let c = card();
        let link = ClientLink::IdOnly(c.id);
        assert_eq!(link.with_card(c.clone()), ClientLink::Hydrated(c));
    }

    #[test]
    fn id_only_confirmation_keeps_prior_card() {
        let c = card();
        let confirmed = ClientLink::IdOnly(c.id);
        let prior = ClientLink::Hydrated(c.clone());
        assert_eq!(
            confirmed.adopting_card_from(&prior),
            ClientLink::Hydrated(c)
        );
    }

    #[test]
    fn unset_confirmation_wins_over_prior_card() {
        let prior = ClientLink::Hydrated(card());
        assert_eq!(
            ClientLink::Unset.adopting_card_from(&prior),
            ClientLink::Unset
        );
    }
}
