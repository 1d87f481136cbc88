//! Linked-reference display-data resolution
//!
//! Persisting a linked client or property only needs the id; the card shown
//! next to it (name, email, address) comes from a secondary lookup. The
//! resolver runs that lookup in the background, discards results that
//! arrive after the link was re-targeted, and caches resolved cards so
//! re-linking a recently-seen record hydrates without a refetch.
//!
//! Lookup failures degrade to id-only display. They never touch the ledger
//! and never roll the link back.

use crate::config::EngineConfig;
use dealflow_model::TaskSnapshot;
use dealflow_remote::{Candidate, LookupService, RelatedId, RelationKind};
use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

/// Background card resolution with staleness tracking
///
/// One generation counter per relation kind: every id application bumps it,
/// and a fetch only applies its card when it still holds the latest
/// generation. This is what keeps a quick A-then-B re-link from ever
/// flashing A's card.
#[derive(Debug)]
pub(crate) struct ReferenceResolver {
    cards: Cache<(RelationKind, RelatedId), Candidate>,
    client_generation: AtomicU64,
    property_generation: AtomicU64,
}

impl ReferenceResolver {
    pub(crate) fn new(config: &EngineConfig) -> Self {
        Self {
            cards: Cache::builder()
                .max_capacity(config.card_cache_capacity)
                .time_to_live(config.card_cache_ttl())
                .build(),
            client_generation: AtomicU64::new(0),
            property_generation: AtomicU64::new(0),
        }
    }

    fn counter(&self, kind: RelationKind) -> &AtomicU64 {
        match kind {
            RelationKind::Client => &self.client_generation,
            RelationKind::Property => &self.property_generation,
        }
    }

    /// Invalidate all outstanding fetches for a kind; returns the new
    /// generation a subsequent fetch must present
    pub(crate) fn bump(&self, kind: RelationKind) -> u64 {
        self.counter(kind).fetch_add(1, Ordering::SeqCst) + 1
    }

    fn current(&self, kind: RelationKind) -> u64 {
        self.counter(kind).load(Ordering::SeqCst)
    }

    /// Resolve the candidate describing `id`, from cache or lookup
    ///
    /// Returns `None` when the lookup failed or the record is unknown;
    /// either way the link stays id-only.
    async fn resolve(
        &self,
        lookup: &dyn LookupService,
        kind: RelationKind,
        id: RelatedId,
    ) -> Option<Candidate> {
        if let Some(hit) = self.cards.get(&(kind, id)).await {
            tracing::debug!("card cache hit for {kind} {id}");
            return Some(hit);
        }
        match lookup.fetch_candidates(kind, None).await {
            Ok(candidates) => {
                let found = candidates.into_iter().find(|c| c.id == id);
                match &found {
                    Some(candidate) => {
                        self.cards.insert((kind, id), candidate.clone()).await;
                    }
                    None => tracing::debug!("no {kind} candidate for {id}"),
                }
                found
            }
            Err(err) => {
                tracing::warn!("card lookup for {kind} {id} failed: {err}");
                None
            }
        }
    }

    /// Fetch the card for `id` and attach it to the snapshot
    ///
    /// `generation` is the token handed out by [`bump`](Self::bump) when the
    /// id was applied. A fetch that lost its generation by the time it
    /// resolves is dropped without touching the snapshot.
    pub(crate) async fn hydrate(
        &self,
        lookup: &dyn LookupService,
        snapshot: &watch::Sender<TaskSnapshot>,
        kind: RelationKind,
        id: RelatedId,
        generation: u64,
    ) {
        let Some(candidate) = self.resolve(lookup, kind, id).await else {
            return;
        };
        if self.current(kind) != generation {
            tracing::debug!("discarding stale {kind} card for {id}");
            return;
        }
        snapshot.send_modify(|snap| match kind {
            RelationKind::Client => {
                // with_card re-checks the id, covering a re-target that
                // raced the generation read.
                snap.linked_client = snap
                    .linked_client
                    .clone()
                    .with_card(candidate.to_client_card());
            }
            RelationKind::Property => {
                snap.linked_property = snap
                    .linked_property
                    .clone()
                    .with_card(candidate.to_property_card());
            }
        });
        tracing::debug!("hydrated {kind} card for {id}");
    }
}
