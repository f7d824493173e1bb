//! History: rebuild an identity's claims from the ledger event log.
//!
//! Every call replays the full log from genesis to the latest block; there
//! is no cached index, so cost grows with chain history.
//!
//! Ordering: events are sorted by confirmation position `(block,
//! log_index)`, kept only when owned by the requested identity, and
//! de-duplicated by fingerprint (first confirmation wins). The result is in
//! confirmation order for [`HistoryOrder::ScanOrder`] and reversed for
//! [`HistoryOrder::NewestFirst`].

use std::collections::HashSet;

use proofcreate_core::{ClaimEvent, ClaimSummary, Identity};
use proofcreate_ledger::{BlockTag, EventFilter};
use serde::{Deserialize, Serialize};
use tracing::{debug, info_span, Instrument};

use crate::config::ProofConfig;
use crate::error::{ProofError, Result};
use crate::session::{ReadFallback, Session};

/// Display order of a history listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryOrder {
    /// Most recently confirmed first.
    #[default]
    NewestFirst,
    /// Confirmation order.
    ScanOrder,
}

pub struct HistoryProjector {
    fallback: ReadFallback,
    order: HistoryOrder,
    display_len: usize,
}

impl HistoryProjector {
    pub fn new(fallback: ReadFallback, order: HistoryOrder, display_len: usize) -> Self {
        Self {
            fallback,
            order,
            display_len,
        }
    }

    pub fn from_config(config: &ProofConfig, fallback: ReadFallback) -> Self {
        Self::new(fallback, config.history_order, config.display_prefix_len)
    }

    /// All claims owned by `identity`. An empty list is a valid result.
    pub async fn project_history(
        &self,
        session: &Session,
        identity: &Identity,
    ) -> Result<Vec<ClaimSummary>> {
        let span = info_span!("project_history", owner = %identity.address().short());
        async {
            let client = self.fallback.read_client(session).await?;
            let events = client
                .scan_events(
                    &EventFilter::by_owner(identity.address()),
                    BlockTag::Genesis,
                    BlockTag::Latest,
                )
                .await?;
            let history = project(events, identity, self.order, self.display_len);
            debug!(claims = history.len(), "history projected");
            Ok::<_, ProofError>(history)
        }
        .instrument(span)
        .await
    }
}

/// Project raw events into display summaries.
///
/// Applies the owner filter itself, so a ledger that ignores the indexed
/// filter still yields only `identity`'s claims.
pub fn project(
    mut events: Vec<ClaimEvent>,
    identity: &Identity,
    order: HistoryOrder,
    display_len: usize,
) -> Vec<ClaimSummary> {
    events.sort_by_key(ClaimEvent::position);

    let owner = identity.address();
    let mut seen = HashSet::new();
    let mut summaries: Vec<ClaimSummary> = events
        .iter()
        .filter(|e| e.owner == owner)
        .filter(|e| seen.insert(e.fingerprint))
        .map(|e| ClaimSummary::from_event(e, display_len))
        .collect();

    if order == HistoryOrder::NewestFirst {
        summaries.reverse();
    }
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use proofcreate_core::{Address, Fingerprint, TxHash};

    fn event(owner: u8, fp: u8, block: u64) -> ClaimEvent {
        ClaimEvent {
            fingerprint: Fingerprint::from_bytes([fp; 32]),
            owner: Address::from_bytes([owner; 20]),
            timestamp: 1_000 + block,
            block,
            log_index: 0,
            tx_hash: TxHash::hash(&[fp]),
        }
    }

    fn me() -> Identity {
        Identity::new(Address::from_bytes([1; 20]))
    }

    #[test]
    fn test_empty_history() {
        assert!(project(Vec::new(), &me(), HistoryOrder::NewestFirst, 20).is_empty());
    }

    #[test]
    fn test_filters_interleaved_owners() {
        let events = vec![event(1, 10, 1), event(2, 11, 2), event(1, 12, 3), event(3, 13, 4)];
        let history = project(events, &me(), HistoryOrder::ScanOrder, 20);

        let blocks: Vec<u64> = history.iter().map(|s| s.block).collect();
        assert_eq!(blocks, vec![1, 3]);
        assert!(history.iter().all(|s| s.owner == me().address()));
    }

    #[test]
    fn test_newest_first_reverses_confirmation_order() {
        // Delivered out of order by the ledger.
        let events = vec![event(1, 12, 3), event(1, 10, 1), event(1, 11, 2)];
        let history = project(events, &me(), HistoryOrder::NewestFirst, 20);
        let blocks: Vec<u64> = history.iter().map(|s| s.block).collect();
        assert_eq!(blocks, vec![3, 2, 1]);
    }

    #[test]
    fn test_duplicate_fingerprint_keeps_first() {
        let events = vec![event(1, 10, 5), event(1, 10, 2)];
        let history = project(events, &me(), HistoryOrder::ScanOrder, 20);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].block, 2);
    }

    #[test]
    fn test_display_form_truncated() {
        let history = project(vec![event(1, 0xcd, 1)], &me(), HistoryOrder::ScanOrder, 20);
        assert_eq!(history[0].display, "0xcdcdcdcdcdcdcdcdcd...");
        assert_eq!(history[0].fingerprint.to_hex().len(), 66);
    }
}
