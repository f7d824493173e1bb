//! Property-based test generators using proptest.

use proofcreate_core::{
    Address, ClaimEvent, Fingerprint, FingerprintEngine, Identity, Keypair, TxHash,
};
use proptest::prelude::*;

/// Generate a random fingerprint.
pub fn fingerprint() -> impl Strategy<Value = Fingerprint> {
    any::<[u8; 32]>().prop_map(Fingerprint::from_bytes)
}

/// Generate a random address.
pub fn address() -> impl Strategy<Value = Address> {
    any::<[u8; 20]>().prop_map(Address::from_bytes)
}

/// Generate a random identity.
pub fn identity() -> impl Strategy<Value = Identity> {
    address().prop_map(Identity::new)
}

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate file content up to `max_len` bytes.
pub fn content(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate two distinct contents of up to `max_len` bytes.
pub fn distinct_contents(max_len: usize) -> impl Strategy<Value = (Vec<u8>, Vec<u8>)> {
    (content(max_len), content(max_len)).prop_filter("contents must differ", |(a, b)| a != b)
}

/// Generate an event log with up to `max_owners` owners and `max_len`
/// events.
///
/// Every event claims a distinct fingerprint. Blocks are `1..=len` in claim
/// order, but the returned log is shuffled, as a scan over several sources
/// may return it.
pub fn event_log(
    max_owners: usize,
    max_len: usize,
) -> impl Strategy<Value = (Vec<Address>, Vec<ClaimEvent>)> {
    prop::collection::vec(address(), 1..=max_owners.max(1))
        .prop_flat_map(move |owners| {
            let n = owners.len();
            let picks = prop::collection::vec(0..n, 0..=max_len);
            (Just(owners), picks)
        })
        .prop_flat_map(|(owners, picks)| {
            let events: Vec<ClaimEvent> = picks
                .iter()
                .enumerate()
                .map(|(i, &owner)| {
                    let index = i as u64;
                    ClaimEvent {
                        fingerprint: FingerprintEngine::fingerprint(&index.to_le_bytes()),
                        owner: owners[owner],
                        timestamp: 1_700_000_000 + index,
                        block: index + 1,
                        log_index: 0,
                        tx_hash: TxHash::hash(&index.to_be_bytes()),
                    }
                })
                .collect();
            (Just(owners), Just(events).prop_shuffle())
        })
}
