//! Test fixtures for common scenarios.

use std::sync::Arc;
use std::time::Duration;

use proofcreate::{ProofConfig, ProofCreate, Session};
use proofcreate_core::{Claim, Fingerprint, Identity, Keypair};
use proofcreate_ledger::{
    Clock, Confirmation, Connector, LocalConnector, LocalLedgerConfig, MemoryChainStore,
};

/// First timestamp handed out by fixture ledgers.
pub const GENESIS_TIME: u64 = 1_700_000_000;

/// A local ledger shared by every party in a test.
///
/// Timestamps come from a stepping clock starting at [`GENESIS_TIME`], so
/// claims made in sequence get strictly increasing times.
pub struct LedgerFixture {
    pub chain: Arc<MemoryChainStore>,
    pub connector: Arc<LocalConnector<MemoryChainStore>>,
    pub config: ProofConfig,
}

impl LedgerFixture {
    /// Fixture with instant confirmation.
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    /// Fixture whose transactions confirm after `delay`.
    pub fn with_delay(delay: Duration) -> Self {
        let chain = Arc::new(MemoryChainStore::new());
        let ledger = LocalLedgerConfig::default()
            .with_delay(delay)
            .with_clock(Clock::stepping(GENESIS_TIME, 1));
        let connector = Arc::new(LocalConnector::new(Arc::clone(&chain), ledger));
        Self {
            chain,
            connector,
            config: ProofConfig::default(),
        }
    }

    /// Replace the workflow configuration used by [`LedgerFixture::app`].
    pub fn with_config(mut self, config: ProofConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a deterministic party and return its identity.
    pub fn party(&self, seed: u8) -> Identity {
        let keypair = Arc::new(Keypair::from_seed(&[seed; 32]));
        let address = self
            .connector
            .add_signer(keypair)
            .expect("signer registry available");
        Identity::new(address)
    }

    /// An authenticated session already connected for `identity`.
    pub async fn session(&self, identity: Identity) -> Session {
        let mut session = Session::authenticated(identity);
        session
            .connect(self.connector.as_ref())
            .await
            .expect("party was registered with this fixture");
        session
    }

    /// A session with no identity and no connection.
    pub fn anonymous(&self) -> Session {
        Session::anonymous()
    }

    /// The workflow facade over this fixture's ledger.
    pub fn app(&self) -> ProofCreate {
        let connector: Arc<dyn Connector> = self.connector.clone();
        ProofCreate::new(&self.config, connector)
    }

    /// Claim `fingerprint` for `identity` directly on the ledger, bypassing
    /// the workflows.
    pub async fn claim(&self, identity: Identity, fingerprint: &Fingerprint) -> Claim {
        let client = self
            .connector
            .connect(&identity)
            .await
            .expect("party was registered with this fixture");
        let pending = client.submit_claim(fingerprint).await.expect("submit");
        match client.await_confirmation(&pending).await.expect("confirm") {
            Confirmation::Confirmed(claim) => claim,
            Confirmation::Reverted(reason) => panic!("claim reverted: {}", reason),
        }
    }
}

impl Default for LedgerFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A fixture with `n` registered parties, seeded `1..=n`.
pub fn multi_party_fixture(n: usize) -> (LedgerFixture, Vec<Identity>) {
    let fixture = LedgerFixture::new();
    let parties = (1..=n)
        .map(|i| fixture.party(u8::try_from(i).expect("at most 255 parties")))
        .collect();
    (fixture, parties)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parties_are_distinct() {
        let (_fixture, parties) = multi_party_fixture(4);
        for (i, a) in parties.iter().enumerate() {
            for b in &parties[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[tokio::test]
    async fn test_direct_claims_step_the_clock() {
        let (fixture, parties) = multi_party_fixture(2);
        let first = fixture
            .claim(parties[0], &Fingerprint::from_bytes([1; 32]))
            .await;
        let second = fixture
            .claim(parties[1], &Fingerprint::from_bytes([2; 32]))
            .await;

        assert_eq!(first.timestamp, GENESIS_TIME);
        assert_eq!(second.timestamp, GENESIS_TIME + 1);
        assert_eq!(second.owner, parties[1].address());
    }

    #[tokio::test]
    async fn test_session_is_connected_for_party() {
        let fixture = LedgerFixture::new();
        let alice = fixture.party(7);
        let session = fixture.session(alice).await;
        assert!(session.is_connected());
        assert_eq!(session.identity(), Some(alice));
        assert!(!fixture.anonymous().is_connected());
    }
}
