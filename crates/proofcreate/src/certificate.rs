//! Certificates: the display-ready record of one claim.

use proofcreate_core::{Address, Claim, Fingerprint};
use serde::{Deserialize, Serialize};
use tracing::{debug, info_span, Instrument};

use crate::error::{ProofError, Result};
use crate::session::{ReadFallback, Session};

/// Proof that `owner` claimed `fingerprint` at `timestamp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub fingerprint: Fingerprint,
    pub owner: Address,
    /// `0x1234...abcd` form of the owner.
    pub owner_short: String,
    /// Ledger time of the claim, seconds since epoch.
    pub timestamp: u64,
}

impl Certificate {
    pub fn from_claim(claim: &Claim) -> Self {
        Self {
            fingerprint: claim.fingerprint,
            owner: claim.owner,
            owner_short: claim.owner.short(),
            timestamp: claim.timestamp,
        }
    }

    pub fn claim(&self) -> Claim {
        Claim {
            fingerprint: self.fingerprint,
            owner: self.owner,
            timestamp: self.timestamp,
        }
    }
}

/// Resolves certificates straight from the ledger.
///
/// The same fingerprint resolves to the same certificate whether it came
/// from a fresh registration or a history entry.
pub struct CertificateResolver {
    fallback: ReadFallback,
}

impl CertificateResolver {
    pub fn new(fallback: ReadFallback) -> Self {
        Self { fallback }
    }

    pub async fn resolve(
        &self,
        session: &Session,
        fingerprint: &Fingerprint,
    ) -> Result<Certificate> {
        let span = info_span!("resolve_certificate", fingerprint = %fingerprint);
        async {
            let client = self.fallback.read_client(session).await?;
            let claim = client
                .lookup(fingerprint)
                .await?
                .ok_or(ProofError::NotFound(*fingerprint))?;
            debug!(owner = %claim.owner, "certificate resolved");
            Ok::<_, ProofError>(Certificate::from_claim(&claim))
        }
        .instrument(span)
        .await
    }
}
