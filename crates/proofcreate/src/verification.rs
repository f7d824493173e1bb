//! Verification: is a fingerprint claimed? Read-only, identity optional.

use proofcreate_core::Fingerprint;
use tracing::{debug, info_span, warn, Instrument};

use crate::error::{ProofError, Result};
use crate::outcome::WorkflowResult;
use crate::session::{ReadFallback, Session};

pub struct VerificationWorkflow {
    fallback: ReadFallback,
}

impl VerificationWorkflow {
    pub fn new(fallback: ReadFallback) -> Self {
        Self { fallback }
    }

    /// Look up `fingerprint`. Never writes.
    ///
    /// Uses the session's connection when it has one, the read fallback
    /// otherwise. Returns `Success` or `NotClaimed`, or `TransportError` if
    /// the ledger cannot be reached.
    pub async fn verify(
        &self,
        session: &Session,
        fingerprint: &Fingerprint,
    ) -> Result<WorkflowResult> {
        let span = info_span!("verify", fingerprint = %fingerprint);
        async {
            let client = match self.fallback.read_client(session).await {
                Ok(client) => client,
                Err(ProofError::Ledger(e)) => {
                    warn!(error = %e, "could not open read connection");
                    return Ok(WorkflowResult::TransportError(e.to_string()));
                }
                Err(e) => return Err(e),
            };

            let result = match client.lookup(fingerprint).await {
                Ok(Some(claim)) => WorkflowResult::Success(claim),
                Ok(None) => WorkflowResult::NotClaimed,
                Err(e) => {
                    warn!(error = %e, "lookup failed");
                    WorkflowResult::TransportError(e.to_string())
                }
            };
            debug!(claimed = result.claim().is_some(), "verified");
            Ok(result)
        }
        .instrument(span)
        .await
    }

    /// Number of claims recorded on the ledger. Informational only.
    pub async fn total_claims(&self, session: &Session) -> Result<u64> {
        let client = self.fallback.read_client(session).await?;
        Ok(client.total_claims().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use proofcreate_core::{Identity, Keypair};
    use proofcreate_ledger::{
        Connector, LedgerClient, LocalConnector, LocalLedgerConfig, MemoryChainStore,
    };

    #[tokio::test]
    async fn test_verify_anonymous_through_fallback() {
        let connector = Arc::new(LocalConnector::new(
            Arc::new(MemoryChainStore::new()),
            LocalLedgerConfig::default(),
        ));
        let address = connector
            .add_signer(Arc::new(Keypair::from_seed(&[1; 32])))
            .unwrap();
        let writer = connector.connect(&Identity::new(address)).await.unwrap();
        let fp = Fingerprint::from_bytes([9; 32]);
        let pending = writer.submit_claim(&fp).await.unwrap();
        writer.await_confirmation(&pending).await.unwrap();

        let workflow = VerificationWorkflow::new(ReadFallback::connector(connector));
        let session = Session::anonymous();

        let result = workflow.verify(&session, &fp).await.unwrap();
        assert_eq!(result.claim().map(|c| c.owner), Some(address));
        assert!(result.is_success());

        let missing = workflow
            .verify(&session, &Fingerprint::from_bytes([8; 32]))
            .await
            .unwrap();
        assert_eq!(missing, WorkflowResult::NotClaimed);

        assert_eq!(workflow.total_claims(&session).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_verify_without_connection_or_fallback() {
        let workflow = VerificationWorkflow::new(ReadFallback::Disabled);
        let err = workflow
            .verify(&Session::anonymous(), &Fingerprint::from_bytes([1; 32]))
            .await
            .unwrap_err();
        assert!(matches!(err, ProofError::NotConnected));
    }
}
