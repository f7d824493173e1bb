//! The ProofCreate facade: all workflows over one connector.

use std::path::Path;
use std::sync::Arc;

use proofcreate_core::{ClaimSummary, Fingerprint, FingerprintEngine, Identity};
use proofcreate_ledger::Connector;
use tokio::sync::watch;

use crate::certificate::{Certificate, CertificateResolver};
use crate::config::ProofConfig;
use crate::error::Result;
use crate::history::HistoryProjector;
use crate::outcome::WorkflowResult;
use crate::registration::{RegistrationStage, RegistrationWorkflow};
use crate::session::Session;
use crate::verification::VerificationWorkflow;

/// Registration, verification, history, and certificates, wired from one
/// configuration and one ledger connector.
///
/// Holds no per-user state; each call takes the caller's [`Session`].
pub struct ProofCreate {
    connector: Arc<dyn Connector>,
    registration: RegistrationWorkflow,
    verification: VerificationWorkflow,
    history: HistoryProjector,
    certificates: CertificateResolver,
}

impl ProofCreate {
    pub fn new(config: &ProofConfig, connector: Arc<dyn Connector>) -> Self {
        let fallback = config.fallback_for(Arc::clone(&connector));
        Self {
            registration: RegistrationWorkflow::from_config(config),
            verification: VerificationWorkflow::new(fallback.clone()),
            history: HistoryProjector::from_config(config, fallback.clone()),
            certificates: CertificateResolver::new(fallback),
            connector,
        }
    }

    /// Fingerprint a file. Unreadable input is a [`ProofError::Input`](crate::ProofError).
    pub fn fingerprint_file(&self, path: impl AsRef<Path>) -> Result<Fingerprint> {
        Ok(FingerprintEngine::fingerprint_file(path)?)
    }

    /// (Re)open the session's connection for its current identity.
    pub async fn connect(&self, session: &mut Session) -> Result<()> {
        session.connect(self.connector.as_ref()).await
    }

    pub async fn register(
        &self,
        session: &Session,
        fingerprint: &Fingerprint,
    ) -> Result<WorkflowResult> {
        self.registration.register(session, fingerprint).await
    }

    pub fn is_busy(&self, fingerprint: &Fingerprint) -> bool {
        self.registration.is_busy(fingerprint)
    }

    pub fn subscribe(&self) -> watch::Receiver<RegistrationStage> {
        self.registration.subscribe()
    }

    pub async fn verify(
        &self,
        session: &Session,
        fingerprint: &Fingerprint,
    ) -> Result<WorkflowResult> {
        self.verification.verify(session, fingerprint).await
    }

    pub async fn total_claims(&self, session: &Session) -> Result<u64> {
        self.verification.total_claims(session).await
    }

    pub async fn history(
        &self,
        session: &Session,
        identity: &Identity,
    ) -> Result<Vec<ClaimSummary>> {
        self.history.project_history(session, identity).await
    }

    pub async fn certificate(
        &self,
        session: &Session,
        fingerprint: &Fingerprint,
    ) -> Result<Certificate> {
        self.certificates.resolve(session, fingerprint).await
    }
}
