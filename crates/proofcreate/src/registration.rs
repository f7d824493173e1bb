//! Registration: claim ownership of a fingerprint.
//!
//! Order within one invocation:
//!
//! 1. `lookup`: an existing claim ends the workflow as `AlreadyClaimed`
//!    with no write attempted.
//! 2. `submit_claim`: at most one write, never retried.
//! 3. `await_confirmation`: may take arbitrarily long; progress is
//!    published on a watch channel.
//!
//! The channel carries the latest stage change of any invocation, tagged
//! with its fingerprint. With several fingerprints in flight, use
//! [`RegistrationWorkflow::is_busy`] for the state of a particular one.
//! Every invocation that got past the busy check ends with `Finished`,
//! including one whose future was dropped.
//!
//! A duplicate revert (another claim confirmed between 1 and 2) is
//! reported as `AlreadyClaimed` with the winning claim. Other refusals are
//! `Rejected`; anything that leaves the outcome unknown is `TransportError`.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use proofcreate_core::{Fingerprint, PendingTransaction, RejectReason};
use proofcreate_ledger::{Confirmation, LedgerClient, LedgerError};
use tokio::sync::watch;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::ProofConfig;
use crate::error::{ProofError, Result};
use crate::outcome::WorkflowResult;
use crate::session::Session;

/// Latest registration progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStage {
    Idle,
    CheckingExisting(Fingerprint),
    AwaitingSignature(Fingerprint),
    AwaitingConfirmation(PendingTransaction),
    Finished(Fingerprint),
}

impl RegistrationStage {
    /// Whether a write may be outstanding.
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            RegistrationStage::AwaitingSignature(_) | RegistrationStage::AwaitingConfirmation(_)
        )
    }
}

pub struct RegistrationWorkflow {
    confirmation_timeout: Option<Duration>,
    in_flight: Arc<Mutex<HashSet<Fingerprint>>>,
    stage: Arc<watch::Sender<RegistrationStage>>,
}

impl RegistrationWorkflow {
    /// A workflow that waits for confirmation for at most `confirmation_timeout`.
    pub fn new(confirmation_timeout: Option<Duration>) -> Self {
        let (stage, _) = watch::channel(RegistrationStage::Idle);
        Self {
            confirmation_timeout,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            stage: Arc::new(stage),
        }
    }

    pub fn from_config(config: &ProofConfig) -> Self {
        Self::new(config.confirmation_timeout())
    }

    /// Observe registration progress.
    pub fn subscribe(&self) -> watch::Receiver<RegistrationStage> {
        self.stage.subscribe()
    }

    /// Whether a registration for `fingerprint` is in flight.
    pub fn is_busy(&self, fingerprint: &Fingerprint) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(fingerprint)
    }

    /// Claim `fingerprint` for the session's identity.
    ///
    /// Fails with a [`ProofError`] only when the preconditions do not hold:
    /// no identity, no usable connection, or the same fingerprint already in
    /// flight. Every ledger outcome is a [`WorkflowResult`].
    pub async fn register(
        &self,
        session: &Session,
        fingerprint: &Fingerprint,
    ) -> Result<WorkflowResult> {
        let client = session.signing_client()?;
        let _guard = InFlight::acquire(&self.in_flight, &self.stage, *fingerprint)?;

        let span = info_span!(
            "register",
            fingerprint = %fingerprint,
            owner = ?client.signer().map(|a| a.short())
        );
        let result = self.run(client.as_ref(), fingerprint).instrument(span).await;
        Ok(result)
    }

    async fn run(&self, client: &dyn LedgerClient, fingerprint: &Fingerprint) -> WorkflowResult {
        self.stage
            .send_replace(RegistrationStage::CheckingExisting(*fingerprint));
        match client.lookup(fingerprint).await {
            Ok(Some(existing)) => {
                info!(owner = %existing.owner, "already claimed, nothing submitted");
                return WorkflowResult::AlreadyClaimed(existing);
            }
            Ok(None) => {}
            Err(e) => return transport(e),
        }

        self.stage
            .send_replace(RegistrationStage::AwaitingSignature(*fingerprint));
        let pending = match client.submit_claim(fingerprint).await {
            Ok(pending) => pending,
            Err(LedgerError::Rejected(reason)) => {
                return self.classify_rejection(client, fingerprint, reason).await;
            }
            Err(e) => return transport(e),
        };

        debug!(tx = %pending.hash, "awaiting confirmation");
        self.stage
            .send_replace(RegistrationStage::AwaitingConfirmation(pending));

        let confirmation = match self.confirmation_timeout {
            Some(limit) => {
                match tokio::time::timeout(limit, client.await_confirmation(&pending)).await {
                    Ok(confirmation) => confirmation,
                    Err(_) => {
                        warn!(tx = %pending.hash, ?limit, "stopped waiting for confirmation");
                        return WorkflowResult::TransportError(format!(
                            "transaction {} not confirmed within {}s; it may still confirm",
                            pending.hash,
                            limit.as_secs()
                        ));
                    }
                }
            }
            None => client.await_confirmation(&pending).await,
        };

        match confirmation {
            Ok(Confirmation::Confirmed(claim)) => {
                info!(timestamp = claim.timestamp, "claim confirmed");
                WorkflowResult::Success(claim)
            }
            Ok(Confirmation::Reverted(reason)) | Err(LedgerError::Rejected(reason)) => {
                self.classify_rejection(client, fingerprint, reason).await
            }
            Err(e) => transport(e),
        }
    }

    /// Map a refusal to an outcome using its structured code.
    async fn classify_rejection(
        &self,
        client: &dyn LedgerClient,
        fingerprint: &Fingerprint,
        reason: RejectReason,
    ) -> WorkflowResult {
        if reason.is_duplicate() {
            // Lost a race; report the claim that won.
            match client.lookup(fingerprint).await {
                Ok(Some(existing)) => {
                    info!(owner = %existing.owner, "claimed concurrently by another submission");
                    return WorkflowResult::AlreadyClaimed(existing);
                }
                Ok(None) => debug!("duplicate revert but no claim visible"),
                Err(e) => warn!(error = %e, "could not read the competing claim"),
            }
        }
        info!(code = ?reason.code, message = %reason.message, "claim rejected");
        WorkflowResult::Rejected(reason)
    }
}

impl Default for RegistrationWorkflow {
    fn default() -> Self {
        Self::new(None)
    }
}

fn transport(error: LedgerError) -> WorkflowResult {
    warn!(%error, "ledger unreachable");
    WorkflowResult::TransportError(error.to_string())
}

/// Marks a fingerprint in flight until dropped, then publishes `Finished`.
struct InFlight {
    set: Arc<Mutex<HashSet<Fingerprint>>>,
    stage: Arc<watch::Sender<RegistrationStage>>,
    fingerprint: Fingerprint,
}

impl InFlight {
    fn acquire(
        set: &Arc<Mutex<HashSet<Fingerprint>>>,
        stage: &Arc<watch::Sender<RegistrationStage>>,
        fingerprint: Fingerprint,
    ) -> Result<Self> {
        let inserted = set
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(fingerprint);
        if !inserted {
            return Err(ProofError::Busy(fingerprint));
        }
        Ok(Self {
            set: Arc::clone(set),
            stage: Arc::clone(stage),
            fingerprint,
        })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.fingerprint);
        self.stage
            .send_replace(RegistrationStage::Finished(self.fingerprint));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proofcreate_core::{Identity, Keypair, RejectCode};
    use proofcreate_ledger::{
        ChainStore, Clock, LocalConnector, LocalLedgerConfig, MemoryChainStore,
    };

    fn fp(b: u8) -> Fingerprint {
        Fingerprint::from_bytes([b; 32])
    }

    async fn connected(connector: &LocalConnector<MemoryChainStore>, seed: u8) -> Session {
        let address = connector
            .add_signer(Arc::new(Keypair::from_seed(&[seed; 32])))
            .unwrap();
        let mut session = Session::authenticated(Identity::new(address));
        session.connect(connector).await.unwrap();
        session
    }

    fn local(delay: Duration) -> LocalConnector<MemoryChainStore> {
        LocalConnector::new(
            Arc::new(MemoryChainStore::new()),
            LocalLedgerConfig::default()
                .with_delay(delay)
                .with_clock(Clock::stepping(1_000, 1)),
        )
    }

    #[tokio::test]
    async fn test_register_then_duplicate() {
        let connector = local(Duration::ZERO);
        let session = connected(&connector, 1).await;
        let workflow = RegistrationWorkflow::default();

        let first = workflow.register(&session, &fp(1)).await.unwrap();
        let claim = match first {
            WorkflowResult::Success(claim) => claim,
            other => panic!("expected success, got {:?}", other),
        };

        let second = workflow.register(&session, &fp(1)).await.unwrap();
        assert_eq!(second, WorkflowResult::AlreadyClaimed(claim));
        assert_eq!(*workflow.subscribe().borrow(), RegistrationStage::Finished(fp(1)));
        assert!(!workflow.is_busy(&fp(1)));
    }

    #[tokio::test]
    async fn test_register_requires_identity() {
        let connector = local(Duration::ZERO);
        let mut session = Session::anonymous();
        session.connect(&connector).await.unwrap();

        let err = RegistrationWorkflow::default()
            .register(&session, &fp(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ProofError::NotAuthenticated));
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_fingerprint_is_busy_while_pending() {
        let connector = local(Duration::from_secs(15));
        let session = connected(&connector, 1).await;
        let workflow = Arc::new(RegistrationWorkflow::default());
        let mut stages = workflow.subscribe();

        let task = {
            let workflow = Arc::clone(&workflow);
            tokio::spawn(async move { workflow.register(&session, &fp(2)).await })
        };

        stages
            .wait_for(|s| matches!(s, RegistrationStage::AwaitingConfirmation(_)))
            .await
            .unwrap();
        assert!(workflow.is_busy(&fp(2)));
        assert!(!workflow.is_busy(&fp(3)));

        let other = connected(&connector, 1).await;
        assert!(matches!(
            workflow.register(&other, &fp(2)).await,
            Err(ProofError::Busy(f)) if f == fp(2)
        ));

        let result = task.await.unwrap().unwrap();
        assert!(result.is_success());
        assert!(!workflow.is_busy(&fp(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmation_timeout_is_transport_error() {
        let connector = local(Duration::from_secs(60));
        let session = connected(&connector, 1).await;
        let workflow = RegistrationWorkflow::new(Some(Duration::from_secs(5)));

        let result = workflow.register(&session, &fp(4)).await.unwrap();
        assert!(matches!(result, WorkflowResult::TransportError(_)));
        assert!(!workflow.is_busy(&fp(4)));

        // The write lands after the caller stopped waiting.
        tokio::time::sleep(Duration::from_secs(3600)).await;
        let client = session.signing_client().unwrap();
        let claim = client.lookup(&fp(4)).await.unwrap().unwrap();
        assert_eq!(Some(claim.owner), client.signer());

        let retry = workflow.register(&session, &fp(4)).await.unwrap();
        assert_eq!(retry, WorkflowResult::AlreadyClaimed(claim));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_registration_publishes_finished() {
        let connector = local(Duration::from_secs(30));
        let session = connected(&connector, 1).await;
        let workflow = Arc::new(RegistrationWorkflow::default());
        let mut stages = workflow.subscribe();

        let task = {
            let workflow = Arc::clone(&workflow);
            tokio::spawn(async move { workflow.register(&session, &fp(6)).await })
        };
        stages
            .wait_for(|s| matches!(s, RegistrationStage::AwaitingConfirmation(_)))
            .await
            .unwrap();

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        assert_eq!(*stages.borrow(), RegistrationStage::Finished(fp(6)));
        assert!(!workflow.is_busy(&fp(6)));
    }

    #[tokio::test]
    async fn test_stale_session_rejected_before_any_call() {
        let connector = local(Duration::ZERO);
        let mut session = connected(&connector, 1).await;
        let other = Keypair::from_seed(&[2; 32]).address();
        session.set_identity(Some(Identity::new(other)));

        let err = RegistrationWorkflow::default()
            .register(&session, &fp(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ProofError::StaleSession(_)));
        assert_eq!(connector.store().claim_count().await.unwrap(), 0);
    }

    #[test]
    fn test_pending_stages() {
        assert!(RegistrationStage::AwaitingSignature(fp(1)).is_pending());
        assert!(!RegistrationStage::Finished(fp(1)).is_pending());
        assert!(!RegistrationStage::Idle.is_pending());
    }

    #[test]
    fn test_reject_code_drives_classification() {
        assert!(RejectReason::new(RejectCode::AlreadyClaimed, "taken").is_duplicate());
        assert!(!RejectReason::new(RejectCode::Unspecified, "already registered").is_duplicate());
    }
}
