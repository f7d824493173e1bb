//! Self-hosted ledger enforcing the claim contract over a [`ChainStore`].
//!
//! Writes go through the same two phases a remote ledger has: a signed
//! transaction is broadcast into the pending pool, and confirmation later
//! executes it against chain state. The duplicate check happens at
//! execution, so two parties racing on one fingerprint see exactly one
//! confirmation and one revert.
//!
//! Execution runs on its own task once the block time has passed, whether
//! or not anyone is waiting. A caller that stops waiting does not stop the
//! write.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use proofcreate_core::{
    Address, Claim, ClaimEvent, ClaimTransaction, Fingerprint, Identity, PendingTransaction,
    RejectCode, RejectReason, TransactionSigner, TxHash, UnsignedClaim,
};
use tokio::sync::watch;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::error::{LedgerError, Result};
use crate::traits::{
    BlockTag, ChainStore, CommitResult, Confirmation, Connector, EventFilter, LedgerClient,
};

/// Source of ledger timestamps.
#[derive(Debug)]
pub enum Clock {
    /// Wall-clock seconds since the Unix epoch.
    System,
    /// Deterministic clock that advances by `step` on every reading.
    Stepping { next: AtomicU64, step: u64 },
}

impl Clock {
    pub fn system() -> Self {
        Clock::System
    }

    pub fn stepping(start: u64, step: u64) -> Self {
        Clock::Stepping {
            next: AtomicU64::new(start),
            step,
        }
    }

    /// Current ledger time in seconds.
    pub fn now(&self) -> u64 {
        match self {
            Clock::System => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            Clock::Stepping { next, step } => next.fetch_add(*step, Ordering::SeqCst),
        }
    }
}

/// Tuning for a local ledger.
#[derive(Debug, Clone)]
pub struct LocalLedgerConfig {
    /// Simulated block time before a broadcast transaction executes.
    pub confirmation_delay: Duration,
    /// Timestamp source for new claims.
    pub clock: Arc<Clock>,
}

impl Default for LocalLedgerConfig {
    fn default() -> Self {
        Self {
            confirmation_delay: Duration::ZERO,
            clock: Arc::new(Clock::System),
        }
    }
}

impl LocalLedgerConfig {
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.confirmation_delay = delay;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }
}

/// Final state of a broadcast transaction. Store failures are carried as
/// text so every waiter can receive a copy.
type Outcome = std::result::Result<Confirmation, String>;

/// Outcomes of broadcast transactions, published by their execution tasks.
///
/// An entry lives until its outcome is delivered to a waiter.
#[derive(Default)]
struct Confirmations {
    slots: Mutex<HashMap<TxHash, watch::Receiver<Option<Outcome>>>>,
}

impl Confirmations {
    fn track(&self, hash: TxHash) -> watch::Sender<Option<Outcome>> {
        let (tx, rx) = watch::channel(None);
        self.slots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(hash, rx);
        tx
    }

    fn watcher(&self, hash: &TxHash) -> Option<watch::Receiver<Option<Outcome>>> {
        self.slots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(hash)
            .cloned()
    }

    fn forget(&self, hash: &TxHash) {
        self.slots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(hash);
    }
}

/// A ledger connection backed by a local chain store.
pub struct LocalLedger<S: ChainStore> {
    store: Arc<S>,
    signer: Option<Arc<dyn TransactionSigner>>,
    config: LocalLedgerConfig,
    confirmations: Arc<Confirmations>,
}

impl<S: ChainStore> LocalLedger<S> {
    /// A signing connection for `signer`.
    pub fn connect(
        store: Arc<S>,
        signer: Arc<dyn TransactionSigner>,
        config: LocalLedgerConfig,
    ) -> Self {
        Self {
            store,
            signer: Some(signer),
            config,
            confirmations: Arc::default(),
        }
    }

    /// A connection that can read but not submit.
    pub fn read_only(store: Arc<S>, config: LocalLedgerConfig) -> Self {
        Self {
            store,
            signer: None,
            config,
            confirmations: Arc::default(),
        }
    }

    fn sharing(mut self, confirmations: &Arc<Confirmations>) -> Self {
        self.confirmations = Arc::clone(confirmations);
        self
    }

    /// The underlying chain store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}

/// Take `hash` from the pending pool and run it against chain state.
async fn confirm<S: ChainStore>(store: &S, clock: &Clock, hash: &TxHash) -> Result<Confirmation> {
    let tx = store
        .take_pending(hash)
        .await?
        .ok_or(LedgerError::UnknownTransaction(*hash))?;
    execute(store, clock, &tx).await
}

async fn execute<S: ChainStore>(
    store: &S,
    clock: &Clock,
    tx: &ClaimTransaction,
) -> Result<Confirmation> {
    if let Err(e) = tx.verify() {
        warn!(tx = %tx.hash(), "pending transaction failed verification");
        return Ok(Confirmation::Reverted(RejectReason::new(
            RejectCode::InvalidSignature,
            e.to_string(),
        )));
    }

    let fingerprint = tx.claim.fingerprint;
    let owner = tx.sender_address();
    let timestamp = clock.now();

    match store
        .commit_claim(&tx.hash(), &fingerprint, &owner, timestamp)
        .await?
    {
        CommitResult::Committed(event) => {
            info!(
                fingerprint = %fingerprint,
                owner = %owner,
                block = event.block,
                "claim confirmed"
            );
            Ok(Confirmation::Confirmed(event.claim()))
        }
        CommitResult::AlreadyClaimed(existing) => {
            debug!(
                fingerprint = %fingerprint,
                owner = %existing.owner,
                "claim reverted, fingerprint already claimed"
            );
            Ok(Confirmation::Reverted(RejectReason::already_claimed(
                &fingerprint,
            )))
        }
    }
}

#[async_trait]
impl<S: ChainStore + 'static> LedgerClient for LocalLedger<S> {
    async fn lookup(&self, fingerprint: &Fingerprint) -> Result<Option<Claim>> {
        let record = self.store.claim_record(fingerprint).await?;
        Ok(record.into_claim(*fingerprint))
    }

    async fn scan_events(
        &self,
        filter: &EventFilter,
        from: BlockTag,
        to: BlockTag,
    ) -> Result<Vec<ClaimEvent>> {
        let head = self.store.head_block().await?;
        let (from, to) = (from.resolve(head), to.resolve(head));
        if from > to {
            return Ok(Vec::new());
        }
        self.store.events(filter, from, to).await
    }

    async fn submit_claim(&self, fingerprint: &Fingerprint) -> Result<PendingTransaction> {
        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| LedgerError::NoSigner("connection is read-only".into()))?;

        let claim = UnsignedClaim::new(*fingerprint, signer.public_key());
        let signature = signer.sign_claim(&claim).map_err(|e| {
            debug!(fingerprint = %fingerprint, error = %e, "signer declined claim");
            LedgerError::Rejected(RejectReason::declined(e.to_string()))
        })?;

        let tx = ClaimTransaction { claim, signature };
        if let Err(e) = tx.verify() {
            return Err(LedgerError::Rejected(RejectReason::new(
                RejectCode::InvalidSignature,
                e.to_string(),
            )));
        }

        let hash = self.store.insert_pending(&tx).await?;
        debug!(fingerprint = %fingerprint, tx = %hash, "claim broadcast");

        let outcome = self.confirmations.track(hash);
        let store = Arc::clone(&self.store);
        let clock = Arc::clone(&self.config.clock);
        let delay = self.config.confirmation_delay;
        tokio::spawn(
            async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let result = confirm(store.as_ref(), &clock, &hash).await.map_err(|e| {
                    warn!(error = %e, "transaction execution failed");
                    e.to_string()
                });
                outcome.send_replace(Some(result));
            }
            .instrument(info_span!("execute_claim", tx = %hash)),
        );

        Ok(PendingTransaction {
            hash,
            fingerprint: *fingerprint,
            sender: tx.sender_address(),
        })
    }

    async fn await_confirmation(&self, pending: &PendingTransaction) -> Result<Confirmation> {
        let Some(mut watcher) = self.confirmations.watcher(&pending.hash) else {
            // Broadcast elsewhere, e.g. before a restart: execute from the pool.
            return confirm(self.store.as_ref(), &self.config.clock, &pending.hash).await;
        };

        let outcome = watcher
            .wait_for(Option::is_some)
            .await
            .map_err(|_| {
                LedgerError::Transport(format!("execution of {} was abandoned", pending.hash))
            })?
            .clone();
        self.confirmations.forget(&pending.hash);

        match outcome {
            Some(Ok(confirmation)) => Ok(confirmation),
            Some(Err(message)) => Err(LedgerError::Transport(message)),
            None => Err(LedgerError::UnknownTransaction(pending.hash)),
        }
    }

    async fn total_claims(&self) -> Result<u64> {
        self.store.claim_count().await
    }

    fn signer(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.address())
    }
}

/// Connector handing out [`LocalLedger`] connections over one shared chain.
///
/// Signing connections are available only for identities whose signer has
/// been registered.
pub struct LocalConnector<S: ChainStore> {
    store: Arc<S>,
    config: LocalLedgerConfig,
    signers: RwLock<HashMap<Address, Arc<dyn TransactionSigner>>>,
    confirmations: Arc<Confirmations>,
}

impl<S: ChainStore> LocalConnector<S> {
    pub fn new(store: Arc<S>, config: LocalLedgerConfig) -> Self {
        Self {
            store,
            config,
            signers: RwLock::new(HashMap::new()),
            confirmations: Arc::default(),
        }
    }

    /// Register a signer; its address becomes connectable.
    pub fn add_signer(&self, signer: Arc<dyn TransactionSigner>) -> Result<Address> {
        let address = signer.address();
        self.signers
            .write()
            .map_err(|e| LedgerError::InvalidData(format!("signer registry poisoned: {}", e)))?
            .insert(address, signer);
        Ok(address)
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}

#[async_trait]
impl<S: ChainStore + 'static> Connector for LocalConnector<S> {
    async fn connect(&self, identity: &Identity) -> Result<Arc<dyn LedgerClient>> {
        let signer = self
            .signers
            .read()
            .map_err(|e| LedgerError::InvalidData(format!("signer registry poisoned: {}", e)))?
            .get(&identity.address())
            .cloned()
            .ok_or_else(|| {
                LedgerError::NoSigner(format!("no signer for {}", identity.address()))
            })?;

        Ok(Arc::new(
            LocalLedger::connect(Arc::clone(&self.store), signer, self.config.clone())
                .sharing(&self.confirmations),
        ))
    }

    async fn connect_read_only(&self) -> Result<Arc<dyn LedgerClient>> {
        Ok(Arc::new(
            LocalLedger::read_only(Arc::clone(&self.store), self.config.clone())
                .sharing(&self.confirmations),
        ))
    }
}
