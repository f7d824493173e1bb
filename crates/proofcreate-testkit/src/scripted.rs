//! A scripted ledger client.
//!
//! [`ScriptedLedger`] behaves like an honest single-node ledger unless the
//! test tells it otherwise: fail the next call of some kind, lose the next
//! confirmation race to a rival, revert the next transaction, or switch the
//! signing account underneath the session. Every call is logged so tests
//! can assert on what a workflow did, not only on what it returned.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use proofcreate_core::{
    Address, Claim, ClaimEvent, Fingerprint, PendingTransaction, RejectReason, TxHash,
};
use proofcreate_ledger::{
    BlockTag, Confirmation, EventFilter, LedgerClient, LedgerError, Result,
};

use crate::fixtures::GENESIS_TIME;

/// Kind of ledger call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerOp {
    Lookup,
    ScanEvents,
    SubmitClaim,
    AwaitConfirmation,
    TotalClaims,
}

/// A logged ledger call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    Lookup(Fingerprint),
    ScanEvents(EventFilter),
    SubmitClaim(Fingerprint),
    AwaitConfirmation(TxHash),
    TotalClaims,
}

impl LedgerCall {
    pub fn op(&self) -> LedgerOp {
        match self {
            LedgerCall::Lookup(_) => LedgerOp::Lookup,
            LedgerCall::ScanEvents(_) => LedgerOp::ScanEvents,
            LedgerCall::SubmitClaim(_) => LedgerOp::SubmitClaim,
            LedgerCall::AwaitConfirmation(_) => LedgerOp::AwaitConfirmation,
            LedgerCall::TotalClaims => LedgerOp::TotalClaims,
        }
    }

    /// Whether the call asks the ledger to change state.
    pub fn is_write(&self) -> bool {
        matches!(self, LedgerCall::SubmitClaim(_))
    }
}

/// A scripted failure for one call.
#[derive(Debug, Clone)]
pub enum Failure {
    /// The ledger could not be reached.
    Transport(String),
    /// The ledger or the key holder refused.
    Rejected(RejectReason),
}

impl Failure {
    fn into_error(self) -> LedgerError {
        match self {
            Failure::Transport(message) => LedgerError::Transport(message),
            Failure::Rejected(reason) => LedgerError::Rejected(reason),
        }
    }
}

struct State {
    signer: Option<Address>,
    claims: HashMap<Fingerprint, Claim>,
    events: Vec<ClaimEvent>,
    failures: HashMap<LedgerOp, VecDeque<Option<Failure>>>,
    rival: Option<Address>,
    revert: Option<RejectReason>,
    calls: Vec<LedgerCall>,
    clock: u64,
    nonce: u64,
}

impl State {
    fn enter(&mut self, call: LedgerCall) -> Result<()> {
        let op = call.op();
        self.calls.push(call);
        match self.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(Some(failure)) => Err(failure.into_error()),
            _ => Ok(()),
        }
    }

    fn head(&self) -> u64 {
        self.events.iter().map(|e| e.block).max().unwrap_or(0)
    }

    fn commit(&mut self, fingerprint: Fingerprint, owner: Address, tx_hash: TxHash) -> Claim {
        let claim = Claim {
            fingerprint,
            owner,
            timestamp: self.clock,
        };
        self.clock += 1;
        let block = self.head() + 1;
        self.events.push(ClaimEvent {
            fingerprint,
            owner,
            timestamp: claim.timestamp,
            block,
            log_index: 0,
            tx_hash,
        });
        self.claims.insert(fingerprint, claim);
        claim
    }
}

/// A call-recording [`LedgerClient`] with scriptable failures.
pub struct ScriptedLedger {
    state: Mutex<State>,
}

impl ScriptedLedger {
    /// An empty ledger connection signing for `signer`.
    pub fn new(signer: Option<Address>) -> Self {
        Self {
            state: Mutex::new(State {
                signer,
                claims: HashMap::new(),
                events: Vec::new(),
                failures: HashMap::new(),
                rival: None,
                revert: None,
                calls: Vec::new(),
                clock: GENESIS_TIME,
                nonce: 0,
            }),
        }
    }

    /// An empty read-only connection.
    pub fn read_only() -> Self {
        Self::new(None)
    }

    /// Seed an existing claim.
    pub fn with_claim(self, fingerprint: Fingerprint, owner: Address) -> Self {
        {
            let mut state = self.lock();
            let tx_hash = TxHash::hash(fingerprint.as_bytes());
            state.commit(fingerprint, owner, tx_hash);
        }
        self
    }

    /// Append a raw event to the log, as the ledger reported it.
    ///
    /// The first event for a fingerprint also becomes its claim.
    pub fn record_event(&self, event: ClaimEvent) {
        let mut state = self.lock();
        state.claims.entry(event.fingerprint).or_insert_with(|| event.claim());
        state.events.push(event);
    }

    /// Fail the next call of kind `op`. Failures queue per kind.
    pub fn fail_next(&self, op: LedgerOp, failure: Failure) {
        self.script(op, Some(failure));
    }

    /// Let the next call of kind `op` through, so a failure queued after it
    /// hits a later call.
    pub fn pass_next(&self, op: LedgerOp) {
        self.script(op, None);
    }

    fn script(&self, op: LedgerOp, step: Option<Failure>) {
        self.lock().failures.entry(op).or_default().push_back(step);
    }

    /// Let `rival` claim the fingerprint just before the next confirmation,
    /// which then reverts as a duplicate.
    pub fn lose_next_race(&self, rival: Address) {
        self.lock().rival = Some(rival);
    }

    /// Revert the next confirmation with `reason`, without changing state.
    pub fn revert_next(&self, reason: RejectReason) {
        self.lock().revert = Some(reason);
    }

    /// Switch the account this connection signs for.
    pub fn set_signer(&self, signer: Option<Address>) {
        self.lock().signer = signer;
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<LedgerCall> {
        self.lock().calls.clone()
    }

    /// Number of calls of kind `op`.
    pub fn count(&self, op: LedgerOp) -> usize {
        self.lock().calls.iter().filter(|c| c.op() == op).count()
    }

    /// Whether any call asked for a state change.
    pub fn has_writes(&self) -> bool {
        self.lock().calls.iter().any(LedgerCall::is_write)
    }

    /// Current claim for `fingerprint`, read without logging a call.
    pub fn claim(&self, fingerprint: &Fingerprint) -> Option<Claim> {
        self.lock().claims.get(fingerprint).copied()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl LedgerClient for ScriptedLedger {
    async fn lookup(&self, fingerprint: &Fingerprint) -> Result<Option<Claim>> {
        let mut state = self.lock();
        state.enter(LedgerCall::Lookup(*fingerprint))?;
        Ok(state.claims.get(fingerprint).copied())
    }

    async fn scan_events(
        &self,
        filter: &EventFilter,
        from: BlockTag,
        to: BlockTag,
    ) -> Result<Vec<ClaimEvent>> {
        let mut state = self.lock();
        state.enter(LedgerCall::ScanEvents(*filter))?;
        let head = state.head();
        let (from, to) = (from.resolve(head), to.resolve(head));
        Ok(state
            .events
            .iter()
            .filter(|e| e.block >= from && e.block <= to && filter.matches(e))
            .copied()
            .collect())
    }

    async fn submit_claim(&self, fingerprint: &Fingerprint) -> Result<PendingTransaction> {
        let mut state = self.lock();
        state.enter(LedgerCall::SubmitClaim(*fingerprint))?;
        let sender = state
            .signer
            .ok_or_else(|| LedgerError::NoSigner("read-only connection".to_string()))?;

        state.nonce += 1;
        let mut preimage = fingerprint.as_bytes().to_vec();
        preimage.extend_from_slice(&state.nonce.to_le_bytes());
        Ok(PendingTransaction {
            hash: TxHash::hash(&preimage),
            fingerprint: *fingerprint,
            sender,
        })
    }

    async fn await_confirmation(&self, pending: &PendingTransaction) -> Result<Confirmation> {
        let mut state = self.lock();
        state.enter(LedgerCall::AwaitConfirmation(pending.hash))?;

        if let Some(rival) = state.rival.take() {
            if !state.claims.contains_key(&pending.fingerprint) {
                let rival_tx = TxHash::hash(rival.as_bytes());
                state.commit(pending.fingerprint, rival, rival_tx);
            }
        }
        if let Some(reason) = state.revert.take() {
            return Ok(Confirmation::Reverted(reason));
        }
        if state.claims.contains_key(&pending.fingerprint) {
            return Ok(Confirmation::Reverted(RejectReason::already_claimed(
                &pending.fingerprint,
            )));
        }
        let claim = state.commit(pending.fingerprint, pending.sender, pending.hash);
        Ok(Confirmation::Confirmed(claim))
    }

    async fn total_claims(&self) -> Result<u64> {
        let mut state = self.lock();
        state.enter(LedgerCall::TotalClaims)?;
        Ok(state.claims.len() as u64)
    }

    fn signer(&self) -> Option<Address> {
        self.lock().signer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Address {
        Address::from_bytes([0xa1; 20])
    }

    fn bob() -> Address {
        Address::from_bytes([0xb0; 20])
    }

    fn fp(byte: u8) -> Fingerprint {
        Fingerprint::from_bytes([byte; 32])
    }

    #[tokio::test]
    async fn test_honest_submit_and_confirm() {
        let ledger = ScriptedLedger::new(Some(alice()));
        let pending = ledger.submit_claim(&fp(1)).await.unwrap();
        assert_eq!(pending.sender, alice());

        let confirmation = ledger.await_confirmation(&pending).await.unwrap();
        let claim = match confirmation {
            Confirmation::Confirmed(claim) => claim,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(claim.owner, alice());
        assert_eq!(claim.timestamp, GENESIS_TIME);
        assert_eq!(ledger.lookup(&fp(1)).await.unwrap(), Some(claim));
        assert_eq!(
            ledger.calls(),
            vec![
                LedgerCall::SubmitClaim(fp(1)),
                LedgerCall::AwaitConfirmation(pending.hash),
                LedgerCall::Lookup(fp(1)),
            ]
        );
    }

    #[tokio::test]
    async fn test_scripted_failures_queue_per_op() {
        let ledger = ScriptedLedger::new(Some(alice()));
        ledger.fail_next(LedgerOp::Lookup, Failure::Transport("down".into()));
        ledger.fail_next(
            LedgerOp::SubmitClaim,
            Failure::Rejected(RejectReason::declined("no")),
        );

        assert!(matches!(
            ledger.lookup(&fp(1)).await,
            Err(LedgerError::Transport(_))
        ));
        assert!(ledger.lookup(&fp(1)).await.unwrap().is_none());

        let err = ledger.submit_claim(&fp(1)).await.unwrap_err();
        assert!(err.is_rejection());
        assert!(ledger.submit_claim(&fp(1)).await.is_ok());
        assert_eq!(ledger.count(LedgerOp::SubmitClaim), 2);

        ledger.pass_next(LedgerOp::TotalClaims);
        ledger.fail_next(LedgerOp::TotalClaims, Failure::Transport("down".into()));
        assert!(ledger.total_claims().await.is_ok());
        assert!(ledger.total_claims().await.is_err());
    }

    #[tokio::test]
    async fn test_lost_race_reverts_and_records_rival() {
        let ledger = ScriptedLedger::new(Some(alice()));
        let pending = ledger.submit_claim(&fp(2)).await.unwrap();
        ledger.lose_next_race(bob());

        let confirmation = ledger.await_confirmation(&pending).await.unwrap();
        match confirmation {
            Confirmation::Reverted(reason) => assert!(reason.is_duplicate()),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(ledger.claim(&fp(2)).map(|c| c.owner), Some(bob()));
    }

    #[tokio::test]
    async fn test_read_only_refuses_submit() {
        let ledger = ScriptedLedger::read_only();
        assert!(matches!(
            ledger.submit_claim(&fp(3)).await,
            Err(LedgerError::NoSigner(_))
        ));
        assert!(ledger.signer().is_none());
        ledger.set_signer(Some(bob()));
        assert_eq!(ledger.signer(), Some(bob()));
    }

    #[tokio::test]
    async fn test_scan_respects_filter_and_bounds() {
        let ledger = ScriptedLedger::new(None)
            .with_claim(fp(1), alice())
            .with_claim(fp(2), bob())
            .with_claim(fp(3), alice());

        let mine = ledger
            .scan_events(&EventFilter::by_owner(alice()), BlockTag::Genesis, BlockTag::Latest)
            .await
            .unwrap();
        assert_eq!(
            mine.iter().map(|e| e.fingerprint).collect::<Vec<_>>(),
            vec![fp(1), fp(3)]
        );

        let early = ledger
            .scan_events(&EventFilter::all(), BlockTag::Genesis, BlockTag::Number(2))
            .await
            .unwrap();
        assert_eq!(early.len(), 2);
        assert!(!ledger.has_writes());
    }
}
