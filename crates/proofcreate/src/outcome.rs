//! Workflow outcomes.

use std::fmt;

use proofcreate_core::{Claim, RejectReason};
use serde::{Deserialize, Serialize};

/// The single outcome of a registration or verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum WorkflowResult {
    /// Registration confirmed, or verification found a claim.
    Success(Claim),
    /// The fingerprint was claimed before this registration.
    AlreadyClaimed(Claim),
    /// Verification found no claim.
    NotClaimed,
    /// The ledger definitively refused the write.
    Rejected(RejectReason),
    /// The ledger could not be reached; the effect is unknown.
    TransportError(String),
}

impl WorkflowResult {
    /// The claim carried by the outcome, if any.
    pub fn claim(&self) -> Option<&Claim> {
        match self {
            WorkflowResult::Success(claim) | WorkflowResult::AlreadyClaimed(claim) => Some(claim),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, WorkflowResult::Success(_))
    }

    /// Whether re-invoking the workflow might produce a different outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WorkflowResult::TransportError(_))
    }
}

impl fmt::Display for WorkflowResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowResult::Success(claim) => write!(
                f,
                "{} is owned by {} since {}",
                claim.fingerprint.short(20),
                claim.owner.short(),
                claim.timestamp
            ),
            WorkflowResult::AlreadyClaimed(claim) => write!(
                f,
                "{} was already claimed by {} at {}",
                claim.fingerprint.short(20),
                claim.owner.short(),
                claim.timestamp
            ),
            WorkflowResult::NotClaimed => write!(f, "not claimed"),
            WorkflowResult::Rejected(reason) => write!(f, "rejected: {}", reason.message),
            WorkflowResult::TransportError(reason) => {
                write!(f, "ledger unavailable ({}); please try again", reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proofcreate_core::{Address, Fingerprint};

    fn claim() -> Claim {
        Claim {
            fingerprint: Fingerprint::from_bytes([0xab; 32]),
            owner: Address::from_bytes([0x11; 20]),
            timestamp: 1_700_000_000,
        }
    }

    #[test]
    fn test_claim_accessor() {
        assert_eq!(WorkflowResult::Success(claim()).claim(), Some(&claim()));
        assert_eq!(WorkflowResult::AlreadyClaimed(claim()).claim(), Some(&claim()));
        assert_eq!(WorkflowResult::NotClaimed.claim(), None);
    }

    #[test]
    fn test_only_transport_is_retryable() {
        assert!(WorkflowResult::TransportError("timeout".into()).is_retryable());
        assert!(!WorkflowResult::Rejected(RejectReason::declined("no")).is_retryable());
        assert!(!WorkflowResult::NotClaimed.is_retryable());
    }

    #[test]
    fn test_display_uses_short_forms() {
        let text = WorkflowResult::AlreadyClaimed(claim()).to_string();
        assert!(text.contains("0xababababababababab..."));
        assert!(text.contains("0x1111...1111"));
    }

    #[test]
    fn test_serializes_tagged() {
        let json = serde_json::to_string(&WorkflowResult::NotClaimed).unwrap();
        assert_eq!(json, r#"{"outcome":"not_claimed"}"#);

        let json = serde_json::to_value(WorkflowResult::Success(claim())).unwrap();
        assert_eq!(json["outcome"], "success");
        assert_eq!(json["detail"]["timestamp"], 1_700_000_000);
    }
}
