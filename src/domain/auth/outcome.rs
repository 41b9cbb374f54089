use serde::{Deserialize, Serialize};

use super::RejectReason;
use crate::domain::signing::SignedRequestEnvelope;

/// Everything the verifier needs about one inbound request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRequest {
    pub envelope: SignedRequestEnvelope,
    /// Path of the endpoint being called
    pub endpoint: String,
    #[serde(default)]
    pub source_address: Option<String>,
    #[serde(default)]
    pub client_agent: Option<String>,
}

impl VerificationRequest {
    pub fn new(envelope: SignedRequestEnvelope, endpoint: impl Into<String>) -> Self {
        Self {
            envelope,
            endpoint: endpoint.into(),
            source_address: None,
            client_agent: None,
        }
    }

    pub fn with_source_address(mut self, address: impl Into<String>) -> Self {
        self.source_address = Some(address.into());
        self
    }

    pub fn with_client_agent(mut self, agent: impl Into<String>) -> Self {
        self.client_agent = Some(agent.into());
        self
    }
}

/// Identity established by a successful verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedRequest {
    pub merchant_id: String,
    pub key_id: String,
    /// Secret version that produced the matching signature
    pub secret_version: u32,
    /// True when the rotated-out secret (overlap window) matched
    pub used_previous_secret: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VerificationOutcome {
    Accept(AcceptedRequest),
    Reject { reason: RejectReason },
}

impl VerificationOutcome {
    pub fn reject(reason: RejectReason) -> Self {
        Self::Reject { reason }
    }

    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept(_))
    }

    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            Self::Accept(_) => None,
            Self::Reject { reason } => Some(*reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reject_helpers() {
        let outcome = VerificationOutcome::reject(RejectReason::BadSignature);

        assert!(!outcome.is_accept());
        assert_eq!(outcome.reject_reason(), Some(RejectReason::BadSignature));
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = VerificationOutcome::reject(RejectReason::ReplayedNonce);
        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(json["outcome"], "reject");
        assert_eq!(json["reason"], "REPLAYED_NONCE");

        let accepted = VerificationOutcome::Accept(AcceptedRequest {
            merchant_id: "m-1".to_string(),
            key_id: "k-1".to_string(),
            secret_version: 2,
            used_previous_secret: false,
        });
        let json = serde_json::to_value(&accepted).unwrap();
        assert_eq!(json["outcome"], "accept");
        assert_eq!(json["secret_version"], 2);
    }
}
