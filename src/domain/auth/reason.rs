use serde::{Deserialize, Serialize};

/// Why a request was rejected. The serialized code is stable and is what
/// callers and the audit trail see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    UnknownKey,
    KeyInactive,
    KeyExpired,
    LockedOut,
    RateLimited,
    MalformedRequest,
    StaleTimestamp,
    FutureTimestamp,
    ReplayedNonce,
    BadSignature,
    ForbiddenEndpoint,
    DependencyUnavailable,
}

/// Coarse grouping so callers can tell bad credentials from throttling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectCategory {
    /// Resend with a fresh timestamp/nonce or a correct signature
    ClientCorrectable,
    /// The key itself is unusable or throttled right now
    AccountState,
    /// A collaborator failed; the caller may retry
    Dependency,
}

impl RejectReason {
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownKey => "UNKNOWN_KEY",
            Self::KeyInactive => "KEY_INACTIVE",
            Self::KeyExpired => "KEY_EXPIRED",
            Self::LockedOut => "LOCKED_OUT",
            Self::RateLimited => "RATE_LIMITED",
            Self::MalformedRequest => "MALFORMED_REQUEST",
            Self::StaleTimestamp => "STALE_TIMESTAMP",
            Self::FutureTimestamp => "FUTURE_TIMESTAMP",
            Self::ReplayedNonce => "REPLAYED_NONCE",
            Self::BadSignature => "BAD_SIGNATURE",
            Self::ForbiddenEndpoint => "FORBIDDEN_ENDPOINT",
            Self::DependencyUnavailable => "DEPENDENCY_UNAVAILABLE",
        }
    }

    pub fn category(&self) -> RejectCategory {
        match self {
            Self::MalformedRequest
            | Self::StaleTimestamp
            | Self::FutureTimestamp
            | Self::ReplayedNonce
            | Self::BadSignature
            | Self::ForbiddenEndpoint => RejectCategory::ClientCorrectable,
            Self::UnknownKey
            | Self::KeyInactive
            | Self::KeyExpired
            | Self::LockedOut
            | Self::RateLimited => RejectCategory::AccountState,
            Self::DependencyUnavailable => RejectCategory::Dependency,
        }
    }

    /// Whether this failure counts toward the lockout threshold.
    ///
    /// Only failures that involve presenting credentials count; rejections
    /// caused by the key's own state (including an active lockout) do not.
    pub fn counts_toward_lockout(&self) -> bool {
        self.category() == RejectCategory::ClientCorrectable
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DependencyUnavailable | Self::RateLimited)
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}
