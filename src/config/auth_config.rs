use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::domain::api_key::MAX_KEY_LIFETIME_DAYS;
use crate::domain::{DomainError, EndpointList};
use crate::infrastructure::auth::{MAX_NONCE_BYTES, MIN_NONCE_BYTES};

/// Tunables of the authentication core.
///
/// Every field except `rotation_overlap_minutes` has a documented default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Counting failures within the window that trigger a lockout
    #[serde(default = "default_max_failed_attempts")]
    pub max_failed_attempts: u32,
    /// Window over which failures are counted
    #[serde(default = "default_failure_window_minutes")]
    pub failure_window_minutes: u32,
    /// Lockout length, measured from the most recent counting failure
    #[serde(default = "default_lockout_duration_minutes")]
    pub lockout_duration_minutes: u32,
    /// Lifetime of a key (and of a rotated secret) before it expires
    #[serde(default = "default_key_rotation_days")]
    pub key_rotation_days: u32,
    /// Requests per window for keys issued without an explicit limit
    #[serde(default = "default_rate_limit")]
    pub default_rate_limit: u32,
    /// Rate-limit window length
    #[serde(default = "default_request_time_window_minutes")]
    pub request_time_window_minutes: u32,
    /// Accepted clock skew in either direction
    #[serde(default = "default_max_skew_seconds")]
    pub max_skew_seconds: u32,
    #[serde(default = "default_max_active_keys_per_merchant")]
    pub max_active_keys_per_merchant: u32,
    /// Upper bound for every secret-store and persistence call
    #[serde(default = "default_dependency_timeout_ms")]
    pub dependency_timeout_ms: u64,
    /// Random bytes per nonce (16 to 192)
    #[serde(default = "default_nonce_bytes")]
    pub nonce_bytes: usize,
    /// Endpoint patterns for keys issued without an explicit list
    #[serde(default)]
    pub allowed_endpoints: Option<EndpointList>,
    /// How long a rotated-out secret keeps verifying; 0 invalidates it at once
    pub rotation_overlap_minutes: u32,
}

fn default_max_failed_attempts() -> u32 {
    5
}

fn default_failure_window_minutes() -> u32 {
    15
}

fn default_lockout_duration_minutes() -> u32 {
    30
}

fn default_key_rotation_days() -> u32 {
    90
}

fn default_rate_limit() -> u32 {
    100
}

fn default_request_time_window_minutes() -> u32 {
    1
}

fn default_max_skew_seconds() -> u32 {
    300
}

fn default_max_active_keys_per_merchant() -> u32 {
    5
}

fn default_dependency_timeout_ms() -> u64 {
    2000
}

fn default_nonce_bytes() -> usize {
    16
}

impl AuthConfig {
    /// Defaults for everything except the rotation overlap, which has none
    pub fn new(rotation_overlap_minutes: u32) -> Self {
        Self {
            max_failed_attempts: default_max_failed_attempts(),
            failure_window_minutes: default_failure_window_minutes(),
            lockout_duration_minutes: default_lockout_duration_minutes(),
            key_rotation_days: default_key_rotation_days(),
            default_rate_limit: default_rate_limit(),
            request_time_window_minutes: default_request_time_window_minutes(),
            max_skew_seconds: default_max_skew_seconds(),
            max_active_keys_per_merchant: default_max_active_keys_per_merchant(),
            dependency_timeout_ms: default_dependency_timeout_ms(),
            nonce_bytes: default_nonce_bytes(),
            allowed_endpoints: None,
            rotation_overlap_minutes,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let positive = [
            ("max_failed_attempts", self.max_failed_attempts),
            ("failure_window_minutes", self.failure_window_minutes),
            ("lockout_duration_minutes", self.lockout_duration_minutes),
            ("key_rotation_days", self.key_rotation_days),
            ("default_rate_limit", self.default_rate_limit),
            ("request_time_window_minutes", self.request_time_window_minutes),
            ("max_skew_seconds", self.max_skew_seconds),
            ("max_active_keys_per_merchant", self.max_active_keys_per_merchant),
        ];

        for (name, value) in positive {
            if value == 0 {
                return Err(DomainError::configuration(format!(
                    "auth.{} must be greater than zero",
                    name
                )));
            }
        }

        if self.dependency_timeout_ms == 0 {
            return Err(DomainError::configuration(
                "auth.dependency_timeout_ms must be greater than zero",
            ));
        }

        if self.key_rotation_days > MAX_KEY_LIFETIME_DAYS {
            return Err(DomainError::configuration(format!(
                "auth.key_rotation_days must be at most {}",
                MAX_KEY_LIFETIME_DAYS
            )));
        }

        if !(MIN_NONCE_BYTES..=MAX_NONCE_BYTES).contains(&self.nonce_bytes) {
            return Err(DomainError::configuration(format!(
                "auth.nonce_bytes must be between {} and {}",
                MIN_NONCE_BYTES, MAX_NONCE_BYTES
            )));
        }

        Ok(())
    }

    pub fn failure_window(&self) -> Duration {
        Duration::minutes(i64::from(self.failure_window_minutes))
    }

    pub fn lockout_duration(&self) -> Duration {
        Duration::minutes(i64::from(self.lockout_duration_minutes))
    }

    pub fn key_lifetime(&self) -> Duration {
        Duration::days(i64::from(self.key_rotation_days))
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::minutes(i64::from(self.request_time_window_minutes))
    }

    pub fn max_skew(&self) -> Duration {
        Duration::seconds(i64::from(self.max_skew_seconds))
    }

    pub fn rotation_overlap(&self) -> Duration {
        Duration::minutes(i64::from(self.rotation_overlap_minutes))
    }

    pub fn dependency_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.dependency_timeout_ms)
    }

    pub fn default_allowed_endpoints(&self) -> Vec<String> {
        EndpointList::resolve(self.allowed_endpoints.clone())
    }

    // Builder helpers, mostly for tests and embedding

    pub fn with_max_failed_attempts(mut self, value: u32) -> Self {
        self.max_failed_attempts = value;
        self
    }

    pub fn with_lockout_duration_minutes(mut self, value: u32) -> Self {
        self.lockout_duration_minutes = value;
        self
    }

    pub fn with_failure_window_minutes(mut self, value: u32) -> Self {
        self.failure_window_minutes = value;
        self
    }

    pub fn with_default_rate_limit(mut self, value: u32) -> Self {
        self.default_rate_limit = value;
        self
    }

    pub fn with_max_skew_seconds(mut self, value: u32) -> Self {
        self.max_skew_seconds = value;
        self
    }

    pub fn with_max_active_keys_per_merchant(mut self, value: u32) -> Self {
        self.max_active_keys_per_merchant = value;
        self
    }

    pub fn with_dependency_timeout_ms(mut self, value: u64) -> Self {
        self.dependency_timeout_ms = value;
        self
    }
}
