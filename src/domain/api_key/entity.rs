//! API Key entity and related types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::endpoint::EndpointScope;
use super::validation::{validate_api_key_id, validate_merchant_id, ApiKeyValidationError};
use crate::domain::secret::SecretRef;

/// API Key identifier - alphanumeric + hyphens, max 50 characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApiKeyId(String);

impl ApiKeyId {
    /// Create a new ApiKeyId after validation
    pub fn new(id: impl Into<String>) -> Result<Self, ApiKeyValidationError> {
        let id = id.into();
        validate_api_key_id(&id)?;
        Ok(Self(id))
    }

    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ApiKeyId {
    type Error = ApiKeyValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ApiKeyId> for String {
    fn from(id: ApiKeyId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ApiKeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owning tenant of a key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MerchantId(String);

impl MerchantId {
    pub fn new(id: impl Into<String>) -> Result<Self, ApiKeyValidationError> {
        let id = id.into();
        validate_merchant_id(&id)?;
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for MerchantId {
    type Error = ApiKeyValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MerchantId> for String {
    fn from(id: MerchantId) -> Self {
        id.0
    }
}

impl std::fmt::Display for MerchantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of an API key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiKeyStatus {
    /// Key is active and can be used
    #[default]
    Active,
    /// Key has been revoked and cannot be used
    Revoked,
    /// Key has expired
    Expired,
}

impl ApiKeyStatus {
    /// Check if the key is usable
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl std::fmt::Display for ApiKeyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Revoked => write!(f, "REVOKED"),
            Self::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// Secret replaced by a rotation, still honoured until `valid_until`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviousSecret {
    pub secret_ref: SecretRef,
    pub valid_until: DateTime<Utc>,
}

/// API Key entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    /// Unique identifier for the key
    id: ApiKeyId,
    /// Tenant that owns the key
    merchant_id: MerchantId,
    /// Handle of the current secret in the secret store
    secret_ref: SecretRef,
    /// Incremented on every rotation
    secret_version: u32,
    /// Secret from before the last rotation, during its overlap window
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_secret: Option<PreviousSecret>,
    /// Current status of the key
    status: ApiKeyStatus,
    /// Requests allowed per rate-limit window
    rate_limit: u32,
    /// Endpoint patterns this key may call (empty = unrestricted)
    #[serde(default)]
    allowed_endpoints: EndpointScope,
    /// Description of the key's purpose
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    /// Creation timestamp
    created_at: DateTime<Utc>,
    /// Instant after which the key no longer verifies
    expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rotated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    revoked_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    revocation_reason: Option<String>,
    /// Last successful verification
    #[serde(skip_serializing_if = "Option::is_none")]
    last_used_at: Option<DateTime<Utc>>,
    /// Last update timestamp
    updated_at: DateTime<Utc>,
}

impl ApiKey {
    /// Create a new active API key
    pub fn new(
        id: ApiKeyId,
        merchant_id: MerchantId,
        secret_ref: SecretRef,
        rate_limit: u32,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            merchant_id,
            secret_ref,
            secret_version: 1,
            previous_secret: None,
            status: ApiKeyStatus::Active,
            rate_limit,
            allowed_endpoints: EndpointScope::default(),
            description: None,
            created_at,
            expires_at,
            rotated_at: None,
            revoked_at: None,
            revocation_reason: None,
            last_used_at: None,
            updated_at: created_at,
        }
    }

    /// Set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set allowed endpoint patterns
    pub fn with_allowed_endpoints(mut self, endpoints: Vec<String>) -> Self {
        self.allowed_endpoints = EndpointScope::new(endpoints);
        self
    }

    // Getters

    pub fn id(&self) -> &ApiKeyId {
        &self.id
    }

    pub fn merchant_id(&self) -> &MerchantId {
        &self.merchant_id
    }

    pub fn secret_ref(&self) -> &SecretRef {
        &self.secret_ref
    }

    pub fn secret_version(&self) -> u32 {
        self.secret_version
    }

    pub fn previous_secret(&self) -> Option<&PreviousSecret> {
        self.previous_secret.as_ref()
    }

    pub fn status(&self) -> ApiKeyStatus {
        self.status
    }

    pub fn rate_limit(&self) -> u32 {
        self.rate_limit
    }

    pub fn allowed_endpoints(&self) -> &[String] {
        self.allowed_endpoints.patterns()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn rotated_at(&self) -> Option<DateTime<Utc>> {
        self.rotated_at
    }

    pub fn revoked_at(&self) -> Option<DateTime<Utc>> {
        self.revoked_at
    }

    pub fn revocation_reason(&self) -> Option<&str> {
        self.revocation_reason.as_deref()
    }

    pub fn last_used_at(&self) -> Option<DateTime<Utc>> {
        self.last_used_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // Status checks

    /// Status as seen at `now`; an active key past its expiry reads as expired
    pub fn effective_status(&self, now: DateTime<Utc>) -> ApiKeyStatus {
        match self.status {
            ApiKeyStatus::Active if now >= self.expires_at => ApiKeyStatus::Expired,
            status => status,
        }
    }

    /// Check if the key is usable at `now`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.effective_status(now).is_usable()
    }

    /// Check whether the key may call an endpoint
    pub fn allows_endpoint(&self, endpoint: &str) -> bool {
        self.allowed_endpoints.allows(endpoint)
    }

    /// Secrets that verify at `now`: the current one first, then the
    /// previous one while its overlap window is open.
    pub fn verification_secrets(&self, now: DateTime<Utc>) -> Vec<&SecretRef> {
        let mut refs = vec![&self.secret_ref];

        if let Some(ref previous) = self.previous_secret {
            if now < previous.valid_until {
                refs.push(&previous.secret_ref);
            }
        }

        refs
    }

    // Mutators

    /// Install a new secret version.
    ///
    /// The old secret keeps verifying for `overlap`; a zero overlap drops it
    /// immediately. The key lifetime restarts at `expires_at`.
    pub fn rotate_secret(
        &mut self,
        new_secret_ref: SecretRef,
        now: DateTime<Utc>,
        overlap: Duration,
        expires_at: DateTime<Utc>,
    ) {
        let old_ref = std::mem::replace(&mut self.secret_ref, new_secret_ref);

        self.previous_secret = if overlap > Duration::zero() {
            Some(PreviousSecret {
                secret_ref: old_ref,
                valid_until: now + overlap,
            })
        } else {
            None
        };

        self.secret_version += 1;
        self.expires_at = expires_at;
        self.rotated_at = Some(now);
        self.touch(now);
    }

    /// Revoke the key; returns false when it was already revoked
    pub fn revoke(&mut self, reason: Option<String>, now: DateTime<Utc>) -> bool {
        if self.status == ApiKeyStatus::Revoked {
            return false;
        }

        self.status = ApiKeyStatus::Revoked;
        self.revoked_at = Some(now);
        self.revocation_reason = reason;
        self.previous_secret = None;
        self.touch(now);
        true
    }

    /// Persist the lazily detected expiry; returns false if nothing changed
    pub fn mark_expired(&mut self, now: DateTime<Utc>) -> bool {
        if self.status != ApiKeyStatus::Active || now < self.expires_at {
            return false;
        }

        self.status = ApiKeyStatus::Expired;
        self.touch(now);
        true
    }

    /// Drop a previous secret whose overlap window has closed
    pub fn clear_closed_overlap(&mut self, now: DateTime<Utc>) -> bool {
        match self.previous_secret {
            Some(ref previous) if now >= previous.valid_until => {
                self.previous_secret = None;
                self.touch(now);
                true
            }
            _ => false,
        }
    }

    /// Record key usage
    pub fn record_usage(&mut self, now: DateTime<Utc>) {
        self.last_used_at = Some(now);
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}
