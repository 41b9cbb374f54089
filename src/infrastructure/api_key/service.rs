//! API Key service
//!
//! Provides the key lifecycle: issue, rotate, revoke and the expiry sweep.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

use crate::config::AuthConfig;
use crate::domain::api_key::{
    validate_issue_request, ApiKey, ApiKeyId, ApiKeyRepository, ApiKeyStatus, IssueKeyRequest,
    KeyExpiry, MerchantId,
};
use crate::domain::{
    AuditAction, AuditEntry, AuditLogRepository, Clock, DomainError, SecretNameTemplate,
    SecretStore, SystemClock,
};
use crate::infrastructure::observability;
use crate::infrastructure::timeout::with_deadline;

use super::generator::SecretGenerator;
use super::rate_limiter::RateLimiter;

/// Result of issuing or rotating a key
pub struct IssuedApiKey {
    /// The API key entity (without the secret)
    pub api_key: ApiKey,
    /// The plaintext secret (only returned once)
    pub secret: String,
}

impl std::fmt::Debug for IssuedApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedApiKey")
            .field("api_key", &self.api_key)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// What one expiry sweep changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: usize,
    pub overlaps_closed: usize,
    pub failed: usize,
}

type LockMap = DashMap<String, Arc<Mutex<()>>>;

/// Exclusive hold on one entry of a lock map.
///
/// The entry is removed on drop unless another task is holding or waiting
/// for it.
struct EntryGuard<'a> {
    locks: &'a LockMap,
    id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for EntryGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.locks
            .remove_if(&self.id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// API Key service for managing the key lifecycle
#[derive(Debug)]
pub struct ApiKeyService {
    repository: Arc<dyn ApiKeyRepository>,
    secrets: Arc<dyn SecretStore>,
    audit_log: Arc<dyn AuditLogRepository>,
    rate_limiter: Arc<RateLimiter>,
    generator: SecretGenerator,
    secret_names: SecretNameTemplate,
    clock: Arc<dyn Clock>,
    config: AuthConfig,
    merchant_locks: LockMap,
    key_locks: LockMap,
}

impl ApiKeyService {
    pub fn new(
        config: AuthConfig,
        repository: Arc<dyn ApiKeyRepository>,
        secrets: Arc<dyn SecretStore>,
        audit_log: Arc<dyn AuditLogRepository>,
        rate_limiter: Arc<RateLimiter>,
        secret_names: SecretNameTemplate,
    ) -> Self {
        Self {
            repository,
            secrets,
            audit_log,
            rate_limiter,
            generator: SecretGenerator::production(),
            secret_names,
            clock: Arc::new(SystemClock),
            config,
            merchant_locks: DashMap::new(),
            key_locks: DashMap::new(),
        }
    }

    /// Create with a custom generator
    pub fn with_generator(mut self, generator: SecretGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Issue a new key for a merchant and return its secret once
    pub async fn issue(
        &self,
        merchant_id: &MerchantId,
        request: IssueKeyRequest,
    ) -> Result<IssuedApiKey, DomainError> {
        let now = self.clock.now();
        let validated = validate_issue_request(&request, now)
            .map_err(|report| DomainError::validation(report.to_string()))?;

        let _guard = Self::lock_entry(&self.merchant_locks, merchant_id.as_str()).await;

        let active = self
            .call(
                "api_key_repository.list_by_merchant",
                self.repository
                    .list_by_merchant(merchant_id, Some(ApiKeyStatus::Active)),
            )
            .await?
            .into_iter()
            .filter(|key| key.is_valid_at(now))
            .count();

        let max_active = self.config.max_active_keys_per_merchant as usize;
        if active >= max_active {
            warn!(merchant_id = %merchant_id, active = active, "Active API key limit reached");
            return Err(DomainError::limit_exceeded(format!(
                "Merchant '{}' already has {} active API keys (max {})",
                merchant_id, active, max_active
            )));
        }

        let id = ApiKeyId::generate();
        let expires_at = match validated.expiry {
            KeyExpiry::At(at) => at,
            KeyExpiry::AfterDays(days) => expiry_after(now, Duration::days(i64::from(days)))?,
            KeyExpiry::RotationPeriod => expiry_after(now, self.config.key_lifetime())?,
        };

        let generated = self.generator.generate();
        let name = self.secret_names.render(merchant_id.as_str(), id.as_str(), 1);
        let secret_ref = self
            .call(
                "secret_store.put",
                self.secrets.put(&name, generated.key_material()),
            )
            .await?;

        let mut api_key = ApiKey::new(
            id,
            merchant_id.clone(),
            secret_ref,
            validated.rate_limit.unwrap_or(self.config.default_rate_limit),
            now,
            expires_at,
        )
        .with_allowed_endpoints(
            validated
                .allowed_endpoints
                .unwrap_or_else(|| self.config.default_allowed_endpoints()),
        );
        if let Some(description) = validated.description {
            api_key = api_key.with_description(description);
        }

        let created = self
            .call("api_key_repository.create", self.repository.create(api_key))
            .await?;

        self.audit(&created, AuditAction::KeyIssued, None, now).await;
        info!(
            merchant_id = %merchant_id,
            api_key_id = %created.id(),
            expires_at = %created.expires_at(),
            "API key issued"
        );

        Ok(IssuedApiKey {
            api_key: created,
            secret: generated.expose().to_string(),
        })
    }

    /// Install a new secret version; the old one verifies until the overlap closes
    pub async fn rotate(&self, id: &ApiKeyId) -> Result<IssuedApiKey, DomainError> {
        let _guard = Self::lock_entry(&self.key_locks, id.as_str()).await;

        let now = self.clock.now();
        let mut key = self.load(id).await?;

        match key.effective_status(now) {
            ApiKeyStatus::Active => {}
            status => {
                return Err(DomainError::conflict(format!(
                    "API key '{}' is {} and cannot be rotated",
                    id, status
                )))
            }
        }

        let expires_at = expiry_after(now, self.config.key_lifetime())?;
        let version = key.secret_version() + 1;
        let generated = self.generator.generate();
        let name = self
            .secret_names
            .render(key.merchant_id().as_str(), id.as_str(), version);
        let secret_ref = self
            .call(
                "secret_store.put",
                self.secrets.put(&name, generated.key_material()),
            )
            .await?;

        key.rotate_secret(
            secret_ref,
            now,
            self.config.rotation_overlap(),
            expires_at,
        );

        let updated = self
            .call("api_key_repository.update", self.repository.update(&key))
            .await?;

        self.audit(
            &updated,
            AuditAction::KeyRotated,
            Some(format!("secret version {}", version)),
            now,
        )
        .await;
        info!(
            api_key_id = %id,
            secret_version = version,
            previous_valid_until = ?updated.previous_secret().map(|p| p.valid_until),
            "API key rotated"
        );

        Ok(IssuedApiKey {
            api_key: updated,
            secret: generated.expose().to_string(),
        })
    }

    /// Revoke a key; revoking twice is a no-op
    pub async fn revoke(&self, id: &ApiKeyId, reason: Option<String>) -> Result<ApiKey, DomainError> {
        let _guard = Self::lock_entry(&self.key_locks, id.as_str()).await;

        let now = self.clock.now();
        let mut key = self.load(id).await?;

        if !key.revoke(reason.clone(), now) {
            debug!(api_key_id = %id, "API key already revoked");
            return Ok(key);
        }

        let updated = self
            .call("api_key_repository.update", self.repository.update(&key))
            .await?;

        self.rate_limiter.reset(id.as_str());
        self.audit(&updated, AuditAction::KeyRevoked, reason, now).await;
        info!(api_key_id = %id, "API key revoked");

        Ok(updated)
    }

    /// Persist expiry of lapsed keys and drop closed overlap windows
    pub async fn sweep_expired(&self) -> Result<SweepReport, DomainError> {
        let now = self.clock.now();
        let mut report = SweepReport::default();

        let expiring = self
            .call(
                "api_key_repository.get_expiring_before",
                self.repository.get_expiring_before(now),
            )
            .await?;

        for key in expiring {
            match self.expire_one(key.id(), now).await {
                Ok(true) => report.expired += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(api_key_id = %key.id(), error = %e, "Failed to expire API key");
                    report.failed += 1;
                }
            }
        }

        let overlapping = self
            .call(
                "api_key_repository.get_with_previous_secret",
                self.repository.get_with_previous_secret(),
            )
            .await?;

        for key in overlapping {
            match self.close_overlap(key.id(), now).await {
                Ok(true) => report.overlaps_closed += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(api_key_id = %key.id(), error = %e, "Failed to clear previous secret");
                    report.failed += 1;
                }
            }
        }

        if report != SweepReport::default() {
            info!(
                expired = report.expired,
                overlaps_closed = report.overlaps_closed,
                failed = report.failed,
                "Expiry sweep finished"
            );
        }

        Ok(report)
    }

    /// Get an API key by ID
    pub async fn get(&self, id: &ApiKeyId) -> Result<Option<ApiKey>, DomainError> {
        self.call("api_key_repository.get", self.repository.get(id))
            .await
    }

    /// List a merchant's keys, oldest first
    pub async fn list_for_merchant(
        &self,
        merchant_id: &MerchantId,
        status: Option<ApiKeyStatus>,
    ) -> Result<Vec<ApiKey>, DomainError> {
        self.call(
            "api_key_repository.list_by_merchant",
            self.repository.list_by_merchant(merchant_id, status),
        )
        .await
    }

    async fn expire_one(&self, id: &ApiKeyId, now: DateTime<Utc>) -> Result<bool, DomainError> {
        let _guard = Self::lock_entry(&self.key_locks, id.as_str()).await;

        // re-read under the lock; a rotation may have renewed the key
        let mut key = self.load(id).await?;
        if !key.mark_expired(now) {
            return Ok(false);
        }

        let updated = self
            .call("api_key_repository.update", self.repository.update(&key))
            .await?;
        self.audit(&updated, AuditAction::KeyExpired, None, now).await;
        info!(api_key_id = %id, "API key expired");

        Ok(true)
    }

    async fn close_overlap(&self, id: &ApiKeyId, now: DateTime<Utc>) -> Result<bool, DomainError> {
        let _guard = Self::lock_entry(&self.key_locks, id.as_str()).await;

        let mut key = self.load(id).await?;
        if !key.clear_closed_overlap(now) {
            return Ok(false);
        }

        self.call("api_key_repository.update", self.repository.update(&key))
            .await?;
        debug!(api_key_id = %id, "Cleared previous secret after overlap");

        Ok(true)
    }

    async fn load(&self, id: &ApiKeyId) -> Result<ApiKey, DomainError> {
        self.call("api_key_repository.get", self.repository.get(id))
            .await?
            .ok_or_else(|| DomainError::not_found(format!("API key '{}' not found", id)))
    }

    /// Audit writes never undo a committed change
    async fn audit(
        &self,
        key: &ApiKey,
        action: AuditAction,
        detail: Option<String>,
        at: DateTime<Utc>,
    ) {
        let mut entry = AuditEntry::new(key.merchant_id().as_str(), key.id().as_str(), action, at);
        if let Some(detail) = detail {
            entry = entry.with_detail(detail);
        }

        observability::record_lifecycle_event(action);

        if let Err(e) = self
            .call("audit_log_repository.append", self.audit_log.append(entry))
            .await
        {
            error!(api_key_id = %key.id(), action = %action, error = %e, "Failed to write audit entry");
        }
    }

    async fn call<T, F>(&self, operation: &'static str, future: F) -> Result<T, DomainError>
    where
        F: Future<Output = Result<T, DomainError>>,
    {
        with_deadline(operation, self.config.dependency_timeout(), future)
            .await
            .inspect_err(|e| {
                if e.is_dependency_failure() {
                    error!(operation = operation, error = %e, "Dependency failure");
                    observability::record_dependency_failure(operation);
                }
            })
    }

    async fn lock_entry<'a>(locks: &'a LockMap, id: &str) -> EntryGuard<'a> {
        let lock = locks.entry(id.to_string()).or_default().clone();

        EntryGuard {
            locks,
            id: id.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }
}

fn expiry_after(now: DateTime<Utc>, lifetime: Duration) -> Result<DateTime<Utc>, DomainError> {
    now.checked_add_signed(lifetime).ok_or_else(|| {
        DomainError::validation(format!(
            "Key lifetime of {} days is out of range",
            lifetime.num_days()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::api_key::mock::MockApiKeyRepository;
    use crate::domain::api_key::EndpointList;
    use crate::domain::secret::MockSecretStore;
    use crate::domain::{ManualClock, SecretRef, SeededRandom};
    use crate::infrastructure::api_key::InMemoryApiKeyRepository;
    use crate::infrastructure::audit::InMemoryAuditLogRepository;
    use crate::infrastructure::secrets::InMemorySecretStore;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn merchant() -> MerchantId {
        MerchantId::new("merchant-1").unwrap()
    }

    fn template() -> SecretNameTemplate {
        SecretNameTemplate::new("{service}/{merchant_id}/{key_id}/v{version}", "payments").unwrap()
    }

    struct Harness {
        service: ApiKeyService,
        keys: Arc<InMemoryApiKeyRepository>,
        secrets: Arc<InMemorySecretStore>,
        audit_log: Arc<InMemoryAuditLogRepository>,
        rate_limiter: Arc<RateLimiter>,
        clock: Arc<ManualClock>,
    }

    fn harness(config: AuthConfig) -> Harness {
        let keys = Arc::new(InMemoryApiKeyRepository::new());
        let secrets = Arc::new(InMemorySecretStore::new());
        let audit_log = Arc::new(InMemoryAuditLogRepository::new());
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit_window()));
        let clock = Arc::new(ManualClock::new(t0()));

        let service = ApiKeyService::new(
            config,
            keys.clone(),
            secrets.clone(),
            audit_log.clone(),
            rate_limiter.clone(),
            template(),
        )
        .with_generator(SecretGenerator::new(Arc::new(SeededRandom::new(7)), "sk_test_"))
        .with_clock(clock.clone());

        Harness {
            service,
            keys,
            secrets,
            audit_log,
            rate_limiter,
            clock,
        }
    }

    #[tokio::test]
    async fn test_issue_stores_secret_and_audits() {
        let h = harness(AuthConfig::new(10));

        let issued = h
            .service
            .issue(
                &merchant(),
                IssueKeyRequest::new()
                    .with_description("checkout")
                    .with_rate_limit(50)
                    .with_allowed_endpoints(EndpointList::One("/v1/payments/*".to_string())),
            )
            .await
            .unwrap();

        let key = &issued.api_key;
        assert!(issued.secret.starts_with("sk_test_"));
        assert_eq!(key.merchant_id(), &merchant());
        assert_eq!(key.status(), ApiKeyStatus::Active);
        assert_eq!(key.secret_version(), 1);
        assert_eq!(key.rate_limit(), 50);
        assert_eq!(key.description(), Some("checkout"));
        assert_eq!(key.expires_at(), t0() + Duration::days(90));
        assert_eq!(
            key.secret_ref().as_str(),
            format!("payments/merchant-1/{}/v1", key.id())
        );

        let stored = h.secrets.get(key.secret_ref()).await.unwrap();
        assert_eq!(stored, issued.secret.as_bytes());

        let audit = h.audit_log.all().await;
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].action, AuditAction::KeyIssued);

        assert!(!format!("{:?}", issued).contains(&issued.secret));
    }

    #[tokio::test]
    async fn test_issue_expiry_options_and_defaults() {
        let config = AuthConfig::new(10).with_default_rate_limit(25);
        let h = harness(config);

        let by_days = h
            .service
            .issue(&merchant(), IssueKeyRequest::new().with_valid_for_days(7))
            .await
            .unwrap();
        assert_eq!(by_days.api_key.expires_at(), t0() + Duration::days(7));
        assert_eq!(by_days.api_key.rate_limit(), 25);
        assert!(by_days.api_key.allowed_endpoints().is_empty());

        let at = t0() + Duration::hours(12);
        let absolute = h
            .service
            .issue(&merchant(), IssueKeyRequest::new().with_expires_at(at))
            .await
            .unwrap();
        assert_eq!(absolute.api_key.expires_at(), at);
    }

    #[tokio::test]
    async fn test_issue_validation_error() {
        let h = harness(AuthConfig::new(10));

        let result = h
            .service
            .issue(
                &merchant(),
                IssueKeyRequest::new()
                    .with_valid_for_days(7)
                    .with_expires_at(t0() + Duration::days(1)),
            )
            .await;

        assert!(matches!(result, Err(DomainError::Validation { .. })));
        assert!(h.secrets.is_empty().await);
    }

    #[tokio::test]
    async fn test_issue_enforces_active_key_limit() {
        let h = harness(AuthConfig::new(10).with_max_active_keys_per_merchant(2));

        let first = h.service.issue(&merchant(), IssueKeyRequest::new()).await.unwrap();
        h.service.issue(&merchant(), IssueKeyRequest::new()).await.unwrap();

        let third = h.service.issue(&merchant(), IssueKeyRequest::new()).await;
        assert!(matches!(third, Err(DomainError::LimitExceeded { .. })));

        // other merchants are unaffected
        let other = MerchantId::new("merchant-2").unwrap();
        assert!(h.service.issue(&other, IssueKeyRequest::new()).await.is_ok());

        h.service.revoke(first.api_key.id(), None).await.unwrap();
        assert!(h.service.issue(&merchant(), IssueKeyRequest::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_lapsed_keys_do_not_count_toward_limit() {
        let h = harness(AuthConfig::new(10).with_max_active_keys_per_merchant(1));

        h.service
            .issue(&merchant(), IssueKeyRequest::new().with_valid_for_days(1))
            .await
            .unwrap();

        h.clock.advance(Duration::days(1));
        assert!(h.service.issue(&merchant(), IssueKeyRequest::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_issue_respects_limit() {
        let h = Arc::new(harness(AuthConfig::new(10).with_max_active_keys_per_merchant(3)));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let h = h.clone();
                tokio::spawn(async move { h.service.issue(&merchant(), IssueKeyRequest::new()).await })
            })
            .collect();

        let mut issued = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                issued += 1;
            }
        }

        assert_eq!(issued, 3);
        let stored = h.keys.list_by_merchant(&merchant(), None).await.unwrap();
        assert_eq!(stored.len(), 3);
        assert!(h.service.merchant_locks.is_empty());
    }

    #[tokio::test]
    async fn test_issue_rejects_out_of_range_lifetime() {
        let h = harness(AuthConfig::new(10));

        let result = h
            .service
            .issue(&merchant(), IssueKeyRequest::new().with_valid_for_days(100_000_000))
            .await;

        assert!(matches!(result, Err(DomainError::Validation { .. })));
        assert!(h.secrets.is_empty().await);
    }

    #[tokio::test]
    async fn test_unrepresentable_rotation_period_is_validation_error() {
        let mut config = AuthConfig::new(10);
        config.key_rotation_days = u32::MAX;
        let h = harness(config);

        let result = h.service.issue(&merchant(), IssueKeyRequest::new()).await;
        assert!(matches!(result, Err(DomainError::Validation { .. })));

        let issued = h
            .service
            .issue(&merchant(), IssueKeyRequest::new().with_valid_for_days(7))
            .await
            .unwrap();
        let rotated = h.service.rotate(issued.api_key.id()).await;
        assert!(matches!(rotated, Err(DomainError::Validation { .. })));

        let stored = h.keys.get(issued.api_key.id()).await.unwrap().unwrap();
        assert_eq!(stored.secret_version(), 1);
    }

    #[tokio::test]
    async fn test_lock_entries_are_released() {
        let h = harness(AuthConfig::new(10));

        let issued = h.service.issue(&merchant(), IssueKeyRequest::new()).await.unwrap();
        h.service.rotate(issued.api_key.id()).await.unwrap();
        h.service.revoke(issued.api_key.id(), None).await.unwrap();

        for id in ["key-404", "key-405"] {
            let missing = h.service.revoke(&ApiKeyId::new(id).unwrap(), None).await;
            assert!(matches!(missing, Err(DomainError::NotFound { .. })));
        }

        h.clock.advance(Duration::days(1));
        h.service.sweep_expired().await.unwrap();

        assert!(h.service.merchant_locks.is_empty());
        assert!(h.service.key_locks.is_empty());
    }

    #[tokio::test]
    async fn test_rotate_keeps_previous_secret_for_overlap() {
        let h = harness(AuthConfig::new(10));
        let issued = h.service.issue(&merchant(), IssueKeyRequest::new()).await.unwrap();
        let id = issued.api_key.id().clone();

        h.clock.advance(Duration::days(30));
        let rotated = h.service.rotate(&id).await.unwrap();
        let key = &rotated.api_key;

        assert_ne!(rotated.secret, issued.secret);
        assert_eq!(key.secret_version(), 2);
        assert_eq!(key.expires_at(), t0() + Duration::days(120));

        let previous = key.previous_secret().unwrap();
        assert_eq!(&previous.secret_ref, issued.api_key.secret_ref());
        assert_eq!(previous.valid_until, t0() + Duration::days(30) + Duration::minutes(10));

        let new_secret = h.secrets.get(key.secret_ref()).await.unwrap();
        assert_eq!(new_secret, rotated.secret.as_bytes());

        let actions: Vec<_> = h.audit_log.all().await.iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![AuditAction::KeyIssued, AuditAction::KeyRotated]);
    }

    #[tokio::test]
    async fn test_rotate_with_zero_overlap_drops_previous() {
        let h = harness(AuthConfig::new(0));
        let issued = h.service.issue(&merchant(), IssueKeyRequest::new()).await.unwrap();

        let rotated = h.service.rotate(issued.api_key.id()).await.unwrap();

        assert!(rotated.api_key.previous_secret().is_none());
        assert_eq!(rotated.api_key.verification_secrets(t0()).len(), 1);
    }

    #[tokio::test]
    async fn test_rotate_unknown_revoked_and_expired() {
        let h = harness(AuthConfig::new(10));

        let missing = h.service.rotate(&ApiKeyId::new("key-404").unwrap()).await;
        assert!(matches!(missing, Err(DomainError::NotFound { .. })));

        let revoked = h.service.issue(&merchant(), IssueKeyRequest::new()).await.unwrap();
        h.service.revoke(revoked.api_key.id(), None).await.unwrap();
        let result = h.service.rotate(revoked.api_key.id()).await;
        assert!(matches!(result, Err(DomainError::Conflict { .. })));

        let lapsed = h
            .service
            .issue(&merchant(), IssueKeyRequest::new().with_valid_for_days(1))
            .await
            .unwrap();
        h.clock.advance(Duration::days(2));
        let result = h.service.rotate(lapsed.api_key.id()).await;
        assert!(matches!(result, Err(DomainError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent_and_resets_rate_limit() {
        let h = harness(AuthConfig::new(10));
        let issued = h.service.issue(&merchant(), IssueKeyRequest::new()).await.unwrap();
        let id = issued.api_key.id().clone();

        assert!(h.rate_limiter.allow(id.as_str(), 1, t0()));
        assert!(!h.rate_limiter.allow(id.as_str(), 1, t0()));

        let revoked = h
            .service
            .revoke(&id, Some("compromised".to_string()))
            .await
            .unwrap();
        assert_eq!(revoked.status(), ApiKeyStatus::Revoked);
        assert_eq!(revoked.revocation_reason(), Some("compromised"));
        assert!(h.rate_limiter.allow(id.as_str(), 1, t0()));

        h.clock.advance(Duration::minutes(5));
        let again = h.service.revoke(&id, None).await.unwrap();
        assert_eq!(again.revoked_at(), Some(t0()));
        assert_eq!(again.revocation_reason(), Some("compromised"));

        let revocations = h
            .audit_log
            .all()
            .await
            .into_iter()
            .filter(|e| e.action == AuditAction::KeyRevoked)
            .count();
        assert_eq!(revocations, 1);

        let missing = h.service.revoke(&ApiKeyId::new("key-404").unwrap(), None).await;
        assert!(matches!(missing, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_sweep_expires_keys_and_closes_overlaps() {
        let h = harness(AuthConfig::new(10));

        let short = h
            .service
            .issue(&merchant(), IssueKeyRequest::new().with_valid_for_days(1))
            .await
            .unwrap();
        let long = h.service.issue(&merchant(), IssueKeyRequest::new()).await.unwrap();
        h.service.rotate(long.api_key.id()).await.unwrap();

        h.clock.advance(Duration::days(2));
        let report = h.service.sweep_expired().await.unwrap();
        assert_eq!(
            report,
            SweepReport {
                expired: 1,
                overlaps_closed: 1,
                failed: 0,
            }
        );

        let short = h.service.get(short.api_key.id()).await.unwrap().unwrap();
        assert_eq!(short.status(), ApiKeyStatus::Expired);

        let long = h.service.get(long.api_key.id()).await.unwrap().unwrap();
        assert_eq!(long.status(), ApiKeyStatus::Active);
        assert!(long.previous_secret().is_none());

        assert_eq!(h.service.sweep_expired().await.unwrap(), SweepReport::default());

        let expired = h
            .service
            .list_for_merchant(&merchant(), Some(ApiKeyStatus::Expired))
            .await
            .unwrap();
        assert_eq!(expired.len(), 1);
        assert!(h
            .audit_log
            .all()
            .await
            .iter()
            .any(|e| e.action == AuditAction::KeyExpired));
    }

    #[tokio::test]
    async fn test_secret_store_failure_persists_nothing() {
        let mut secrets = MockSecretStore::new();
        secrets
            .expect_put()
            .returning(|_, _| Err(DomainError::secret_store("throttled")));

        let keys = Arc::new(InMemoryApiKeyRepository::new());
        let audit_log = Arc::new(InMemoryAuditLogRepository::new());
        let service = ApiKeyService::new(
            AuthConfig::new(10),
            keys.clone(),
            Arc::new(secrets),
            audit_log.clone(),
            Arc::new(RateLimiter::default()),
            template(),
        )
        .with_clock(Arc::new(ManualClock::new(t0())));

        let result = service.issue(&merchant(), IssueKeyRequest::new()).await;

        assert!(matches!(result, Err(DomainError::SecretStore { .. })));
        assert!(keys.list_by_merchant(&merchant(), None).await.unwrap().is_empty());
        assert!(audit_log.all().await.is_empty());
    }

    #[tokio::test]
    async fn test_slow_repository_times_out() {
        let keys = Arc::new(MockApiKeyRepository::new());
        keys.set_delay(Some(std::time::Duration::from_millis(500))).await;

        let mut secrets = MockSecretStore::new();
        secrets
            .expect_put()
            .returning(|name, _| Ok(SecretRef::new(name.as_str())));

        let service = ApiKeyService::new(
            AuthConfig::new(10).with_dependency_timeout_ms(50),
            keys,
            Arc::new(secrets),
            Arc::new(InMemoryAuditLogRepository::new()),
            Arc::new(RateLimiter::default()),
            template(),
        );

        let result = service.issue(&merchant(), IssueKeyRequest::new()).await;
        assert!(matches!(result, Err(DomainError::Timeout { .. })));
    }
}
