//! Inbound request verification
//!
//! Checks run in a fixed order and stop at the first failure:
//! key lookup, key status, lockout, rate limit, timestamp, nonce, signature
//! and endpoint scope. Every call records exactly one attempt before it
//! returns, and nothing a collaborator does can turn into an accept.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, warn};

use super::attempt_tracker::AttemptTracker;
use super::nonce::MAX_NONCE_LENGTH;
use super::nonce_cache::NonceCache;
use super::signer::HmacSigner;
use crate::config::AuthConfig;
use crate::domain::api_key::{ApiKey, ApiKeyId, ApiKeyRepository, ApiKeyStatus};
use crate::domain::signing::parse_timestamp;
use crate::domain::{
    AcceptedRequest, AuthenticationAttempt, Clock, DomainError, RejectCategory, RejectReason,
    SecretStore, SystemClock, VerificationOutcome, VerificationRequest,
};
use crate::infrastructure::api_key::RateLimiter;
use crate::infrastructure::observability;
use crate::infrastructure::timeout::with_deadline;

/// Verifies signed requests against stored keys
#[derive(Debug)]
pub struct Verifier {
    keys: Arc<dyn ApiKeyRepository>,
    secrets: Arc<dyn SecretStore>,
    attempts: Arc<AttemptTracker>,
    rate_limiter: Arc<RateLimiter>,
    nonces: Arc<NonceCache>,
    clock: Arc<dyn Clock>,
    max_skew: Duration,
    timeout: std::time::Duration,
}

impl Verifier {
    pub fn new(
        config: &AuthConfig,
        keys: Arc<dyn ApiKeyRepository>,
        secrets: Arc<dyn SecretStore>,
        attempts: Arc<AttemptTracker>,
        rate_limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            keys,
            secrets,
            attempts,
            rate_limiter,
            nonces: Arc::new(NonceCache::new().with_purge_interval(config.max_skew())),
            clock: Arc::new(SystemClock),
            max_skew: config.max_skew(),
            timeout: config.dependency_timeout(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_nonce_cache(mut self, nonces: Arc<NonceCache>) -> Self {
        self.nonces = nonces;
        self
    }

    /// Verify one request and record the attempt
    pub async fn verify(&self, request: &VerificationRequest) -> VerificationOutcome {
        let started = Instant::now();
        let now = self.clock.now();
        let envelope = &request.envelope;

        let outcome = match self.evaluate(request, now).await {
            Ok(accepted) => VerificationOutcome::Accept(accepted),
            Err(reason) => VerificationOutcome::reject(reason),
        };

        let attempt = match outcome.reject_reason() {
            None => AuthenticationAttempt::success(&envelope.merchant_id, &envelope.key_id, now),
            Some(reason) => {
                AuthenticationAttempt::failure(&envelope.merchant_id, &envelope.key_id, reason, now)
            }
        }
        .with_source(request.source_address.clone(), request.client_agent.clone());

        // a lost attempt record is logged by the tracker; the outcome stands
        if self.attempts.record_attempt(attempt).await.is_err() {
            observability::record_dependency_failure("attempt_repository.append");
        }

        self.log_outcome(request, &outcome);
        observability::record_verification(&outcome, started.elapsed());

        outcome
    }

    async fn evaluate(
        &self,
        request: &VerificationRequest,
        now: DateTime<Utc>,
    ) -> Result<AcceptedRequest, RejectReason> {
        let envelope = &request.envelope;

        // 1. key lookup
        let key = self.lookup_key(&envelope.key_id, &envelope.merchant_id).await?;

        // 2. status
        self.check_status(&key, now).await?;

        // 3. lockout
        let locked = self
            .attempts
            .is_locked_out(key.id().as_str(), now)
            .await
            .map_err(|e| self.dependency_failure("attempt_repository.list_for_key_since", &e))?;
        if locked {
            return Err(RejectReason::LockedOut);
        }

        // 4. rate limit
        if !self.rate_limiter.allow(key.id().as_str(), key.rate_limit(), now) {
            return Err(RejectReason::RateLimited);
        }

        // 5. timestamp
        let timestamp = self.check_timestamp(&envelope.timestamp, now)?;
        if envelope.nonce.is_empty()
            || envelope.nonce.len() > MAX_NONCE_LENGTH
            || envelope.signature.is_empty()
        {
            return Err(RejectReason::MalformedRequest);
        }

        // 6. nonce; released on drop unless committed below
        let reservation = self
            .nonces
            .reserve(key.id().as_str(), &envelope.nonce, now)
            .ok_or(RejectReason::ReplayedNonce)?;

        // 7. signature
        let (secret_version, used_previous_secret) = self.check_signature(&key, request, now).await?;

        // 8. endpoint scope
        if !key.allows_endpoint(&request.endpoint) {
            return Err(RejectReason::ForbiddenEndpoint);
        }

        reservation.commit(timestamp + self.max_skew);
        self.stamp_usage(key.id(), now).await;

        Ok(AcceptedRequest {
            merchant_id: key.merchant_id().to_string(),
            key_id: key.id().to_string(),
            secret_version,
            used_previous_secret,
        })
    }

    async fn lookup_key(&self, key_id: &str, merchant_id: &str) -> Result<ApiKey, RejectReason> {
        // an id that cannot be valid cannot be stored either
        let id = ApiKeyId::new(key_id).map_err(|_| RejectReason::UnknownKey)?;

        let key = with_deadline("api_key_repository.get", self.timeout, self.keys.get(&id))
            .await
            .map_err(|e| self.dependency_failure("api_key_repository.get", &e))?
            .ok_or(RejectReason::UnknownKey)?;

        if key.merchant_id().as_str() != merchant_id {
            return Err(RejectReason::UnknownKey);
        }

        Ok(key)
    }

    async fn check_status(&self, key: &ApiKey, now: DateTime<Utc>) -> Result<(), RejectReason> {
        match key.effective_status(now) {
            ApiKeyStatus::Active => Ok(()),
            ApiKeyStatus::Revoked => Err(RejectReason::KeyInactive),
            ApiKeyStatus::Expired => {
                if key.status() == ApiKeyStatus::Active {
                    self.persist_expiry(key.id(), now).await;
                }
                Err(RejectReason::KeyExpired)
            }
        }
    }

    /// Best-effort write of an expiry detected during verification.
    ///
    /// The write is conditional on the stored record, so a concurrent
    /// revocation or rotation is never overwritten.
    async fn persist_expiry(&self, id: &ApiKeyId, now: DateTime<Utc>) {
        let marked = with_deadline(
            "api_key_repository.mark_expired",
            self.timeout,
            self.keys.mark_expired(id, now),
        )
        .await;

        match marked {
            Ok(true) => info!(api_key_id = %id, "Marked API key as expired"),
            Ok(false) => debug!(api_key_id = %id, "API key changed before expiry was stored"),
            Err(e) => warn!(api_key_id = %id, error = %e, "Failed to mark API key as expired"),
        }
    }

    fn check_timestamp(&self, value: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, RejectReason> {
        let timestamp = parse_timestamp(value).ok_or(RejectReason::MalformedRequest)?;

        if now - timestamp > self.max_skew {
            return Err(RejectReason::StaleTimestamp);
        }
        if timestamp - now > self.max_skew {
            return Err(RejectReason::FutureTimestamp);
        }

        Ok(timestamp)
    }

    /// Returns the matching secret version and whether it was the rotated-out one
    async fn check_signature(
        &self,
        key: &ApiKey,
        request: &VerificationRequest,
        now: DateTime<Utc>,
    ) -> Result<(u32, bool), RejectReason> {
        let envelope = &request.envelope;

        for (index, secret_ref) in key.verification_secrets(now).into_iter().enumerate() {
            let secret = with_deadline("secret_store.get", self.timeout, self.secrets.get(secret_ref))
                .await
                .map_err(|e| self.dependency_failure("secret_store.get", &e))?;

            if HmacSigner::verify(
                &secret,
                &envelope.timestamp,
                &envelope.nonce,
                &envelope.canonical_body,
                &envelope.signature,
            ) {
                let previous = index > 0;
                let version = if previous {
                    key.secret_version().saturating_sub(1)
                } else {
                    key.secret_version()
                };
                return Ok((version, previous));
            }
        }

        Err(RejectReason::BadSignature)
    }

    async fn stamp_usage(&self, id: &ApiKeyId, now: DateTime<Utc>) {
        if let Err(e) = with_deadline(
            "api_key_repository.record_usage",
            self.timeout,
            self.keys.record_usage(id, now),
        )
        .await
        {
            warn!(api_key_id = %id, error = %e, "Failed to record API key usage");
        }
    }

    fn dependency_failure(&self, operation: &'static str, e: &DomainError) -> RejectReason {
        error!(operation = operation, error = %e, "Dependency failure during verification");
        observability::record_dependency_failure(operation);
        RejectReason::DependencyUnavailable
    }

    fn log_outcome(&self, request: &VerificationRequest, outcome: &VerificationOutcome) {
        let envelope = &request.envelope;

        match outcome {
            VerificationOutcome::Accept(accepted) => debug!(
                merchant_id = %envelope.merchant_id,
                api_key_id = %envelope.key_id,
                endpoint = %request.endpoint,
                secret_version = accepted.secret_version,
                "Request verified"
            ),
            VerificationOutcome::Reject { reason } => match reason.category() {
                RejectCategory::ClientCorrectable => warn!(
                    merchant_id = %envelope.merchant_id,
                    api_key_id = %envelope.key_id,
                    endpoint = %request.endpoint,
                    reason = %reason,
                    "Request rejected"
                ),
                RejectCategory::AccountState => debug!(
                    merchant_id = %envelope.merchant_id,
                    api_key_id = %envelope.key_id,
                    reason = %reason,
                    "Request rejected"
                ),
                RejectCategory::Dependency => error!(
                    merchant_id = %envelope.merchant_id,
                    api_key_id = %envelope.key_id,
                    reason = %reason,
                    "Request rejected"
                ),
            },
        }
    }
}
