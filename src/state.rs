//! Shared authentication services
//!
//! The verifier and the lifecycle service are built together so that they
//! share one rate limiter, one set of repositories and one clock.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::domain::{
    ApiKeyRepository, AttemptRepository, AuditLogRepository, Clock, DomainError, OsRandom,
    SecretNameTemplate, SecretStore,
};
use crate::infrastructure::api_key::{ApiKeyService, InMemoryApiKeyRepository, RateLimiter};
use crate::infrastructure::audit::{InMemoryAttemptRepository, InMemoryAuditLogRepository};
use crate::infrastructure::auth::{
    AttemptTracker, LockoutPolicy, NonceGenerator, RequestSigner, Verifier,
};
use crate::infrastructure::secrets::InMemorySecretStore;

/// Storage collaborators
#[derive(Debug, Clone)]
pub struct AuthStores {
    pub keys: Arc<dyn ApiKeyRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
    pub audit_log: Arc<dyn AuditLogRepository>,
    pub secrets: Arc<dyn SecretStore>,
}

impl AuthStores {
    /// Process-local stores, suitable for tests and single-node setups
    pub fn in_memory() -> Self {
        Self::with_secret_store(Arc::new(InMemorySecretStore::new()))
    }

    /// In-memory repositories around a given secret store
    pub fn with_secret_store(secrets: Arc<dyn SecretStore>) -> Self {
        Self {
            keys: Arc::new(InMemoryApiKeyRepository::new()),
            attempts: Arc::new(InMemoryAttemptRepository::new()),
            audit_log: Arc::new(InMemoryAuditLogRepository::new()),
            secrets,
        }
    }
}

/// Authentication state containing shared services
#[derive(Debug, Clone)]
pub struct AuthState {
    pub verifier: Arc<Verifier>,
    pub api_keys: Arc<ApiKeyService>,
    pub attempts: Arc<AttemptTracker>,
    pub rate_limiter: Arc<RateLimiter>,
    pub nonces: NonceGenerator,
}

impl AuthState {
    pub fn new(config: &AppConfig, stores: AuthStores, clock: Arc<dyn Clock>) -> Result<Self, DomainError> {
        let auth = &config.auth;
        auth.validate()?;

        let secret_names =
            SecretNameTemplate::new(&config.secrets.name_template, &config.secrets.service_name)
                .map_err(|e| DomainError::configuration(e.to_string()))?;

        let rate_limiter = Arc::new(RateLimiter::new(auth.rate_limit_window()));
        let attempts = Arc::new(AttemptTracker::new(
            stores.attempts,
            LockoutPolicy::from_config(auth),
            auth.dependency_timeout(),
        ));

        let verifier = Verifier::new(
            auth,
            stores.keys.clone(),
            stores.secrets.clone(),
            attempts.clone(),
            rate_limiter.clone(),
        )
        .with_clock(clock.clone());

        let api_keys = ApiKeyService::new(
            auth.clone(),
            stores.keys,
            stores.secrets,
            stores.audit_log,
            rate_limiter.clone(),
            secret_names,
        )
        .with_clock(clock);

        Ok(Self {
            verifier: Arc::new(verifier),
            api_keys: Arc::new(api_keys),
            attempts,
            rate_limiter,
            nonces: NonceGenerator::new(Arc::new(OsRandom), auth.nonce_bytes),
        })
    }

    /// Client-side signer drawing nonces of the configured size
    pub fn request_signer(
        &self,
        merchant_id: impl Into<String>,
        key_id: impl Into<String>,
        secret: impl Into<Vec<u8>>,
    ) -> RequestSigner {
        RequestSigner::new(merchant_id, key_id, secret).with_nonce_generator(self.nonces.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthConfig, LoggingConfig, SecretsConfig};
    use crate::domain::api_key::MerchantId;
    use crate::domain::{IssueKeyRequest, ManualClock, RejectReason, VerificationOutcome, VerificationRequest};
    use base64::{engine::general_purpose::STANDARD, Engine};
    use chrono::{Duration, TimeZone, Utc};

    fn app_config(auth: AuthConfig) -> AppConfig {
        AppConfig {
            logging: LoggingConfig::default(),
            auth,
            secrets: SecretsConfig::default(),
        }
    }

    fn setup(auth: AuthConfig) -> (AuthState, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
        let state = AuthState::new(&app_config(auth), AuthStores::in_memory(), clock.clone()).unwrap();
        (state, clock)
    }

    async fn send(state: &AuthState, signer: &RequestSigner) -> VerificationOutcome {
        let envelope = signer.sign_json(&serde_json::json!({"amount": 10, "currency": "EUR"}));
        state
            .verifier
            .verify(&VerificationRequest::new(envelope, "/v1/surcharges"))
            .await
    }

    #[tokio::test]
    async fn test_issued_key_signs_and_verifies() {
        let (state, clock) = setup(AuthConfig::new(10));
        let merchant = MerchantId::new("merchant-1").unwrap();

        let issued = state.api_keys.issue(&merchant, IssueKeyRequest::new()).await.unwrap();
        let signer = state
            .request_signer("merchant-1", issued.api_key.id().as_str(), issued.secret.clone())
            .with_clock(clock.clone());

        assert!(send(&state, &signer).await.is_accept());
    }

    #[tokio::test]
    async fn test_configured_nonce_size_reaches_signer() {
        let mut auth = AuthConfig::new(10);
        auth.nonce_bytes = 48;
        let (state, clock) = setup(auth);
        let merchant = MerchantId::new("merchant-1").unwrap();

        let issued = state.api_keys.issue(&merchant, IssueKeyRequest::new()).await.unwrap();
        let signer = state
            .request_signer("merchant-1", issued.api_key.id().as_str(), issued.secret.clone())
            .with_clock(clock);

        let envelope = signer.sign_body("{}");
        assert_eq!(STANDARD.decode(&envelope.nonce).unwrap().len(), 48);

        let outcome = state
            .verifier
            .verify(&VerificationRequest::new(envelope, "/v1/surcharges"))
            .await;
        assert!(outcome.is_accept());
    }

    #[test]
    fn test_oversized_nonce_config_is_rejected() {
        let mut auth = AuthConfig::new(10);
        auth.nonce_bytes = 193;

        let result = AuthState::new(&app_config(auth), AuthStores::in_memory(), Arc::new(ManualClock::new(Utc::now())));
        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_rotation_overlap_end_to_end() {
        let (state, clock) = setup(AuthConfig::new(10));
        let merchant = MerchantId::new("merchant-1").unwrap();

        let issued = state.api_keys.issue(&merchant, IssueKeyRequest::new()).await.unwrap();
        let id = issued.api_key.id().clone();
        let old = state
            .request_signer("merchant-1", id.as_str(), issued.secret.clone())
            .with_clock(clock.clone());

        let rotated = state.api_keys.rotate(&id).await.unwrap();
        let new = state
            .request_signer("merchant-1", id.as_str(), rotated.secret.clone())
            .with_clock(clock.clone());

        match send(&state, &old).await {
            VerificationOutcome::Accept(accepted) => assert!(accepted.used_previous_secret),
            other => panic!("expected accept, got {:?}", other),
        }
        assert!(send(&state, &new).await.is_accept());

        clock.advance(Duration::minutes(10));
        assert_eq!(send(&state, &old).await.reject_reason(), Some(RejectReason::BadSignature));
        assert!(send(&state, &new).await.is_accept());
    }

    #[tokio::test]
    async fn test_revoked_key_rejected_end_to_end() {
        let (state, clock) = setup(AuthConfig::new(10));
        let merchant = MerchantId::new("merchant-1").unwrap();

        let issued = state.api_keys.issue(&merchant, IssueKeyRequest::new()).await.unwrap();
        let signer = state
            .request_signer("merchant-1", issued.api_key.id().as_str(), issued.secret.clone())
            .with_clock(clock);

        state.api_keys.revoke(issued.api_key.id(), None).await.unwrap();
        assert_eq!(send(&state, &signer).await.reject_reason(), Some(RejectReason::KeyInactive));
    }

    #[test]
    fn test_invalid_name_template_is_configuration_error() {
        let mut config = app_config(AuthConfig::new(10));
        config.secrets.name_template = "{tenant}/{key_id}".to_string();

        let result = AuthState::new(&config, AuthStores::in_memory(), Arc::new(ManualClock::new(Utc::now())));
        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }
}
