//! API Key repository trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Debug;

use super::entity::{ApiKey, ApiKeyId, ApiKeyStatus, MerchantId};
use crate::domain::DomainError;

/// Repository trait for API key storage
#[async_trait]
pub trait ApiKeyRepository: Send + Sync + Debug {
    /// Get an API key by its ID
    async fn get(&self, id: &ApiKeyId) -> Result<Option<ApiKey>, DomainError>;

    /// Create a new API key
    async fn create(&self, api_key: ApiKey) -> Result<ApiKey, DomainError>;

    /// Update an existing API key
    async fn update(&self, api_key: &ApiKey) -> Result<ApiKey, DomainError>;

    /// List a merchant's keys (optionally filtered by stored status)
    async fn list_by_merchant(
        &self,
        merchant_id: &MerchantId,
        status: Option<ApiKeyStatus>,
    ) -> Result<Vec<ApiKey>, DomainError>;

    /// Count a merchant's keys (optionally filtered by stored status)
    async fn count_by_merchant(
        &self,
        merchant_id: &MerchantId,
        status: Option<ApiKeyStatus>,
    ) -> Result<usize, DomainError> {
        Ok(self.list_by_merchant(merchant_id, status).await?.len())
    }

    /// Record usage of an API key
    async fn record_usage(&self, id: &ApiKeyId, at: DateTime<Utc>) -> Result<(), DomainError>;

    /// Store EXPIRED if the key is still stored ACTIVE and past its expiry.
    ///
    /// Returns whether the record changed; any other state is left alone.
    async fn mark_expired(&self, id: &ApiKeyId, now: DateTime<Utc>) -> Result<bool, DomainError>;

    /// Get stored-active API keys expiring before a given timestamp
    async fn get_expiring_before(&self, before: DateTime<Utc>) -> Result<Vec<ApiKey>, DomainError>;

    /// Get keys still carrying a rotated-out secret
    async fn get_with_previous_secret(&self) -> Result<Vec<ApiKey>, DomainError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::RwLock;

    /// Mock API key repository for testing
    #[derive(Debug, Default)]
    pub struct MockApiKeyRepository {
        keys: Arc<RwLock<HashMap<String, ApiKey>>>,
        should_fail: Arc<RwLock<bool>>,
        delay: Arc<RwLock<Option<Duration>>>,
    }

    impl MockApiKeyRepository {
        /// Create a new mock repository
        pub fn new() -> Self {
            Self::default()
        }

        /// Set whether operations should fail
        pub async fn set_should_fail(&self, fail: bool) {
            *self.should_fail.write().await = fail;
        }

        /// Delay every operation, to exercise caller timeouts
        pub async fn set_delay(&self, delay: Option<Duration>) {
            *self.delay.write().await = delay;
        }

        async fn check_should_fail(&self) -> Result<(), DomainError> {
            let delay = *self.delay.read().await;
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            if *self.should_fail.read().await {
                return Err(DomainError::storage("Mock repository configured to fail"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ApiKeyRepository for MockApiKeyRepository {
        async fn get(&self, id: &ApiKeyId) -> Result<Option<ApiKey>, DomainError> {
            self.check_should_fail().await?;
            let keys = self.keys.read().await;
            Ok(keys.get(id.as_str()).cloned())
        }

        async fn create(&self, api_key: ApiKey) -> Result<ApiKey, DomainError> {
            self.check_should_fail().await?;
            let mut keys = self.keys.write().await;
            let id = api_key.id().as_str().to_string();

            if keys.contains_key(&id) {
                return Err(DomainError::conflict(format!(
                    "API key with ID '{}' already exists",
                    id
                )));
            }

            keys.insert(id, api_key.clone());
            Ok(api_key)
        }

        async fn update(&self, api_key: &ApiKey) -> Result<ApiKey, DomainError> {
            self.check_should_fail().await?;
            let mut keys = self.keys.write().await;
            let id = api_key.id().as_str().to_string();

            if !keys.contains_key(&id) {
                return Err(DomainError::not_found(format!("API key '{}' not found", id)));
            }

            keys.insert(id, api_key.clone());
            Ok(api_key.clone())
        }

        async fn list_by_merchant(
            &self,
            merchant_id: &MerchantId,
            status: Option<ApiKeyStatus>,
        ) -> Result<Vec<ApiKey>, DomainError> {
            self.check_should_fail().await?;
            let keys = self.keys.read().await;

            Ok(keys
                .values()
                .filter(|k| k.merchant_id() == merchant_id)
                .filter(|k| status.map(|s| k.status() == s).unwrap_or(true))
                .cloned()
                .collect())
        }

        async fn record_usage(&self, id: &ApiKeyId, at: DateTime<Utc>) -> Result<(), DomainError> {
            self.check_should_fail().await?;
            let mut keys = self.keys.write().await;

            if let Some(key) = keys.get_mut(id.as_str()) {
                key.record_usage(at);
                Ok(())
            } else {
                Err(DomainError::not_found(format!("API key '{}' not found", id)))
            }
        }

        async fn mark_expired(&self, id: &ApiKeyId, now: DateTime<Utc>) -> Result<bool, DomainError> {
            self.check_should_fail().await?;
            let mut keys = self.keys.write().await;

            Ok(keys
                .get_mut(id.as_str())
                .map(|key| key.mark_expired(now))
                .unwrap_or(false))
        }

        async fn get_expiring_before(
            &self,
            before: DateTime<Utc>,
        ) -> Result<Vec<ApiKey>, DomainError> {
            self.check_should_fail().await?;
            let keys = self.keys.read().await;

            Ok(keys
                .values()
                .filter(|k| k.status() == ApiKeyStatus::Active && k.expires_at() < before)
                .cloned()
                .collect())
        }

        async fn get_with_previous_secret(&self) -> Result<Vec<ApiKey>, DomainError> {
            self.check_should_fail().await?;
            let keys = self.keys.read().await;

            Ok(keys
                .values()
                .filter(|k| k.previous_secret().is_some())
                .cloned()
                .collect())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::domain::secret::SecretRef;
        use chrono::TimeZone;

        fn create_test_key(id: &str) -> ApiKey {
            let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
            ApiKey::new(
                ApiKeyId::new(id).unwrap(),
                MerchantId::new("merchant-1").unwrap(),
                SecretRef::new(format!("secret/{}", id)),
                10,
                now,
                now + chrono::Duration::days(1),
            )
        }

        #[tokio::test]
        async fn test_create_and_get() {
            let repo = MockApiKeyRepository::new();
            let key = create_test_key("test-1");

            repo.create(key.clone()).await.unwrap();

            let retrieved = repo.get(key.id()).await.unwrap();
            assert!(retrieved.is_some());
        }

        #[tokio::test]
        async fn test_count_by_merchant_default_impl() {
            let repo = MockApiKeyRepository::new();

            repo.create(create_test_key("test-1")).await.unwrap();
            repo.create(create_test_key("test-2")).await.unwrap();

            let merchant = MerchantId::new("merchant-1").unwrap();
            let count = repo
                .count_by_merchant(&merchant, Some(ApiKeyStatus::Active))
                .await
                .unwrap();
            assert_eq!(count, 2);
        }

        #[tokio::test]
        async fn test_should_fail() {
            let repo = MockApiKeyRepository::new();
            repo.set_should_fail(true).await;

            let result = repo.get(&ApiKeyId::new("test-1").unwrap()).await;
            assert!(matches!(result, Err(DomainError::Storage { .. })));
        }
    }
}
