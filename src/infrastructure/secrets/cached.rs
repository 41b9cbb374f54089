use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{DomainError, SecretName, SecretRef, SecretStore};

/// Secret store wrapper that adds caching with TTL.
///
/// Secret versions are written once under distinct names, so a cached value
/// never goes stale before it is evicted.
#[derive(Debug)]
pub struct CachedSecretStore {
    inner: Arc<dyn SecretStore>,
    cache: Cache<String, Arc<Vec<u8>>>,
}

impl CachedSecretStore {
    pub fn new(inner: Arc<dyn SecretStore>, ttl: Duration) -> Self {
        Self::with_capacity(inner, ttl, 10_000)
    }

    pub fn with_capacity(inner: Arc<dyn SecretStore>, ttl: Duration, capacity: u64) -> Self {
        let cache = Cache::builder()
            .time_to_live(ttl)
            .max_capacity(capacity)
            .build();

        Self { inner, cache }
    }
}

#[async_trait]
impl SecretStore for CachedSecretStore {
    async fn get(&self, secret_ref: &SecretRef) -> Result<Vec<u8>, DomainError> {
        if let Some(cached) = self.cache.get(secret_ref.as_str()).await {
            tracing::debug!(
                store = self.inner.store_name(),
                secret_ref = %secret_ref,
                "Cache hit for secret"
            );
            return Ok((*cached).clone());
        }

        tracing::debug!(
            store = self.inner.store_name(),
            secret_ref = %secret_ref,
            "Cache miss, fetching secret"
        );

        let secret = self.inner.get(secret_ref).await?;
        self.cache
            .insert(secret_ref.as_str().to_string(), Arc::new(secret.clone()))
            .await;

        Ok(secret)
    }

    async fn put(&self, name: &SecretName, secret: &[u8]) -> Result<SecretRef, DomainError> {
        let secret_ref = self.inner.put(name, secret).await?;
        self.cache
            .insert(secret_ref.as_str().to_string(), Arc::new(secret.to_vec()))
            .await;
        Ok(secret_ref)
    }

    fn store_name(&self) -> &'static str {
        self.inner.store_name()
    }
}
