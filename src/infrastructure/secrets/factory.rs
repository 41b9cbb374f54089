use std::sync::Arc;
use std::time::Duration;

use super::{AwsSecretsManagerStore, CachedSecretStore, InMemorySecretStore};
use crate::config::{SecretBackend, SecretsConfig};
use crate::domain::{DomainError, SecretStore};

/// Factory for creating secret stores
#[derive(Debug)]
pub struct SecretStoreFactory;

impl SecretStoreFactory {
    /// Create the configured store, wrapped in a cache when a TTL is set
    pub async fn create(config: &SecretsConfig) -> Result<Arc<dyn SecretStore>, DomainError> {
        let store: Arc<dyn SecretStore> = match config.backend {
            SecretBackend::InMemory => Arc::new(InMemorySecretStore::new()),
            SecretBackend::AwsSecretsManager => {
                Arc::new(AwsSecretsManagerStore::new(config.region.as_deref()).await?)
            }
        };

        if config.cache_ttl_seconds == 0 {
            return Ok(store);
        }

        Ok(Arc::new(CachedSecretStore::new(
            store,
            Duration::from_secs(config.cache_ttl_seconds),
        )))
    }
}
