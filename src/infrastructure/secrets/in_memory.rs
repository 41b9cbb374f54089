use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::{DomainError, SecretName, SecretRef, SecretStore};

/// Process-local secret store
#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    secrets: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.secrets.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.secrets.read().await.is_empty()
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn get(&self, secret_ref: &SecretRef) -> Result<Vec<u8>, DomainError> {
        let secrets = self.secrets.read().await;

        secrets
            .get(secret_ref.as_str())
            .cloned()
            .ok_or_else(|| DomainError::secret_store(format!("Secret '{}' not found", secret_ref)))
    }

    async fn put(&self, name: &SecretName, secret: &[u8]) -> Result<SecretRef, DomainError> {
        let mut secrets = self.secrets.write().await;

        if secrets.contains_key(name.as_str()) {
            return Err(DomainError::conflict(format!(
                "Secret '{}' already exists",
                name
            )));
        }

        secrets.insert(name.as_str().to_string(), secret.to_vec());
        Ok(SecretRef::new(name.as_str()))
    }

    fn store_name(&self) -> &'static str {
        "in_memory"
    }
}
