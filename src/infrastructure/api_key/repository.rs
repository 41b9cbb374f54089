//! In-memory API key repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::api_key::{ApiKey, ApiKeyId, ApiKeyRepository, ApiKeyStatus, MerchantId};
use crate::domain::DomainError;

/// In-memory implementation of ApiKeyRepository
#[derive(Debug)]
pub struct InMemoryApiKeyRepository {
    keys: Arc<RwLock<HashMap<String, ApiKey>>>,
    merchant_index: Arc<RwLock<HashMap<String, HashSet<String>>>>,
}

impl InMemoryApiKeyRepository {
    /// Create a new in-memory repository
    pub fn new() -> Self {
        Self {
            keys: Arc::new(RwLock::new(HashMap::new())),
            merchant_index: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a repository with initial keys
    pub async fn with_keys(keys: Vec<ApiKey>) -> Result<Self, DomainError> {
        let repo = Self::new();
        for key in keys {
            repo.create(key).await?;
        }
        Ok(repo)
    }
}

impl Default for InMemoryApiKeyRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ApiKeyRepository for InMemoryApiKeyRepository {
    async fn get(&self, id: &ApiKeyId) -> Result<Option<ApiKey>, DomainError> {
        let keys = self.keys.read().await;
        Ok(keys.get(id.as_str()).cloned())
    }

    async fn create(&self, api_key: ApiKey) -> Result<ApiKey, DomainError> {
        let mut keys = self.keys.write().await;
        let mut merchant_index = self.merchant_index.write().await;

        let id = api_key.id().as_str().to_string();

        if keys.contains_key(&id) {
            return Err(DomainError::conflict(format!(
                "API key with ID '{}' already exists",
                id
            )));
        }

        merchant_index
            .entry(api_key.merchant_id().as_str().to_string())
            .or_default()
            .insert(id.clone());
        keys.insert(id, api_key.clone());

        Ok(api_key)
    }

    async fn update(&self, api_key: &ApiKey) -> Result<ApiKey, DomainError> {
        let mut keys = self.keys.write().await;
        let id = api_key.id().as_str().to_string();

        match keys.get(&id) {
            None => {
                return Err(DomainError::not_found(format!(
                    "API key '{}' not found",
                    id
                )));
            }
            Some(existing) if existing.merchant_id() != api_key.merchant_id() => {
                return Err(DomainError::conflict(format!(
                    "API key '{}' cannot change owner",
                    id
                )));
            }
            Some(_) => {}
        }

        keys.insert(id, api_key.clone());
        Ok(api_key.clone())
    }

    async fn list_by_merchant(
        &self,
        merchant_id: &MerchantId,
        status: Option<ApiKeyStatus>,
    ) -> Result<Vec<ApiKey>, DomainError> {
        let merchant_index = self.merchant_index.read().await;
        let keys = self.keys.read().await;

        let mut result: Vec<ApiKey> = merchant_index
            .get(merchant_id.as_str())
            .into_iter()
            .flatten()
            .filter_map(|id| keys.get(id))
            .filter(|k| {
                if let Some(s) = status {
                    k.status() == s
                } else {
                    true
                }
            })
            .cloned()
            .collect();

        result.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().as_str().cmp(b.id().as_str()))
        });

        Ok(result)
    }

    async fn record_usage(&self, id: &ApiKeyId, at: DateTime<Utc>) -> Result<(), DomainError> {
        let mut keys = self.keys.write().await;

        if let Some(key) = keys.get_mut(id.as_str()) {
            key.record_usage(at);
            Ok(())
        } else {
            Err(DomainError::not_found(format!(
                "API key '{}' not found",
                id
            )))
        }
    }

    async fn mark_expired(&self, id: &ApiKeyId, now: DateTime<Utc>) -> Result<bool, DomainError> {
        let mut keys = self.keys.write().await;

        Ok(keys
            .get_mut(id.as_str())
            .map(|key| key.mark_expired(now))
            .unwrap_or(false))
    }

    async fn get_expiring_before(&self, before: DateTime<Utc>) -> Result<Vec<ApiKey>, DomainError> {
        let keys = self.keys.read().await;

        let result: Vec<ApiKey> = keys
            .values()
            .filter(|k| k.status() == ApiKeyStatus::Active && k.expires_at() < before)
            .cloned()
            .collect();

        Ok(result)
    }

    async fn get_with_previous_secret(&self) -> Result<Vec<ApiKey>, DomainError> {
        let keys = self.keys.read().await;

        Ok(keys
            .values()
            .filter(|k| k.previous_secret().is_some())
            .cloned()
            .collect())
    }
}
