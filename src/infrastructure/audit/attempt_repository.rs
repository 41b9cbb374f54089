//! In-memory authentication attempt log

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::{AttemptRepository, AuthenticationAttempt, DomainError};

/// In-memory implementation of AttemptRepository
#[derive(Debug, Default)]
pub struct InMemoryAttemptRepository {
    attempts: Arc<RwLock<Vec<AuthenticationAttempt>>>,
}

impl InMemoryAttemptRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every recorded attempt, in append order
    pub async fn all(&self) -> Vec<AuthenticationAttempt> {
        self.attempts.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.attempts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.attempts.read().await.is_empty()
    }
}

#[async_trait]
impl AttemptRepository for InMemoryAttemptRepository {
    async fn append(&self, attempt: AuthenticationAttempt) -> Result<(), DomainError> {
        self.attempts.write().await.push(attempt);
        Ok(())
    }

    async fn list_for_key_since(
        &self,
        api_key_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<AuthenticationAttempt>, DomainError> {
        let attempts = self.attempts.read().await;

        let mut result: Vec<AuthenticationAttempt> = attempts
            .iter()
            .filter(|a| a.api_key_id == api_key_id && a.attempted_at >= since)
            .cloned()
            .collect();

        result.sort_by_key(|a| a.attempted_at);
        Ok(result)
    }
}
