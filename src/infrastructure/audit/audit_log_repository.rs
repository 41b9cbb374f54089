//! In-memory key audit trail

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::{AuditEntry, AuditLogRepository, DomainError};

/// In-memory implementation of AuditLogRepository
#[derive(Debug, Default)]
pub struct InMemoryAuditLogRepository {
    entries: Arc<RwLock<Vec<AuditEntry>>>,
}

impl InMemoryAuditLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<AuditEntry> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl AuditLogRepository for InMemoryAuditLogRepository {
    async fn append(&self, entry: AuditEntry) -> Result<(), DomainError> {
        self.entries.write().await.push(entry);
        Ok(())
    }

    async fn list_for_key(&self, api_key_id: &str) -> Result<Vec<AuditEntry>, DomainError> {
        let entries = self.entries.read().await;

        let mut result: Vec<AuditEntry> = entries
            .iter()
            .filter(|e| e.api_key_id == api_key_id)
            .cloned()
            .collect();

        result.sort_by_key(|e| e.occurred_at);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AuditAction;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_append_and_list_for_key() {
        let repo = InMemoryAuditLogRepository::new();
        let now = Utc::now();

        repo.append(AuditEntry::new("m-1", "k-1", AuditAction::KeyRotated, now + Duration::seconds(1)))
            .await
            .unwrap();
        repo.append(AuditEntry::new("m-1", "k-1", AuditAction::KeyIssued, now))
            .await
            .unwrap();
        repo.append(AuditEntry::new("m-1", "k-2", AuditAction::KeyIssued, now))
            .await
            .unwrap();

        let entries = repo.list_for_key("k-1").await.unwrap();
        let actions: Vec<AuditAction> = entries.iter().map(|e| e.action).collect();

        assert_eq!(actions, vec![AuditAction::KeyIssued, AuditAction::KeyRotated]);
        assert_eq!(repo.all().await.len(), 3);
    }
}
