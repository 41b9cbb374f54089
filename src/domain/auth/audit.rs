use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use uuid::Uuid;

use crate::domain::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    KeyIssued,
    KeyRotated,
    KeyRevoked,
    KeyExpired,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KeyIssued => write!(f, "key_issued"),
            Self::KeyRotated => write!(f, "key_rotated"),
            Self::KeyRevoked => write!(f, "key_revoked"),
            Self::KeyExpired => write!(f, "key_expired"),
        }
    }
}

/// Key lifecycle change, written once and never updated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub merchant_id: String,
    pub api_key_id: String,
    pub action: AuditAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        merchant_id: impl Into<String>,
        api_key_id: impl Into<String>,
        action: AuditAction,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            merchant_id: merchant_id.into(),
            api_key_id: api_key_id.into(),
            action,
            detail: None,
            occurred_at,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Append-only audit trail
#[async_trait]
pub trait AuditLogRepository: Send + Sync + Debug {
    async fn append(&self, entry: AuditEntry) -> Result<(), DomainError>;

    /// Entries for one key, oldest first
    async fn list_for_key(&self, api_key_id: &str) -> Result<Vec<AuditEntry>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_entry() {
        let entry = AuditEntry::new("m-1", "k-1", AuditAction::KeyRevoked, Utc::now())
            .with_detail("compromised");

        assert_eq!(entry.action, AuditAction::KeyRevoked);
        assert_eq!(entry.detail.as_deref(), Some("compromised"));
        assert_eq!(entry.action.to_string(), "key_revoked");
    }
}
