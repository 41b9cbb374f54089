use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use uuid::Uuid;

#[cfg(test)]
use mockall::automock;

use super::RejectReason;
use crate::domain::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptStatus {
    Success,
    Failure,
}

/// One verification attempt. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationAttempt {
    pub id: Uuid,
    pub merchant_id: String,
    pub api_key_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_agent: Option<String>,
    pub status: AttemptStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<RejectReason>,
    pub attempted_at: DateTime<Utc>,
}

impl AuthenticationAttempt {
    pub fn success(
        merchant_id: impl Into<String>,
        api_key_id: impl Into<String>,
        attempted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            merchant_id: merchant_id.into(),
            api_key_id: api_key_id.into(),
            source_address: None,
            client_agent: None,
            status: AttemptStatus::Success,
            failure_reason: None,
            attempted_at,
        }
    }

    pub fn failure(
        merchant_id: impl Into<String>,
        api_key_id: impl Into<String>,
        reason: RejectReason,
        attempted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            merchant_id: merchant_id.into(),
            api_key_id: api_key_id.into(),
            source_address: None,
            client_agent: None,
            status: AttemptStatus::Failure,
            failure_reason: Some(reason),
            attempted_at,
        }
    }

    pub fn with_source(mut self, source_address: Option<String>, client_agent: Option<String>) -> Self {
        self.source_address = source_address;
        self.client_agent = client_agent;
        self
    }

    /// Whether this attempt counts toward the lockout threshold
    pub fn counts_toward_lockout(&self) -> bool {
        self.status == AttemptStatus::Failure
            && self
                .failure_reason
                .map(|r| r.counts_toward_lockout())
                .unwrap_or(false)
    }
}

/// Append-only persistence for authentication attempts
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AttemptRepository: Send + Sync + Debug {
    /// Append one attempt
    async fn append(&self, attempt: AuthenticationAttempt) -> Result<(), DomainError>;

    /// Attempts for a key at or after `since`, oldest first
    async fn list_for_key_since(
        &self,
        api_key_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<AuthenticationAttempt>, DomainError>;
}
