//! Inbound request shapes for key issuance

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::endpoint::EndpointList;

/// Parameters for issuing a new API key
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueKeyRequest {
    /// Free-text purpose of the key
    #[serde(default)]
    pub description: Option<String>,
    /// Requests allowed per window; the configured default applies when absent
    #[serde(default)]
    pub rate_limit: Option<u32>,
    /// Endpoint patterns; the configured default applies when absent
    #[serde(default)]
    pub allowed_endpoints: Option<EndpointList>,
    /// Absolute expiry
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Relative expiry in days
    #[serde(default)]
    pub valid_for_days: Option<u32>,
}

impl IssueKeyRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: u32) -> Self {
        self.rate_limit = Some(rate_limit);
        self
    }

    pub fn with_allowed_endpoints(mut self, endpoints: EndpointList) -> Self {
        self.allowed_endpoints = Some(endpoints);
        self
    }

    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn with_valid_for_days(mut self, days: u32) -> Self {
        self.valid_for_days = Some(days);
        self
    }
}
