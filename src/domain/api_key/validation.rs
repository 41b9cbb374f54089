//! API Key validation utilities

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::endpoint::EndpointList;
use super::request::IssueKeyRequest;

/// Errors that can occur during identifier validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApiKeyValidationError {
    #[error("Identifier cannot be empty")]
    EmptyId,

    #[error("Identifier exceeds maximum length of {0} characters")]
    TooLong(usize),

    #[error("Identifier must start with a letter or number")]
    InvalidStart,

    #[error("Identifier must end with a letter or number")]
    InvalidEnd,

    #[error("Identifier contains invalid character: '{0}'. Only alphanumeric characters and hyphens are allowed")]
    InvalidCharacter(char),

    #[error("Identifier cannot contain consecutive hyphens")]
    ConsecutiveHyphens,
}

const MAX_API_KEY_ID_LENGTH: usize = 50;
const MAX_MERCHANT_ID_LENGTH: usize = 64;

/// Maximum length of a key description
pub const MAX_DESCRIPTION_LENGTH: usize = 255;

/// Longest lifetime a key may be issued or renewed with
pub const MAX_KEY_LIFETIME_DAYS: u32 = 3650;

/// Validate an API key ID
///
/// Rules:
/// - Cannot be empty
/// - Maximum 50 characters
/// - Only alphanumeric characters and hyphens
/// - Must start and end with alphanumeric
/// - No consecutive hyphens
pub fn validate_api_key_id(id: &str) -> Result<(), ApiKeyValidationError> {
    validate_identifier(id, MAX_API_KEY_ID_LENGTH)
}

/// Validate a merchant ID (same rules as key IDs, up to 64 characters)
pub fn validate_merchant_id(id: &str) -> Result<(), ApiKeyValidationError> {
    validate_identifier(id, MAX_MERCHANT_ID_LENGTH)
}

fn validate_identifier(id: &str, max_len: usize) -> Result<(), ApiKeyValidationError> {
    if id.is_empty() {
        return Err(ApiKeyValidationError::EmptyId);
    }

    if id.len() > max_len {
        return Err(ApiKeyValidationError::TooLong(max_len));
    }

    let chars: Vec<char> = id.chars().collect();

    if !chars[0].is_ascii_alphanumeric() {
        return Err(ApiKeyValidationError::InvalidStart);
    }

    if !chars[chars.len() - 1].is_ascii_alphanumeric() {
        return Err(ApiKeyValidationError::InvalidEnd);
    }

    let mut prev_hyphen = false;

    for c in &chars {
        if *c == '-' {
            if prev_hyphen {
                return Err(ApiKeyValidationError::ConsecutiveHyphens);
            }
            prev_hyphen = true;
        } else if c.is_ascii_alphanumeric() {
            prev_hyphen = false;
        } else {
            return Err(ApiKeyValidationError::InvalidCharacter(*c));
        }
    }

    Ok(())
}

/// A single rejected field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: String,
}

/// Every problem found in a request, in field order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    violations: Vec<FieldViolation>,
}

impl ValidationReport {
    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.violations.push(FieldViolation {
            field,
            message: message.into(),
        });
    }

    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Whether a given field was rejected
    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .violations
            .iter()
            .map(|v| format!("{}: {}", v.field, v.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// How the expiry of a new key was specified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyExpiry {
    /// Absolute expiry instant
    At(DateTime<Utc>),
    /// Relative lifetime in days
    AfterDays(u32),
    /// Neither given; the configured rotation period applies
    RotationPeriod,
}

/// A request that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedIssueRequest {
    pub description: Option<String>,
    pub rate_limit: Option<u32>,
    pub allowed_endpoints: Option<Vec<String>>,
    pub expiry: KeyExpiry,
}

/// Validate an issuance request.
///
/// Expiry is given either as `expires_at` or as `valid_for_days`, never both.
/// All violations are collected instead of stopping at the first one.
pub fn validate_issue_request(
    request: &IssueKeyRequest,
    now: DateTime<Utc>,
) -> Result<ValidatedIssueRequest, ValidationReport> {
    let mut report = ValidationReport::default();

    let description = request
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);

    if let Some(ref d) = description {
        if d.chars().count() > MAX_DESCRIPTION_LENGTH {
            report.push(
                "description",
                format!("must be at most {} characters", MAX_DESCRIPTION_LENGTH),
            );
        }
    }

    if request.rate_limit == Some(0) {
        report.push("rate_limit", "must be greater than zero");
    }

    let allowed_endpoints = request
        .allowed_endpoints
        .clone()
        .map(|list| EndpointList::resolve(Some(list)));

    if let Some(ref patterns) = allowed_endpoints {
        for pattern in patterns {
            if !pattern.starts_with('/') {
                report.push(
                    "allowed_endpoints",
                    format!("pattern '{}' must start with '/'", pattern),
                );
            }
        }
    }

    let expiry = match (request.expires_at, request.valid_for_days) {
        (Some(_), Some(_)) => {
            report.push(
                "expires_at",
                "expires_at and valid_for_days are mutually exclusive",
            );
            KeyExpiry::RotationPeriod
        }
        (Some(at), None) => {
            if at <= now {
                report.push("expires_at", "must be in the future");
            }
            KeyExpiry::At(at)
        }
        (None, Some(0)) => {
            report.push("valid_for_days", "must be greater than zero");
            KeyExpiry::RotationPeriod
        }
        (None, Some(days)) if days > MAX_KEY_LIFETIME_DAYS => {
            report.push(
                "valid_for_days",
                format!("must be at most {}", MAX_KEY_LIFETIME_DAYS),
            );
            KeyExpiry::RotationPeriod
        }
        (None, Some(days)) => KeyExpiry::AfterDays(days),
        (None, None) => KeyExpiry::RotationPeriod,
    };

    if !report.is_empty() {
        return Err(report);
    }

    Ok(ValidatedIssueRequest {
        description,
        rate_limit: request.rate_limit,
        allowed_endpoints,
        expiry,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_valid_api_key_ids() {
        assert!(validate_api_key_id("my-api-key").is_ok());
        assert!(validate_api_key_id("key123").is_ok());
        assert!(validate_api_key_id("a").is_ok());
        assert!(validate_api_key_id("6f1c2a3e-9d7b-4f0a-8c1e-2b3d4e5f6a7b").is_ok());
    }

    #[test]
    fn test_empty_id() {
        assert_eq!(validate_api_key_id(""), Err(ApiKeyValidationError::EmptyId));
    }

    #[test]
    fn test_too_long_ids() {
        assert_eq!(
            validate_api_key_id(&"a".repeat(51)),
            Err(ApiKeyValidationError::TooLong(50))
        );
        assert!(validate_merchant_id(&"a".repeat(64)).is_ok());
        assert_eq!(
            validate_merchant_id(&"a".repeat(65)),
            Err(ApiKeyValidationError::TooLong(64))
        );
    }

    #[test]
    fn test_invalid_edges_and_characters() {
        assert_eq!(validate_api_key_id("-key"), Err(ApiKeyValidationError::InvalidStart));
        assert_eq!(validate_api_key_id("key-"), Err(ApiKeyValidationError::InvalidEnd));
        assert_eq!(
            validate_merchant_id("merchant_1"),
            Err(ApiKeyValidationError::InvalidCharacter('_'))
        );
        assert_eq!(
            validate_merchant_id("m--1"),
            Err(ApiKeyValidationError::ConsecutiveHyphens)
        );
    }

    #[test]
    fn test_empty_request_uses_rotation_period() {
        let validated = validate_issue_request(&IssueKeyRequest::default(), now()).unwrap();

        assert_eq!(validated.expiry, KeyExpiry::RotationPeriod);
        assert!(validated.description.is_none());
        assert!(validated.allowed_endpoints.is_none());
    }

    #[test]
    fn test_expires_at_or_days_not_both() {
        let request = IssueKeyRequest {
            expires_at: Some(now() + Duration::days(10)),
            valid_for_days: Some(10),
            ..Default::default()
        };

        let report = validate_issue_request(&request, now()).unwrap_err();
        assert!(report.has_field("expires_at"));
    }

    #[test]
    fn test_expiry_variants() {
        let at = now() + Duration::days(3);
        let by_instant = IssueKeyRequest {
            expires_at: Some(at),
            ..Default::default()
        };
        let by_days = IssueKeyRequest {
            valid_for_days: Some(7),
            ..Default::default()
        };

        assert_eq!(
            validate_issue_request(&by_instant, now()).unwrap().expiry,
            KeyExpiry::At(at)
        );
        assert_eq!(
            validate_issue_request(&by_days, now()).unwrap().expiry,
            KeyExpiry::AfterDays(7)
        );
    }

    #[test]
    fn test_valid_for_days_upper_bound() {
        let longest = IssueKeyRequest {
            valid_for_days: Some(MAX_KEY_LIFETIME_DAYS),
            ..Default::default()
        };
        assert!(validate_issue_request(&longest, now()).is_ok());

        let too_long = IssueKeyRequest {
            valid_for_days: Some(100_000_000),
            ..Default::default()
        };
        let report = validate_issue_request(&too_long, now()).unwrap_err();
        assert!(report.has_field("valid_for_days"));
    }

    #[test]
    fn test_collects_every_violation() {
        let request = IssueKeyRequest {
            description: Some("x".repeat(256)),
            rate_limit: Some(0),
            allowed_endpoints: Some(EndpointList::One("v1/no-slash".to_string())),
            expires_at: Some(now() - Duration::seconds(1)),
            valid_for_days: None,
        };

        let report = validate_issue_request(&request, now()).unwrap_err();

        assert_eq!(report.violations().len(), 4);
        assert!(report.has_field("description"));
        assert!(report.has_field("rate_limit"));
        assert!(report.has_field("allowed_endpoints"));
        assert!(report.has_field("expires_at"));
        assert!(report.to_string().contains("rate_limit: must be greater than zero"));
    }

    #[test]
    fn test_blank_description_is_dropped() {
        let request = IssueKeyRequest {
            description: Some("   ".to_string()),
            ..Default::default()
        };

        assert!(validate_issue_request(&request, now()).unwrap().description.is_none());
    }
}
