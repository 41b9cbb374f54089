//! API Key domain
//!
//! This module provides domain types and traits for API key management,
//! including identity, status, secret versions and endpoint scope.

mod endpoint;
mod entity;
mod repository;
mod request;
mod validation;

pub use endpoint::{EndpointList, EndpointScope};
pub use entity::{ApiKey, ApiKeyId, ApiKeyStatus, MerchantId, PreviousSecret};
pub use repository::ApiKeyRepository;
pub use request::IssueKeyRequest;
pub use validation::{
    validate_api_key_id, validate_issue_request, validate_merchant_id, ApiKeyValidationError,
    FieldViolation, KeyExpiry, ValidatedIssueRequest, ValidationReport, MAX_DESCRIPTION_LENGTH,
    MAX_KEY_LIFETIME_DAYS,
};

#[cfg(test)]
pub use repository::mock;
