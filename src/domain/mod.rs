//! Domain layer - Core types, invariants and collaborator traits

pub mod api_key;
pub mod auth;
pub mod error;
pub mod secret;
pub mod signing;
pub mod traits;

pub use api_key::{
    ApiKey, ApiKeyId, ApiKeyRepository, ApiKeyStatus, ApiKeyValidationError, EndpointList,
    IssueKeyRequest, MerchantId, PreviousSecret, ValidationReport,
};
pub use auth::{
    AcceptedRequest, AttemptRepository, AttemptStatus, AuditAction, AuditEntry,
    AuditLogRepository, AuthenticationAttempt, RejectCategory, RejectReason, VerificationOutcome,
    VerificationRequest,
};
pub use error::DomainError;
pub use secret::{SecretName, SecretNameTemplate, SecretRef, SecretStore};
pub use signing::SignedRequestEnvelope;
pub use traits::{Clock, ManualClock, OsRandom, RandomSource, SeededRandom, SystemClock};
