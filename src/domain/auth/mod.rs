//! Authentication domain
//!
//! Verification requests and outcomes, the stable rejection taxonomy and the
//! append-only records (authentication attempts, audit entries) the core writes.

mod attempt;
mod audit;
mod outcome;
mod reason;

pub use attempt::{AttemptRepository, AttemptStatus, AuthenticationAttempt};
pub use audit::{AuditAction, AuditEntry, AuditLogRepository};
pub use outcome::{AcceptedRequest, VerificationOutcome, VerificationRequest};
pub use reason::{RejectCategory, RejectReason};

#[cfg(test)]
pub use attempt::MockAttemptRepository;
