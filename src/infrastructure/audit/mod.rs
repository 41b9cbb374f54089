//! In-memory append-only logs for authentication attempts and key audit

mod attempt_repository;
mod audit_log_repository;

pub use attempt_repository::InMemoryAttemptRepository;
pub use audit_log_repository::InMemoryAuditLogRepository;
