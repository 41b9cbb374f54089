//! Authentication metrics
//!
//! Counters are emitted through the `metrics` facade; installing a recorder
//! (Prometheus or otherwise) is left to the embedding service.

use std::time::Duration;

use metrics::{counter, histogram};

use crate::domain::{AuditAction, VerificationOutcome};

/// Record one verification outcome
pub fn record_verification(outcome: &VerificationOutcome, duration: Duration) {
    let (result, reason) = outcome_labels(outcome);
    let labels = [("outcome", result.to_string()), ("reason", reason.to_string())];

    counter!("auth_verifications_total", &labels).increment(1);
    histogram!("auth_verification_duration_seconds", "outcome" => result)
        .record(duration.as_secs_f64());
}

/// Record a key lifecycle change
pub fn record_lifecycle_event(action: AuditAction) {
    counter!("api_key_lifecycle_total", "action" => action.to_string()).increment(1);
}

/// Record a failed collaborator call
pub fn record_dependency_failure(operation: &'static str) {
    counter!("auth_dependency_failures_total", "operation" => operation).increment(1);
}

fn outcome_labels(outcome: &VerificationOutcome) -> (&'static str, &'static str) {
    match outcome.reject_reason() {
        None => ("accept", "none"),
        Some(reason) => ("reject", reason.code()),
    }
}
