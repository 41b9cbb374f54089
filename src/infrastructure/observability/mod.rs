//! Observability infrastructure - Metrics

mod metrics;

pub use metrics::{record_dependency_failure, record_lifecycle_event, record_verification};
