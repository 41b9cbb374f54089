//! Authentication attempt tracking and lockout
//!
//! Every verification outcome is appended to the attempt log. Counting
//! failures are also kept in memory per key so the lockout check does not
//! hit storage on the hot path; a key's state is loaded from the log the
//! first time it is seen.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::config::AuthConfig;
use crate::domain::{AttemptRepository, AuthenticationAttempt, DomainError};
use crate::infrastructure::timeout::with_deadline;

/// Thresholds for locking a key out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub max_failed_attempts: u32,
    pub failure_window: Duration,
    pub lockout_duration: Duration,
}

impl LockoutPolicy {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            max_failed_attempts: config.max_failed_attempts,
            failure_window: config.failure_window(),
            lockout_duration: config.lockout_duration(),
        }
    }

    /// How far back the log has to be read to rebuild a key's state
    fn lookback(&self) -> Duration {
        self.failure_window + self.lockout_duration
    }
}

/// Counting failures of one key, oldest first
#[derive(Debug, Default)]
struct FailureWindow {
    failures: VecDeque<DateTime<Utc>>,
}

impl FailureWindow {
    fn push(&mut self, at: DateTime<Utc>, policy: &LockoutPolicy) {
        // attempts can land slightly out of order under concurrency
        let pos = self.failures.iter().rposition(|t| *t <= at).map(|p| p + 1).unwrap_or(0);
        self.failures.insert(pos, at);

        if let Some(latest) = self.failures.back().copied() {
            let cutoff = latest - policy.failure_window;
            while self.failures.front().is_some_and(|t| *t < cutoff) {
                self.failures.pop_front();
            }
        }
    }

    /// When the current lockout ends, if one is in force at `now`
    fn locked_until(&self, now: DateTime<Utc>, policy: &LockoutPolicy) -> Option<DateTime<Utc>> {
        let latest = *self.failures.back()?;
        let window_start = latest - policy.failure_window;
        let in_window = self.failures.iter().filter(|t| **t >= window_start).count();

        if in_window < policy.max_failed_attempts as usize {
            return None;
        }

        let until = latest + policy.lockout_duration;
        (now < until).then_some(until)
    }
}

/// Records attempts and answers lockout queries
#[derive(Debug)]
pub struct AttemptTracker {
    repository: Arc<dyn AttemptRepository>,
    policy: LockoutPolicy,
    timeout: std::time::Duration,
    windows: DashMap<String, FailureWindow>,
}

impl AttemptTracker {
    pub fn new(
        repository: Arc<dyn AttemptRepository>,
        policy: LockoutPolicy,
        timeout: std::time::Duration,
    ) -> Self {
        Self {
            repository,
            policy,
            timeout,
            windows: DashMap::new(),
        }
    }

    /// Record one attempt.
    ///
    /// The in-memory window is updated before the append, so a failed write
    /// never lets a counting failure escape the lockout.
    pub async fn record_attempt(&self, attempt: AuthenticationAttempt) -> Result<(), DomainError> {
        if attempt.counts_toward_lockout() {
            // a failed warm-up leaves the key cold; it is loaded on the next check
            if self.ensure_loaded(&attempt.api_key_id, attempt.attempted_at).await.is_ok() {
                if let Some(mut window) = self.windows.get_mut(&attempt.api_key_id) {
                    window.push(attempt.attempted_at, &self.policy);
                }
            }
        }

        let key_id = attempt.api_key_id.clone();
        let status = attempt.status;

        with_deadline(
            "attempt_repository.append",
            self.timeout,
            self.repository.append(attempt),
        )
        .await
        .inspect_err(|e| {
            warn!(api_key_id = %key_id, status = ?status, error = %e, "Failed to persist authentication attempt");
        })
    }

    /// Whether the key is locked out at `now`
    pub async fn is_locked_out(&self, key_id: &str, now: DateTime<Utc>) -> Result<bool, DomainError> {
        self.ensure_loaded(key_id, now).await?;

        let locked_until = self
            .windows
            .get(key_id)
            .and_then(|window| window.locked_until(now, &self.policy));

        if let Some(until) = locked_until {
            debug!(api_key_id = %key_id, locked_until = %until, "Key is locked out");
        }

        Ok(locked_until.is_some())
    }

    async fn ensure_loaded(&self, key_id: &str, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.windows.contains_key(key_id) {
            return Ok(());
        }

        let since = now - self.policy.lookback();
        let history = with_deadline(
            "attempt_repository.list_for_key_since",
            self.timeout,
            self.repository.list_for_key_since(key_id, since),
        )
        .await?;

        let mut loaded = FailureWindow::default();
        for attempt in history.iter().filter(|a| a.counts_toward_lockout()) {
            loaded.push(attempt.attempted_at, &self.policy);
        }

        debug!(
            api_key_id = %key_id,
            failures = loaded.failures.len(),
            "Loaded failure history"
        );

        self.windows.entry(key_id.to_string()).or_insert(loaded);
        Ok(())
    }
}
