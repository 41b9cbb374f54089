//! Rate limiter implementation
//!
//! Sliding window rate limiting per API key. Check-then-record runs under
//! the key's map entry lock, so concurrent requests for one key never
//! overshoot the limit and different keys never contend.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

/// Result of a rate limit check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request is allowed
    pub allowed: bool,
    /// Remaining requests in the current window
    pub remaining: u32,
    /// Total limit for the window
    pub limit: u32,
    /// Time until the oldest counted request leaves the window (in seconds)
    pub reset_in_seconds: u64,
}

/// Rate limiter for API keys
#[derive(Debug)]
pub struct RateLimiter {
    /// Per-key accepted request times, oldest first
    records: DashMap<String, VecDeque<DateTime<Utc>>>,
    window: Duration,
    /// Cleanup interval
    cleanup_interval: Duration,
    /// Last cleanup time
    last_cleanup: Mutex<Option<DateTime<Utc>>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given window
    pub fn new(window: Duration) -> Self {
        Self {
            records: DashMap::new(),
            window,
            cleanup_interval: Duration::minutes(5),
            last_cleanup: Mutex::new(None),
        }
    }

    /// Check and record in one operation; a denied request consumes no slot
    pub fn check_and_record(&self, key_id: &str, limit: u32, now: DateTime<Utc>) -> RateLimitDecision {
        self.maybe_cleanup(now);

        let mut entry = self.records.entry(key_id.to_string()).or_default();
        self.evict(&mut entry, now);

        let decision = self.decide(&entry, limit, now);
        if decision.allowed {
            entry.push_back(now);
        }

        decision
    }

    /// Whether one more request is allowed; records it if so
    pub fn allow(&self, key_id: &str, limit: u32, now: DateTime<Utc>) -> bool {
        self.check_and_record(key_id, limit, now).allowed
    }

    /// Check without recording
    pub fn check(&self, key_id: &str, limit: u32, now: DateTime<Utc>) -> RateLimitDecision {
        match self.records.get(key_id) {
            Some(records) => {
                let mut live = records.value().clone();
                drop(records);
                self.evict(&mut live, now);
                self.decide(&live, limit, now)
            }
            None => self.decide(&VecDeque::new(), limit, now),
        }
    }

    /// Reset rate limits for a key
    pub fn reset(&self, key_id: &str) {
        self.records.remove(key_id);
    }

    fn evict(&self, records: &mut VecDeque<DateTime<Utc>>, now: DateTime<Utc>) {
        let cutoff = now - self.window;
        while records.front().is_some_and(|t| *t <= cutoff) {
            records.pop_front();
        }
    }

    fn decide(&self, records: &VecDeque<DateTime<Utc>>, limit: u32, now: DateTime<Utc>) -> RateLimitDecision {
        let count = u32::try_from(records.len()).unwrap_or(u32::MAX);
        let window_secs = self.window.num_seconds().max(0) as u64;

        let reset_in_seconds = records
            .front()
            .map(|oldest| {
                let elapsed = (now - *oldest).num_seconds().max(0) as u64;
                window_secs.saturating_sub(elapsed)
            })
            .unwrap_or(window_secs);

        if count >= limit {
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                limit,
                reset_in_seconds,
            };
        }

        RateLimitDecision {
            allowed: true,
            remaining: limit.saturating_sub(count + 1),
            limit,
            reset_in_seconds,
        }
    }

    fn maybe_cleanup(&self, now: DateTime<Utc>) {
        let should_cleanup = {
            let mut last = self.last_cleanup.lock().unwrap_or_else(|e| e.into_inner());
            match *last {
                Some(at) if now - at < self.cleanup_interval => false,
                _ => {
                    *last = Some(now);
                    true
                }
            }
        };

        if should_cleanup {
            let cutoff = now - self.window;
            self.records.retain(|_, records| {
                records.retain(|t| *t > cutoff);
                !records.is_empty()
            });
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Duration::minutes(1))
    }
}
