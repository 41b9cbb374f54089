//! Replay protection
//!
//! Tracks `(key_id, nonce)` pairs until the request timestamp they were
//! sent with can no longer pass the skew check.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NonceState {
    /// Held by an in-flight verification
    Reserved,
    /// Used by an accepted request; blocks reuse through `expires_at`
    Committed { expires_at: DateTime<Utc> },
}

impl NonceState {
    fn blocks_at(&self, now: DateTime<Utc>) -> bool {
        match self {
            Self::Reserved => true,
            Self::Committed { expires_at } => now <= *expires_at,
        }
    }
}

type NonceKey = (String, String);

/// Concurrent TTL set of seen nonces, scoped per key
#[derive(Debug)]
pub struct NonceCache {
    entries: DashMap<NonceKey, NonceState>,
    purge_interval: Duration,
    last_purge: Mutex<Option<DateTime<Utc>>>,
}

impl NonceCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            purge_interval: Duration::minutes(5),
            last_purge: Mutex::new(None),
        }
    }

    pub fn with_purge_interval(mut self, interval: Duration) -> Self {
        self.purge_interval = interval;
        self
    }

    /// Atomically claim a nonce for one verification.
    ///
    /// Returns `None` when the nonce is already reserved or committed and
    /// not yet expired. The claim is released when the returned guard is
    /// dropped without [`NonceReservation::commit`].
    pub fn reserve(&self, key_id: &str, nonce: &str, now: DateTime<Utc>) -> Option<NonceReservation<'_>> {
        self.maybe_purge(now);

        let key = (key_id.to_string(), nonce.to_string());

        match self.entries.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                if entry.get().blocks_at(now) {
                    return None;
                }
                entry.insert(NonceState::Reserved);
            }
            Entry::Vacant(entry) => {
                entry.insert(NonceState::Reserved);
            }
        }

        Some(NonceReservation {
            cache: self,
            key,
            committed: false,
        })
    }

    /// Whether a nonce would currently be rejected as a replay
    pub fn contains(&self, key_id: &str, nonce: &str, now: DateTime<Utc>) -> bool {
        self.entries
            .get(&(key_id.to_string(), nonce.to_string()))
            .map(|state| state.blocks_at(now))
            .unwrap_or(false)
    }

    /// Drop committed nonces whose expiry has passed
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, state| state.blocks_at(now));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn maybe_purge(&self, now: DateTime<Utc>) {
        let due = {
            let mut last = self.last_purge.lock().unwrap_or_else(|e| e.into_inner());
            match *last {
                Some(at) if now - at < self.purge_interval => false,
                _ => {
                    *last = Some(now);
                    true
                }
            }
        };

        if due {
            let purged = self.purge_expired(now);
            if purged > 0 {
                tracing::debug!(purged = purged, "Purged expired nonces");
            }
        }
    }

    fn release(&self, key: &NonceKey) {
        self.entries
            .remove_if(key, |_, state| *state == NonceState::Reserved);
    }
}

impl Default for NonceCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Claim on a nonce held for the duration of one verification
#[derive(Debug)]
pub struct NonceReservation<'a> {
    cache: &'a NonceCache,
    key: NonceKey,
    committed: bool,
}

impl NonceReservation<'_> {
    /// Keep the nonce through `expires_at`
    pub fn commit(mut self, expires_at: DateTime<Utc>) {
        self.cache
            .entries
            .insert(self.key.clone(), NonceState::Committed { expires_at });
        self.committed = true;
    }
}

impl Drop for NonceReservation<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.cache.release(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_committed_nonce_blocks_reuse() {
        let cache = NonceCache::new();

        let reservation = cache.reserve("key-1", "n1", t0()).unwrap();
        reservation.commit(t0() + Duration::minutes(5));

        assert!(cache.reserve("key-1", "n1", t0()).is_none());
        assert!(cache.contains("key-1", "n1", t0() + Duration::minutes(4)));
    }

    #[test]
    fn test_nonce_scoped_per_key() {
        let cache = NonceCache::new();

        cache
            .reserve("key-1", "n1", t0())
            .unwrap()
            .commit(t0() + Duration::minutes(5));

        assert!(cache.reserve("key-2", "n1", t0()).is_some());
    }

    #[test]
    fn test_dropped_reservation_is_released() {
        let cache = NonceCache::new();

        {
            let _reservation = cache.reserve("key-1", "n1", t0()).unwrap();
            assert!(cache.reserve("key-1", "n1", t0()).is_none());
        }

        assert!(cache.is_empty());
        assert!(cache.reserve("key-1", "n1", t0()).is_some());
    }

    #[test]
    fn test_expired_nonce_can_be_reused() {
        let cache = NonceCache::new();
        let expiry = t0() + Duration::minutes(5);

        cache.reserve("key-1", "n1", t0()).unwrap().commit(expiry);

        // the last instant a timestamp still passes the skew check
        assert!(cache.reserve("key-1", "n1", expiry).is_none());
        assert!(cache.reserve("key-1", "n1", expiry + Duration::seconds(1)).is_some());
    }

    #[test]
    fn test_purge_expired() {
        let cache = NonceCache::new();

        cache
            .reserve("key-1", "n1", t0())
            .unwrap()
            .commit(t0() + Duration::minutes(1));
        cache
            .reserve("key-1", "n2", t0())
            .unwrap()
            .commit(t0() + Duration::minutes(10));

        assert_eq!(cache.purge_expired(t0() + Duration::minutes(2)), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_concurrent_reservations_yield_one_winner() {
        let cache = Arc::new(NonceCache::new());
        let barrier = Arc::new(std::sync::Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    match cache.reserve("key-1", "same", t0()) {
                        Some(reservation) => {
                            reservation.commit(t0() + Duration::minutes(5));
                            true
                        }
                        None => false,
                    }
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
    }
}
