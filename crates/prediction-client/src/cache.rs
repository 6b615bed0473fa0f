//! Single-slot TTL cache with an injectable clock.
//!
//! The upstream feeds refresh on a 5-minute cadence, so one global slot per
//! feed is enough. Reads race writes without coordination; refreshes are
//! idempotent overwrites, so the worst case is a redundant fetch.

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

/// Time source. Production uses [`SystemClock`]; tests drive a [`ManualClock`]
/// so TTL expiry is observable without sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for deterministic tests.
#[derive(Debug)]
pub struct ManualClock {
    now: std::sync::Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: std::sync::Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

struct Entry<T> {
    value: T,
    expires_at: DateTime<Utc>,
}

/// One cached value with wall-clock expiry.
pub struct TtlCache<T> {
    ttl: Duration,
    slot: RwLock<Option<Entry<T>>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::seconds(300)),
            slot: RwLock::new(None),
        }
    }

    /// Return the cached value if it has not expired at `now`.
    pub async fn get(&self, now: DateTime<Utc>) -> Option<T> {
        let slot = self.slot.read().await;
        slot.as_ref()
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.value.clone())
    }

    pub async fn put(&self, value: T, now: DateTime<Utc>) {
        let mut slot = self.slot.write().await;
        *slot = Some(Entry {
            value,
            expires_at: now + self.ttl,
        });
    }

    /// Manual invalidation.
    pub async fn clear(&self) {
        let mut slot = self.slot.write().await;
        *slot = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hit_within_ttl() {
        let clock = ManualClock::new(Utc::now());
        let cache = TtlCache::new(std::time::Duration::from_secs(300));

        cache.put(vec![1, 2, 3], clock.now()).await;
        clock.advance(Duration::seconds(299));
        assert_eq!(cache.get(clock.now()).await, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_expires_after_ttl() {
        let clock = ManualClock::new(Utc::now());
        let cache = TtlCache::new(std::time::Duration::from_secs(300));

        cache.put(vec![1], clock.now()).await;
        clock.advance(Duration::seconds(301));
        assert_eq!(cache.get(clock.now()).await, None);
    }

    #[tokio::test]
    async fn test_clear_invalidates() {
        let clock = ManualClock::new(Utc::now());
        let cache = TtlCache::new(std::time::Duration::from_secs(300));

        cache.put("cached".to_string(), clock.now()).await;
        cache.clear().await;
        assert_eq!(cache.get(clock.now()).await, None);
    }

    #[tokio::test]
    async fn test_refresh_extends_expiry() {
        let clock = ManualClock::new(Utc::now());
        let cache = TtlCache::new(std::time::Duration::from_secs(300));

        cache.put(1u32, clock.now()).await;
        clock.advance(Duration::seconds(200));
        cache.put(2u32, clock.now()).await;
        clock.advance(Duration::seconds(200));
        assert_eq!(cache.get(clock.now()).await, Some(2));
    }
}
