//! Read-side TTL caches
//!
//! Not correctness-critical: writers always go through the actor to
//! storage, and every successful mutation invalidates the affected
//! entries before the mutating call returns. Readers may therefore see
//! a snapshot at most one TTL old, never a stale post-write value.

use dashmap::DashMap;
use parking_lot::RwLock;
use std::time::{Duration, Instant};

/// Per-user cache with a fixed TTL
pub(crate) struct TtlCache<V> {
    entries: DashMap<u64, (V, Instant)>,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn get(&self, user: u64) -> Option<V> {
        let hit = self.entries.get(&user)?;
        let (value, inserted_at) = hit.value();
        if inserted_at.elapsed() > self.ttl {
            drop(hit);
            self.entries.remove(&user);
            return None;
        }
        Some(value.clone())
    }

    pub fn put(&self, user: u64, value: V) {
        self.entries.insert(user, (value, Instant::now()));
    }

    pub fn invalidate(&self, user: u64) {
        self.entries.remove(&user);
    }
}

/// Single-slot snapshot cache (leaderboards)
pub(crate) struct SnapshotCache<V> {
    slot: RwLock<Option<(V, Instant)>>,
    ttl: Duration,
}

impl<V: Clone> SnapshotCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slot: RwLock::new(None),
            ttl,
        }
    }

    pub fn get(&self) -> Option<V> {
        let slot = self.slot.read();
        let (value, refreshed_at) = slot.as_ref()?;
        if refreshed_at.elapsed() > self.ttl {
            return None;
        }
        Some(value.clone())
    }

    pub fn put(&self, value: V) {
        *self.slot.write() = Some((value, Instant::now()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_cache_hit_and_invalidate() {
        let cache = TtlCache::new(Duration::from_secs(30));
        cache.put(1, "a");
        assert_eq!(cache.get(1), Some("a"));

        cache.invalidate(1);
        assert_eq!(cache.get(1), None);
    }

    #[test]
    fn ttl_cache_expires() {
        let cache = TtlCache::new(Duration::from_millis(10));
        cache.put(1, 42u64);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.get(1), None);
    }

    #[test]
    fn snapshot_cache_expires() {
        let cache = SnapshotCache::new(Duration::from_millis(10));
        cache.put(7u32);
        assert_eq!(cache.get(), Some(7));
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.get(), None);
    }
}
