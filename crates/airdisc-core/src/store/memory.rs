// ── In-process TTL cache ──
//
// `DashMap`-backed store with lazy expiry: an expired slot is dropped the
// next time it is read, or by `purge_expired()`. Values are held as JSON
// so what sits in memory is byte-for-byte what a shared cache would hold.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use tracing::trace;

use super::{CacheStore, CacheValue, StoreError};
use crate::clock::{Clock, SystemClock};

struct Slot {
    json: Vec<u8>,
    /// `None` = never expires.
    expires_at: Option<DateTime<Utc>>,
}

impl Slot {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// A lock-free, in-memory [`CacheStore`].
///
/// Cheaply cloneable; clones share the same slots and clock.
#[derive(Clone)]
pub struct MemoryStore {
    slots: Arc<DashMap<String, Slot>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            slots: Arc::new(DashMap::new()),
            clock,
        }
    }

    /// Number of slots held, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether `key` holds a live value.
    pub fn contains_key(&self, key: &str) -> bool {
        let now = self.clock.now();
        self.slots.get(key).is_some_and(|slot| slot.is_live(now))
    }

    /// Drop every expired slot. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.slots.len();
        self.slots.retain(|_, slot| slot.is_live(now));
        let purged = before.saturating_sub(self.slots.len());
        if purged > 0 {
            trace!(purged, "purged expired cache slots");
        }
        purged
    }

    fn write(&self, key: &str, value: &CacheValue, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = if ttl.is_zero() {
            None
        } else {
            let delta = TimeDelta::from_std(ttl).map_err(|_| StoreError::InvalidTtl {
                ttl_secs: ttl.as_secs(),
            })?;
            Some(
                self.clock
                    .now()
                    .checked_add_signed(delta)
                    .ok_or(StoreError::InvalidTtl {
                        ttl_secs: ttl.as_secs(),
                    })?,
            )
        };
        let json = serde_json::to_vec(value)?;
        self.slots.insert(key.to_owned(), Slot { json, expires_at });
        Ok(())
    }

    fn read(&self, key: &str) -> Result<Option<CacheValue>, StoreError> {
        let now = self.clock.now();
        if let Some(slot) = self.slots.get(key) {
            if slot.is_live(now) {
                return Ok(Some(serde_json::from_slice(&slot.json)?));
            }
        }
        // Expired (or absent): drop it unless a writer replaced it meanwhile.
        self.slots.remove_if(key, |_, slot| !slot.is_live(now));
        Ok(None)
    }

    fn remaining(&self, key: &str) -> Option<Duration> {
        let now = self.clock.now();
        let slot = self.slots.get(key)?;
        let expires_at = slot.expires_at?;
        if expires_at <= now {
            return None;
        }
        (expires_at - now).to_std().ok()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore for MemoryStore {
    async fn set(&self, key: &str, value: CacheValue, ttl: Duration) -> Result<(), StoreError> {
        self.write(key, &value, ttl)
    }

    async fn get(&self, key: &str) -> Result<Option<CacheValue>, StoreError> {
        self.read(key)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.slots.remove(key);
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        Ok(self.remaining(key))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn store_at(start: &str) -> (MemoryStore, ManualClock) {
        let clock = ManualClock::new(start.parse().unwrap());
        (MemoryStore::with_clock(Arc::new(clock.clone())), clock)
    }

    fn pointer(target: &str) -> CacheValue {
        CacheValue::Pointer(target.into())
    }

    #[test]
    fn get_returns_value_until_expiry() {
        let (store, clock) = store_at("2021-03-12T00:00:00Z");
        tokio_test::block_on(async {
            store
                .set("k", pointer("discount_id_1"), Duration::from_secs(60))
                .await
                .unwrap();
            assert_eq!(store.get("k").await.unwrap(), Some(pointer("discount_id_1")));

            clock.advance(Duration::from_secs(59));
            assert!(store.get("k").await.unwrap().is_some());

            clock.advance(Duration::from_secs(1));
            assert!(store.get("k").await.unwrap().is_none());
        });
        // The expired read dropped the slot.
        assert!(store.is_empty());
    }

    #[test]
    fn zero_ttl_never_expires() {
        let (store, clock) = store_at("2021-03-12T00:00:00Z");
        tokio_test::block_on(async {
            store.set("k", pointer("x"), Duration::ZERO).await.unwrap();
            clock.advance(Duration::from_secs(365 * 24 * 60 * 60));
            assert!(store.get("k").await.unwrap().is_some());
            assert_eq!(store.ttl("k").await.unwrap(), None);
        });
    }

    #[test]
    fn ttl_counts_down_and_is_none_when_absent() {
        let (store, clock) = store_at("2021-03-12T00:00:00Z");
        tokio_test::block_on(async {
            store
                .set("k", pointer("x"), Duration::from_secs(100))
                .await
                .unwrap();
            clock.advance(Duration::from_secs(40));
            assert_eq!(store.ttl("k").await.unwrap(), Some(Duration::from_secs(60)));

            store.delete("k").await.unwrap();
            assert_eq!(store.ttl("k").await.unwrap(), None);
            assert_eq!(store.ttl("missing").await.unwrap(), None);
        });
    }

    #[test]
    fn set_overwrites_value_and_expiry() {
        let (store, clock) = store_at("2021-03-12T00:00:00Z");
        tokio_test::block_on(async {
            store
                .set("k", pointer("a"), Duration::from_secs(10))
                .await
                .unwrap();
            store
                .set("k", pointer("b"), Duration::from_secs(100))
                .await
                .unwrap();
            clock.advance(Duration::from_secs(50));
            assert_eq!(store.get("k").await.unwrap(), Some(pointer("b")));
        });
    }

    #[test]
    fn purge_removes_only_expired_slots() {
        let (store, clock) = store_at("2021-03-12T00:00:00Z");
        tokio_test::block_on(async {
            store
                .set("short", pointer("a"), Duration::from_secs(10))
                .await
                .unwrap();
            store
                .set("long", pointer("b"), Duration::from_secs(1000))
                .await
                .unwrap();
        });
        clock.advance(Duration::from_secs(11));

        assert_eq!(store.len(), 2);
        assert_eq!(store.purge_expired(), 1);
        assert!(store.contains_key("long"));
        assert!(!store.contains_key("short"));
    }
}
