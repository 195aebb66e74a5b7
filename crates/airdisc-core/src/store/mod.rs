// ── Cache store abstraction ──
//
// The ledger sees the cache as flat string keys with per-key expiry.
// Each individual call is atomic; nothing spans more than one key.

mod keys;
mod memory;

pub use keys::CacheKey;
pub use memory::MemoryStore;

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::DiscountEntry;

/// The two value shapes the ledger ever writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CacheValue {
    /// A discount record, stored under `discount_id_*`.
    Entry(DiscountEntry),
    /// The key of another value, usually a `discount_id_*` key.
    Pointer(String),
}

impl CacheValue {
    pub fn pointer(target: &CacheKey) -> Self {
        Self::Pointer(target.as_str().to_owned())
    }

    pub fn into_entry(self) -> Option<DiscountEntry> {
        match self {
            Self::Entry(entry) => Some(entry),
            Self::Pointer(_) => None,
        }
    }

    pub fn into_pointer(self) -> Option<CacheKey> {
        match self {
            Self::Pointer(target) => Some(CacheKey::from_pointer(target)),
            Self::Entry(_) => None,
        }
    }
}

/// Failures reported by a [`CacheStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Cache store unavailable: {message}")]
    Unavailable { message: String },

    #[error("TTL of {ttl_secs}s is out of range")]
    InvalidTtl { ttl_secs: u64 },

    #[error("Cache value serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Key-value store with per-key expiry.
///
/// A `ttl` of zero on `set` means the key never expires. `ttl` returns
/// `None` for keys that are absent or have no expiry.
pub trait CacheStore: Send + Sync {
    fn set(
        &self,
        key: &str,
        value: CacheValue,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn get(&self, key: &str) -> impl Future<Output = Result<Option<CacheValue>, StoreError>> + Send;

    fn delete(&self, key: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn ttl(&self, key: &str) -> impl Future<Output = Result<Option<Duration>, StoreError>> + Send;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn values_are_tagged_on_the_wire() {
        let pointer = CacheValue::Pointer("discount_id_abc".into());
        let json = serde_json::to_value(&pointer).unwrap();
        assert_eq!(json["kind"], "pointer");
        assert_eq!(json["value"], "discount_id_abc");

        let back: CacheValue = serde_json::from_value(json).unwrap();
        assert_eq!(back.into_pointer().unwrap().as_str(), "discount_id_abc");
    }

    #[test]
    fn shape_accessors_reject_the_other_variant() {
        let pointer = CacheValue::Pointer("discount_id_abc".into());
        assert!(pointer.into_entry().is_none());
    }
}
