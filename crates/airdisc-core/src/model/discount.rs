// ── Discount records ──
//
// `DiscountEntry` is the payload stored under `discount_id_<uuid>`. Field
// names are camelCase on the wire so entries written by other services
// sharing the cache stay readable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A secondary code tied to one connectable flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDiscountCode {
    pub code: String,
    pub flight_id: String,
    /// `"<origin>-<destination>"` label shown to the user.
    pub flight_desc: String,
    pub valid_until: DateTime<Utc>,
}

impl ConnectionDiscountCode {
    /// A code is usable strictly before its `valid_until` instant.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.valid_until > now
    }
}

/// Everything issued to one national ID in a single issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountEntry {
    pub national_id: String,
    pub discount_code: String,
    #[serde(default)]
    pub connection_discount_codes: Vec<ConnectionDiscountCode>,
}

impl DiscountEntry {
    /// This entry with every connection code past its `valid_until` dropped.
    pub fn without_expired(mut self, now: DateTime<Utc>) -> Self {
        self.connection_discount_codes.retain(|c| c.is_valid_at(now));
        self
    }

    /// Whether `code` is one of this entry's connection codes and still valid.
    pub fn has_valid_connection_code(&self, code: &str, now: DateTime<Utc>) -> bool {
        self.connection_discount_codes
            .iter()
            .any(|c| c.code == code && c.is_valid_at(now))
    }
}

/// A resolved discount, as handed back to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Discount {
    #[serde(flatten)]
    pub entry: DiscountEntry,
    /// Seconds left on the cache key the discount was resolved through.
    /// `None` when the store reported no expiry.
    pub expires_in: Option<u64>,
}

impl Discount {
    pub fn discount_code(&self) -> &str {
        &self.entry.discount_code
    }

    pub fn national_id(&self) -> &str {
        &self.entry.national_id
    }

    pub fn connection_discount_codes(&self) -> &[ConnectionDiscountCode] {
        &self.entry.connection_discount_codes
    }
}
