// ── Cache key shapes ──
//
// Every key the ledger touches is built here, so the prefixes live in
// one place.

use std::fmt;

use uuid::Uuid;

const USER_LOOKUP_PREFIX: &str = "discount_user_lookup_";
const ENTRY_PREFIX: &str = "discount_id_";
const CODE_LOOKUP_PREFIX: &str = "discount_code_lookup_";
const CONNECTION_PREFIX: &str = "connection_discount_";
const FLIGHT_LOOKUP_PREFIX: &str = "discount_flight_lookup_";

/// A fully rendered cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// `discount_user_lookup_<nationalId>` → entry key.
    pub fn user_lookup(national_id: &str) -> Self {
        Self(format!("{USER_LOOKUP_PREFIX}{national_id}"))
    }

    /// A freshly allocated `discount_id_<uuid>` entry key.
    pub fn new_entry() -> Self {
        Self(format!("{ENTRY_PREFIX}{}", Uuid::new_v4()))
    }

    /// `discount_code_lookup_<code>` → entry key.
    pub fn code_lookup(discount_code: &str) -> Self {
        Self(format!("{CODE_LOOKUP_PREFIX}{discount_code}"))
    }

    /// `connection_discount_<code>` → entry key.
    pub fn connection(connection_code: &str) -> Self {
        Self(format!("{CONNECTION_PREFIX}{connection_code}"))
    }

    /// `discount_flight_lookup_<flightId>` → entry key, held between
    /// redemption and reactivation.
    pub fn flight_lookup(flight_id: &str) -> Self {
        Self(format!("{FLIGHT_LOOKUP_PREFIX}{flight_id}"))
    }

    /// Wrap a key read back out of a pointer value.
    pub fn from_pointer(raw: String) -> Self {
        Self(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_entry(&self) -> bool {
        self.0.starts_with(ENTRY_PREFIX)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
