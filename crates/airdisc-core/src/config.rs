// ── Ledger runtime configuration ──
//
// Constants the flight domain hands to the ledger. Core never reads
// config files; `airdisc-config` builds a `LedgerConfig` and passes it in.

use std::time::Duration;

use chrono::TimeDelta;

/// Lifetime of a freshly issued discount (one day).
pub const DEFAULT_ENTRY_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Extra validity given to a connection code whose flight departs from
/// Reykjavík.
pub const DEFAULT_GRACE_PERIOD_HOURS: i64 = 48;

/// Airport codes treated as the Reykjavík area.
pub const DEFAULT_REYKJAVIK_AIRPORT_CODES: [&str; 2] = ["RKV", "REK"];

/// Configuration for a [`DiscountLedger`](crate::DiscountLedger).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// TTL applied to the entry and every pointer written at issuance.
    pub entry_ttl: Duration,
    /// Added to the first leg's date when the flight leaves Reykjavík.
    pub connecting_flight_grace_period: TimeDelta,
    /// Airport codes considered to be in the Reykjavík area.
    pub reykjavik_airport_codes: Vec<String>,
}

impl LedgerConfig {
    /// Whether `airport` is one of the configured Reykjavík-area codes.
    pub fn is_reykjavik(&self, airport: &str) -> bool {
        self.reykjavik_airport_codes
            .iter()
            .any(|code| code.eq_ignore_ascii_case(airport))
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            entry_ttl: DEFAULT_ENTRY_TTL,
            connecting_flight_grace_period: TimeDelta::hours(DEFAULT_GRACE_PERIOD_HOURS),
            reykjavik_airport_codes: DEFAULT_REYKJAVIK_AIRPORT_CODES
                .iter()
                .map(|code| (*code).to_owned())
                .collect(),
        }
    }
}
