// ── Discount ledger ──
//
// Issues, resolves, redeems and reactivates discount codes. All state
// lives in the cache as a small pointer graph:
//
//   discount_user_lookup_<nationalId> ─┐
//   discount_code_lookup_<code>       ─┼─> discount_id_<uuid>  (DiscountEntry)
//   connection_discount_<code>        ─┤
//   discount_flight_lookup_<flightId> ─┘   (only between use and reactivate)
//
// Every operation is a sequence of single-key store calls. There is no
// transaction around them; a failure midway leaves the earlier writes.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::code::{RandomSource, ThreadRandom, generate_code};
use crate::config::LedgerConfig;
use crate::error::CoreError;
use crate::model::{ConnectableFlight, ConnectionDiscountCode, Discount, DiscountEntry, FlightLeg};
use crate::store::{CacheKey, CacheStore, CacheValue};

/// Which code a redemption consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscountKind {
    /// The entry's primary code. Redemption hides the whole entry from
    /// national-ID lookups until it is reactivated.
    Primary,
    /// One connection code. Redemption removes just that code.
    Connection,
}

/// Stateless facade over a [`CacheStore`].
pub struct DiscountLedger<S> {
    store: S,
    config: LedgerConfig,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
}

impl<S: CacheStore> DiscountLedger<S> {
    pub fn new(store: S, config: LedgerConfig) -> Self {
        Self {
            store,
            config,
            clock: Arc::new(SystemClock),
            random: Arc::new(ThreadRandom),
        }
    }

    /// Use `clock` for validity-window checks.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Draw codes from `random` instead of the thread RNG.
    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // ── Issuance ─────────────────────────────────────────────────────

    /// Issue a new primary code for `national_id`, plus one connection code
    /// for every flight in `flights` not already covered by the holder's
    /// previous entry.
    ///
    /// Still-valid connection codes from the previous entry are carried
    /// forward. The previous entry and its primary code are left to expire.
    pub async fn issue_discount(
        &self,
        national_id: &str,
        flights: Vec<ConnectableFlight>,
    ) -> Result<Discount, CoreError> {
        let discount_code = generate_code(self.random.as_ref());
        let entry_key = CacheKey::new_entry();
        let ttl = self.config.entry_ttl;

        let mut connection_codes = match self.resolve(&CacheKey::user_lookup(national_id)).await? {
            Some(previous_key) => self
                .load_entry(&previous_key)
                .await?
                .map(|previous| previous.connection_discount_codes)
                .unwrap_or_default(),
            None => Vec::new(),
        };
        let mut covered: HashSet<String> =
            connection_codes.iter().map(|c| c.flight_id.clone()).collect();

        for flight in flights {
            if !covered.insert(flight.id.clone()) {
                continue;
            }
            let (Some(first), Some(last), Some(flight_desc)) =
                (flight.first_leg(), flight.last_leg(), flight.description())
            else {
                warn!(flight_id = %flight.id, "connectable flight has no legs; skipping");
                continue;
            };
            let valid_until = self.connection_valid_until(first, last);

            let code = generate_code(self.random.as_ref());
            self.store
                .set(
                    CacheKey::connection(&code).as_str(),
                    CacheValue::pointer(&entry_key),
                    ttl,
                )
                .await?;

            connection_codes.push(ConnectionDiscountCode {
                code,
                flight_id: flight.id,
                flight_desc,
                valid_until,
            });
        }

        let now = self.clock.now();
        connection_codes.retain(|c| c.is_valid_at(now));

        let entry = DiscountEntry {
            national_id: national_id.to_owned(),
            discount_code,
            connection_discount_codes: connection_codes,
        };

        self.store
            .set(entry_key.as_str(), CacheValue::Entry(entry.clone()), ttl)
            .await?;
        self.store
            .set(
                CacheKey::code_lookup(&entry.discount_code).as_str(),
                CacheValue::pointer(&entry_key),
                ttl,
            )
            .await?;
        self.store
            .set(
                CacheKey::user_lookup(national_id).as_str(),
                CacheValue::pointer(&entry_key),
                ttl,
            )
            .await?;

        debug!(
            national_id,
            entry_key = %entry_key,
            connection_codes = entry.connection_discount_codes.len(),
            "issued discount"
        );

        Ok(Discount {
            entry,
            expires_in: Some(ttl.as_secs()),
        })
    }

    /// A connection code is valid from issuance until the first leg's date.
    /// Flights leaving Reykjavík get the grace period on top; flights
    /// arriving there do not.
    fn connection_valid_until(&self, first: &FlightLeg, last: &FlightLeg) -> DateTime<Utc> {
        if self.config.is_reykjavik(&first.origin) {
            first
                .date
                .checked_add_signed(self.config.connecting_flight_grace_period)
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
        } else {
            if self.config.is_reykjavik(&last.destination) {
                debug!(destination = %last.destination, "inbound connection; no grace period");
            }
            first.date
        }
    }

    // ── Lookups ──────────────────────────────────────────────────────

    /// The holder's current discount, or `None` once its primary code has
    /// been redeemed (until reactivation).
    pub async fn discount_by_national_id(
        &self,
        national_id: &str,
    ) -> Result<Option<Discount>, CoreError> {
        let user_key = CacheKey::user_lookup(national_id);
        let Some(entry_key) = self.resolve(&user_key).await? else {
            return Ok(None);
        };
        let Some(entry) = self.load_entry(&entry_key).await? else {
            return Ok(None);
        };
        if self
            .resolve(&CacheKey::code_lookup(&entry.discount_code))
            .await?
            .is_none()
        {
            debug!(national_id, "primary code no longer live; hiding entry");
            return Ok(None);
        }

        let expires_in = self.ttl_secs(&user_key).await?;
        Ok(Some(self.visible(entry, expires_in)))
    }

    /// Resolve a primary code, falling back to treating it as a connection
    /// code.
    pub async fn discount_by_code(&self, code: &str) -> Result<Option<Discount>, CoreError> {
        let code_key = CacheKey::code_lookup(code);
        let Some(entry_key) = self.resolve(&code_key).await? else {
            return self.discount_by_connection_code(code).await;
        };
        let Some(entry) = self.load_entry(&entry_key).await? else {
            return Ok(None);
        };

        let expires_in = self.ttl_secs(&code_key).await?;
        Ok(Some(self.visible(entry, expires_in)))
    }

    /// Resolve a connection code to the full entry it belongs to. Expired
    /// codes resolve to `None`.
    pub async fn discount_by_connection_code(
        &self,
        code: &str,
    ) -> Result<Option<Discount>, CoreError> {
        let connection_key = CacheKey::connection(code);
        let Some(entry_key) = self.resolve(&connection_key).await? else {
            return Ok(None);
        };
        let Some(entry) = self.load_entry(&entry_key).await? else {
            return Ok(None);
        };
        let now = self.clock.now();
        if !entry.has_valid_connection_code(code, now) {
            debug!(code, "connection code expired or not in entry");
            return Ok(None);
        }

        let expires_in = self.ttl_secs(&connection_key).await?;
        Ok(Some(Discount {
            entry: entry.without_expired(now),
            expires_in,
        }))
    }

    // ── Redemption ───────────────────────────────────────────────────

    /// Redeem `code`.
    ///
    /// A connection code is removed from the holder's entry. A primary code
    /// loses its lookup pointer and is parked under `flight_id` so a failed
    /// payment can [`reactivate`](Self::reactivate_discount) it. Unknown
    /// codes are ignored.
    pub async fn use_discount(
        &self,
        code: &str,
        national_id: &str,
        flight_id: &str,
        kind: DiscountKind,
    ) -> Result<(), CoreError> {
        match kind {
            DiscountKind::Connection => self.use_connection_code(code, national_id).await,
            DiscountKind::Primary => self.use_primary_code(code, flight_id).await,
        }
    }

    async fn use_connection_code(&self, code: &str, national_id: &str) -> Result<(), CoreError> {
        let Some(entry_key) = self.resolve(&CacheKey::user_lookup(national_id)).await? else {
            return Ok(());
        };
        let Some(mut entry) = self.load_entry(&entry_key).await? else {
            return Ok(());
        };
        let Some(position) = entry
            .connection_discount_codes
            .iter()
            .position(|c| c.code == code)
        else {
            debug!(code, national_id, "connection code not in entry; nothing to redeem");
            return Ok(());
        };

        let used = entry.connection_discount_codes.remove(position);
        self.store
            .delete(CacheKey::connection(&used.code).as_str())
            .await?;

        let ttl = self.remaining_ttl(&entry_key).await?;
        self.store
            .set(entry_key.as_str(), CacheValue::Entry(entry), ttl)
            .await?;

        debug!(code, flight_id = %used.flight_id, "redeemed connection code");
        Ok(())
    }

    async fn use_primary_code(&self, code: &str, flight_id: &str) -> Result<(), CoreError> {
        let code_key = CacheKey::code_lookup(code);
        let Some(entry_key) = self.resolve(&code_key).await? else {
            debug!(code, "primary code not live; nothing to redeem");
            return Ok(());
        };

        // Captured before the delete: a deleted key has no TTL left to read.
        let ttl = self.remaining_ttl(&code_key).await?;
        self.store.delete(code_key.as_str()).await?;
        self.store
            .set(
                CacheKey::flight_lookup(flight_id).as_str(),
                CacheValue::pointer(&entry_key),
                ttl,
            )
            .await?;

        debug!(code, flight_id, ttl_secs = ttl.as_secs(), "redeemed primary code");
        Ok(())
    }

    // ── Reactivation ─────────────────────────────────────────────────

    /// Undo a primary redemption after the booking for `flight_id` failed
    /// payment. Restores the entry and its code and national-ID pointers
    /// under the entry's remaining TTL. Nothing else is reconciled.
    pub async fn reactivate_discount(&self, flight_id: &str) -> Result<(), CoreError> {
        let flight_key = CacheKey::flight_lookup(flight_id);
        let Some(entry_key) = self.resolve(&flight_key).await? else {
            return Ok(());
        };
        self.store.delete(flight_key.as_str()).await?;

        let Some(entry) = self.load_entry(&entry_key).await? else {
            debug!(flight_id, "redeemed entry already expired; nothing to reactivate");
            return Ok(());
        };
        let ttl = self.remaining_ttl(&entry_key).await?;

        self.store
            .set(entry_key.as_str(), CacheValue::Entry(entry.clone()), ttl)
            .await?;
        self.store
            .set(
                CacheKey::code_lookup(&entry.discount_code).as_str(),
                CacheValue::pointer(&entry_key),
                ttl,
            )
            .await?;
        self.store
            .set(
                CacheKey::user_lookup(&entry.national_id).as_str(),
                CacheValue::pointer(&entry_key),
                ttl,
            )
            .await?;

        debug!(flight_id, discount_code = %entry.discount_code, "reactivated discount");
        Ok(())
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// What a lookup hands back: expired connection codes are hidden, the
    /// stored entry keeps them until the next issuance prunes it.
    fn visible(&self, entry: DiscountEntry, expires_in: Option<u64>) -> Discount {
        Discount {
            entry: entry.without_expired(self.clock.now()),
            expires_in,
        }
    }

    /// Follow one pointer hop.
    async fn resolve(&self, key: &CacheKey) -> Result<Option<CacheKey>, CoreError> {
        match self.store.get(key.as_str()).await? {
            None => Ok(None),
            Some(value) => value.into_pointer().map(Some).ok_or_else(|| {
                warn!(key = %key, "expected a pointer, found an entry");
                CoreError::UnexpectedValue {
                    key: key.to_string(),
                    expected: "pointer",
                }
            }),
        }
    }

    async fn load_entry(&self, key: &CacheKey) -> Result<Option<DiscountEntry>, CoreError> {
        match self.store.get(key.as_str()).await? {
            None => Ok(None),
            Some(value) => value.into_entry().map(Some).ok_or_else(|| {
                warn!(key = %key, "expected a discount entry, found a pointer");
                CoreError::UnexpectedValue {
                    key: key.to_string(),
                    expected: "discount entry",
                }
            }),
        }
    }

    async fn ttl_secs(&self, key: &CacheKey) -> Result<Option<u64>, CoreError> {
        Ok(self
            .store
            .ttl(key.as_str())
            .await?
            .map(|ttl| ttl.as_secs()))
    }

    /// TTL left on `key`, or the configured entry TTL when the store has
    /// none to report.
    async fn remaining_ttl(&self, key: &CacheKey) -> Result<Duration, CoreError> {
        Ok(self
            .store
            .ttl(key.as_str())
            .await?
            .unwrap_or(self.config.entry_ttl))
    }
}
