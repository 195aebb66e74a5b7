//! Discount-code ledger for the air discount scheme.
//!
//! This crate owns the issuance and redemption state machine that sits on
//! top of a shared key-value cache with per-key expiry:
//!
//! - **[`DiscountLedger`]**: Issues a primary discount code for a national
//!   ID together with one connection code per newly connectable flight, and
//!   resolves, redeems and reactivates those codes through a graph of cache
//!   pointers (`discount_user_lookup_*`, `discount_code_lookup_*`,
//!   `connection_discount_*`, `discount_flight_lookup_*` → `discount_id_*`).
//!
//! - **[`CacheStore`]**: The only external capability the ledger needs:
//!   async `set` / `get` / `delete` / `ttl`. [`MemoryStore`] is a
//!   `DashMap`-backed implementation with lazy expiry, used in tests and for
//!   single-process deployments.
//!
//! - **Code generation** ([`code`]): 8-character human-friendly codes drawn
//!   from `1-9`, `A-N` and `P-Z`, through an injectable [`RandomSource`].
//!
//! - **Time** ([`clock`]): The ledger and the memory store read "now" from a
//!   shared [`Clock`], so validity windows and TTLs can be driven by tests.
//!
//! The ledger itself is stateless. Each operation is a sequence of
//! independent store calls with no transaction around them; a failure part
//! way through leaves whatever was already written.

pub mod clock;
pub mod code;
pub mod config;
pub mod error;
pub mod ledger;
pub mod model;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use clock::{Clock, ManualClock, SystemClock};
pub use code::{RandomSource, SequenceRandom, ThreadRandom, generate_code};
pub use config::LedgerConfig;
pub use error::CoreError;
pub use ledger::{DiscountKind, DiscountLedger};
pub use store::{CacheKey, CacheStore, CacheValue, MemoryStore, StoreError};

pub use model::{ConnectableFlight, ConnectionDiscountCode, Discount, DiscountEntry, FlightLeg};
