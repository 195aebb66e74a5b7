// ── Domain model ──
//
// Records stored in the cache and the flight shapes handed in by the
// flight domain.

pub mod discount;
pub mod flight;

pub use discount::{ConnectionDiscountCode, Discount, DiscountEntry};
pub use flight::{ConnectableFlight, FlightLeg};
