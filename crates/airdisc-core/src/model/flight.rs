// ── Flight input types ──
//
// Eligibility is decided upstream; the ledger only needs each flight's
// id and the endpoints and date of its legs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One leg of a booked flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightLeg {
    pub origin: String,
    pub destination: String,
    pub date: DateTime<Utc>,
}

/// A flight that has become eligible for a connection discount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectableFlight {
    pub id: String,
    pub legs: Vec<FlightLeg>,
}

impl ConnectableFlight {
    pub fn first_leg(&self) -> Option<&FlightLeg> {
        self.legs.first()
    }

    pub fn last_leg(&self) -> Option<&FlightLeg> {
        self.legs.last()
    }

    /// `"<first origin>-<last destination>"`, or `None` for a flight without legs.
    pub fn description(&self) -> Option<String> {
        let first = self.first_leg()?;
        let last = self.last_leg()?;
        Some(format!("{}-{}", first.origin, last.destination))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn leg(origin: &str, destination: &str) -> FlightLeg {
        FlightLeg {
            origin: origin.into(),
            destination: destination.into(),
            date: "2021-03-12T12:35:50.971Z".parse().unwrap(),
        }
    }

    #[test]
    fn description_spans_first_origin_to_last_destination() {
        let flight = ConnectableFlight {
            id: "flight-1".into(),
            legs: vec![leg("RKV", "AEY"), leg("AEY", "GRY")],
        };
        assert_eq!(flight.description().as_deref(), Some("RKV-GRY"));
    }

    #[test]
    fn description_without_legs_is_none() {
        let flight = ConnectableFlight {
            id: "flight-1".into(),
            legs: Vec::new(),
        };
        assert!(flight.description().is_none());
    }
}
