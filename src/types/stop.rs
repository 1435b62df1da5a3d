//! Pickup and drop stops of a trip.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::location::Position;

/// Whether a stop picks a passenger up or drops them off.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
pub enum StopKind {
    /// Passenger boards here.
    Pickup,
    /// Passenger leaves here.
    Drop,
}

impl std::fmt::Display for StopKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            StopKind::Pickup => write!(f, "pickup"),
            StopKind::Drop => write!(f, "drop"),
        }
    }
}

/// A pickup or drop point associated with a passenger.
///
/// Created when a trip is assigned its passenger list. Fulfillment is an
/// app-level action (the driver confirming the pickup/drop); it invalidates
/// the active route and triggers a fresh route request excluding completed
/// stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    /// Stable identifier of the stop.
    pub id: Uuid,

    /// Pickup or drop.
    pub kind: StopKind,

    /// Where the stop is.
    pub position: Position,

    /// Humanized address shown to dispatchers, when known.
    pub address: Option<String>,

    /// Whether the driver has confirmed this stop.
    pub fulfilled: bool,
}

impl Stop {
    /// Create an unfulfilled stop with a fresh identifier.
    pub fn new(kind: StopKind, position: Position) -> Self {
        Stop {
            id: Uuid::new_v4(),
            kind,
            position,
            address: None,
            fulfilled: false,
        }
    }

    /// Attach a humanized address.
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Mark the stop as confirmed by the driver.
    pub fn fulfill(&mut self) {
        self.fulfilled = true;
    }
}
