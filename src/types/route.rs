//! Route description types: maneuvers, steps, legs and route models.
//!
//! A [`RouteModel`] is an immutable description of one candidate route as
//! returned by the directions provider. Progress bookkeeping addresses steps
//! by their index in the flattened leg/step sequence.

use serde::{Deserialize, Serialize};

use crate::types::location::Position;

/// The kind of maneuver performed where a step begins.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone, Serialize, Deserialize)]
pub enum ManeuverKind {
    /// Left turn.
    TurnLeft,
    /// Right turn.
    TurnRight,
    /// Continue straight.
    Straight,
    /// Roundabout, leaving to the left.
    RoundaboutLeft,
    /// Roundabout, leaving to the right.
    RoundaboutRight,
    /// The provider reported no usable maneuver.
    Unknown,
}

/// Smallest guidance unit within a leg: one maneuver with its path segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Human readable instruction, e.g. "Turn left onto MG Road".
    pub instruction: String,

    /// Maneuver performed at the start of the step.
    pub maneuver: ManeuverKind,

    /// Length of the step in meters.
    pub distance_meters: f64,

    /// Static travel time over the step in seconds.
    pub duration_seconds: f64,

    /// Ordered polyline of the step. May be empty when the provider
    /// returned no geometry.
    pub path: Vec<Position>,

    /// Where the step ends.
    pub end_location: Position,
}

impl Step {
    /// Create a new step.
    pub fn new(
        instruction: impl Into<String>,
        maneuver: ManeuverKind,
        distance_meters: f64,
        duration_seconds: f64,
        path: Vec<Position>,
        end_location: Position,
    ) -> Self {
        Step {
            instruction: instruction.into(),
            maneuver,
            distance_meters,
            duration_seconds,
            path,
            end_location,
        }
    }
}

/// Ordered sequence of steps between two consecutive stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    /// Steps of the leg, in driving order.
    pub steps: Vec<Step>,

    /// Total length of the leg in meters, derived from its steps.
    pub distance_meters: f64,

    /// Static travel time of the leg in seconds, derived from its steps.
    pub duration_seconds: f64,

    /// Traffic-aware travel time when the provider reported one.
    pub duration_in_traffic_seconds: Option<f64>,

    /// Humanized address of the leg start, when known.
    pub start_address: Option<String>,

    /// Humanized address of the leg end, when known.
    pub end_address: Option<String>,
}

impl Leg {
    /// Create a leg from its steps, deriving distance and duration totals.
    pub fn new(steps: Vec<Step>, duration_in_traffic_seconds: Option<f64>) -> Self {
        let distance_meters = steps.iter().map(|s| s.distance_meters).sum();
        let duration_seconds = steps.iter().map(|s| s.duration_seconds).sum();
        Leg {
            steps,
            distance_meters,
            duration_seconds,
            duration_in_traffic_seconds,
            start_address: None,
            end_address: None,
        }
    }

    /// Attach provider-reported start/end addresses.
    pub fn with_addresses(
        mut self,
        start_address: impl Into<String>,
        end_address: impl Into<String>,
    ) -> Self {
        self.start_address = Some(start_address.into());
        self.end_address = Some(end_address.into());
        self
    }
}

/// One candidate route: ordered legs with derived totals.
///
/// Several alternatives may be returned together by the directions
/// provider; exactly one is selected at a time by the owning session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteModel {
    /// Short label for the route, e.g. the main road used.
    pub summary: String,

    /// Legs of the route, in driving order.
    pub legs: Vec<Leg>,

    total_distance_meters: f64,
    total_duration_seconds: f64,
}

impl RouteModel {
    /// Create a route model from its legs, deriving totals.
    pub fn new(summary: impl Into<String>, legs: Vec<Leg>) -> Self {
        let total_distance_meters = legs.iter().map(|l| l.distance_meters).sum();
        let total_duration_seconds = legs.iter().map(|l| l.duration_seconds).sum();
        RouteModel {
            summary: summary.into(),
            legs,
            total_distance_meters,
            total_duration_seconds,
        }
    }

    /// Total length of the route in meters.
    pub fn total_distance_meters(&self) -> f64 {
        self.total_distance_meters
    }

    /// Total static travel time of the route in seconds.
    pub fn total_duration_seconds(&self) -> f64 {
        self.total_duration_seconds
    }

    /// Traffic-aware total travel time in seconds.
    ///
    /// `None` when no leg reported a traffic-aware duration; legs without
    /// one contribute their static duration.
    pub fn traffic_aware_duration_seconds(&self) -> Option<f64> {
        if self.legs.iter().all(|l| l.duration_in_traffic_seconds.is_none()) {
            return None;
        }
        Some(
            self.legs
                .iter()
                .map(|l| l.duration_in_traffic_seconds.unwrap_or(l.duration_seconds))
                .sum(),
        )
    }

    /// Number of steps across all legs.
    pub fn step_count(&self) -> usize {
        self.legs.iter().map(|l| l.steps.len()).sum()
    }

    /// Whether the route carries any steps at all.
    pub fn is_empty(&self) -> bool {
        self.step_count() == 0
    }

    /// Iterate all steps in driving order.
    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.legs.iter().flat_map(|l| l.steps.iter())
    }

    /// The step at the given flattened index.
    pub fn step_at(&self, index: usize) -> Option<&Step> {
        self.steps().nth(index)
    }

    /// Index of the final step, `None` for an empty route.
    pub fn last_step_index(&self) -> Option<usize> {
        self.step_count().checked_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(distance: f64, duration: f64) -> Step {
        Step::new(
            "Head north",
            ManeuverKind::Straight,
            distance,
            duration,
            vec![],
            Position::new(0.0, 0.0),
        )
    }

    #[test]
    fn test_route_totals_derived_from_legs() {
        let route = RouteModel::new(
            "MG Road",
            vec![
                Leg::new(vec![step(500.0, 60.0), step(300.0, 45.0)], Some(150.0)),
                Leg::new(vec![step(200.0, 30.0)], None),
            ],
        );

        assert_eq!(route.total_distance_meters(), 1000.0);
        assert_eq!(route.total_duration_seconds(), 135.0);
        assert_eq!(route.step_count(), 3);
        assert_eq!(route.last_step_index(), Some(2));
        // second leg has no traffic data and contributes its static time
        assert_eq!(route.traffic_aware_duration_seconds(), Some(180.0));
    }

    #[test]
    fn test_route_without_traffic_data() {
        let route = RouteModel::new("MG Road", vec![Leg::new(vec![step(500.0, 60.0)], None)]);
        assert_eq!(route.traffic_aware_duration_seconds(), None);
    }

    #[test]
    fn test_flattened_step_indexing() {
        let route = RouteModel::new(
            "MG Road",
            vec![
                Leg::new(vec![step(500.0, 60.0)], None),
                Leg::new(vec![step(300.0, 45.0), step(200.0, 30.0)], None),
            ],
        );

        assert_eq!(route.step_at(1).map(|s| s.distance_meters), Some(300.0));
        assert_eq!(route.step_at(3), None);

        let empty = RouteModel::new("", vec![]);
        assert!(empty.is_empty());
        assert_eq!(empty.last_step_index(), None);
    }
}
