//! Struct definitions and implementations for [`Position`] and
//! [`LocationFix`].

use chrono::{DateTime, Utc};
use geo::Point;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// A [`Position`] is an interface type that represents a geographic
/// location of an object. Typically, this type is used in tandem with
/// the [`Step`](`super::route::Step`) and [`Stop`](`super::stop::Stop`)
/// types.
///
/// `f64` values are used; step matching works at meter scale and needs
/// more headroom than the ~1 m error margin of single precision.
#[derive(Debug, PartialEq, Hash, Eq, Copy, Clone, Serialize, Deserialize)]
pub struct Position {
    /// The latitude of the position.
    pub latitude: OrderedFloat<f64>,

    /// The longitude of the position.
    pub longitude: OrderedFloat<f64>,
}

impl Position {
    /// Create a new position from raw coordinates.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Position {
            latitude: OrderedFloat(latitude),
            longitude: OrderedFloat(longitude),
        }
    }

    /// The latitude as a plain float.
    pub fn latitude(&self) -> f64 {
        self.latitude.into_inner()
    }

    /// The longitude as a plain float.
    pub fn longitude(&self) -> f64 {
        self.longitude.into_inner()
    }
}

impl From<Position> for Point<f64> {
    fn from(position: Position) -> Self {
        Point::new(position.longitude(), position.latitude())
    }
}

/// Origin of a GPS observation.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
pub enum FixSource {
    /// Straight from the device sensor.
    Raw,

    /// Already snapped to a road by the location provider.
    Snapped,
}

/// A single timestamped GPS observation.
///
/// Immutable once created; the engine consumes a fix and discards it once
/// its interpolation window has passed.
#[derive(Debug, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct LocationFix {
    /// Observed coordinates.
    pub position: Position,

    /// Heading over ground in degrees, normalized to `[0, 360)`.
    /// `None` when the device could not determine one.
    pub heading_degrees: Option<f64>,

    /// Speed over ground in meters per second, never negative.
    pub speed_mps: f64,

    /// Device timestamp of the observation.
    pub timestamp: DateTime<Utc>,

    /// Whether the coordinates are raw or road-snapped.
    pub source: FixSource,
}

impl LocationFix {
    /// Create a raw fix, normalizing heading and speed.
    pub fn new(
        position: Position,
        heading_degrees: Option<f64>,
        speed_mps: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        LocationFix {
            position,
            heading_degrees: heading_degrees.map(|h| h.rem_euclid(360.0)),
            speed_mps: speed_mps.max(0.0),
            timestamp,
            source: FixSource::Raw,
        }
    }

    /// Mark the fix as road-snapped by the provider.
    pub fn snapped(mut self) -> Self {
        self.source = FixSource::Snapped;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_to_point() {
        let position = Position::new(12.9716, 77.5946);
        let point: Point<f64> = position.into();
        assert_eq!(point.x(), 77.5946);
        assert_eq!(point.y(), 12.9716);
    }

    #[test]
    fn test_fix_normalizes_heading_and_speed() {
        let fix = LocationFix::new(
            Position::new(12.9716, 77.5946),
            Some(-90.0),
            -3.0,
            Utc::now(),
        );
        assert_eq!(fix.heading_degrees, Some(270.0));
        assert_eq!(fix.speed_mps, 0.0);
        assert_eq!(fix.source, FixSource::Raw);

        let fix = fix.snapped();
        assert_eq!(fix.source, FixSource::Snapped);
    }
}
