/// test utilities. Provides log macros and deterministic route and fix
/// builders shared by the unit tests.
use chrono::{DateTime, TimeZone, Utc};

use crate::types::location::{LocationFix, Position};
use crate::types::route::{Leg, ManeuverKind, RouteModel, Step};

macro_rules! ut_debug {
    ($($arg:tt)+) => {
        log::debug!(target: "test", $($arg)+)
    };
}

macro_rules! ut_info {
    ($($arg:tt)+) => {
        log::info!(target: "test", $($arg)+)
    };
}

macro_rules! ut_warn {
    ($($arg:tt)+) => {
        log::warn!(target: "test", $($arg)+)
    };
}

macro_rules! ut_error {
    ($($arg:tt)+) => {
        log::error!(target: "test", $($arg)+)
    };
}

/// Meters covered by one degree of longitude on the equator, for the
/// 6371 km mean earth radius the engine's haversine uses.
pub const METERS_PER_DEGREE: f64 = 111_194.926_644_558_73;

/// Epoch all test fixes are timestamped relative to.
const TEST_EPOCH_SECONDS: i64 = 1_700_000_000;

/// A position `meters_east` along the equator from the test origin.
pub fn equator_position(meters_east: f64) -> Position {
    Position::new(0.0, meters_east / METERS_PER_DEGREE)
}

/// A fix `meters_east` along the equator, `at_seconds` after the test
/// epoch, heading east at cruising speed.
pub fn equator_fix(meters_east: f64, at_seconds: i64) -> LocationFix {
    LocationFix::new(
        equator_position(meters_east),
        Some(90.0),
        10.0,
        test_timestamp(at_seconds),
    )
}

/// A timestamp `at_seconds` after the test epoch.
pub fn test_timestamp(at_seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(TEST_EPOCH_SECONDS + at_seconds, 0)
        .single()
        .expect("valid test timestamp")
}

/// One leg of three steps of 500 m, 300 m and 200 m along the equator,
/// with contiguous path geometry.
pub fn route_500_300_200() -> RouteModel {
    let steps = vec![
        Step::new(
            "Head east",
            ManeuverKind::Straight,
            500.0,
            50.0,
            vec![equator_position(0.0), equator_position(500.0)],
            equator_position(500.0),
        ),
        Step::new(
            "Turn right at the market",
            ManeuverKind::TurnRight,
            300.0,
            30.0,
            vec![equator_position(500.0), equator_position(800.0)],
            equator_position(800.0),
        ),
        Step::new(
            "Arrive at the drop point",
            ManeuverKind::Straight,
            200.0,
            20.0,
            vec![equator_position(800.0), equator_position(1000.0)],
            equator_position(1000.0),
        ),
    ];
    RouteModel::new("Equator Road", vec![Leg::new(steps, None)])
}
