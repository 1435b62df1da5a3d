//! Implementation of the Haversine formula for calculating the distance
//! between two points on a sphere, plus the small amount of spherical
//! geometry step matching needs.
//!
//! See [Wikipedia](https://en.wikipedia.org/wiki/Haversine_formula) for
//! more.
//!
//! **Distances are returned in meters**.

use crate::types::location::Position;

/// Mean earth radius in meters.
const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Calculate the distance between two points on a sphere.
///
/// # Notes
/// The formula does ***not*** take altitude into account; road vehicles
/// don't need it.
pub fn distance_meters(start: &Position, end: &Position) -> f64 {
    let d_lat = (end.latitude() - start.latitude()).to_radians();
    let d_lon = (end.longitude() - start.longitude()).to_radians();
    let lat1 = start.latitude().to_radians();
    let lat2 = end.latitude().to_radians();

    let a = ((d_lat / 2.0).sin()) * ((d_lat / 2.0).sin())
        + ((d_lon / 2.0).sin()) * ((d_lon / 2.0).sin()) * (lat1.cos()) * (lat2.cos());
    let c = 2.0 * ((a.sqrt()).atan2((1.0 - a).sqrt()));

    EARTH_RADIUS_METERS * c
}

/// Initial bearing from `start` towards `end`, in degrees `[0, 360)`.
pub fn initial_bearing_degrees(start: &Position, end: &Position) -> f64 {
    let lat1 = start.latitude().to_radians();
    let lat2 = end.latitude().to_radians();
    let d_lon = (end.longitude() - start.longitude()).to_radians();

    let y = d_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();

    y.atan2(x).to_degrees().rem_euclid(360.0)
}

/// Shortest distance from `point` to the polyline `path`.
///
/// Returns `None` when the path has no points. A single-point path
/// degenerates to the distance to that point.
pub fn distance_to_path_meters(point: &Position, path: &[Position]) -> Option<f64> {
    match path {
        [] => None,
        [only] => Some(distance_meters(point, only)),
        _ => Some(
            path.windows(2)
                .map(|pair| distance_to_segment_meters(point, &pair[0], &pair[1]))
                .fold(f64::INFINITY, f64::min),
        ),
    }
}

/// Distance from `point` to the segment `a`-`b`.
///
/// Uses an equirectangular projection centered on `a`; accurate to well
/// below the matching tolerance for segment lengths that occur in road
/// step polylines.
fn distance_to_segment_meters(point: &Position, a: &Position, b: &Position) -> f64 {
    let scale = a.latitude().to_radians().cos();

    let bx = (b.longitude() - a.longitude()).to_radians() * scale * EARTH_RADIUS_METERS;
    let by = (b.latitude() - a.latitude()).to_radians() * EARTH_RADIUS_METERS;
    let px = (point.longitude() - a.longitude()).to_radians() * scale * EARTH_RADIUS_METERS;
    let py = (point.latitude() - a.latitude()).to_radians() * EARTH_RADIUS_METERS;

    let length_squared = bx * bx + by * by;
    if length_squared == 0.0 {
        return distance_meters(point, a);
    }

    let t = ((px * bx + py * by) / length_squared).clamp(0.0, 1.0);
    let dx = px - t * bx;
    let dy = py - t * by;

    (dx * dx + dy * dy).sqrt()
}

#[cfg(test)]
pub mod geometry_test {
    use super::*;

    #[test]
    fn haversine_distance_in_meters() {
        let start = Position::new(38.898556, -77.037852);
        let end = Position::new(38.897147, -77.043934);
        let distance = distance_meters(&start, &end);
        assert!((distance - 549.6).abs() < 1.0, "got {}", distance);
    }

    #[test]
    fn bearing_cardinal_directions() {
        let origin = Position::new(0.0, 0.0);
        assert!((initial_bearing_degrees(&origin, &Position::new(1.0, 0.0)) - 0.0).abs() < 1e-6);
        assert!((initial_bearing_degrees(&origin, &Position::new(0.0, 1.0)) - 90.0).abs() < 1e-6);
        assert!((initial_bearing_degrees(&origin, &Position::new(-1.0, 0.0)) - 180.0).abs() < 1e-6);
        assert!((initial_bearing_degrees(&origin, &Position::new(0.0, -1.0)) - 270.0).abs() < 1e-6);
    }

    #[test]
    fn distance_to_segment() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(0.0, 0.001);

        // on the segment
        let on = Position::new(0.0, 0.0005);
        assert!(distance_to_segment_meters(&on, &a, &b) < 0.01);

        // 0.0001 deg of latitude is roughly 11.1 m off the segment
        let off = Position::new(0.0001, 0.0005);
        let d = distance_to_segment_meters(&off, &a, &b);
        assert!((d - 11.1).abs() < 0.5, "got {}", d);

        // beyond the end the distance is to the endpoint
        let past = Position::new(0.0, 0.002);
        let d = distance_to_segment_meters(&past, &a, &b);
        assert!((d - distance_meters(&past, &b)).abs() < 0.01);
    }

    #[test]
    fn distance_to_path() {
        let path = vec![
            Position::new(0.0, 0.0),
            Position::new(0.0, 0.001),
            Position::new(0.001, 0.001),
        ];
        let point = Position::new(0.0005, 0.001);
        let d = distance_to_path_meters(&point, &path).unwrap();
        assert!(d < 0.01, "got {}", d);

        assert!(distance_to_path_meters(&point, &[]).is_none());

        let single = distance_to_path_meters(&point, &path[..1]).unwrap();
        assert!((single - distance_meters(&point, &path[0])).abs() < 0.01);
    }
}
