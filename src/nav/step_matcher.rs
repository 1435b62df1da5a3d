//! Maps a location fix to the most plausible current step of a route.

use crate::config::Config;
use crate::nav::geometry;
use crate::types::location::LocationFix;
use crate::types::route::RouteModel;

/// A fix within this distance of a step's end point is attributed to the
/// following step; the maneuver is behind the vehicle at that point.
const STEP_BOUNDARY_EPSILON_METERS: f64 = 1.0;

/// Result of matching one fix against the active route.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MatchOutcome {
    /// Flattened index of the matched step.
    pub step_index: usize,

    /// `false` when the route carried no geometry to match against: the
    /// "no-route" guidance state, rendered as a generic proceed-to-route
    /// message.
    pub on_route: bool,
}

/// How a candidate index was found.
#[derive(Debug, Copy, Clone, PartialEq)]
enum MatchMethod {
    /// The fix lies on the step's polyline within tolerance.
    OnEdge,
    /// Fallback: the step's end point is the nearest of all steps.
    NearestEnd,
}

/// Matches fixes to steps, enforcing monotone step progression.
///
/// The matched index may only move backward when the fix is unambiguously
/// on an earlier step's path more than `backward_jump_min_steps` behind;
/// anything else is treated as GPS noise and clamped to the previous
/// index, keeping completed-distance accounting monotone.
#[derive(Debug, Copy, Clone)]
pub struct StepMatcher {
    on_edge_tolerance_meters: f64,
    backward_jump_min_steps: usize,
}

impl StepMatcher {
    /// Create a matcher with explicit thresholds.
    pub fn new(on_edge_tolerance_meters: f64, backward_jump_min_steps: usize) -> Self {
        StepMatcher {
            on_edge_tolerance_meters,
            backward_jump_min_steps,
        }
    }

    /// Create a matcher from engine configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.on_edge_tolerance_meters,
            config.backward_jump_min_steps,
        )
    }

    /// Match `fix` against `route`, given the previously accepted index.
    pub fn match_step(
        &self,
        route: &RouteModel,
        fix: &LocationFix,
        previous_index: usize,
    ) -> MatchOutcome {
        if route.is_empty() {
            nav_debug!("(match_step) route has no steps, holding index 0.");
            return MatchOutcome {
                step_index: 0,
                on_route: false,
            };
        }

        let (candidate, method) = self.raw_match(route, fix);
        let step_index = self.clamp(candidate, method, previous_index);
        MatchOutcome {
            step_index,
            on_route: true,
        }
    }

    /// On-edge scan in route order, then nearest-end-point fallback.
    fn raw_match(&self, route: &RouteModel, fix: &LocationFix) -> (usize, MatchMethod) {
        let step_count = route.step_count();
        for (index, step) in route.steps().enumerate() {
            let Some(distance) = geometry::distance_to_path_meters(&fix.position, &step.path)
            else {
                continue;
            };
            if distance > self.on_edge_tolerance_meters {
                continue;
            }
            // At the step boundary the maneuver is already behind the
            // vehicle; attribute the fix to the following step.
            let to_end = geometry::distance_meters(&fix.position, &step.end_location);
            if to_end <= STEP_BOUNDARY_EPSILON_METERS && index + 1 < step_count {
                return (index + 1, MatchMethod::OnEdge);
            }
            return (index, MatchMethod::OnEdge);
        }

        // ties keep the earliest step
        let mut best_index = 0;
        let mut best_distance = f64::INFINITY;
        for (index, step) in route.steps().enumerate() {
            let distance = geometry::distance_meters(&fix.position, &step.end_location);
            if distance < best_distance {
                best_index = index;
                best_distance = distance;
            }
        }
        (best_index, MatchMethod::NearestEnd)
    }

    fn clamp(&self, candidate: usize, method: MatchMethod, previous_index: usize) -> usize {
        if candidate >= previous_index {
            return candidate;
        }

        let jump = previous_index - candidate;
        if method == MatchMethod::OnEdge && jump > self.backward_jump_min_steps {
            nav_info!(
                "(match_step) accepting backward jump {} -> {}.",
                previous_index,
                candidate
            );
            candidate
        } else {
            nav_debug!(
                "(match_step) clamping backward match {} to {}.",
                candidate,
                previous_index
            );
            previous_index
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{equator_fix, equator_position, route_500_300_200};
    use crate::types::location::Position;
    use crate::types::route::{Leg, ManeuverKind, RouteModel, Step};

    fn matcher() -> StepMatcher {
        StepMatcher::new(50.0, 1)
    }

    #[test]
    fn test_on_path_fix_matches_its_step() {
        let route = route_500_300_200();

        // mid-step fixes land on their own step
        assert_eq!(
            matcher()
                .match_step(&route, &equator_fix(250.0, 0), 0)
                .step_index,
            0
        );
        assert_eq!(
            matcher()
                .match_step(&route, &equator_fix(650.0, 0), 1)
                .step_index,
            1
        );
        assert_eq!(
            matcher()
                .match_step(&route, &equator_fix(900.0, 0), 2)
                .step_index,
            2
        );
    }

    #[test]
    fn test_step_boundary_advances_to_next_step() {
        let route = route_500_300_200();

        // exactly at step 0's end point: the turn is behind the vehicle
        let outcome = matcher().match_step(&route, &equator_fix(500.0, 0), 0);
        assert_eq!(outcome.step_index, 1);
        assert!(outcome.on_route);

        // the final step's end point has no successor to hand over to
        let outcome = matcher().match_step(&route, &equator_fix(1000.0, 0), 2);
        assert_eq!(outcome.step_index, 2);
    }

    #[test]
    fn test_nearest_endpoint_fallback_off_route() {
        let route = route_500_300_200();

        // 200 m north of the corridor, past the 800 m mark: closest end
        // point is step 2's at 1000 m east
        let off = LocationFix::new(
            Position::new(200.0 / crate::test_util::METERS_PER_DEGREE, equator_position(950.0).longitude()),
            None,
            0.0,
            chrono::Utc::now(),
        );
        let outcome = matcher().match_step(&route, &off, 2);
        assert_eq!(outcome.step_index, 2);
        assert!(outcome.on_route);
    }

    #[test]
    fn test_noise_backward_jump_is_clamped() {
        let route = route_500_300_200();

        // one step behind, even on-edge: clamped
        let outcome = matcher().match_step(&route, &equator_fix(650.0, 0), 2);
        assert_eq!(outcome.step_index, 2);
    }

    #[test]
    fn test_unambiguous_backward_jump_is_accepted() {
        let route = route_500_300_200();

        // two steps behind and on step 0's path: accepted
        let outcome = matcher().match_step(&route, &equator_fix(250.0, 0), 2);
        assert_eq!(outcome.step_index, 0);
    }

    #[test]
    fn test_off_route_backward_match_is_clamped() {
        let route = route_500_300_200();

        // nearest-endpoint matches (fix way off route, closest to step 0's
        // end) are never allowed to move the index backward
        let off = LocationFix::new(
            Position::new(0.05, equator_position(500.0).longitude()),
            None,
            0.0,
            chrono::Utc::now(),
        );
        let outcome = matcher().match_step(&route, &off, 2);
        assert_eq!(outcome.step_index, 2);
    }

    #[test]
    fn test_empty_route_yields_no_route_state() {
        let route = RouteModel::new("", vec![]);
        let outcome = matcher().match_step(&route, &equator_fix(0.0, 0), 0);
        assert_eq!(outcome.step_index, 0);
        assert!(!outcome.on_route);
    }

    #[test]
    fn test_step_without_geometry_matched_by_end_point() {
        // a single step whose path the provider dropped
        let end = equator_position(100.0);
        let step = Step::new("Head east", ManeuverKind::Straight, 100.0, 10.0, vec![], end);
        let route = RouteModel::new("", vec![Leg::new(vec![step], None)]);

        let outcome = matcher().match_step(&route, &equator_fix(90.0, 0), 0);
        assert_eq!(outcome.step_index, 0);
        assert!(outcome.on_route);
    }
}
