//! Derives completed/remaining distance and the remaining-time estimate
//! from the current step index and the route model.

use crate::types::progress::ProgressState;
use crate::types::route::RouteModel;

/// Recompute progress for `route` at `step_index`.
///
/// Completed distance sums every step below the index; remaining distance
/// is the total minus completed, so the two always add up to the route
/// total. The remaining-time estimate uses the traffic-aware leg duration
/// where the provider reported one, the static duration otherwise; the
/// partially-driven current leg contributes its static per-step tail
/// scaled by the leg's traffic ratio.
///
/// Called on every accepted match and immediately after any route
/// replacement (baseline reset to index 0 of the new model). An index
/// past the final step is clamped defensively.
pub fn update(route: &RouteModel, step_index: usize) -> ProgressState {
    let step_count = route.step_count();
    if step_count == 0 {
        return ProgressState::default();
    }

    let index = step_index.min(step_count - 1);

    let completed_distance_meters: f64 = route
        .steps()
        .take(index)
        .map(|step| step.distance_meters)
        .sum();
    let remaining_distance_meters = route.total_distance_meters() - completed_distance_meters;

    let mut estimated_remaining_seconds = 0.0;
    let mut offset = 0;
    for leg in &route.legs {
        let leg_start = offset;
        let leg_end = offset + leg.steps.len();
        offset = leg_end;

        if leg_end <= index {
            // fully driven
            continue;
        }
        if leg_start >= index {
            // fully ahead
            estimated_remaining_seconds += leg
                .duration_in_traffic_seconds
                .unwrap_or(leg.duration_seconds);
            continue;
        }

        // current leg: static tail, scaled by the traffic ratio when known
        let tail: f64 = leg.steps[index - leg_start..]
            .iter()
            .map(|step| step.duration_seconds)
            .sum();
        let scale = match leg.duration_in_traffic_seconds {
            Some(traffic) if leg.duration_seconds > 0.0 => traffic / leg.duration_seconds,
            _ => 1.0,
        };
        estimated_remaining_seconds += tail * scale;
    }

    ProgressState {
        current_step_index: index,
        completed_distance_meters,
        remaining_distance_meters,
        estimated_remaining_seconds,
    }
}
