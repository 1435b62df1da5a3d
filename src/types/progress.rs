//! Route progress snapshot.

use serde::{Deserialize, Serialize};

/// Progress of a session along its selected route.
///
/// Owned exclusively by the session; recomputed by the progress
/// accumulator on every accepted step match and after any route
/// replacement. `completed + remaining == total` holds within a
/// floating-point epsilon at all times.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProgressState {
    /// Index of the current step in the flattened step sequence.
    /// Advances monotonically under normal operation.
    pub current_step_index: usize,

    /// Meters of route already driven.
    pub completed_distance_meters: f64,

    /// Meters of route still ahead.
    pub remaining_distance_meters: f64,

    /// Estimated seconds until the final stop, traffic-aware when the
    /// provider reported traffic data.
    pub estimated_remaining_seconds: f64,
}
