//! Mock provider implementations. Provides deterministic fabricated
//! routes, speech capture and scripted location streams so sessions can
//! be exercised without a mapping vendor.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use rand::Rng;

use crate::nav::announce::{SpeechError, SpeechSink};
use crate::nav::geometry;
use crate::provider::{DirectionsProvider, LocationSource, ProviderError, RouteRequest};
use crate::types::location::{LocationFix, Position};
use crate::types::route::{Leg, ManeuverKind, RouteModel, Step};

/// Assumed cruise speed of a mock cab in meters per second.
const MOCK_CRUISE_SPEED_M_PER_S: f64 = 10.0;

/// Jitter applied to fabricated mid-path vertices, in degrees. Small
/// enough to stay well inside any sane on-edge tolerance.
const MOCK_PATH_JITTER_DEGREES: f64 = 0.000002;

/// Traffic inflation applied to fabricated leg durations.
const MOCK_TRAFFIC_FACTOR: f64 = 1.2;

/// A directions provider that fabricates straight-line routes.
///
/// Each consecutive pair of points (origin, waypoints, destination)
/// becomes one leg, subdivided into equally long steps. Failures can be
/// queued to exercise retry paths, and an artificial delay can be set to
/// exercise stale-response handling.
pub struct MockDirections {
    failures: Mutex<VecDeque<ProviderError>>,
    route_requests: AtomicUsize,
    alternatives: usize,
    steps_per_leg: usize,
    delay: Option<Duration>,
}

impl MockDirections {
    /// A provider fabricating two alternatives with three steps per leg.
    pub fn new() -> Self {
        MockDirections {
            failures: Mutex::new(VecDeque::new()),
            route_requests: AtomicUsize::new(0),
            alternatives: 2,
            steps_per_leg: 3,
            delay: None,
        }
    }

    /// Override the number of fabricated alternatives.
    pub fn with_alternatives(mut self, count: usize) -> Self {
        self.alternatives = count;
        self
    }

    /// Override the number of steps per fabricated leg.
    pub fn with_steps_per_leg(mut self, count: usize) -> Self {
        self.steps_per_leg = count.max(1);
        self
    }

    /// Delay every route computation, simulating network latency.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a failure for the next route computation.
    pub fn fail_next(&self, error: ProviderError) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push_back(error);
        }
    }

    /// How many route computations were requested.
    pub fn route_requests(&self) -> usize {
        self.route_requests.load(Ordering::SeqCst)
    }

    fn fabricate_route(&self, request: &RouteRequest, alternative: usize) -> RouteModel {
        let mut points = vec![request.origin];
        points.extend(request.waypoints.iter().copied());
        points.push(request.destination);

        // later alternatives are slightly slower variants of the same line
        let slowdown = 1.0 + 0.2 * alternative as f64;
        let mut rng = rand::thread_rng();

        let legs = points
            .windows(2)
            .enumerate()
            .map(|(leg_index, pair)| {
                let steps = (0..self.steps_per_leg)
                    .map(|step_index| {
                        let start = lerp(
                            &pair[0],
                            &pair[1],
                            step_index as f64 / self.steps_per_leg as f64,
                        );
                        let end = lerp(
                            &pair[0],
                            &pair[1],
                            (step_index + 1) as f64 / self.steps_per_leg as f64,
                        );
                        let mut mid = lerp(&start, &end, 0.5);
                        mid = Position::new(
                            mid.latitude()
                                + rng.gen_range(-MOCK_PATH_JITTER_DEGREES..=MOCK_PATH_JITTER_DEGREES),
                            mid.longitude()
                                + rng.gen_range(-MOCK_PATH_JITTER_DEGREES..=MOCK_PATH_JITTER_DEGREES),
                        );

                        let distance = geometry::distance_meters(&start, &end);
                        let instruction = if step_index == 0 {
                            format!("Head towards stop {}", leg_index + 1)
                        } else if step_index == self.steps_per_leg - 1 {
                            format!("Arrive at stop {}", leg_index + 1)
                        } else {
                            String::from("Continue")
                        };
                        Step::new(
                            instruction,
                            ManeuverKind::Straight,
                            distance,
                            distance / MOCK_CRUISE_SPEED_M_PER_S * slowdown,
                            vec![start, mid, end],
                            end,
                        )
                    })
                    .collect::<Vec<Step>>();

                let static_duration: f64 = steps.iter().map(|s| s.duration_seconds).sum();
                Leg::new(steps, Some(static_duration * MOCK_TRAFFIC_FACTOR)).with_addresses(
                    format!("Mock point {}", leg_index),
                    format!("Mock point {}", leg_index + 1),
                )
            })
            .collect::<Vec<Leg>>();

        RouteModel::new(format!("Mock Road {}", alternative), legs)
    }
}

impl Default for MockDirections {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DirectionsProvider for MockDirections {
    async fn compute_route(&self, request: RouteRequest) -> Result<Vec<RouteModel>, ProviderError> {
        self.route_requests.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self.failures.lock().ok().and_then(|mut f| f.pop_front());
        if let Some(error) = failure {
            provider_warn!("(compute_route) mock failing as scripted: {}", error);
            return Err(error);
        }

        let count = if request.provide_alternatives {
            self.alternatives.max(1)
        } else {
            1
        };
        let routes = (0..count)
            .map(|alternative| self.fabricate_route(&request, alternative))
            .collect::<Vec<RouteModel>>();

        provider_debug!(
            "(compute_route) fabricated {} route(s) over {} waypoint(s).",
            routes.len(),
            request.waypoints.len()
        );
        Ok(routes)
    }

    async fn reverse_geocode(&self, position: Position) -> Result<String, ProviderError> {
        Ok(format!(
            "Near {:.4}, {:.4}",
            position.latitude(),
            position.longitude()
        ))
    }
}

fn lerp(a: &Position, b: &Position, fraction: f64) -> Position {
    Position::new(
        a.latitude() + (b.latitude() - a.latitude()) * fraction,
        a.longitude() + (b.longitude() - a.longitude()) * fraction,
    )
}

/// A speech sink that records utterances instead of vocalizing them.
pub struct MockSpeech {
    spoken: Mutex<Vec<String>>,
    fail: bool,
}

impl MockSpeech {
    /// A sink that accepts every utterance.
    pub fn new() -> Self {
        MockSpeech {
            spoken: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// A sink on a device without speech synthesis.
    pub fn failing() -> Self {
        MockSpeech {
            spoken: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Everything spoken so far.
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Default for MockSpeech {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechSink for MockSpeech {
    fn speak(&self, text: &str) -> Result<(), SpeechError> {
        if self.fail {
            return Err(SpeechError::Unavailable);
        }
        if let Ok(mut spoken) = self.spoken.lock() {
            spoken.push(text.to_string());
        }
        Ok(())
    }
}

/// A location source replaying a scripted sequence of fixes.
pub struct MockLocationSource {
    fixes: Vec<LocationFix>,
}

impl MockLocationSource {
    /// Replay `fixes` in order.
    pub fn new(fixes: Vec<LocationFix>) -> Self {
        MockLocationSource { fixes }
    }
}

#[async_trait]
impl LocationSource for MockLocationSource {
    async fn current_position(&self) -> Result<LocationFix, ProviderError> {
        self.fixes.first().copied().ok_or(ProviderError::ClientError)
    }

    fn subscribe(&self) -> BoxStream<'static, LocationFix> {
        futures::stream::iter(self.fixes.clone()).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::equator_position;

    fn request() -> RouteRequest {
        RouteRequest {
            origin: equator_position(0.0),
            destination: equator_position(1000.0),
            waypoints: vec![equator_position(500.0)],
            optimize_waypoints: true,
            provide_alternatives: true,
        }
    }

    #[tokio::test]
    async fn test_fabricated_route_shape() {
        crate::get_log_handle().await;
        ut_info!("Start.");

        let provider = MockDirections::new();
        let routes = provider.compute_route(request()).await.unwrap();

        assert_eq!(routes.len(), 2);
        let route = &routes[0];
        assert_eq!(route.legs.len(), 2);
        assert_eq!(route.step_count(), 6);
        assert!((route.total_distance_meters() - 1000.0).abs() < 2.0);

        // alternatives share geometry but drive slower
        assert!(routes[1].total_duration_seconds() > route.total_duration_seconds());

        ut_info!("Success.");
    }

    #[tokio::test]
    async fn test_scripted_failure_then_success() {
        crate::get_log_handle().await;
        ut_info!("Start.");

        let provider = MockDirections::new();
        provider.fail_next(ProviderError::NoRouteFound);

        assert_eq!(
            provider.compute_route(request()).await,
            Err(ProviderError::NoRouteFound)
        );
        assert!(provider.compute_route(request()).await.is_ok());
        assert_eq!(provider.route_requests(), 2);

        ut_info!("Success.");
    }

    #[tokio::test]
    async fn test_location_source_replays_fixes() {
        use futures::StreamExt;

        let fixes = vec![
            crate::test_util::equator_fix(0.0, 0),
            crate::test_util::equator_fix(10.0, 4),
        ];
        let source = MockLocationSource::new(fixes.clone());

        assert_eq!(source.current_position().await.unwrap(), fixes[0]);

        let collected = source.subscribe().collect::<Vec<LocationFix>>().await;
        assert_eq!(collected, fixes);
    }
}
