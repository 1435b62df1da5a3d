//! Smooths displayed positions between discrete fixes.
//!
//! Fixes arrive every few seconds; rendering a marker that teleports on
//! each one looks broken. Each tracked entity glides from its current
//! displayed position to the latest fix over a fixed wall-clock window.
//! A fix that arrives mid-transition restarts the glide from the current
//! interpolated position, never from the stale target.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::nav::geometry;
use crate::types::location::{LocationFix, Position};

/// Below this displacement a fix keeps the previous marker rotation.
const ROTATION_HOLD_THRESHOLD_METERS: f64 = 1.0;

/// A renderable position: smoothed coordinates plus marker rotation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DisplayedPosition {
    /// Interpolated coordinates.
    pub position: Position,

    /// Marker rotation in degrees `[0, 360)`, for directional icons.
    pub rotation_degrees: f64,
}

/// One in-flight glide towards the latest fix.
#[derive(Debug, Copy, Clone)]
struct Transition {
    from: Position,
    to: Position,
    rotation_degrees: f64,
    started_at: Instant,
}

/// Per-entity position smoothing over a fixed wall-clock window.
#[derive(Debug)]
pub struct PositionInterpolator {
    window: Duration,
    transitions: HashMap<String, Transition>,
}

impl PositionInterpolator {
    /// Create an interpolator gliding over `window` per fix.
    pub fn new(window: Duration) -> Self {
        PositionInterpolator {
            window,
            transitions: HashMap::new(),
        }
    }

    /// Create an interpolator from engine configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(Duration::from_millis(config.interpolation_window_ms))
    }

    /// Start a transition of `entity_id` towards `fix`.
    pub fn on_fix(&mut self, entity_id: &str, fix: &LocationFix) {
        self.on_fix_at(entity_id, fix, Instant::now());
    }

    /// Start a transition at an explicit instant. The previous transition
    /// is replaced; its current interpolated position becomes the new
    /// origin, so the marker never jumps.
    pub fn on_fix_at(&mut self, entity_id: &str, fix: &LocationFix, now: Instant) {
        let from = self
            .sample_at(entity_id, now)
            .map(|displayed| displayed.position)
            .unwrap_or(fix.position);

        let rotation_degrees = match fix.heading_degrees {
            Some(heading) => heading,
            None if geometry::distance_meters(&from, &fix.position)
                < ROTATION_HOLD_THRESHOLD_METERS =>
            {
                self.transitions
                    .get(entity_id)
                    .map(|t| t.rotation_degrees)
                    .unwrap_or(0.0)
            }
            None => geometry::initial_bearing_degrees(&from, &fix.position),
        };

        self.transitions.insert(
            entity_id.to_string(),
            Transition {
                from,
                to: fix.position,
                rotation_degrees,
                started_at: now,
            },
        );
    }

    /// Sample the displayed position of one entity now.
    pub fn sample(&self, entity_id: &str) -> Option<DisplayedPosition> {
        self.sample_at(entity_id, Instant::now())
    }

    /// Sample the displayed position of one entity at an explicit instant.
    pub fn sample_at(&self, entity_id: &str, now: Instant) -> Option<DisplayedPosition> {
        let transition = self.transitions.get(entity_id)?;

        let fraction = if self.window.is_zero() {
            1.0
        } else {
            (now.saturating_duration_since(transition.started_at)
                .as_secs_f64()
                / self.window.as_secs_f64())
            .min(1.0)
        };

        let latitude = transition.from.latitude()
            + (transition.to.latitude() - transition.from.latitude()) * fraction;
        let longitude = transition.from.longitude()
            + (transition.to.longitude() - transition.from.longitude()) * fraction;

        Some(DisplayedPosition {
            position: Position::new(latitude, longitude),
            rotation_degrees: transition.rotation_degrees,
        })
    }

    /// Sample every tracked entity now, ordered by entity id.
    pub fn sample_all(&self) -> Vec<(String, DisplayedPosition)> {
        self.sample_all_at(Instant::now())
    }

    /// Sample every tracked entity at an explicit instant, ordered by
    /// entity id.
    pub fn sample_all_at(&self, now: Instant) -> Vec<(String, DisplayedPosition)> {
        let mut samples: Vec<(String, DisplayedPosition)> = self
            .transitions
            .keys()
            .filter_map(|id| self.sample_at(id, now).map(|d| (id.clone(), d)))
            .collect();
        samples.sort_by(|a, b| a.0.cmp(&b.0));
        samples
    }

    /// Drop the transition of an entity that is no longer tracked.
    pub fn remove(&mut self, entity_id: &str) {
        self.transitions.remove(entity_id);
    }
}

/// Samples a shared interpolator once per animation tick and hands each
/// frame to a renderer callback.
///
/// The loop cooperatively yields between frames and never blocks fix
/// processing; cancelling the token stops it.
pub struct AnimationDriver {
    cancel: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
}

impl AnimationDriver {
    /// Spawn the animation loop on the current runtime.
    pub fn spawn<F>(
        interpolator: Arc<Mutex<PositionInterpolator>>,
        tick: Duration,
        mut on_frame: F,
    ) -> Self
    where
        F: FnMut(Vec<(String, DisplayedPosition)>) + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let child = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = interval.tick() => {
                        let frame = interpolator.lock().await.sample_all();
                        on_frame(frame);
                    }
                }
            }
        });

        AnimationDriver { cancel, handle }
    }

    /// Spawn the animation loop at the configured tick.
    pub fn spawn_from_config<F>(
        interpolator: Arc<Mutex<PositionInterpolator>>,
        config: &Config,
        on_frame: F,
    ) -> Self
    where
        F: FnMut(Vec<(String, DisplayedPosition)>) + Send + 'static,
    {
        Self::spawn(
            interpolator,
            Duration::from_millis(config.animation_tick_ms),
            on_frame,
        )
    }

    /// Request the loop to stop after the current frame.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Cancel and wait for the loop to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
    }
}
