//! Turn-by-turn guidance announcements.
//!
//! The scheduler guarantees at most one announcement per step index per
//! route selection; the ledger is cleared whenever the selected route
//! changes.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use lazy_static::lazy_static;

use crate::types::route::{ManeuverKind, RouteModel, Step};

lazy_static! {
    /// Spoken fallback phrases for steps without instruction text.
    static ref MANEUVER_PHRASES: HashMap<ManeuverKind, &'static str> = {
        let mut phrases = HashMap::new();
        phrases.insert(ManeuverKind::TurnLeft, "Turn left");
        phrases.insert(ManeuverKind::TurnRight, "Turn right");
        phrases.insert(ManeuverKind::Straight, "Continue straight");
        phrases.insert(ManeuverKind::RoundaboutLeft, "Take the roundabout to the left");
        phrases.insert(ManeuverKind::RoundaboutRight, "Take the roundabout to the right");
        phrases.insert(ManeuverKind::Unknown, "Proceed along the route");
        phrases
    };
}

/// Below this step length the distance prefix is dropped; the maneuver is
/// immediate.
const ANNOUNCE_IMMEDIATE_THRESHOLD_METERS: f64 = 20.0;

/// Errors raised by a speech sink.
#[derive(Debug, PartialEq, Clone)]
pub enum SpeechError {
    /// Speech synthesis is not supported on this device.
    Unavailable,
    /// Synthesis failed mid-utterance.
    Failed(String),
}

impl std::fmt::Display for SpeechError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SpeechError::Unavailable => write!(f, "Speech synthesis unavailable"),
            SpeechError::Failed(reason) => write!(f, "Speech synthesis failed: {}", reason),
        }
    }
}

impl std::error::Error for SpeechError {}

/// Vocalizes guidance text.
///
/// Sink failures are non-fatal: the announcement text stays available
/// visually and the error is only logged.
pub trait SpeechSink: Send + Sync {
    /// Speak one utterance.
    fn speak(&self, text: &str) -> Result<(), SpeechError>;
}

/// Decides, on step-index change, whether to emit a guidance announcement.
pub struct AnnouncementScheduler {
    announced: HashSet<usize>,
    last_index: Option<usize>,
    sink: Option<Arc<dyn SpeechSink>>,
}

impl AnnouncementScheduler {
    /// Create a scheduler, optionally wired to a speech sink.
    pub fn new(sink: Option<Arc<dyn SpeechSink>>) -> Self {
        AnnouncementScheduler {
            announced: HashSet::new(),
            last_index: None,
            sink,
        }
    }

    /// Called with every accepted step index.
    ///
    /// Returns the announcement text when one fires: the index differs
    /// from the previous call and has not been announced for the current
    /// route selection. Idempotent on repeated calls with the same index.
    pub fn on_step_changed(&mut self, route: &RouteModel, new_index: usize) -> Option<String> {
        if self.last_index == Some(new_index) {
            return None;
        }
        self.last_index = Some(new_index);

        if self.announced.contains(&new_index) {
            return None;
        }

        let step = route.step_at(new_index)?;
        let text = announcement_text(step);
        self.announced.insert(new_index);

        if let Some(sink) = &self.sink {
            if let Err(e) = sink.speak(&text) {
                nav_warn!("(on_step_changed) speech sink failed: {}. Continuing.", e);
            }
        }

        Some(text)
    }

    /// Forget everything announced; called when the route selection
    /// changes (new RouteModel or alternative switch).
    pub fn clear(&mut self) {
        self.announced.clear();
        self.last_index = None;
    }
}

/// Step instruction with a distance-to-maneuver phrase.
fn announcement_text(step: &Step) -> String {
    let instruction = if step.instruction.is_empty() {
        MANEUVER_PHRASES
            .get(&step.maneuver)
            .copied()
            .unwrap_or("Proceed along the route")
            .to_string()
    } else {
        step.instruction.clone()
    };

    if step.distance_meters < ANNOUNCE_IMMEDIATE_THRESHOLD_METERS {
        return instruction;
    }

    format!(
        "In {} meters, {}",
        step.distance_meters.round() as i64,
        lowercase_first(&instruction)
    )
}

fn lowercase_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
