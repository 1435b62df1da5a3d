//! Value types shared across the navigation engine.

pub mod location;
pub mod progress;
pub mod route;
pub mod stop;

pub use location::{FixSource, LocationFix, Position};
pub use progress::ProgressState;
pub use route::{Leg, ManeuverKind, RouteModel, Step};
pub use stop::{Stop, StopKind};
