//! Live navigation engine: step matching, progress accounting, guidance
//! announcements, marker interpolation and the per-trip route session.

#[macro_use]
pub mod macros;

pub mod announce;
pub mod geometry;
pub mod interpolator;
pub mod progress;
pub mod session;
pub mod step_matcher;
