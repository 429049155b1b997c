//! Parameter definitions with physical units and documented semantics.
//!
//! All magic numbers are extracted here with:
//! - Physical units (seconds, milliseconds, Hz, etc.)
//! - Documented ranges and meanings
//! - Type safety where possible

mod analysis;
mod audio;
mod intro;

// Re-export all types
pub use analysis::AnalysisConfig;
pub use audio::{audio_constants, AmbienceParams, DroneParams, FadeParams, ShimmerParams, WindParams};
pub use intro::{IntroConfig, PhaseStep, ScheduleVariant, SESSION_KEY};
