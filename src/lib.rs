//! The Manifestorium threshold: a timed, once-per-session intro sequence
//! with a procedural ambient soundscape.

pub mod audio;
pub mod cli;
pub mod error;
pub mod intro;
pub mod params;
pub mod session;
pub mod timing;
