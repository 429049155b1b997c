//! The threshold intro: a one-time-per-session animated gate in front of the site.

mod sequencer;

pub use sequencer::{ExitReason, IntroSequencer, IntroState};
