//! Procedural ambient audio.
//!
//! A small node graph ([`AudioContext`]) renders the wind, drone and shimmer
//! layers through one master gain. [`AmbientEngine`] owns one graph at a time
//! and plays it through an [`AudioBackend`].

mod analysis;
mod context;
mod dsp;
mod engine;
mod layers;
mod output;
mod render;

// Re-export public types
pub use analysis::{analyze, SpectrumBands};
pub use context::{AudioContext, NodeId, ParamKind, Playback, SharedContext, Target};
pub use dsp::{brown_noise, FilterKind};
pub use engine::{Ambience, AmbientEngine, Silence};
pub use layers::{drone, shimmer, wind, LayerBuilder, LAYERS};
pub use output::{AudioBackend, CpalBackend, OfflineBackend, OutputHandle};
pub use render::{render_ambience, write_wav};
