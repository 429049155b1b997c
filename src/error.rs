//! Error types for the threshold intro and its audio engine.

use thiserror::Error;

use crate::audio::NodeId;

/// Errors raised while wiring or mutating an audio graph.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    /// The node id does not belong to this context.
    #[error("unknown audio node {0:?}")]
    UnknownNode(NodeId),

    /// The connection would feed a node back into itself.
    #[error("connecting {from:?} -> {to:?} would create a cycle")]
    Cycle { from: NodeId, to: NodeId },

    /// The parameter slot does not exist on the target node.
    #[error("node {node:?} has no parameter {param}")]
    UnknownParam { node: NodeId, param: &'static str },

    /// A node's output goes either to audio inputs or to parameters, not both.
    #[error("node {0:?} cannot feed both audio inputs and parameters")]
    MixedRouting(NodeId),

    /// The context has been closed; no further mutation is possible.
    #[error("audio context is closed")]
    Closed,
}

/// Errors raised by the ambient audio engine and its output backends.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output device found")]
    NoOutputDevice,

    #[error("failed to query audio output config: {0}")]
    DeviceConfig(String),

    #[error("failed to open audio output stream: {0}")]
    Stream(String),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

/// Errors raised by a session store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("session storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store exists but cannot be used in this environment.
    #[error("session storage unavailable: {0}")]
    Unavailable(String),
}

/// Invalid parameter sets.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("phase schedule must contain at least one step")]
    EmptySchedule,

    #[error("phase step {index} must target phase {expected}, got {found}")]
    PhaseOrder {
        index: usize,
        expected: u32,
        found: u32,
    },

    #[error("phase step {index} fires at {delay_ms}ms, not after the previous step")]
    DelayOrder { index: usize, delay_ms: u64 },

    #[error("auto-complete at {auto_ms}ms must come after the last phase step ({last_ms}ms)")]
    AutoCompleteTooEarly { auto_ms: u64, last_ms: u64 },

    #[error("volume must be within [0, 1], got {0}")]
    Volume(String),

    #[error("FFT size must be power of 2, got {0}")]
    FftSize(usize),

    #[error("sample rate must be > 0")]
    SampleRate,

    #[error("{band} band must end below the Nyquist frequency ({nyquist_hz} Hz)")]
    BandAboveNyquist {
        band: &'static str,
        nyquist_hz: usize,
    },

    #[error("{0} band range is empty or inverted")]
    InvertedBand(&'static str),

    #[error("unknown schedule variant '{0}'")]
    UnknownVariant(String),
}
