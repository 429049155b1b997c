//! Output backends that pull rendered samples from a shared context.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, PoisonError};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{debug, error};

use super::context::SharedContext;
use crate::error::AudioError;
use crate::params::audio_constants::{DEFAULT_SAMPLE_RATE, OUTPUT_LIMIT};

/// Keeps an output stream alive; dropping it closes the stream
pub struct OutputHandle {
    _stream: Option<Box<dyn Any>>,
}

impl OutputHandle {
    pub fn new(stream: impl Any) -> Self {
        Self {
            _stream: Some(Box::new(stream)),
        }
    }

    /// Handle for backends without a device stream
    pub fn detached() -> Self {
        Self { _stream: None }
    }
}

/// Somewhere to play a context
pub trait AudioBackend {
    /// Sample rate the context must be created with
    fn sample_rate(&self) -> Result<u32, AudioError>;

    /// Start pulling samples from `context`
    fn open(&mut self, context: SharedContext) -> Result<OutputHandle, AudioError>;
}

/// Default output device of the default cpal host
#[derive(Debug, Default)]
pub struct CpalBackend;

impl CpalBackend {
    pub fn new() -> Self {
        Self
    }

    fn device(&self) -> Result<cpal::Device, AudioError> {
        cpal::default_host()
            .default_output_device()
            .ok_or(AudioError::NoOutputDevice)
    }
}

impl AudioBackend for CpalBackend {
    fn sample_rate(&self) -> Result<u32, AudioError> {
        let config = self
            .device()?
            .default_output_config()
            .map_err(|e| AudioError::DeviceConfig(e.to_string()))?;
        Ok(config.sample_rate().0)
    }

    fn open(&mut self, context: SharedContext) -> Result<OutputHandle, AudioError> {
        let device = self.device()?;
        let config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceConfig(e.to_string()))?;
        let channels = config.channels().max(1) as usize;

        debug!(
            device = %device.name().unwrap_or_else(|_| "Unknown".to_string()),
            sample_rate = config.sample_rate().0,
            channels,
            "opening audio output"
        );

        let mut mono = Vec::<f32>::new();
        let stream = device
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let frames = data.len() / channels;
                    mono.resize(frames, 0.0);
                    context
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .render(&mut mono);

                    for (frame, &sample) in data.chunks_mut(channels).zip(&mono) {
                        // Safety limiter: hard clip to prevent ear damage
                        frame.fill(sample.clamp(-OUTPUT_LIMIT, OUTPUT_LIMIT));
                    }
                },
                |err| error!("audio stream error: {err}"),
                None,
            )
            .map_err(|e| AudioError::Stream(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::Stream(e.to_string()))?;

        Ok(OutputHandle::new(stream))
    }
}

/// Backend with no device: contexts are only rendered on demand.
///
/// Clones share the list of opened contexts so callers can render or inspect
/// what an engine built.
#[derive(Debug, Clone)]
pub struct OfflineBackend {
    sample_rate: u32,
    available: bool,
    opened: Rc<RefCell<Vec<SharedContext>>>,
}

impl Default for OfflineBackend {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

impl OfflineBackend {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            available: true,
            opened: Rc::default(),
        }
    }

    /// Backend that behaves like a platform without audio support
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::default()
        }
    }

    /// Most recently opened context
    pub fn last_context(&self) -> Option<SharedContext> {
        self.opened.borrow().last().map(Arc::clone)
    }

    pub fn open_count(&self) -> usize {
        self.opened.borrow().len()
    }
}

impl AudioBackend for OfflineBackend {
    fn sample_rate(&self) -> Result<u32, AudioError> {
        if self.available {
            Ok(self.sample_rate)
        } else {
            Err(AudioError::NoOutputDevice)
        }
    }

    fn open(&mut self, context: SharedContext) -> Result<OutputHandle, AudioError> {
        if !self.available {
            return Err(AudioError::NoOutputDevice);
        }
        self.opened.borrow_mut().push(context);
        Ok(OutputHandle::detached())
    }
}
