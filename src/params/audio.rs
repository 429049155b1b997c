//! Ambient soundscape parameters.

use crate::error::ConfigError;

/// Wind layer: looped brown noise through a breathing low-pass filter
#[derive(Debug, Clone)]
pub struct WindParams {
    /// Length of the looped noise buffer (seconds)
    pub buffer_secs: f32,

    /// Random-walk increment applied to each white noise sample
    /// Formula: y = (y_prev + step * white) / (1 + step)
    pub walk_step: f32,

    /// Output boost applied after the random walk (dimensionless)
    pub boost: f32,

    /// Low-pass cutoff centre (Hz)
    pub cutoff_hz: f32,

    /// Low-pass resonance (Q)
    pub q: f32,

    /// Cutoff modulation rate (Hz)
    pub lfo_hz: f32,

    /// Cutoff modulation depth (Hz, peak deviation)
    pub lfo_depth_hz: f32,

    /// Layer gain into the master bus
    pub gain: f32,

    /// Noise seed, so a rendered soundscape is reproducible
    pub seed: u64,
}

impl Default for WindParams {
    fn default() -> Self {
        Self {
            buffer_secs: 2.0,
            walk_step: 0.02,
            boost: 3.5,
            cutoff_hz: 400.0,
            q: 1.0,
            lfo_hz: 0.1, // One slow breath every ten seconds
            lfo_depth_hz: 150.0,
            gain: 0.6,
            seed: 42,
        }
    }
}

/// Drone layer: sustained low tones with detuned companions and tremolo
#[derive(Debug, Clone)]
pub struct DroneParams {
    /// Tone frequencies (Hz), lowest first
    /// A1, E2, A2, E3
    pub frequencies_hz: Vec<f32>,

    /// Frequency ratio of the companion oscillator (≈0.3% sharp)
    pub detune_ratio: f32,

    /// Gain of the first tone; tone `i` gets `base_gain / (i + 1)`
    pub base_gain: f32,

    /// Tremolo rate of the first tone (Hz)
    pub tremolo_base_hz: f32,

    /// Tremolo rate added per tone index (Hz)
    pub tremolo_step_hz: f32,

    /// Tremolo depth (gain units)
    pub tremolo_depth: f32,
}

impl Default for DroneParams {
    fn default() -> Self {
        Self {
            frequencies_hz: vec![55.0, 82.5, 110.0, 165.0],
            detune_ratio: 1.003,
            base_gain: 0.03,
            tremolo_base_hz: 0.05,
            tremolo_step_hz: 0.02,
            tremolo_depth: 0.01,
        }
    }
}

impl DroneParams {
    /// Gain for tone `index`; higher tones are quieter
    pub fn tone_gain(&self, index: usize) -> f32 {
        self.base_gain / (index as f32 + 1.0)
    }

    /// Tremolo rate for tone `index` (Hz)
    pub fn tremolo_hz(&self, index: usize) -> f32 {
        self.tremolo_base_hz + index as f32 * self.tremolo_step_hz
    }
}

/// Shimmer layer: faint high tone through a narrow band-pass ("heat haze")
#[derive(Debug, Clone)]
pub struct ShimmerParams {
    /// Source tone (Hz)
    pub tone_hz: f32,

    /// Band-pass centre (Hz)
    pub band_hz: f32,

    /// Band-pass Q (narrow)
    pub q: f32,

    /// Layer gain into the master bus
    pub gain: f32,

    /// Amplitude modulation rate (Hz)
    pub lfo_hz: f32,

    /// Amplitude modulation depth (gain units)
    pub lfo_depth: f32,
}

impl Default for ShimmerParams {
    fn default() -> Self {
        Self {
            tone_hz: 2000.0,
            band_hz: 2500.0,
            q: 5.0,
            gain: 0.005,
            lfo_hz: 0.3,
            lfo_depth: 0.003,
        }
    }
}

/// Complete soundscape configuration
#[derive(Debug, Clone, Default)]
pub struct AmbienceParams {
    pub wind: WindParams,
    pub drone: DroneParams,
    pub shimmer: ShimmerParams,
}

/// Master volume envelope
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeParams {
    /// Master volume reached at the end of the fade-in, in [0, 1]
    pub volume: f32,

    /// Fade-in duration (milliseconds)
    pub fade_in_ms: u64,

    /// Fade-out duration (milliseconds)
    pub fade_out_ms: u64,
}

impl Default for FadeParams {
    fn default() -> Self {
        Self {
            volume: 0.15,
            fade_in_ms: 3000,
            fade_out_ms: 2000,
        }
    }
}

impl FadeParams {
    /// Validate configuration (volume range)
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(ConfigError::Volume(self.volume.to_string()));
        }
        Ok(())
    }
}

/// Audio constants (compile-time)
pub mod audio_constants {
    /// Sample rate used when no device dictates one (Hz)
    pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

    /// Frames rendered per block for offline rendering
    pub const BLOCK_SIZE: usize = 128;

    /// Extra wait after a fade-out before the graph is torn down (milliseconds)
    pub const TEARDOWN_MARGIN_MS: u64 = 100;

    /// Hard clip applied to device output
    pub const OUTPUT_LIMIT: f32 = 0.5;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drone_gain_falls_with_pitch() {
        let drone = DroneParams::default();

        assert!((drone.tone_gain(0) - 0.03).abs() < 1e-6);
        assert!((drone.tone_gain(3) - 0.0075).abs() < 1e-6);
        for i in 1..drone.frequencies_hz.len() {
            assert!(drone.tone_gain(i) < drone.tone_gain(i - 1));
            assert!(drone.frequencies_hz[i] > drone.frequencies_hz[i - 1]);
        }
    }

    #[test]
    fn test_tremolo_rates_are_distinct() {
        let drone = DroneParams::default();
        assert!((drone.tremolo_hz(0) - 0.05).abs() < 1e-6);
        assert!((drone.tremolo_hz(2) - 0.09).abs() < 1e-6);
    }

    #[test]
    fn test_volume_validation() {
        let mut fades = FadeParams::default();
        assert!(fades.validate().is_ok());

        fades.volume = 1.5;
        assert!(matches!(fades.validate(), Err(ConfigError::Volume(_))));

        fades.volume = f32::NAN;
        assert!(fades.validate().is_err());
    }
}
