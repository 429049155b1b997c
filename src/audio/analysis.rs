//! Spectral analysis of rendered audio.

use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;
use std::ops::Range;

use crate::error::ConfigError;
use crate::params::AnalysisConfig;

/// Mean spectral magnitude per frequency band
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SpectrumBands {
    pub low: f32,  // Drone and wind body (20-200 Hz)
    pub mid: f32,  // 200-1000 Hz
    pub high: f32, // Shimmer (1000-4000 Hz)
}

/// Average band magnitudes over Hann-windowed FFT frames with 50% overlap.
///
/// Input shorter than one frame is zero-padded.
pub fn analyze(samples: &[f32], config: &AnalysisConfig) -> Result<SpectrumBands, ConfigError> {
    config.validate()?;

    let size = config.fft_size;
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(size);
    let mut frame = vec![Complex::new(0.0, 0.0); size];

    let low_bins = config.low_bins();
    let mid_bins = config.mid_bins();
    let high_bins = config.high_bins();

    let mut totals = SpectrumBands::default();
    let mut frames = 0usize;
    let mut start = 0usize;
    loop {
        for (i, bin) in frame.iter_mut().enumerate() {
            let sample = samples.get(start + i).copied().unwrap_or(0.0);
            *bin = Complex::new(sample * hann_window(i, size), 0.0);
        }
        fft.process(&mut frame);

        totals.low += band_mean(&frame, low_bins.clone());
        totals.mid += band_mean(&frame, mid_bins.clone());
        totals.high += band_mean(&frame, high_bins.clone());
        frames += 1;

        // 50% overlap
        start += size / 2;
        if start + size > samples.len() {
            break;
        }
    }

    let frames = frames as f32;
    Ok(SpectrumBands {
        low: totals.low / frames,
        mid: totals.mid / frames,
        high: totals.high / frames,
    })
}

/// Mean normalized magnitude over `bins`, limited to the lower half spectrum
fn band_mean(spectrum: &[Complex<f32>], bins: Range<usize>) -> f32 {
    let half = spectrum.len() / 2;
    let bins = bins.start.min(half)..bins.end.min(half);
    if bins.is_empty() {
        return 0.0;
    }
    let scale = spectrum.len() as f32;
    let len = bins.len() as f32;
    spectrum[bins].iter().map(|c| c.norm() / scale).sum::<f32>() / len
}

/// Hann window function for FFT analysis
pub fn hann_window(index: usize, size: usize) -> f32 {
    0.5 * (1.0 - ((2.0 * PI * index as f32) / (size as f32 - 1.0)).cos())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(hz: f32, secs: f32, sample_rate: usize) -> Vec<f32> {
        let len = (secs * sample_rate as f32) as usize;
        (0..len)
            .map(|i| (2.0 * PI * hz * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn test_hann_window() {
        let size = 1024;

        // Hann window should be 0 at edges, 1 at center
        assert!((hann_window(0, size) - 0.0).abs() < 0.01);
        assert!((hann_window(size - 1, size) - 0.0).abs() < 0.01);
        assert!((hann_window(size / 2, size) - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_low_tone_lands_in_low_band() {
        let config = AnalysisConfig::default();
        let bands = analyze(&tone(110.0, 1.0, config.sample_rate_hz), &config).unwrap();

        assert!(bands.low > 10.0 * bands.mid, "{bands:?}");
        assert!(bands.low > 10.0 * bands.high, "{bands:?}");
    }

    #[test]
    fn test_high_tone_lands_in_high_band() {
        let config = AnalysisConfig::default();
        let bands = analyze(&tone(2500.0, 1.0, config.sample_rate_hz), &config).unwrap();

        assert!(bands.high > 10.0 * bands.low, "{bands:?}");
    }

    #[test]
    fn test_silence_and_short_input() {
        let config = AnalysisConfig::default();
        assert_eq!(analyze(&[], &config).unwrap(), SpectrumBands::default());
        assert_eq!(
            analyze(&[0.0; 100], &config).unwrap(),
            SpectrumBands::default()
        );
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = AnalysisConfig {
            fft_size: 1000,
            ..AnalysisConfig::default()
        };
        assert_eq!(analyze(&[0.0; 10], &config), Err(ConfigError::FftSize(1000)));
    }

    #[test]
    fn test_low_sample_rate_is_rejected_not_sliced() {
        let config = AnalysisConfig {
            sample_rate_hz: 2000,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            analyze(&[0.1; 16384], &config),
            Err(ConfigError::BandAboveNyquist { band: "high", .. })
        ));
    }

    #[test]
    fn test_band_mean_stays_within_half_spectrum() {
        let spectrum = vec![Complex::new(8.0, 0.0); 8];
        assert_eq!(band_mean(&spectrum, 2..100), 1.0);
        assert_eq!(band_mean(&spectrum, 6..100), 0.0);
    }
}
