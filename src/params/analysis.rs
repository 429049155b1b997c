//! Spectral analysis configuration.

use std::ops::Range;

use crate::error::ConfigError;

/// FFT analysis configuration with frequency band mappings
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Audio sample rate (Hz)
    pub sample_rate_hz: usize,

    /// FFT window size (must be power of 2)
    pub fft_size: usize,

    /// Low band (Hz): drone fundamentals and wind body
    pub low_range_hz: (f32, f32),

    /// Mid band (Hz)
    pub mid_range_hz: (f32, f32),

    /// High band (Hz): shimmer
    pub high_range_hz: (f32, f32),
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 44100,
            fft_size: 8192, // ~5.4 Hz per bin, fine enough to split 55 Hz from 82.5 Hz
            low_range_hz: (20.0, 200.0),
            mid_range_hz: (200.0, 1000.0),
            high_range_hz: (1000.0, 4000.0),
        }
    }
}

impl AnalysisConfig {
    /// Convert frequency (Hz) to FFT bin index
    pub fn hz_to_bin(&self, hz: f32) -> usize {
        ((hz * self.fft_size as f32) / self.sample_rate_hz as f32) as usize
    }

    /// FFT bin range for the low band
    pub fn low_bins(&self) -> Range<usize> {
        self.hz_to_bin(self.low_range_hz.0)..self.hz_to_bin(self.low_range_hz.1)
    }

    /// FFT bin range for the mid band
    pub fn mid_bins(&self) -> Range<usize> {
        self.hz_to_bin(self.mid_range_hz.0)..self.hz_to_bin(self.mid_range_hz.1)
    }

    /// FFT bin range for the high band
    pub fn high_bins(&self) -> Range<usize> {
        self.hz_to_bin(self.high_range_hz.0)..self.hz_to_bin(self.high_range_hz.1)
    }

    /// Validate configuration (FFT size must be power of 2, etc.)
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.fft_size.is_power_of_two() {
            return Err(ConfigError::FftSize(self.fft_size));
        }
        if self.sample_rate_hz == 0 {
            return Err(ConfigError::SampleRate);
        }

        let nyquist_hz = self.sample_rate_hz / 2;
        for (band, (low, high)) in self.bands() {
            if !(low >= 0.0 && low < high) {
                return Err(ConfigError::InvertedBand(band));
            }
            if high >= nyquist_hz as f32 {
                return Err(ConfigError::BandAboveNyquist { band, nyquist_hz });
            }
        }
        Ok(())
    }

    fn bands(&self) -> [(&'static str, (f32, f32)); 3] {
        [
            ("low", self.low_range_hz),
            ("mid", self.mid_range_hz),
            ("high", self.high_range_hz),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hz_to_bin() {
        let config = AnalysisConfig {
            fft_size: 1024,
            ..AnalysisConfig::default()
        };

        // At 44100 Hz sample rate and 1024 FFT size:
        // Bin resolution = 44100 / 1024 ≈ 43.07 Hz per bin
        assert_eq!(config.hz_to_bin(0.0), 0);
        assert_eq!(config.hz_to_bin(43.07), 1);
        assert_eq!(config.hz_to_bin(100.0), 2);
    }

    #[test]
    fn test_band_ranges_are_ordered() {
        let config = AnalysisConfig::default();

        let low = config.low_bins();
        let mid = config.mid_bins();
        let high = config.high_bins();

        assert!(!low.is_empty());
        assert!(mid.start >= low.end);
        assert!(high.start >= mid.end);
        assert!(high.end <= config.fft_size / 2);
    }

    #[test]
    fn test_validate() {
        let mut config = AnalysisConfig::default();
        assert!(config.validate().is_ok());

        config.fft_size = 1000;
        assert_eq!(config.validate(), Err(ConfigError::FftSize(1000)));

        config.fft_size = 1024;
        config.sample_rate_hz = 0;
        assert_eq!(config.validate(), Err(ConfigError::SampleRate));
    }

    #[test]
    fn test_validate_rejects_bands_past_nyquist() {
        // 2 kHz sample rate: the 1-4 kHz high band cannot be represented
        let config = AnalysisConfig {
            sample_rate_hz: 2000,
            ..AnalysisConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::BandAboveNyquist {
                band: "high",
                nyquist_hz: 1000
            })
        );

        let config = AnalysisConfig {
            sample_rate_hz: 8000,
            ..AnalysisConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_bands() {
        let config = AnalysisConfig {
            mid_range_hz: (1000.0, 200.0),
            ..AnalysisConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvertedBand("mid")));

        let config = AnalysisConfig {
            low_range_hz: (50.0, 50.0),
            ..AnalysisConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvertedBand("low")));
    }
}
