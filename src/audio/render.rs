//! Offline rendering of the ambience and WAV export.

use std::path::Path;
use std::time::Duration;

use tracing::debug;

use super::engine::{AmbientEngine, Ambience};
use super::output::OfflineBackend;
use crate::error::AudioError;
use crate::params::audio_constants::BLOCK_SIZE;
use crate::params::{AmbienceParams, FadeParams};
use crate::timing::ManualClock;

/// Render `duration_secs` of the soundscape the way the intro plays it.
///
/// The master fades in from the first sample and fades out so it reaches
/// silence at the end of the buffer.
pub fn render_ambience(
    params: &AmbienceParams,
    fades: &FadeParams,
    sample_rate: u32,
    duration_secs: f32,
) -> Result<Vec<f32>, AudioError> {
    let clock = ManualClock::new();
    let backend = OfflineBackend::new(sample_rate);
    let mut engine = AmbientEngine::new(params.clone(), Box::new(backend.clone()), clock.shared());

    engine.start(fades.volume, fades.fade_in_ms);
    let context = backend.last_context().ok_or(AudioError::NoOutputDevice)?;

    let sample_rate = sample_rate.max(1) as u64;
    let total = (duration_secs.max(0.0) as f64 * sample_rate as f64) as usize;
    let fade_out_frames = (fades.fade_out_ms * sample_rate / 1000) as usize;
    let fade_start = total.saturating_sub(fade_out_frames);

    let mut samples = vec![0.0; total];
    let mut rendered = 0usize;
    for block in samples.chunks_mut(BLOCK_SIZE) {
        if rendered >= fade_start && !engine.is_fading_out() && engine.is_running() {
            engine.stop(fades.fade_out_ms);
        }

        context
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .render(block);
        rendered += block.len();

        clock.set(Duration::from_secs_f64(rendered as f64 / sample_rate as f64));
        engine.poll();
    }

    debug!(frames = total, sample_rate, "rendered ambience offline");
    Ok(samples)
}

/// Write mono samples as a 32-bit float WAV
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), AudioError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::analysis::analyze;
    use crate::params::AnalysisConfig;

    fn rms(samples: &[f32]) -> f32 {
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len().max(1) as f32).sqrt()
    }

    #[test]
    fn test_render_fades_in_and_out() {
        let fades = FadeParams {
            volume: 0.5,
            fade_in_ms: 1000,
            fade_out_ms: 1000,
        };
        let samples = render_ambience(&AmbienceParams::default(), &fades, 8000, 4.0).unwrap();
        assert_eq!(samples.len(), 32_000);

        let head = rms(&samples[..400]);
        let middle = rms(&samples[12_000..20_000]);
        let tail = rms(&samples[31_600..]);

        assert!(middle > 0.0);
        assert!(head < middle * 0.2, "head {head} middle {middle}");
        assert!(tail < middle * 0.2, "tail {tail} middle {middle}");
    }

    #[test]
    fn test_soundscape_is_bass_heavy_with_a_shimmer() {
        let fades = FadeParams {
            volume: 1.0,
            fade_in_ms: 0,
            fade_out_ms: 0,
        };
        let samples = render_ambience(&AmbienceParams::default(), &fades, 44_100, 2.0).unwrap();
        let bands = analyze(&samples, &AnalysisConfig::default()).unwrap();

        assert!(bands.low > bands.mid, "{bands:?}");
        assert!(bands.low > bands.high, "{bands:?}");
        assert!(bands.high > 0.0, "{bands:?}");
    }

    #[test]
    fn test_zero_length_render() {
        let samples =
            render_ambience(&AmbienceParams::default(), &FadeParams::default(), 8000, 0.0).unwrap();
        assert!(samples.is_empty());
    }

    #[test]
    fn test_write_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ambience.wav");
        let samples: Vec<f32> = (0..800).map(|i| (i as f32 / 800.0) - 0.5).collect();

        write_wav(&path, &samples, 8000).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.spec().sample_rate, 8000);
        let read: Vec<f32> = reader.samples::<f32>().map(Result::unwrap).collect();
        assert_eq!(read, samples);
    }
}
