//! Sample-level DSP primitives: biquad filters, oscillator phase, brown noise.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use std::f32::consts::PI;

/// Biquad response shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    LowPass,
    /// Constant 0 dB peak gain band-pass
    BandPass,
}

/// Direct form I biquad (RBJ cookbook coefficients)
#[derive(Debug, Clone)]
pub struct Biquad {
    kind: FilterKind,
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
    /// Last (frequency, q, sample rate) the coefficients were computed for
    tuned: Option<(f32, f32, f32)>,
}

impl Biquad {
    pub fn new(kind: FilterKind) -> Self {
        Self {
            kind,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
            tuned: None,
        }
    }

    /// Recompute coefficients; cheap when nothing changed
    pub fn tune(&mut self, frequency_hz: f32, q: f32, sample_rate: f32) {
        let nyquist = sample_rate / 2.0;
        let frequency_hz = frequency_hz.clamp(10.0, nyquist * 0.99);
        let q = q.max(1e-3);
        if self.tuned == Some((frequency_hz, q, sample_rate)) {
            return;
        }

        let w0 = 2.0 * PI * frequency_hz / sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * q);

        let (b0, b1, b2) = match self.kind {
            FilterKind::LowPass => {
                let b1 = 1.0 - cos_w0;
                (b1 / 2.0, b1, b1 / 2.0)
            }
            FilterKind::BandPass => (alpha, 0.0, -alpha),
        };
        let a0 = 1.0 + alpha;

        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = -2.0 * cos_w0 / a0;
        self.a2 = (1.0 - alpha) / a0;
        self.tuned = Some((frequency_hz, q, sample_rate));
    }

    pub fn process(&mut self, x: f32) -> f32 {
        let y = self.b0 * x + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

/// Sine output for a normalized phase in [0, 1)
pub fn sine(phase: f32) -> f32 {
    (2.0 * PI * phase).sin()
}

/// Advance a normalized phase by one sample at `frequency_hz`
pub fn advance_phase(phase: f32, frequency_hz: f32, sample_rate: f32) -> f32 {
    (phase + frequency_hz / sample_rate).rem_euclid(1.0)
}

/// Brown noise approximation: leaky random walk over white noise.
///
/// Each sample is `(prev + step * white) / (1 + step)`, then scaled by `boost`.
pub fn brown_noise(len: usize, step: f32, boost: f32, seed: u64) -> Vec<f32> {
    let mut rng = Pcg64::seed_from_u64(seed);
    let mut last = 0.0f32;
    (0..len)
        .map(|_| {
            let white: f32 = rng.gen_range(-1.0..1.0);
            last = (last + step * white) / (1.0 + step);
            last * boost
        })
        .collect()
}
