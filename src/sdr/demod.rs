//! π/4-DQPSK demodulation of raw IQ sample buffers
//!
//! TETRA modulates at 18 kHz symbol rate. The processing chain is:
//! 1. Optional frequency correction (complex mixer)
//! 2. 4th-order Butterworth low-pass at half the channel bandwidth, run
//!    forward and backward so filter group delay does not skew the symbol
//!    timing
//! 3. Decimation to symbol rate by stride selection
//! 4. Differential phase detection between consecutive symbol-rate samples,
//!    quantized to 8 phase buckets

use num_complex::Complex;
use std::f64::consts::PI;

/// TETRA symbol rate in Hz
pub const SYMBOL_RATE: f64 = 18_000.0;

/// Default channel bandwidth in Hz
pub const DEFAULT_BANDWIDTH: f64 = 25_000.0;

// A 4th-order Butterworth low-pass factors into two second-order sections
// with these Q values (1 / (2 cos(pi/8)) and 1 / (2 cos(3 pi/8)))
const BUTTERWORTH4_Q: [f64; 2] = [0.541_196_100_146_197, 1.306_562_964_876_377];

/// Second-order IIR low-pass section (direct form I)
#[derive(Debug, Clone, Copy)]
struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Biquad {
    /// Low-pass section for `cutoff` as a fraction of Nyquist and the given Q.
    fn lowpass(cutoff: f64, q: f64) -> Self {
        let w0 = PI * cutoff;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * q);
        let a0 = 1.0 + alpha;
        Self {
            b0: ((1.0 - cos_w0) / 2.0) / a0,
            b1: (1.0 - cos_w0) / a0,
            b2: ((1.0 - cos_w0) / 2.0) / a0,
            a1: (-2.0 * cos_w0) / a0,
            a2: (1.0 - alpha) / a0,
        }
    }

    fn run(&self, samples: &[Complex<f64>]) -> Vec<Complex<f64>> {
        let zero = Complex::new(0.0, 0.0);
        let (mut x1, mut x2, mut y1, mut y2) = (zero, zero, zero, zero);
        let mut out = Vec::with_capacity(samples.len());
        for &x in samples {
            let y = x * self.b0 + x1 * self.b1 + x2 * self.b2 - y1 * self.a1 - y2 * self.a2;
            x2 = x1;
            x1 = x;
            y2 = y1;
            y1 = y;
            out.push(y);
        }
        out
    }
}

/// Demodulates raw IQ buffers into π/4-DQPSK symbols
#[derive(Debug, Clone)]
pub struct Demodulator {
    sample_rate: f64,
    samples_per_symbol: usize,
}

impl Demodulator {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            samples_per_symbol: (sample_rate / SYMBOL_RATE).round() as usize,
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn samples_per_symbol(&self) -> usize {
        self.samples_per_symbol
    }

    /// Complete pipeline: raw IQ samples to demodulated symbols (0-7).
    pub fn process(&self, samples: &[Complex<f64>], freq_offset: f64) -> Vec<u8> {
        let shifted;
        let samples = if freq_offset != 0.0 {
            shifted = self.frequency_shift(samples, freq_offset);
            shifted.as_slice()
        } else {
            samples
        };

        let filtered = self.filter_signal(samples, DEFAULT_BANDWIDTH);
        let decimated = self.extract_symbols(&filtered);
        self.demodulate_dqpsk(&decimated)
    }

    /// Mix the buffer with a complex exponential counter-rotating at
    /// `freq_offset` Hz. Pure transform; shifting by `-f` undoes a shift
    /// by `f`.
    pub fn frequency_shift(&self, samples: &[Complex<f64>], freq_offset: f64) -> Vec<Complex<f64>> {
        samples
            .iter()
            .enumerate()
            .map(|(n, &s)| {
                let t = n as f64 / self.sample_rate;
                s * Complex::from_polar(1.0, -2.0 * PI * freq_offset * t)
            })
            .collect()
    }

    /// Resample the buffer to `target_rate` by linear interpolation. Pure
    /// transform.
    pub fn resample(&self, samples: &[Complex<f64>], target_rate: f64) -> Vec<Complex<f64>> {
        let new_len = (samples.len() as f64 * target_rate / self.sample_rate) as usize;
        if samples.is_empty() || new_len == 0 {
            return Vec::new();
        }

        let ratio = samples.len() as f64 / new_len as f64;
        (0..new_len)
            .map(|i| {
                let pos = i as f64 * ratio;
                let idx = pos as usize;
                let frac = pos - idx as f64;
                if idx + 1 < samples.len() {
                    samples[idx] * (1.0 - frac) + samples[idx + 1] * frac
                } else {
                    samples[samples.len() - 1]
                }
            })
            .collect()
    }

    /// Low-pass the buffer at `bandwidth / 2`, forward and backward for zero
    /// phase. The normalized cutoff is clamped to [0.01, 0.99] of Nyquist to
    /// avoid degenerate filter designs.
    pub fn filter_signal(&self, samples: &[Complex<f64>], bandwidth: f64) -> Vec<Complex<f64>> {
        let nyquist = self.sample_rate / 2.0;
        let cutoff = (bandwidth / 2.0 / nyquist).clamp(0.01, 0.99);
        let sections = [
            Biquad::lowpass(cutoff, BUTTERWORTH4_Q[0]),
            Biquad::lowpass(cutoff, BUTTERWORTH4_Q[1]),
        ];

        let mut buf = samples.to_vec();
        for section in &sections {
            buf = section.run(&buf);
        }
        buf.reverse();
        for section in &sections {
            buf = section.run(&buf);
        }
        buf.reverse();
        buf
    }

    /// Downsample to symbol rate by stride selection.
    pub fn extract_symbols(&self, samples: &[Complex<f64>]) -> Vec<Complex<f64>> {
        if self.samples_per_symbol > 1 {
            samples
                .iter()
                .step_by(self.samples_per_symbol)
                .copied()
                .collect()
        } else {
            samples.to_vec()
        }
    }

    /// Differential phase detection on symbol-rate samples.
    ///
    /// Each consecutive pair yields the phase of `s[n] * conj(s[n-1])`,
    /// wrapped into [0, 2π) and quantized to the nearest π/4 bucket. The
    /// first sample has no predecessor, so the output is one shorter than
    /// the input. An all-zero buffer skips peak normalization instead of
    /// dividing by zero.
    pub fn demodulate_dqpsk(&self, samples: &[Complex<f64>]) -> Vec<u8> {
        if samples.len() < 2 {
            return Vec::new();
        }

        let max_mag = samples.iter().map(|s| s.norm()).fold(0.0f64, f64::max);
        let normalized: Vec<Complex<f64>> = if max_mag > 0.0 {
            samples.iter().map(|&s| s / max_mag).collect()
        } else {
            samples.to_vec()
        };

        let mut symbols = Vec::with_capacity(normalized.len() - 1);
        let mut prev = normalized[0];
        for &sample in &normalized[1..] {
            let diff = sample * prev.conj();
            let phase = (diff.arg() + 2.0 * PI) % (2.0 * PI);
            let symbol = ((phase / (PI / 4.0)).round() as i64).rem_euclid(8) as u8;
            symbols.push(symbol);
            prev = sample;
        }

        symbols
    }
}
