//! Signal acquisition and demodulation
//!
//! 1. Capture raw IQ samples from RTL-SDR at 1.8 MSPS
//! 2. Frequency-correct and low-pass filter the baseband
//! 3. Decimate to the 18 kHz symbol rate
//! 4. Differential-phase-detect π/4-DQPSK symbols

pub mod capture;
pub mod demod;

pub use capture::{spawn_capture, CaptureStats, RtlSdrConfig, RtlSdrSource, SampleSource};
pub use demod::{Demodulator, DEFAULT_BANDWIDTH, SYMBOL_RATE};
