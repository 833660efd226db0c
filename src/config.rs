//! Configuration loaded from environment variables

use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Center frequency in Hz
    pub frequency: f64,

    /// Sample rate in Hz
    pub sample_rate: f64,

    /// Tuner gain in dB; `None` selects automatic gain
    pub gain_db: Option<f32>,

    /// PPM frequency correction
    pub ppm_error: i32,

    /// RTL-SDR device index
    pub device_index: u32,

    /// Samples per capture buffer
    pub samples_per_capture: usize,

    /// Residual frequency offset corrected in software, in Hz
    pub freq_offset: f64,

    /// Path to a key file for decryption
    pub key_file: Option<PathBuf>,

    /// Automatically try common keys for encrypted frames
    pub auto_decrypt: bool,

    /// Output file for decoded frames
    pub output_path: Option<PathBuf>,

    /// Path to the rtl_sdr executable
    pub rtl_sdr_path: PathBuf,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            frequency: std::env::var("FREQUENCY_HZ")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(400e6),

            sample_rate: std::env::var("SAMPLE_RATE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1.8e6),

            gain_db: std::env::var("DEVICE_GAIN")
                .ok()
                .filter(|s| s.as_str() != "auto")
                .and_then(|s| s.parse().ok()),

            ppm_error: std::env::var("PPM_ERROR")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),

            device_index: std::env::var("DEVICE_INDEX")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),

            samples_per_capture: std::env::var("SAMPLES_PER_CAPTURE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024 * 1024),

            freq_offset: std::env::var("FREQ_OFFSET_HZ")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.0),

            key_file: std::env::var("KEY_FILE").ok().map(PathBuf::from),

            auto_decrypt: std::env::var("AUTO_DECRYPT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(true),

            output_path: std::env::var("OUTPUT_PATH").ok().map(PathBuf::from),

            rtl_sdr_path: std::env::var("RTL_SDR_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("rtl_sdr")),
        }
    }
}
