//! RTL-SDR capture via rtl_sdr subprocess
//!
//! Spawns rtl_sdr to stream raw 8-bit IQ samples on stdout and converts
//! them to complex baseband buffers for the demodulator. The capture thread
//! feeds buffers to the decode loop over a bounded crossbeam channel.

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, Receiver};
use num_complex::Complex;
use std::io::Read;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

/// A source of complex baseband sample buffers.
///
/// Implementations are hardware or process adapters; the decode pipeline
/// only ever sees the buffers. `read_samples` blocks until `count` samples
/// arrive or the source ends.
pub trait SampleSource: Send {
    fn open(&mut self) -> Result<()>;
    fn read_samples(&mut self, count: usize) -> Result<Vec<Complex<f64>>>;
    fn set_frequency(&mut self, freq_hz: f64) -> Result<()>;
    fn close(&mut self);
}

/// RTL-SDR configuration
#[derive(Debug, Clone)]
pub struct RtlSdrConfig {
    pub device_index: u32,
    pub frequency: f64,
    pub sample_rate: f64,
    /// Tuner gain in dB; `None` selects automatic gain
    pub gain: Option<f32>,
    pub ppm_error: i32,
    pub rtl_sdr_path: String,
}

impl Default for RtlSdrConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            frequency: 400_000_000.0, // 400 MHz, middle of the TETRA bands
            sample_rate: 1_800_000.0, // 1.8 MSPS (100 samples per symbol)
            gain: None,
            ppm_error: 0,
            rtl_sdr_path: "rtl_sdr".to_string(),
        }
    }
}

/// Statistics for SDR capture (atomic for thread-safe access)
#[derive(Debug, Default)]
pub struct CaptureStats {
    pub samples_captured: AtomicU64,
    pub buffers_read: AtomicU64,
}

impl CaptureStats {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

/// Sample source backed by an rtl_sdr subprocess
pub struct RtlSdrSource {
    config: RtlSdrConfig,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    stats: Arc<CaptureStats>,
}

impl RtlSdrSource {
    pub fn new(config: RtlSdrConfig) -> Self {
        Self {
            config,
            child: None,
            stdout: None,
            stats: CaptureStats::new(),
        }
    }

    pub fn stats(&self) -> Arc<CaptureStats> {
        self.stats.clone()
    }

    fn spawn_process(&mut self) -> Result<()> {
        // rtl_sdr -d <device> -f <freq> -s <rate> [-g <gain>] [-p <ppm>] -
        // The trailing "-" streams raw IQ bytes to stdout
        let mut cmd = Command::new(&self.config.rtl_sdr_path);
        cmd.arg("-d")
            .arg(self.config.device_index.to_string())
            .arg("-f")
            .arg((self.config.frequency as u64).to_string())
            .arg("-s")
            .arg((self.config.sample_rate as u64).to_string());

        if let Some(gain) = self.config.gain {
            cmd.arg("-g").arg(gain.to_string());
        }
        if self.config.ppm_error != 0 {
            cmd.arg("-p").arg(self.config.ppm_error.to_string());
        }
        cmd.arg("-");

        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        info!("Executing: {:?}", cmd);

        let mut child = cmd
            .spawn()
            .context("Failed to spawn rtl_sdr. Make sure rtl-sdr is installed and in PATH")?;

        let stdout = child
            .stdout
            .take()
            .context("Failed to capture rtl_sdr stdout")?;

        // Forward device chatter from stderr into the log
        if let Some(stderr) = child.stderr.take() {
            thread::spawn(move || {
                let mut reader = std::io::BufReader::new(stderr);
                let mut line = String::new();
                while std::io::BufRead::read_line(&mut reader, &mut line).unwrap_or(0) > 0 {
                    if !line.trim().is_empty() {
                        info!("[rtl_sdr] {}", line.trim());
                    }
                    line.clear();
                }
            });
        }

        self.child = Some(child);
        self.stdout = Some(stdout);
        Ok(())
    }
}

impl SampleSource for RtlSdrSource {
    fn open(&mut self) -> Result<()> {
        info!(
            "Opening RTL-SDR device {} at {:.3} MHz, {:.2} MSPS",
            self.config.device_index,
            self.config.frequency / 1e6,
            self.config.sample_rate / 1e6
        );
        self.spawn_process()
    }

    fn read_samples(&mut self, count: usize) -> Result<Vec<Complex<f64>>> {
        let stdout = self
            .stdout
            .as_mut()
            .context("Sample source is not open")?;

        // 8-bit unsigned I/Q pairs, 2 bytes per complex sample
        let mut raw = vec![0u8; count * 2];
        stdout
            .read_exact(&mut raw)
            .context("rtl_sdr stream ended")?;

        self.stats
            .samples_captured
            .fetch_add(count as u64, Ordering::Relaxed);
        self.stats.buffers_read.fetch_add(1, Ordering::Relaxed);

        let samples = raw
            .chunks_exact(2)
            .map(|pair| {
                Complex::new(
                    (pair[0] as f64 - 127.5) / 127.5,
                    (pair[1] as f64 - 127.5) / 127.5,
                )
            })
            .collect();
        Ok(samples)
    }

    fn set_frequency(&mut self, freq_hz: f64) -> Result<()> {
        // The subprocess cannot retune live; restart it on the new frequency
        self.config.frequency = freq_hz;
        if self.child.is_some() {
            self.close();
            self.spawn_process()?;
        }
        Ok(())
    }

    fn close(&mut self) {
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for RtlSdrSource {
    fn drop(&mut self) {
        self.close();
    }
}

/// Start the capture thread, returning a receiver of sample buffers.
///
/// The thread reads `samples_per_capture` samples at a time until `running`
/// clears or the source fails. The channel is bounded so a slow decoder
/// applies backpressure instead of hoarding buffers.
pub fn spawn_capture(
    mut source: Box<dyn SampleSource>,
    samples_per_capture: usize,
    running: Arc<AtomicBool>,
) -> Result<Receiver<Vec<Complex<f64>>>> {
    source.open()?;

    let (tx, rx) = bounded::<Vec<Complex<f64>>>(4);

    thread::Builder::new()
        .name("sdr-capture".to_string())
        .spawn(move || {
            while running.load(Ordering::SeqCst) {
                match source.read_samples(samples_per_capture) {
                    Ok(buffer) => {
                        if tx.send(buffer).is_err() {
                            warn!("Sample channel disconnected, stopping capture");
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Error reading samples: {}", e);
                        thread::sleep(Duration::from_millis(100));
                        break;
                    }
                }
            }
            source.close();
            info!("Capture thread stopped");
        })
        .context("Failed to spawn capture thread")?;

    Ok(rx)
}
