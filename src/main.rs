//! TETRA Capture - native RTL-SDR π/4-DQPSK demodulator and decoder
//!
//! Captures raw IQ samples from RTL-SDR, demodulates the TETRA downlink,
//! decodes bursts and MAC PDUs with call metadata, and attempts best-effort
//! decryption of encrypted frames with operator keys and a bank of common
//! weak keys.

mod config;
mod crypto;
mod decoder;
mod sdr;
mod stats;
mod tetra;

use anyhow::Result;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use config::Config;
use crypto::KeyRing;
use decoder::TetraDecoder;
use sdr::{spawn_capture, Demodulator, RtlSdrConfig, RtlSdrSource};

fn main() -> Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    info!("===========================================");
    info!("   TETRA Capture - Native RTL-SDR");
    info!("   pi/4-DQPSK demodulator + MAC decoder");
    info!("===========================================");

    // Load configuration
    let config = Config::from_env();

    info!("Configuration:");
    info!("  Frequency: {:.3} MHz", config.frequency / 1e6);
    info!("  Sample rate: {:.2} MHz", config.sample_rate / 1e6);
    match config.gain_db {
        Some(gain) => info!("  Gain: {} dB", gain),
        None => info!("  Gain: auto"),
    }
    info!("  PPM error: {}", config.ppm_error);
    info!("  Samples per capture: {}", config.samples_per_capture);
    info!(
        "  Auto-decrypt: {}",
        if config.auto_decrypt { "Enabled" } else { "Disabled" }
    );

    // Load encryption keys if a key file was provided
    let key_ring = match &config.key_file {
        Some(path) => {
            let mut ring = KeyRing::new();
            match ring.load_key_file(path) {
                Ok(count) => {
                    info!("Loaded {} encryption key(s) from: {}", count, path.display());
                    Some(ring)
                }
                Err(e) => {
                    error!("Failed to load key file: {:#}", e);
                    warn!("Continuing without decryption support");
                    None
                }
            }
        }
        None => None,
    };

    let demodulator = Demodulator::new(config.sample_rate);
    let mut tetra_decoder = TetraDecoder::new(key_ring, config.auto_decrypt);

    // Open output file if specified
    let mut output_file = match &config.output_path {
        Some(path) => {
            let mut file = std::fs::File::create(path)?;
            writeln!(
                file,
                "TETRA Decoder Output - Started: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
            )?;
            writeln!(file, "{}", "=".repeat(60))?;
            Some(file)
        }
        None => None,
    };

    // Start native SDR capture
    let source = RtlSdrSource::new(RtlSdrConfig {
        device_index: config.device_index,
        frequency: config.frequency,
        sample_rate: config.sample_rate,
        gain: config.gain_db,
        ppm_error: config.ppm_error,
        rtl_sdr_path: config.rtl_sdr_path.to_string_lossy().to_string(),
    });

    let running = Arc::new(AtomicBool::new(true));
    let sample_rx = match spawn_capture(
        Box::new(source),
        config.samples_per_capture,
        running.clone(),
    ) {
        Ok(rx) => rx,
        Err(e) => {
            error!("Failed to start SDR capture: {:#}", e);
            error!("Make sure the RTL-SDR device is connected and drivers are installed.");
            return Err(e);
        }
    };

    info!("===========================================");
    info!("  Starting capture and decoding...");
    info!("  Press Ctrl+C to stop.");
    info!("===========================================");

    let mut frame_count = 0u64;
    let mut last_stats_report = Instant::now();

    // Main processing loop - one capture buffer per iteration
    loop {
        match sample_rx.recv_timeout(Duration::from_millis(500)) {
            Ok(samples) => {
                let symbols = demodulator.process(&samples, config.freq_offset);
                let frames = tetra_decoder.decode(&symbols);

                if !frames.is_empty() {
                    frame_count += frames.len() as u64;
                    info!("Found {} frame(s) in this capture", frames.len());

                    for frame in &frames {
                        let frame_info = frame.summary();
                        info!("{}", frame_info);

                        if let Some(file) = output_file.as_mut() {
                            if let Err(e) = writeln!(
                                file,
                                "{} - {}",
                                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                                frame_info
                            ) {
                                warn!("Failed to write output file: {}", e);
                            }
                        }
                    }

                    info!("Total frames decoded: {}", frame_count);
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                // No buffer yet, fall through to periodic reporting
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                warn!("Sample channel disconnected");
                break;
            }
        }

        // Periodic session statistics (every 10 seconds)
        if last_stats_report.elapsed() >= Duration::from_secs(10) {
            info!("[Session] {}", tetra_decoder.stats.snapshot());
            last_stats_report = Instant::now();
        }
    }

    // Cleanup
    running.store(false, Ordering::SeqCst);

    if let Some(file) = output_file.as_mut() {
        let _ = writeln!(
            file,
            "\nDecoder stopped: {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        let _ = writeln!(file, "Total frames decoded: {}", frame_count);
    }

    info!("===========================================");
    info!("TETRA Decoder Stopped - Total frames: {}", frame_count);
    info!("[Session] {}", tetra_decoder.stats.snapshot());
    info!("===========================================");

    Ok(())
}
