//! Session statistics accumulation
//!
//! Counters are mutated additively by the parser, metadata extractor, and
//! decryption engine as frames are processed. One instance belongs to one
//! single-threaded pipeline; a caller running several pipelines in parallel
//! aggregates their snapshots itself.

use serde::Serialize;
use std::fmt;

/// Running counters for one decode session
#[derive(Debug, Default, Clone)]
pub struct SessionStats {
    pub total_bursts: u64,
    pub crc_pass: u64,
    pub crc_fail: u64,
    pub clear_mode_frames: u64,
    pub encrypted_frames: u64,
    pub decrypted_frames: u64,
    pub voice_calls: u64,
    pub data_messages: u64,
    pub control_messages: u64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point-in-time view with derived percentages for reporting.
    pub fn snapshot(&self) -> StatsSnapshot {
        let total_frames = self.clear_mode_frames + self.encrypted_frames;
        let (clear_mode_percentage, encrypted_percentage) = if total_frames > 0 {
            (
                self.clear_mode_frames as f64 / total_frames as f64 * 100.0,
                self.encrypted_frames as f64 / total_frames as f64 * 100.0,
            )
        } else {
            (0.0, 0.0)
        };
        let crc_success_rate = self.crc_pass as f64 / self.total_bursts.max(1) as f64 * 100.0;

        StatsSnapshot {
            total_bursts: self.total_bursts,
            crc_pass: self.crc_pass,
            crc_fail: self.crc_fail,
            clear_mode_frames: self.clear_mode_frames,
            encrypted_frames: self.encrypted_frames,
            decrypted_frames: self.decrypted_frames,
            voice_calls: self.voice_calls,
            data_messages: self.data_messages,
            control_messages: self.control_messages,
            clear_mode_percentage,
            encrypted_percentage,
            crc_success_rate,
        }
    }
}

/// Named-counter snapshot with derived percentages
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub total_bursts: u64,
    pub crc_pass: u64,
    pub crc_fail: u64,
    pub clear_mode_frames: u64,
    pub encrypted_frames: u64,
    pub decrypted_frames: u64,
    pub voice_calls: u64,
    pub data_messages: u64,
    pub control_messages: u64,
    pub clear_mode_percentage: f64,
    pub encrypted_percentage: f64,
    pub crc_success_rate: f64,
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bursts: {} (CRC ok {:.1}%) | Clear: {} ({:.1}%) | Encrypted: {} ({:.1}%) | Decrypted: {} | Calls: {} voice, {} data, {} control",
            self.total_bursts,
            self.crc_success_rate,
            self.clear_mode_frames,
            self.clear_mode_percentage,
            self.encrypted_frames,
            self.encrypted_percentage,
            self.decrypted_frames,
            self.voice_calls,
            self.data_messages,
            self.control_messages,
        )
    }
}
