//! Symbol-to-bit expansion and frame synchronization
//!
//! The synchronizer slides the known 31-bit pattern over the capture's
//! bitstream and reports every offset whose bit agreement reaches the
//! threshold. All matches are returned, not just the best: several candidate
//! frame starts per capture are expected and each one is decode-attempted
//! independently downstream. No deduplication of overlapping windows.

use tracing::trace;

/// TETRA synchronization pattern searched for in the demodulated bitstream
pub const SYNC_PATTERN: [u8; 31] = [
    0, 1, 0, 1, 1, 0, 0, 1, 1, 1, 0, 0, 0, 1, 0, 0, 1, 0, 1, 1, 0, 0, 1, 1, 1, 0, 0, 0, 1, 0, 0,
];

/// Default correlation threshold for strict sync matching
pub const DEFAULT_SYNC_THRESHOLD: f32 = 0.96;

/// Expand π/4-DQPSK symbols (0-7) to bits, 3 bits per symbol, MSB first.
pub fn symbols_to_bits(symbols: &[u8]) -> Vec<u8> {
    let mut bits = Vec::with_capacity(symbols.len() * 3);
    for &symbol in symbols {
        bits.push((symbol >> 2) & 1);
        bits.push((symbol >> 1) & 1);
        bits.push(symbol & 1);
    }
    bits
}

/// Find all offsets where the sync pattern correlates at or above `threshold`.
///
/// O(bitstream length x pattern length); this scan is the dominant
/// per-capture cost. A bitstream shorter than the pattern yields an empty
/// list, never an error.
pub fn find_sync(bits: &[u8], threshold: f32) -> Vec<usize> {
    let sync_len = SYNC_PATTERN.len();
    let mut positions = Vec::new();
    if bits.len() < sync_len {
        return positions;
    }

    for i in 0..bits.len() - sync_len {
        let window = &bits[i..i + sync_len];
        let matches = window
            .iter()
            .zip(SYNC_PATTERN.iter())
            .filter(|(a, b)| a == b)
            .count();
        let correlation = matches as f32 / sync_len as f32;

        if correlation >= threshold {
            trace!("Found sync at position {}, correlation: {:.2}", i, correlation);
            positions.push(i);
        }
    }

    positions
}
