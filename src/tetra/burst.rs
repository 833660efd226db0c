//! Physical-layer burst parsing
//!
//! A burst is one slot's worth of 255 symbols. The parser expands the symbol
//! window to its bit array, classifies the burst from the training-sequence
//! position, strips training and tail bits, and runs a lenient integrity
//! check. The training sequence is used only for coarse classification, not
//! equalization.

use tracing::warn;

use super::types::{BurstType, TetraBurst};
use crate::stats::SessionStats;

/// Symbols per TETRA time slot
pub const SYMBOLS_PER_SLOT: usize = 255;

// Downlink sync training sequences (22 bits each)
const SYNC_CONTINUOUS_DOWNLINK: [u8; 22] = [
    1, 1, 0, 1, 0, 0, 0, 0, 1, 1, 1, 0, 1, 0, 0, 1, 1, 1, 0, 1, 0, 0,
];
const SYNC_DISCONTINUOUS_DOWNLINK: [u8; 22] = [
    0, 0, 1, 1, 1, 0, 1, 0, 0, 1, 0, 0, 0, 0, 1, 1, 0, 1, 0, 0, 1, 1,
];

/// Parse one burst from a symbol window.
///
/// Returns `None` when fewer than 255 symbols are available; all other
/// inputs produce a burst, with `crc_ok` recording the integrity verdict.
pub fn parse_burst(
    symbols: &[u8],
    slot_number: u8,
    frame_number: u8,
    stats: &mut SessionStats,
) -> Option<TetraBurst> {
    if symbols.len() < SYMBOLS_PER_SLOT {
        warn!(
            "Insufficient symbols for burst: {} < {}",
            symbols.len(),
            SYMBOLS_PER_SLOT
        );
        return None;
    }

    // 2 bits per π/4-DQPSK symbol
    let mut bits = Vec::with_capacity(SYMBOLS_PER_SLOT * 2);
    for &symbol in &symbols[..SYMBOLS_PER_SLOT] {
        bits.push((symbol >> 1) & 1);
        bits.push(symbol & 1);
    }

    let burst_type = detect_burst_type(&bits);
    let training_sequence = extract_training_sequence(&bits, burst_type);
    let data_bits = extract_data_bits(&bits, burst_type);
    let crc_ok = check_crc(&data_bits);

    stats.total_bursts += 1;
    if crc_ok {
        stats.crc_pass += 1;
    } else {
        stats.crc_fail += 1;
    }

    Some(TetraBurst {
        burst_type,
        slot_number,
        frame_number,
        training_sequence,
        data_bits,
        crc_ok,
    })
}

/// Classify a burst from the 22-bit window at its midpoint.
///
/// Only the synchronization/normal distinction is attempted; uplink and
/// control bursts are not discriminated.
fn detect_burst_type(bits: &[u8]) -> BurstType {
    let sync_pos = bits.len() / 2;
    let end = (sync_pos + 22).min(bits.len());
    if check_sync_pattern(&bits[sync_pos..end]) {
        return BurstType::Synchronization;
    }
    BurstType::NormalDownlink
}

fn check_sync_pattern(bits: &[u8]) -> bool {
    if bits.len() < 22 {
        return false;
    }
    let correlation = |pattern: &[u8; 22]| {
        bits[..22]
            .iter()
            .zip(pattern.iter())
            .filter(|(a, b)| a == b)
            .count() as f32
            / 22.0
    };
    let match_cont = correlation(&SYNC_CONTINUOUS_DOWNLINK);
    let match_disc = correlation(&SYNC_DISCONTINUOUS_DOWNLINK);
    match_cont.max(match_disc) > 0.8
}

/// Extract the training sequence window from the burst bit array.
pub fn extract_training_sequence(bits: &[u8], burst_type: BurstType) -> Vec<u8> {
    match burst_type {
        BurstType::Synchronization => bits[108..130.min(bits.len())].to_vec(),
        _ => bits[108..122.min(bits.len())].to_vec(),
    }
}

/// Extract data bits, excluding training sequence and tail bits.
///
/// A normal burst carries two 108-bit blocks around the training gap:
/// block 1 at [0, 108), training at [108, 122), block 2 at [122, 230),
/// tail from 230. Other burst types return the raw bit array unmodified.
pub fn extract_data_bits(bits: &[u8], burst_type: BurstType) -> Vec<u8> {
    match burst_type {
        BurstType::NormalDownlink | BurstType::NormalUplink => {
            let mut data = Vec::with_capacity(216);
            data.extend_from_slice(&bits[0..108]);
            data.extend_from_slice(&bits[122..230]);
            data
        }
        _ => bits.to_vec(),
    }
}

/// Lenient integrity check over a burst's data bits.
///
/// A strict TETRA CRC needs the interleaving and puncturing context that is
/// not reconstructed here, so bit distribution is the primary criterion: a
/// minority-bit ratio above 0.15 passes outright (rejects degenerate
/// all-0/all-1 sequences). Only then does the CRC-16-CCITT fallback run over
/// payload-minus-16 against the trailing 16 bits, tolerating up to 3
/// mismatched bits. This over-accepts random bit patterns; known limitation.
pub fn check_crc(bits: &[u8]) -> bool {
    if bits.len() < 16 {
        return false;
    }

    let ones = bits.iter().filter(|&&b| b == 1).count();
    let zeros = bits.len() - ones;
    let minority = ones.min(zeros);
    let majority = ones.max(zeros);
    let bit_ratio = if majority > 0 {
        minority as f32 / majority as f32
    } else {
        0.0
    };

    if bit_ratio > 0.15 {
        return true;
    }

    let payload = &bits[..bits.len() - 16];
    let received = &bits[bits.len() - 16..];
    let calculated = crc16_ccitt_bits(payload);
    let errors = calculated
        .iter()
        .zip(received.iter())
        .filter(|(a, b)| a != b)
        .count();
    errors <= 3
}

/// CRC-16-CCITT (polynomial 0x1021, init 0xFFFF) over a bit slice, one shift
/// per input bit, returned MSB first.
pub fn crc16_ccitt_bits(bits: &[u8]) -> [u8; 16] {
    let polynomial: u16 = 0x1021;
    let mut crc: u16 = 0xFFFF;

    for &bit in bits {
        crc ^= (bit as u16) << 15;
        if crc & 0x8000 != 0 {
            crc = (crc << 1) ^ polynomial;
        } else {
            crc <<= 1;
        }
    }

    let mut out = [0u8; 16];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = ((crc >> (15 - i)) & 1) as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_burst_bits() -> Vec<u8> {
        (0..510).map(|i| ((i * 7 + 3) % 5 < 2) as u8).collect()
    }

    #[test]
    fn test_extract_data_bits_length() {
        // Two 108-bit blocks regardless of content
        let bits = full_burst_bits();
        let data = extract_data_bits(&bits, BurstType::NormalDownlink);
        assert_eq!(data.len(), 216);
        let data = extract_data_bits(&bits, BurstType::NormalUplink);
        assert_eq!(data.len(), 216);
        // Non-normal bursts pass the raw array through
        let data = extract_data_bits(&bits, BurstType::Synchronization);
        assert_eq!(data.len(), 510);
    }

    #[test]
    fn test_extract_data_bits_skips_training_gap() {
        let mut bits = vec![0u8; 510];
        for b in bits[108..122].iter_mut() {
            *b = 1;
        }
        let data = extract_data_bits(&bits, BurstType::NormalDownlink);
        assert!(data.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_training_sequence_windows() {
        let bits = full_burst_bits();
        assert_eq!(
            extract_training_sequence(&bits, BurstType::Synchronization).len(),
            22
        );
        assert_eq!(
            extract_training_sequence(&bits, BurstType::NormalDownlink).len(),
            14
        );
    }

    #[test]
    fn test_check_crc_rejects_degenerate_streams() {
        assert!(!check_crc(&vec![0u8; 216]));
        assert!(!check_crc(&vec![1u8; 216]));
        // Too few bits for any verdict
        assert!(!check_crc(&[1, 0, 1]));
    }

    #[test]
    fn test_check_crc_accepts_mixed_bits() {
        // Alternating bits: minority ratio 1.0, well above 0.15
        let bits: Vec<u8> = (0..216).map(|i| (i % 2) as u8).collect();
        assert!(check_crc(&bits));
    }

    #[test]
    fn test_crc16_fallback_with_matching_checksum() {
        // Sparse payload so the ratio heuristic is inconclusive, with the
        // genuine CRC appended
        let mut payload = vec![0u8; 200];
        payload[0] = 1;
        payload[97] = 1;
        let crc = crc16_ccitt_bits(&payload);
        let mut bits = payload.clone();
        bits.extend_from_slice(&crc);
        assert!(check_crc(&bits));
    }

    #[test]
    fn test_parse_burst_insufficient_symbols() {
        let mut stats = SessionStats::new();
        assert!(parse_burst(&[0u8; 100], 0, 0, &mut stats).is_none());
        assert_eq!(stats.total_bursts, 0);
    }

    #[test]
    fn test_parse_burst_counts_stats() {
        let mut stats = SessionStats::new();
        let symbols: Vec<u8> = (0..255).map(|i| (i % 4) as u8).collect();
        let burst = parse_burst(&symbols, 1, 5, &mut stats).expect("burst");
        assert_eq!(stats.total_bursts, 1);
        assert_eq!(stats.crc_pass + stats.crc_fail, 1);
        assert_eq!(burst.slot_number, 1);
        assert_eq!(burst.frame_number, 5);
    }
}
