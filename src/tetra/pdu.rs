//! MAC layer PDU decoding
//!
//! Field extraction degrades gracefully: too few bits for the address or
//! length fields yields an absent/default value, never an error, and the
//! payload is clipped to whatever bits are actually available. One bad PDU
//! must never discard a structurally valid burst.

use super::types::{MacPdu, PduType};
use crate::stats::SessionStats;

/// Interpret a bit slice (MSB first) as an unsigned integer.
pub fn bits_to_uint(bits: &[u8]) -> u32 {
    bits.iter().fold(0u32, |acc, &b| (acc << 1) | b as u32)
}

/// Pack a bit slice (MSB first) into bytes, zero-padding the final byte.
pub fn bits_to_bytes(bits: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0u8; bits.len().div_ceil(8)];
    for (i, &bit) in bits.iter().enumerate() {
        if bit != 0 {
            bytes[i / 8] |= 1 << (7 - (i % 8));
        }
    }
    bytes
}

/// Parse a MAC PDU from a burst's data bits.
///
/// Layout: 3-bit type, 1-bit fill indicator, 1-bit encrypted flag, 24-bit
/// address, 6-bit length (bytes), then payload bits bounded by the declared
/// length and clipped to what remains.
pub fn parse_mac_pdu(bits: &[u8], stats: &mut SessionStats) -> Option<MacPdu> {
    if bits.len() < 8 {
        return None;
    }

    let type_code = (bits[0] << 2) | (bits[1] << 1) | bits[2];
    let pdu_type = PduType::from_code(type_code);
    let fill_bits = bits[3];
    let encrypted = bits[4] == 1;

    let address = if bits.len() >= 29 {
        Some(bits_to_uint(&bits[5..29]))
    } else {
        None
    };

    let length = if bits.len() >= 35 {
        bits_to_uint(&bits[29..35]) as u8
    } else {
        0
    };

    let data_start = 35;
    let data = if bits.len() > data_start {
        let end = (data_start + length as usize * 8).min(bits.len());
        bits_to_bytes(&bits[data_start..end])
    } else {
        Vec::new()
    };

    if encrypted {
        stats.encrypted_frames += 1;
    } else {
        stats.clear_mode_frames += 1;
    }

    Some(MacPdu {
        pdu_type,
        encrypted,
        address,
        length,
        data,
        fill_bits,
    })
}
