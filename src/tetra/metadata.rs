//! Call metadata and short-data-service extraction
//!
//! Only MAC-RESOURCE and MAC-U-SIGNAL PDUs encode call metadata; every
//! other type genuinely produces none. Short-text recovery is a two-tier
//! heuristic and probabilistic by nature: noise that happens to look
//! textual can slip through.

use super::types::{CallMetadata, CallType, MacPdu, PduType};
use crate::stats::SessionStats;

fn be24(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]) & 0xFF_FFFF
}

/// Extract call metadata (talkgroup, SSIs, channel) from a MAC PDU.
pub fn parse_call_metadata(pdu: &MacPdu, stats: &mut SessionStats) -> Option<CallMetadata> {
    if pdu.data.len() < 4 {
        return None;
    }

    match pdu.pdu_type {
        PduType::Resource => parse_resource_assignment(pdu, stats),
        PduType::USignal => parse_call_setup(pdu, stats),
        _ => None,
    }
}

/// Resource assignment: channel allocation for a group or individual call.
fn parse_resource_assignment(pdu: &MacPdu, stats: &mut SessionStats) -> Option<CallMetadata> {
    let data = &pdu.data;
    if data.len() < 8 {
        return None;
    }

    let call_type = if data[0] & 0x80 != 0 {
        CallType::Group
    } else {
        CallType::Individual
    };
    let talkgroup_id = be24(&data[1..4]);
    let channel_allocated = data[4] & 0x3F;
    let encryption_enabled = data[5] & 0x80 != 0;

    stats.control_messages += 1;

    Some(CallMetadata {
        call_type,
        talkgroup_id: Some(talkgroup_id),
        source_ssi: None,
        dest_ssi: None,
        channel_allocated: Some(channel_allocated),
        encryption_enabled,
        encryption_algorithm: encryption_enabled.then(|| "TEA1".to_string()),
    })
}

/// Call setup signaling: source/destination identities and cipher selection.
fn parse_call_setup(pdu: &MacPdu, stats: &mut SessionStats) -> Option<CallMetadata> {
    let data = &pdu.data;
    if data.len() < 12 {
        return None;
    }

    let source_ssi = be24(&data[0..3]);
    let dest_ssi = be24(&data[3..6]);

    let call_type = if data[6] & 0x80 != 0 {
        stats.voice_calls += 1;
        CallType::Voice
    } else {
        stats.data_messages += 1;
        CallType::Data
    };

    let encryption_enabled = data[7] & 0x80 != 0;
    let encryption_algorithm = if encryption_enabled {
        match (data[7] >> 4) & 0x07 {
            1 => Some("TEA1".to_string()),
            2 => Some("TEA2".to_string()),
            3 => Some("TEA3".to_string()),
            _ => None,
        }
    } else {
        None
    };

    Some(CallMetadata {
        call_type,
        talkgroup_id: (call_type == CallType::Voice).then_some(dest_ssi),
        source_ssi: Some(source_ssi),
        dest_ssi: Some(dest_ssi),
        channel_allocated: None,
        encryption_enabled,
        encryption_algorithm,
    })
}

/// Two-tier printable-text recovery.
///
/// The strict pass accepts the payload only if every byte is printable
/// ASCII. The permissive pass keeps printable bytes (dropping '.' along
/// with the unprintable ones) and accepts the remainder only above a
/// minimum length, trading false positives for coverage of slightly
/// corrupted text.
pub fn decode_sds_text(data: &[u8]) -> Option<String> {
    if data.len() < 2 {
        return None;
    }

    if data.iter().all(|&b| (32..=126).contains(&b)) {
        return Some(data.iter().map(|&b| b as char).collect());
    }

    let clean: String = data
        .iter()
        .filter(|&&b| (32..=126).contains(&b) && b != b'.')
        .map(|&b| b as char)
        .collect();
    if clean.len() > 3 {
        return Some(clean);
    }

    None
}

/// Decode a Short Data Service text message from a clear-mode data PDU.
pub fn parse_sds_message(pdu: &MacPdu, stats: &mut SessionStats) -> Option<String> {
    if !pdu.pdu_type.carries_sds() {
        return None;
    }

    let text = decode_sds_text(&pdu.data)?;
    stats.data_messages += 1;
    Some(text)
}
