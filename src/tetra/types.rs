//! TETRA protocol data types

use serde::Serialize;

use crate::crypto::DecryptOutcome;

/// TETRA burst types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BurstType {
    NormalUplink,
    NormalDownlink,
    ControlUplink,
    ControlDownlink,
    Synchronization,
    Linearization,
}

/// MAC PDU types (3-bit field)
///
/// The `Other` arm carries codes outside 0-7, which can only come from the
/// wider frame-header view of the same leading bits. Consumers that need the
/// original default-to-DATA behavior treat `Other` like `Data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PduType {
    Resource,
    Frag,
    End,
    Broadcast,
    Suppl,
    USignal,
    Data,
    UBlk,
    Other(u8),
}

impl PduType {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Resource,
            1 => Self::Frag,
            2 => Self::End,
            3 => Self::Broadcast,
            4 => Self::Suppl,
            5 => Self::USignal,
            6 => Self::Data,
            7 => Self::UBlk,
            n => Self::Other(n),
        }
    }

    /// Whether SDS text decoding applies to this PDU type.
    /// Unrecognized codes historically fell back to the DATA handling.
    pub fn carries_sds(&self) -> bool {
        matches!(self, Self::Data | Self::Other(_))
    }
}

/// Unified classification over the leading type bits.
///
/// The MAC parser and the top-level frame decoder both branch on the same
/// leading bits; this single classification provides both views: `pdu_type`
/// for protocol statistics and `name`/`description` for display.
#[derive(Debug, Clone, Serialize)]
pub struct FrameClass {
    pub code: u8,
    pub pdu_type: PduType,
    pub name: String,
    pub description: String,
}

impl FrameClass {
    pub fn from_code(code: u8) -> Self {
        let pdu_type = PduType::from_code(code);
        let (name, description) = match code {
            0 => ("MAC-RESOURCE", "Resource allocation"),
            1 => ("MAC-FRAG", "Fragment"),
            2 => ("MAC-END", "End of transmission"),
            3 => ("MAC-BROADCAST", "Broadcast info"),
            4 => ("MAC-SUPPL", "Supplementary"),
            5 => ("MAC-U-SIGNAL", "Signaling"),
            6 => ("MAC-DATA", "User Data"),
            7 => ("MAC-U-BLK", "Block"),
            n => {
                return Self {
                    code,
                    pdu_type,
                    name: format!("Type {n}"),
                    description: format!("Raw type {n}"),
                }
            }
        };
        Self {
            code,
            pdu_type,
            name: name.to_string(),
            description: description.to_string(),
        }
    }
}

/// A parsed TETRA burst (255 symbols, one slot)
#[derive(Debug, Clone)]
pub struct TetraBurst {
    pub burst_type: BurstType,
    pub slot_number: u8,
    pub frame_number: u8,
    /// Training sequence bits, kept for burst-type diagnostics only
    pub training_sequence: Vec<u8>,
    pub data_bits: Vec<u8>,
    pub crc_ok: bool,
}

/// MAC layer PDU
#[derive(Debug, Clone, Serialize)]
pub struct MacPdu {
    pub pdu_type: PduType,
    pub encrypted: bool,
    /// 24-bit address, absent when the burst carried too few bits
    pub address: Option<u32>,
    /// Declared payload length in bytes; the actual payload may be shorter
    pub length: u8,
    pub data: Vec<u8>,
    pub fill_bits: u8,
}

/// Call type derived from setup/assignment PDUs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CallType {
    Voice,
    Data,
    Group,
    Individual,
}

impl std::fmt::Display for CallType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Voice => write!(f, "Voice"),
            Self::Data => write!(f, "Data"),
            Self::Group => write!(f, "Group"),
            Self::Individual => write!(f, "Individual"),
        }
    }
}

/// Call setup/teardown metadata
#[derive(Debug, Clone, Serialize)]
pub struct CallMetadata {
    pub call_type: CallType,
    pub talkgroup_id: Option<u32>,
    /// Subscriber Station Identity of the originator
    pub source_ssi: Option<u32>,
    pub dest_ssi: Option<u32>,
    pub channel_allocated: Option<u8>,
    pub encryption_enabled: bool,
    pub encryption_algorithm: Option<String>,
}

/// How the encryption verdict for a frame was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EncryptionVerdict {
    /// No MAC PDU evidence; the conservative default applies
    AssumedEncrypted,
    /// The MAC PDU flag said encrypted
    FlaggedEncrypted,
    /// The MAC PDU claimed clear mode and payload diversity agreed
    Clear,
    /// The MAC PDU claimed clear mode but payload diversity overrode it
    EntropyOverride,
}

impl EncryptionVerdict {
    pub fn is_encrypted(&self) -> bool {
        !matches!(self, Self::Clear)
    }
}

/// One decoded frame, assembled once after all pipeline stages ran
#[derive(Debug, Clone, Serialize)]
pub struct FrameRecord {
    pub frame_number: u8,
    pub class: FrameClass,
    /// Offset of the sync pattern in the capture's bitstream
    pub position: usize,
    /// Raw 32-bit frame header as '0'/'1' characters
    pub header_bits: String,
    /// 12-bit network id, present for MAC-RESOURCE frames only
    pub network_id: Option<u16>,
    pub slot_number: u8,
    pub encryption: EncryptionVerdict,
    pub encryption_algorithm: Option<String>,
    pub key_id: String,
    pub burst_crc_ok: Option<bool>,
    pub mac_pdu: Option<MacPdu>,
    pub call_metadata: Option<CallMetadata>,
    pub sds_message: Option<String>,
    pub decryption: Option<DecryptOutcome>,
}

impl FrameRecord {
    /// Multi-line human-readable summary for log and file output.
    pub fn summary(&self) -> String {
        let mut info = format!(
            "Frame #{} (Type: {})\n  Position: {}\n  Header: {}",
            self.frame_number, self.class.name, self.position, self.header_bits
        );
        info.push_str(&format!("\n  {}", self.class.description));

        if let Some(network_id) = self.network_id {
            info.push_str(&format!("\n  Network ID: {network_id}"));
        }

        if self.encryption.is_encrypted() {
            info.push_str(&format!(
                "\n  Encrypted: yes ({})",
                self.encryption_algorithm.as_deref().unwrap_or("Unknown")
            ));
            match &self.decryption {
                Some(DecryptOutcome::Recovered {
                    payload,
                    key_used,
                    confidence,
                }) => {
                    info.push_str(&format!("\n  Decrypted: yes - {key_used} (confidence: {confidence})"));
                    let payload_hex = hex::encode(payload);
                    info.push_str(&format!(
                        "\n  Payload (hex): {}...",
                        &payload_hex[..payload_hex.len().min(64)]
                    ));
                }
                Some(DecryptOutcome::Failed(reason)) => {
                    info.push_str(&format!("\n  Decrypted: no ({reason})"));
                }
                None => info.push_str("\n  Decrypted: no"),
            }
        } else {
            info.push_str("\n  Encrypted: no");
        }

        if let Some(text) = &self.sds_message {
            info.push_str(&format!("\n  Content: {text}"));
        }

        if let Some(meta) = &self.call_metadata {
            info.push_str(&format!("\n  Call Type: {}", meta.call_type));
            if let Some(tg) = meta.talkgroup_id {
                info.push_str(&format!("\n  Talkgroup: {tg}"));
            }
            if let Some(src) = meta.source_ssi {
                info.push_str(&format!("\n  Source SSI: {src}"));
            }
            if let Some(dst) = meta.dest_ssi {
                info.push_str(&format!("\n  Dest SSI: {dst}"));
            }
            if let Some(ch) = meta.channel_allocated {
                info.push_str(&format!("\n  Channel: {ch}"));
            }
        }

        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdu_type_from_code() {
        assert_eq!(PduType::from_code(0), PduType::Resource);
        assert_eq!(PduType::from_code(5), PduType::USignal);
        assert_eq!(PduType::from_code(7), PduType::UBlk);
        assert_eq!(PduType::from_code(12), PduType::Other(12));
    }

    #[test]
    fn test_unrecognized_code_carries_sds() {
        // Unknown codes keep the historical default-to-DATA behavior
        assert!(PduType::from_code(9).carries_sds());
        assert!(PduType::Data.carries_sds());
        assert!(!PduType::Resource.carries_sds());
    }

    #[test]
    fn test_frame_class_both_views() {
        let class = FrameClass::from_code(5);
        assert_eq!(class.pdu_type, PduType::USignal);
        assert_eq!(class.name, "MAC-U-SIGNAL");
        assert_eq!(class.description, "Signaling");

        let raw = FrameClass::from_code(11);
        assert_eq!(raw.pdu_type, PduType::Other(11));
        assert_eq!(raw.name, "Type 11");
    }

    #[test]
    fn test_encryption_verdict() {
        assert!(EncryptionVerdict::AssumedEncrypted.is_encrypted());
        assert!(EncryptionVerdict::FlaggedEncrypted.is_encrypted());
        assert!(EncryptionVerdict::EntropyOverride.is_encrypted());
        assert!(!EncryptionVerdict::Clear.is_encrypted());
    }
}
