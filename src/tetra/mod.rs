//! TETRA protocol parsing: synchronization, bursts, MAC PDUs, metadata

pub mod burst;
pub mod metadata;
pub mod pdu;
pub mod sync;
mod types;

pub use burst::parse_burst;
pub use metadata::{decode_sds_text, parse_call_metadata, parse_sds_message};
pub use pdu::{bits_to_bytes, bits_to_uint, parse_mac_pdu};
pub use sync::{find_sync, symbols_to_bits, DEFAULT_SYNC_THRESHOLD};
pub use types::{
    BurstType, CallMetadata, CallType, EncryptionVerdict, FrameClass, FrameRecord, MacPdu, PduType,
    TetraBurst,
};
