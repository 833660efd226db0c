//! Bruteforce decryption engine with plausibility scoring
//!
//! With no ground truth for a "correct" decode, candidates are ranked by a
//! plaintext plausibility heuristic. The score is a ranking signal, not a
//! cryptographic distinguisher: short or coincidentally structured
//! ciphertext can score as a false positive.

use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

use super::cipher::{TeaDecryptor, TeaVariant};
use super::keys::{common_keys, KeyRing};

/// Stop trialing further keys once a candidate scores above this. Kept
/// deliberately low to bound the worst-case trial count.
pub const EARLY_EXIT_SCORE: i32 = 50;

/// Minimum score for the best candidate to be accepted at all.
pub const ACCEPT_SCORE: i32 = 10;

/// First-byte values considered plausible protocol headers
const PLAUSIBLE_HEADER_BYTES: [u8; 8] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x08, 0x0A, 0x0C];

/// Why a decryption attempt produced no accepted plaintext
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DecryptFailure {
    /// Payloads under one cipher block cannot be attempted
    PayloadTooShort,
    NoKeysAvailable,
    /// Every candidate scored at or below the acceptance threshold
    LowConfidence { keys_tried: usize, best_score: i32 },
}

impl fmt::Display for DecryptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PayloadTooShort => write!(f, "Payload too short for decryption"),
            Self::NoKeysAvailable => write!(f, "No keys available"),
            Self::LowConfidence {
                keys_tried,
                best_score,
            } => write!(f, "Tried {keys_tried} key(s), best score: {best_score}"),
        }
    }
}

/// Outcome of a decryption attempt over one frame payload
#[derive(Debug, Clone, Serialize)]
pub enum DecryptOutcome {
    Recovered {
        payload: Vec<u8>,
        /// Which key/cipher produced the accepted plaintext
        key_used: String,
        /// Plausibility score of the accepted plaintext
        confidence: i32,
    },
    Failed(DecryptFailure),
}

/// Count distinct byte values in a buffer.
pub fn unique_byte_count(data: &[u8]) -> usize {
    let mut seen = [false; 256];
    let mut unique = 0;
    for &b in data {
        if !seen[b as usize] {
            seen[b as usize] = true;
            unique += 1;
        }
    }
    unique
}

/// Score a decrypted candidate by plaintext plausibility.
///
/// The constants are empirically chosen behavior and preserved verbatim:
/// printable ASCII and byte diversity score up, degenerate all-0x00/all-0xFF
/// buffers score down, and a handful of first-byte values common in traffic
/// headers get a bonus.
pub fn score_plaintext(data: &[u8]) -> i32 {
    let mut score = 0i32;

    let printable = data.iter().filter(|&&b| (32..=126).contains(&b)).count();
    score += printable as i32 * 2;

    let unique = unique_byte_count(data);
    if unique > data.len() / 8 {
        score += 30;
    }

    if data.iter().all(|&b| b == 0) {
        score -= 50;
    }
    if data.iter().all(|&b| b == 0xFF) {
        score -= 50;
    }

    if data.len() >= 4 {
        let first = data[0];
        if first != 0 && first != 0xFF {
            score += 10;
        }
        if PLAUSIBLE_HEADER_BYTES.contains(&first) {
            score += 20;
        }
    }

    if unique > 1 {
        score += 10;
    }

    score
}

/// Build the prioritized candidate key list: an operator-provided key for
/// the exact (algorithm, key id) pair first, then the declared algorithm's
/// common-key bank, then the first 5 common keys of every other algorithm
/// as a hedge against misclassification.
fn candidate_keys(
    algorithm: &str,
    key_id: &str,
    key_ring: Option<&KeyRing>,
) -> Vec<(Vec<u8>, String, String)> {
    let mut keys = Vec::new();

    if let Some(ring) = key_ring {
        if let Some(key) = ring.get_key(algorithm, key_id) {
            info!("Trying key from file for {}", algorithm);
            keys.push((
                key.to_vec(),
                format!("{algorithm} key_id={key_id} (from file)"),
                algorithm.to_string(),
            ));
        }
    }

    for (idx, hex_key) in common_keys(algorithm).iter().enumerate() {
        if let Ok(key) = hex::decode(hex_key) {
            keys.push((
                key,
                format!("{algorithm} common_key_{idx}"),
                algorithm.to_string(),
            ));
        }
    }

    for other in ["TEA1", "TEA2", "TEA3"] {
        if other == algorithm {
            continue;
        }
        for (idx, hex_key) in common_keys(other).iter().take(5).enumerate() {
            if let Ok(key) = hex::decode(hex_key) {
                keys.push((
                    key,
                    format!("{other} common_key_{idx} (cross-try)"),
                    other.to_string(),
                ));
            }
        }
    }

    keys
}

/// Trial every candidate key against `payload` and accept the best-scoring
/// plaintext above the acceptance threshold.
///
/// The payload is zero-padded up to the next 8-byte block boundary;
/// payloads under 8 bytes are rejected outright. Candidates whose key
/// length or algorithm name is invalid are skipped, not fatal.
pub fn try_decrypt(
    payload: &[u8],
    algorithm: &str,
    key_id: &str,
    key_ring: Option<&KeyRing>,
) -> DecryptOutcome {
    if payload.len() < 8 {
        return DecryptOutcome::Failed(DecryptFailure::PayloadTooShort);
    }

    let mut padded = payload.to_vec();
    if padded.len() % 8 != 0 {
        let padding = 8 - padded.len() % 8;
        padded.resize(padded.len() + padding, 0);
    }

    let keys_to_try = candidate_keys(algorithm, key_id, key_ring);
    if keys_to_try.is_empty() {
        return DecryptOutcome::Failed(DecryptFailure::NoKeysAvailable);
    }

    info!("Trying {} keys", keys_to_try.len());
    let keys_tried = keys_to_try.len();

    let mut best: Option<(Vec<u8>, String)> = None;
    let mut best_score = 0i32;

    for (key, key_desc, alg_name) in keys_to_try {
        let variant = match TeaVariant::from_name(&alg_name) {
            Ok(v) => v,
            Err(e) => {
                debug!("Key {} failed: {}", key_desc, e);
                continue;
            }
        };
        let decryptor = match TeaDecryptor::new(&key, variant) {
            Ok(d) => d,
            Err(e) => {
                debug!("Key {} failed: {}", key_desc, e);
                continue;
            }
        };
        let decrypted = match decryptor.decrypt(&padded, None) {
            Ok(d) => d,
            Err(e) => {
                debug!("Key {} failed: {}", key_desc, e);
                continue;
            }
        };

        let score = score_plaintext(&decrypted);
        if score > best_score {
            best_score = score;
            best = Some((decrypted, key_desc.clone()));
        }

        if score > EARLY_EXIT_SCORE {
            info!("Good decryption score {} with {}", score, key_desc);
            break;
        }
    }

    match best {
        Some((payload, key_used)) if best_score > ACCEPT_SCORE => DecryptOutcome::Recovered {
            payload,
            key_used,
            confidence: best_score,
        },
        _ => DecryptOutcome::Failed(DecryptFailure::LowConfidence {
            keys_tried,
            best_score,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_all_zero_payload() {
        // Penalized below zero; must never be selectable
        let score = score_plaintext(&[0u8; 8]);
        assert!(score <= 0, "all-zero scored {score}");
    }

    #[test]
    fn test_score_all_ff_payload() {
        let score = score_plaintext(&[0xFFu8; 8]);
        assert!(score <= 0, "all-0xFF scored {score}");
    }

    #[test]
    fn test_score_printable_payload() {
        // "ABCDEFGH": at least 2 per printable byte
        let score = score_plaintext(b"ABCDEFGH");
        assert!(score >= 16);
        assert!(score > ACCEPT_SCORE);
    }

    #[test]
    fn test_score_plausible_header_bonus() {
        let with_header = score_plaintext(&[0x02, 0x90, 0x91, 0x92, 0x93, 0x94, 0x95, 0x96]);
        let without = score_plaintext(&[0x30, 0x90, 0x91, 0x92, 0x93, 0x94, 0x95, 0x96]);
        assert_eq!(with_header - without, 20 - 2);
    }

    #[test]
    fn test_score_determinism() {
        let data = hex::decode("0102030405060708090A0B0C0D0E0F10").unwrap();
        assert_eq!(score_plaintext(&data), score_plaintext(&data));
    }

    #[test]
    fn test_decrypt_too_short_payload() {
        let outcome = try_decrypt(&[1, 2, 3], "TEA1", "0", None);
        assert!(matches!(
            outcome,
            DecryptOutcome::Failed(DecryptFailure::PayloadTooShort)
        ));
    }

    #[test]
    fn test_decrypt_no_keys_for_unknown_algorithm() {
        // Unknown algorithm has no bank of its own; cross-try still supplies
        // candidates, so force emptiness through the TEA3 path minus others
        let outcome = try_decrypt(&[0u8; 16], "TEA9", "0", None);
        // TEA9 gets cross-try candidates from TEA1/TEA2/TEA3 banks
        assert!(!matches!(
            outcome,
            DecryptOutcome::Failed(DecryptFailure::NoKeysAvailable)
        ));
    }

    #[test]
    fn test_candidate_key_ordering() {
        let mut ring = KeyRing::new();
        ring.add_key("TEA1", "0", hex::decode("0123456789ABCDEF0123").unwrap());
        let keys = candidate_keys("TEA1", "0", Some(&ring));
        // Registry key first, then the 13 TEA1 bank keys, then 5 cross-try
        // keys from TEA2 (TEA3's bank is empty)
        assert!(keys[0].1.contains("from file"));
        assert_eq!(keys.len(), 1 + 13 + 5);
        assert!(keys[1].1.starts_with("TEA1 common_key_0"));
        assert!(keys[14].1.contains("cross-try"));
    }

    #[test]
    fn test_decrypt_determinism_and_outcome_shape() {
        let payload = hex::decode("AA55AA55AA55AA55DEADBEEF01020304").unwrap();
        let first = try_decrypt(&payload, "TEA1", "0", None);
        let second = try_decrypt(&payload, "TEA1", "0", None);
        match (first, second) {
            (
                DecryptOutcome::Recovered {
                    payload: p1,
                    key_used: k1,
                    confidence: c1,
                },
                DecryptOutcome::Recovered {
                    payload: p2,
                    key_used: k2,
                    confidence: c2,
                },
            ) => {
                assert_eq!(p1, p2);
                assert_eq!(k1, k2);
                assert_eq!(c1, c2);
            }
            (DecryptOutcome::Failed(f1), DecryptOutcome::Failed(f2)) => assert_eq!(f1, f2),
            _ => panic!("outcomes diverged between identical calls"),
        }
    }

    #[test]
    fn test_decrypt_pads_unaligned_payload() {
        // 13 bytes pads to 16; must not error out
        let payload = [0x5Au8; 13];
        let outcome = try_decrypt(&payload, "TEA2", "0", None);
        match outcome {
            DecryptOutcome::Recovered { payload, .. } => assert_eq!(payload.len(), 16),
            DecryptOutcome::Failed(DecryptFailure::LowConfidence { keys_tried, .. }) => {
                assert!(keys_tried > 0)
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_length_bank_keys_are_skipped() {
        // The TEA1 bank contains entries that are not 10 bytes; the engine
        // must skip them and still finish with a deterministic verdict
        let payload = [0u8; 8];
        let outcome = try_decrypt(&payload, "TEA1", "0", None);
        assert!(matches!(
            outcome,
            DecryptOutcome::Recovered { .. } | DecryptOutcome::Failed(DecryptFailure::LowConfidence { .. })
        ));
    }

    #[test]
    fn test_registry_key_tried_first() {
        let mut ring = KeyRing::new();
        ring.add_key("TEA2", "7", vec![0x13; 16]);
        let keys = candidate_keys("TEA2", "7", Some(&ring));
        assert!(keys[0].1.contains("key_id=7"));
        assert_eq!(keys[0].0, vec![0x13; 16]);
    }
}
