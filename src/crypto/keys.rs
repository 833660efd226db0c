//! Encryption key storage and the built-in common-key bank
//!
//! Keys load once at startup; during decode the ring is read-only. Callers
//! that load keys while decodes are in flight must serialize that
//! externally (single-writer-before-any-reader is the expected pattern).

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Key registry: (algorithm, key id) -> raw key bytes
#[derive(Debug, Default, Clone)]
pub struct KeyRing {
    keys: HashMap<String, HashMap<String, Vec<u8>>>,
}

impl KeyRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load keys from a UTF-8 text file, one entry per line:
    ///
    /// ```text
    /// ALGORITHM:KEY_ID:HEX_KEY
    /// ```
    ///
    /// Blank lines and lines starting with `#` are skipped. Malformed lines
    /// are logged and skipped, never fatal. Returns the number of keys
    /// loaded.
    pub fn load_key_file(&mut self, path: &Path) -> Result<usize> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read key file {}", path.display()))?;

        let mut loaded = 0;
        for (line_num, raw_line) in contents.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = line.split(':').collect();
            if parts.len() != 3 {
                warn!("Invalid key format at line {}: {}", line_num + 1, line);
                continue;
            }

            let algorithm = parts[0].to_uppercase();
            let key_id = parts[1].to_string();
            match hex::decode(parts[2]) {
                Ok(key_bytes) => {
                    info!("Loaded {} key {}", algorithm, key_id);
                    self.keys.entry(algorithm).or_default().insert(key_id, key_bytes);
                    loaded += 1;
                }
                Err(e) => {
                    warn!("Error parsing key at line {}: {}", line_num + 1, e);
                }
            }
        }

        Ok(loaded)
    }

    pub fn add_key(&mut self, algorithm: &str, key_id: &str, key: Vec<u8>) {
        self.keys
            .entry(algorithm.to_uppercase())
            .or_default()
            .insert(key_id.to_string(), key);
    }

    pub fn get_key(&self, algorithm: &str, key_id: &str) -> Option<&[u8]> {
        self.keys
            .get(&algorithm.to_uppercase())?
            .get(key_id)
            .map(Vec::as_slice)
    }

    pub fn has_key(&self, algorithm: &str, key_id: &str) -> bool {
        self.get_key(algorithm, key_id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Built-in common/weak keys per algorithm, as hex strings, tried when
/// bruteforcing encrypted frames. Entries whose length does not match the
/// variant fail decryptor construction and are simply skipped by the
/// engine; the bank is kept as collected.
pub fn common_keys(algorithm: &str) -> &'static [&'static str] {
    match algorithm {
        "TEA1" => &[
            // Null/default keys
            "00000000000000000000",
            "FFFFFFFFFFFFFFFFFFFFFFFF",
            // Test patterns
            "0123456789ABCDEF0123",
            "FEDCBA9876543210FEDC",
            // Common weak keys
            "1111111111111111111111",
            "AAAAAAAAAAAAAAAAAAAA",
            "5555555555555555555555",
            // Default manufacturer keys
            "0001020304050607080910",
            "1234567890ABCDEF1234",
            "DEADBEEFCAFEBABEFACE",
            // Network default keys
            "A0B1C2D3E4F506172839",
            "112233445566778899AA",
            "0F0F0F0F0F0F0F0F0F0F",
        ],
        "TEA2" => &[
            // Null/default keys
            "00000000000000000000000000000000",
            "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF",
            // Test patterns
            "0123456789ABCDEF0123456789ABCDEF",
            "FEDCBA9876543210FEDCBA9876543210",
            // Common patterns
            "11111111111111111111111111111111",
            "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA",
            "55555555555555555555555555555555",
            // Manufacturer defaults
            "000102030405060708091011121314151617",
            "1234567890ABCDEF1234567890ABCDEF",
            "DEADBEEFCAFEBABEDEADBEEFCAFEBABE",
            // Network defaults
            "A0B1C2D3E4F5061728394A5B6C7D8E9F",
            "1122334455667788990011223344556677",
        ],
        _ => &[],
    }
}
