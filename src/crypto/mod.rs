//! Decryption: TEA cipher variants, key management, bruteforce engine

pub mod cipher;
pub mod engine;
pub mod keys;

pub use cipher::{CipherError, TeaDecryptor, TeaVariant};
pub use engine::{
    score_plaintext, try_decrypt, unique_byte_count, DecryptFailure, DecryptOutcome, ACCEPT_SCORE,
    EARLY_EXIT_SCORE,
};
pub use keys::{common_keys, KeyRing};
