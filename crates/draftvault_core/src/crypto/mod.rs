//! Symmetric crypto engine for media payload protection.
//!
//! # Responsibility
//! - Authenticated AES-256-GCM encryption/decryption of string payloads
//!   under an externally supplied hex-encoded key.
//! - Secure key generation.
//! - Legacy static-IV AES-256-CBC decryption for interoperability
//!   with payloads produced by the external key-exchange protocol.
//!
//! # Invariants
//! - Keys are 32 bytes (64 hex chars); anything else is rejected before the
//!   primitive runs.
//! - GCM nonces are 12 random bytes, freshly generated per call, never
//!   counter-based: the key is reused across many payloads and no persistent
//!   counter state exists between calls.
//! - Decryption never returns unauthenticated plaintext on tag mismatch.

mod gcm;
mod legacy;

pub use gcm::{decrypt, encrypt, generate_key, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use legacy::{decrypt_media_payload, legacy_decrypt};

use thiserror::Error;
use zeroize::Zeroizing;

/// Crypto engine failure taxonomy.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Decoded key is not exactly 32 bytes. Caller defect, rejected early.
    #[error("key must be {expected} bytes, got {actual}")]
    KeyLength { expected: usize, actual: usize },

    /// Input is not decodable (bad hex/base64) or too short to carry a
    /// nonce and tag.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Authentication tag mismatch: tampered or wrong-key ciphertext.
    #[error("authentication failed: tag mismatch (tampered or wrong-key ciphertext)")]
    Authentication,

    /// Decrypted bytes are not valid UTF-8.
    #[error("decrypted payload is not valid UTF-8")]
    Decoding(#[from] std::string::FromUtf8Error),

    /// Underlying primitive failure during encryption.
    #[error("encryption failed: {0}")]
    Encryption(String),
}

/// Decodes and validates a hex-encoded 256-bit key.
///
/// The decoded material is zeroized on drop.
fn decode_key(hex_key: &str) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let key = Zeroizing::new(hex::decode(hex_key).map_err(|err| {
        CryptoError::MalformedInput(format!("key is not valid hex: {err}"))
    })?);

    if key.len() != KEY_SIZE {
        return Err(CryptoError::KeyLength {
            expected: KEY_SIZE,
            actual: key.len(),
        });
    }

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::{decode_key, CryptoError, KEY_SIZE};

    #[test]
    fn decode_key_accepts_exactly_32_bytes() {
        let key = decode_key(&"ab".repeat(KEY_SIZE)).unwrap();
        assert_eq!(key.len(), KEY_SIZE);
    }

    #[test]
    fn decode_key_rejects_short_and_long_keys() {
        let short = decode_key(&"ab".repeat(KEY_SIZE - 1)).unwrap_err();
        assert!(matches!(short, CryptoError::KeyLength { actual: 31, .. }));

        let long = decode_key(&"ab".repeat(KEY_SIZE + 1)).unwrap_err();
        assert!(matches!(long, CryptoError::KeyLength { actual: 33, .. }));
    }

    #[test]
    fn decode_key_rejects_non_hex() {
        let err = decode_key(&"zz".repeat(KEY_SIZE)).unwrap_err();
        assert!(matches!(err, CryptoError::MalformedInput(_)));
    }
}
