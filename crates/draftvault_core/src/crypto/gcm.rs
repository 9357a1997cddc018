//! AES-256-GCM payload encryption.
//!
//! Ciphertext wire format, base64-encoded as a single blob:
//!   [ nonce (12 bytes) | ciphertext + tag (16 bytes) ]
//!
//! The nonce is prepended so the blob is self-contained; no separate
//! metadata field travels with it.

use aes_gcm::aead::{Aead, AeadCore, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use super::{decode_key, CryptoError};

/// AES-256 key size in bytes (64 hex chars on the wire).
pub const KEY_SIZE: usize = 32;
/// GCM nonce size in bytes.
pub const NONCE_SIZE: usize = 12;
/// GCM authentication tag size in bytes.
pub const TAG_SIZE: usize = 16;

/// Generates a fresh 256-bit key from the OS CSPRNG, hex-encoded.
///
/// CSPRNG failure aborts the process inside the RNG; there is no local
/// recovery from a broken entropy source.
pub fn generate_key() -> String {
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    OsRng.fill_bytes(&mut key[..]);
    hex::encode(&key[..])
}

/// Encrypts a UTF-8 payload under a hex-encoded 256-bit key.
///
/// A fresh random 12-byte nonce is generated per call; nonce reuse under the
/// same key breaks both confidentiality and authenticity.
///
/// # Errors
/// - `KeyLength` when the decoded key is not exactly 32 bytes.
/// - `MalformedInput` when the key is not valid hex.
/// - `Encryption` on primitive failure.
pub fn encrypt(plaintext: &str, hex_key: &str) -> Result<String, CryptoError> {
    let key = decode_key(hex_key)?;
    let cipher = Aes256Gcm::new_from_slice(key.as_slice())
        .map_err(|err| CryptoError::Encryption(err.to_string()))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|_| CryptoError::Encryption("AES-GCM primitive failure".to_string()))?;

    let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(BASE64.encode(blob))
}

/// Decrypts a base64 `nonce || ciphertext+tag` blob under a hex-encoded key.
///
/// # Errors
/// - `MalformedInput` when the blob is not base64 or shorter than 28 bytes
///   (12-byte nonce + 16-byte minimum tag).
/// - `KeyLength` / `MalformedInput` for key defects, as in [`encrypt`].
/// - `Authentication` on tag mismatch; altered plaintext is never returned.
/// - `Decoding` when the decrypted bytes are not valid UTF-8.
pub fn decrypt(ciphertext_b64: &str, hex_key: &str) -> Result<String, CryptoError> {
    let blob = BASE64.decode(ciphertext_b64).map_err(|err| {
        CryptoError::MalformedInput(format!("ciphertext is not valid base64: {err}"))
    })?;

    if blob.len() < NONCE_SIZE + TAG_SIZE {
        return Err(CryptoError::MalformedInput(format!(
            "ciphertext blob is {} bytes; need at least {} (nonce + tag)",
            blob.len(),
            NONCE_SIZE + TAG_SIZE
        )));
    }

    let key = decode_key(hex_key)?;
    let cipher = Aes256Gcm::new_from_slice(key.as_slice())
        .map_err(|err| CryptoError::Encryption(err.to_string()))?;

    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_SIZE);
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| CryptoError::Authentication)?;

    Ok(String::from_utf8(plaintext)?)
}

#[cfg(test)]
mod tests {
    use super::{decrypt, encrypt, generate_key, KEY_SIZE};

    #[test]
    fn generated_keys_are_64_hex_chars_and_distinct() {
        let first = generate_key();
        let second = generate_key();
        assert_eq!(first.len(), KEY_SIZE * 2);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first, second);
    }

    #[test]
    fn encrypt_then_decrypt_roundtrips() {
        let key = generate_key();
        let blob = encrypt("draft body", &key).unwrap();
        assert_eq!(decrypt(&blob, &key).unwrap(), "draft body");
    }
}
