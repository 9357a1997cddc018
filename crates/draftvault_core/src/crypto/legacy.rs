//! Legacy AES-256-CBC decryption for key-exchange interoperability.
//!
//! Payloads in this format are produced by an external signing/key-exchange
//! component that uses a fixed IV of sixteen ASCII `'0'` bytes and PKCS#7
//! padding, with no authentication tag. The IV must stay bit-for-bit
//! identical to that protocol; changing it breaks every existing payload.
//!
//! This path is intentionally weaker than the GCM path (no integrity check)
//! and exists solely for reading data the external protocol already
//! produced. It must not be used for new data.

use aes::Aes256;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, KeyIvInit};
use zeroize::Zeroizing;

use super::KEY_SIZE;

type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Fixed IV mandated by the external protocol: the UTF-8 bytes of the
/// string `"0000000000000000"`, not sixteen zero bytes.
const LEGACY_IV: &[u8; 16] = b"0000000000000000";

const BLOCK_SIZE: usize = 16;

/// Decrypts a hex-encoded legacy ciphertext under a hex-encoded 256-bit key.
///
/// Returns hex-encoded plaintext on success. Any decode, length, or padding
/// failure yields `None` rather than an error, matching the calling
/// convention of the media payload consumer; callers must treat `None` as a
/// hard failure for the current operation.
pub fn legacy_decrypt(hex_ciphertext: &str, hex_key: &str) -> Option<String> {
    let key = Zeroizing::new(hex::decode(hex_key).ok()?);
    if key.len() != KEY_SIZE {
        return None;
    }

    let ciphertext = hex::decode(hex_ciphertext).ok()?;
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return None;
    }

    let plaintext = Aes256CbcDec::new_from_slices(key.as_slice(), LEGACY_IV)
        .ok()?
        .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
        .ok()?;

    Some(hex::encode(plaintext))
}

/// Decrypts a raw legacy-encrypted media payload to its original bytes.
///
/// The sentinel from [`legacy_decrypt`] and zero-length output are both
/// hard failures: an empty payload is never valid media data.
pub fn decrypt_media_payload(encrypted: &[u8], hex_key: &str) -> Option<Vec<u8>> {
    let plain_hex = legacy_decrypt(&hex::encode(encrypted), hex_key)?;
    if plain_hex.is_empty() {
        return None;
    }
    hex::decode(plain_hex).ok()
}

#[cfg(test)]
mod tests {
    use super::legacy_decrypt;

    const KEY: &str = "2b7e151628aed2a6abf7158809cf4f3c2b7e151628aed2a6abf7158809cf4f3c";

    #[test]
    fn rejects_ciphertext_not_aligned_to_block_size() {
        assert_eq!(legacy_decrypt("cafebabe", KEY), None);
    }

    #[test]
    fn rejects_empty_and_non_hex_ciphertext() {
        assert_eq!(legacy_decrypt("", KEY), None);
        assert_eq!(legacy_decrypt(&"zz".repeat(16), KEY), None);
    }

    #[test]
    fn rejects_wrong_size_key() {
        let ciphertext = "00".repeat(16);
        assert_eq!(legacy_decrypt(&ciphertext, &"ab".repeat(31)), None);
        assert_eq!(legacy_decrypt(&ciphertext, &"ab".repeat(33)), None);
    }
}
