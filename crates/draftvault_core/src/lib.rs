//! Core domain logic for DraftVault: client-side encrypted persistence of
//! note drafts and their media attachments.
//!
//! This crate is the single source of truth for business invariants. UI,
//! session handling, wallet signing, and the publish pipeline live outside
//! and interact only through the seams exposed here.

pub mod crypto;
pub mod db;
pub mod keycache;
pub mod logging;
pub mod model;
pub mod repo;

pub use crypto::{
    decrypt, decrypt_media_payload, encrypt, generate_key, legacy_decrypt, CryptoError, KEY_SIZE,
    NONCE_SIZE, TAG_SIZE,
};
pub use keycache::{
    MessageSigner, SigCacheError, SigKeyCache, SigKeyEntry, WalletSession, SIGN_KEYS_SLOT,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::{DraftId, DraftNote, LocalRef, MediaFile, MediaId};
pub use repo::{
    DraftStore, HandleReleaser, NoopReleaser, SqliteDraftStore, StoreError, StoreResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
