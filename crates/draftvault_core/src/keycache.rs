//! Per-address signing-key cache.
//!
//! # Responsibility
//! - Cache the signature-derived key for each wallet address so callers can
//!   avoid re-prompting the external signing operation.
//!
//! # Invariants
//! - Storage is one JSON blob under the `sign_keys` slot; concurrent updates
//!   are last-write-wins with no merge logic.
//! - `reload` and the getters degrade to empty/absent on any storage-read
//!   failure. This is a deliberate best-effort cache semantic, not a
//!   general error-handling pattern.

use crate::db::DbError;
use log::warn;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Well-known `kv_slots` slot holding the serialized cache.
pub const SIGN_KEYS_SLOT: &str = "sign_keys";

const SIG_KEY_HEX_CHARS: usize = 64;

/// One cached `{address, sigKey}` pair, serialized in the external wire
/// shape (camelCase field names).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigKeyEntry {
    pub address: String,
    pub sig_key: String,
}

/// Wallet/session capability consumed by the cache getters.
pub trait WalletSession {
    fn is_authorized(&self) -> bool;
    fn current_address(&self) -> Option<String>;
}

/// Identity-signing capability; returns the hex-encoded signature.
pub trait MessageSigner {
    fn sign_message(&self, message: &str) -> Result<String, String>;
}

#[derive(Debug)]
pub enum SigCacheError {
    /// Storage write failure.
    Db(DbError),
    /// Cache contents failed to serialize.
    Serialize(serde_json::Error),
    /// The external signing operation failed.
    Signer(String),
    /// No authorized identity with an address is active.
    NoActiveIdentity,
}

impl Display for SigCacheError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Serialize(err) => write!(f, "failed to serialize sign keys: {err}"),
            Self::Signer(message) => write!(f, "signing failed: {message}"),
            Self::NoActiveIdentity => write!(f, "no authorized identity is active"),
        }
    }
}

impl Error for SigCacheError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialize(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for SigCacheError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Address-keyed signing-key cache over the shared SQLite database.
pub struct SigKeyCache<'conn> {
    conn: &'conn Connection,
    entries: Vec<SigKeyEntry>,
}

impl<'conn> SigKeyCache<'conn> {
    /// Creates a cache and loads whatever the backing slot currently holds.
    pub fn new(conn: &'conn Connection) -> Self {
        let mut cache = Self {
            conn,
            entries: Vec::new(),
        };
        cache.reload();
        cache
    }

    /// Re-reads the full cache from durable storage.
    ///
    /// A missing or corrupt backing slot resets the cache to empty rather
    /// than failing.
    pub fn reload(&mut self) {
        self.entries = match self.read_slot() {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!("event=sig_cache_reload module=keycache status=reset error={err}");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!("event=sig_cache_reload module=keycache status=reset error={err}");
                Vec::new()
            }
        };
    }

    /// Returns the cached signing key for an address, if any.
    pub fn get(&self, address: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.address == address)
            .map(|entry| entry.sig_key.as_str())
    }

    /// Snapshot of all cached entries.
    pub fn entries(&self) -> &[SigKeyEntry] {
        &self.entries
    }

    /// Replaces the entry for `address` or appends a new one, then persists
    /// the whole cache blob. Last write wins.
    pub fn upsert(&mut self, address: &str, sig_key: &str) -> Result<(), SigCacheError> {
        match self
            .entries
            .iter_mut()
            .find(|entry| entry.address == address)
        {
            Some(entry) => entry.sig_key = sig_key.to_string(),
            None => self.entries.push(SigKeyEntry {
                address: address.to_string(),
                sig_key: sig_key.to_string(),
            }),
        }

        let raw = serde_json::to_string(&self.entries).map_err(SigCacheError::Serialize)?;
        self.conn.execute(
            "INSERT INTO kv_slots (slot, value) VALUES (?1, ?2)
             ON CONFLICT(slot) DO UPDATE SET value = excluded.value;",
            params![SIGN_KEYS_SLOT, raw],
        )?;
        Ok(())
    }

    /// Returns the cached key for the session's current address, or `None`
    /// when the session is unauthorized or nothing is cached.
    pub fn current_sig_key(&self, session: &dyn WalletSession) -> Option<String> {
        if !session.is_authorized() {
            return None;
        }
        let address = session.current_address()?;
        self.get(&address).map(str::to_string)
    }

    /// Signs the current address through the external signer and caches the
    /// first 64 hex chars of the signature as that address's key material.
    pub fn sign_and_store(
        &mut self,
        signer: &dyn MessageSigner,
        session: &dyn WalletSession,
    ) -> Result<String, SigCacheError> {
        let address = session
            .current_address()
            .filter(|_| session.is_authorized())
            .ok_or(SigCacheError::NoActiveIdentity)?;

        let signature = signer
            .sign_message(&address)
            .map_err(SigCacheError::Signer)?;
        let sig_key: String = signature.chars().take(SIG_KEY_HEX_CHARS).collect();

        self.upsert(&address, &sig_key)?;
        Ok(sig_key)
    }

    fn read_slot(&self) -> Result<Option<String>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT value FROM kv_slots WHERE slot = ?1;",
                [SIGN_KEYS_SLOT],
                |row| row.get(0),
            )
            .optional()
    }
}
