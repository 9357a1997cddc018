//! Media attachment domain model.
//!
//! # Responsibility
//! - Define the binary attachment record owned by exactly one draft.
//! - Model the two historical local-reference encodings as a typed variant.
//!
//! # Invariants
//! - `draft_id` must reference a draft that exists for the lifetime of the
//!   record; the store enforces this via cascading delete.
//! - A `Revocable` reference is released exactly once, when its owning
//!   record is deleted.
//! - `publication_id` is set at most once, by the publish workflow.

use serde::{Deserialize, Serialize};

use super::DraftId;

/// Stable storage identifier for a persisted media file.
pub type MediaId = i64;

/// In-process-resolvable content reference for a media attachment.
///
/// Two historical encodings exist: a durable inline encoding that needs no
/// cleanup, and a transient revocable handle that must be released through
/// a [`HandleReleaser`](crate::repo::HandleReleaser) when the record is
/// deleted. Modeling them as a variant keeps the release-exactly-once
/// discipline visible in the type instead of hidden in string prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum LocalRef {
    /// Self-contained data URL; no cleanup required.
    Inline(String),
    /// Transient handle backed by process-local memory; must be released.
    Revocable(String),
}

impl LocalRef {
    /// Returns the raw reference value regardless of encoding.
    pub fn value(&self) -> &str {
        match self {
            Self::Inline(value) | Self::Revocable(value) => value,
        }
    }

    /// Returns the revocable handle, if this reference carries one.
    pub fn revocable_handle(&self) -> Option<&str> {
        match self {
            Self::Revocable(handle) => Some(handle),
            Self::Inline(_) => None,
        }
    }
}

/// A binary attachment (image or similar) owned by one draft.
///
/// Content is immutable once attached: replacing it means deleting the
/// record and adding a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFile {
    /// Assigned by the store on insert; `None` before that.
    pub id: Option<MediaId>,
    /// Owning draft. Required.
    pub draft_id: DraftId,
    /// Local content reference.
    pub local_ref: LocalRef,
    /// Raw binary payload.
    pub data: Vec<u8>,
    /// MIME-ish type tag, e.g. `image/png`.
    pub mime_type: String,
    /// Original filename.
    pub file_name: String,
    /// Epoch milliseconds, stamped by the store on insert.
    pub created_at: i64,
    /// Permanent identifier assigned once the media is published elsewhere.
    pub publication_id: Option<String>,
}

impl MediaFile {
    /// Creates an unpersisted attachment for the given draft.
    pub fn new(
        draft_id: DraftId,
        local_ref: LocalRef,
        data: Vec<u8>,
        mime_type: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            draft_id,
            local_ref,
            data,
            mime_type: mime_type.into(),
            file_name: file_name.into(),
            created_at: 0,
            publication_id: None,
        }
    }
}
