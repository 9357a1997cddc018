//! Draft note domain model.
//!
//! # Responsibility
//! - Define the user-authored, unpublished (or re-editable) note record.
//!
//! # Invariants
//! - `id` is assigned on first save and immutable thereafter.
//! - `created_at` never changes after first save.
//! - `updated_at` strictly increases on every save.
//! - `id == None` means the draft has never been persisted.

use serde::{Deserialize, Serialize};

/// Stable storage identifier for a persisted draft.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
/// Values are auto-assigned SQLite rowids.
pub type DraftId = i64;

/// A user-authored note draft.
///
/// Callers hold copies, not references: the store owns the persisted
/// representation, and concurrent changes are only observable by re-fetching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftNote {
    /// Assigned by the store on first save; `None` before that.
    pub id: Option<DraftId>,
    /// Display title.
    pub title: String,
    /// Display subtitle.
    pub subtitle: String,
    /// Cover image reference: an inline data URL or a published-resource URL.
    pub cover: String,
    /// Note body.
    pub content: String,
    /// Ordered tag set, persisted as a JSON array column.
    pub tags: Vec<String>,
    /// Epoch milliseconds, stamped by the store on first save.
    pub created_at: i64,
    /// Epoch milliseconds, restamped by the store on every save.
    pub updated_at: i64,
    /// Origin publication identifier when this draft edits an
    /// already-published note.
    pub publication_id: Option<String>,
}

impl DraftNote {
    /// Creates an unpersisted draft with empty metadata.
    ///
    /// Timestamps are left at zero; the store stamps them on save and never
    /// trusts caller-supplied values.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            subtitle: String::new(),
            cover: String::new(),
            content: content.into(),
            tags: Vec::new(),
            created_at: 0,
            updated_at: 0,
            publication_id: None,
        }
    }

    /// Returns whether this draft has ever been persisted.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::DraftNote;

    #[test]
    fn new_draft_is_unpersisted() {
        let draft = DraftNote::new("title", "body");
        assert!(!draft.is_persisted());
        assert_eq!(draft.created_at, 0);
        assert!(draft.tags.is_empty());
    }
}
