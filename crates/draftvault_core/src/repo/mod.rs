//! Persistence layer for drafts and media attachments.

pub mod draft_store;

pub use draft_store::{
    DraftStore, HandleReleaser, NoopReleaser, SqliteDraftStore, StoreError, StoreResult,
};
