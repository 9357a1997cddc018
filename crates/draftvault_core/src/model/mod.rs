//! Domain models for drafts and their media attachments.

pub mod draft;
pub mod media;

pub use draft::{DraftId, DraftNote};
pub use media::{LocalRef, MediaFile, MediaId};

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in epoch milliseconds.
///
/// Used to stamp `created_at`/`updated_at` on persistence writes.
pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}
