//! Draft/media store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide durable CRUD APIs for drafts and their owned media files.
//! - Enforce referential integrity between the two collections via
//!   cascading delete; there is no database-level foreign key.
//! - Fold revocable-reference release into delete operations.
//!
//! # Invariants
//! - A draft's `created_at` is read back from storage on update; a
//!   caller-supplied value is never trusted.
//! - `updated_at` strictly increases on every save of the same draft.
//! - Cascading delete spans both collections in one IMMEDIATE transaction.
//! - Revocable handles are released exactly once, after the delete commits.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::{now_millis, DraftId, DraftNote, LocalRef, MediaFile, MediaId};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const DRAFT_SELECT_SQL: &str = "SELECT
    id,
    title,
    subtitle,
    cover,
    content,
    tags,
    created_at,
    updated_at,
    publication_id
FROM drafts";

const MEDIA_SELECT_SQL: &str = "SELECT
    id,
    draft_id,
    local_ref_kind,
    local_ref,
    data,
    mime_type,
    file_name,
    created_at,
    publication_id
FROM media_files";

pub type StoreResult<T> = Result<T, StoreError>;

/// Store error for draft/media persistence and query operations.
#[derive(Debug)]
pub enum StoreError {
    /// Storage substrate unavailable or corrupt.
    Db(DbError),
    /// Referenced draft absent where presence was required.
    NotFound(DraftId),
    /// Referenced media file absent where presence was required.
    MediaNotFound(MediaId),
    /// Attempt to overwrite an already-set publication identifier with a
    /// different value; promotion happens exactly once per record.
    AlreadyPublished {
        media_id: MediaId,
        existing: String,
    },
    /// Persisted state failed to parse back into the domain model.
    InvalidData(String),
    /// Connection has not gone through migration bootstrap.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "draft not found: {id}"),
            Self::MediaNotFound(id) => write!(f, "media file not found: {id}"),
            Self::AlreadyPublished { media_id, existing } => write!(
                f,
                "media file {media_id} already promoted to publication `{existing}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection not migrated: schema version {actual_version}, expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Release seam for transient revocable local references.
///
/// The embedding application owns the process-local memory behind revocable
/// handles; the store calls back through this trait when deleting records
/// that carry one. Release runs exactly once per deleted record, after the
/// delete has committed.
pub trait HandleReleaser {
    fn release(&mut self, handle: &str);
}

/// Releaser for embeddings that only ever store inline references.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReleaser;

impl HandleReleaser for NoopReleaser {
    fn release(&mut self, _handle: &str) {}
}

/// Store interface for draft and media persistence.
pub trait DraftStore {
    /// Inserts when `draft.id` is `None`, otherwise updates the existing
    /// record. Returns the (possibly newly assigned) identifier.
    fn save_draft(&mut self, draft: &DraftNote) -> StoreResult<DraftId>;
    /// Snapshot of all drafts, most recently updated first.
    fn list_drafts(&self) -> StoreResult<Vec<DraftNote>>;
    /// Point lookup; absent is not an error.
    fn get_draft(&self, id: DraftId) -> StoreResult<Option<DraftNote>>;
    /// Cascading delete of the draft and every media file it owns.
    /// Nonexistent id is a no-op.
    fn delete_draft(&mut self, id: DraftId) -> StoreResult<()>;
    /// Always an insert; media content is immutable once attached.
    fn save_media_file(&mut self, media: &MediaFile) -> StoreResult<MediaId>;
    /// All media files owned by the draft, in unspecified order.
    fn media_files_by_draft(&self, draft_id: DraftId) -> StoreResult<Vec<MediaFile>>;
    /// Promotes one media file to its permanent publication identifier.
    fn set_media_publication_id(&mut self, id: MediaId, publication_id: &str) -> StoreResult<()>;
    /// Deletes a single media file; no-op if not found.
    fn delete_media_file(&mut self, id: MediaId) -> StoreResult<()>;
    /// Cascading delete of the at most one draft whose origin publication
    /// identifier matches; no-op on no match.
    fn delete_draft_by_publication_id(&mut self, publication_id: &str) -> StoreResult<()>;
}

/// SQLite-backed draft/media store.
pub struct SqliteDraftStore<'conn, R: HandleReleaser = NoopReleaser> {
    conn: &'conn mut Connection,
    releaser: R,
}

impl<'conn> SqliteDraftStore<'conn, NoopReleaser> {
    /// Constructs a store from a migrated/ready connection, without a
    /// revocable-reference releaser.
    pub fn try_new(conn: &'conn mut Connection) -> StoreResult<Self> {
        Self::with_releaser(conn, NoopReleaser)
    }
}

impl<'conn, R: HandleReleaser> SqliteDraftStore<'conn, R> {
    /// Constructs a store that releases revocable handles through the
    /// provided seam.
    pub fn with_releaser(conn: &'conn mut Connection, releaser: R) -> StoreResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn, releaser })
    }

    fn cascade_delete(&mut self, id: DraftId) -> StoreResult<()> {
        let handles = {
            let tx = self
                .conn
                .transaction_with_behavior(TransactionBehavior::Immediate)?;
            let handles = revocable_handles_for_draft(&tx, id)?;
            tx.execute("DELETE FROM media_files WHERE draft_id = ?1;", [id])?;
            tx.execute("DELETE FROM drafts WHERE id = ?1;", [id])?;
            tx.commit()?;
            handles
        };

        // Release only after commit: revoking a handle whose record could
        // survive a failed transaction would leave a live record pointing
        // at dead memory.
        for handle in &handles {
            self.releaser.release(handle);
        }
        Ok(())
    }
}

impl<R: HandleReleaser> DraftStore for SqliteDraftStore<'_, R> {
    fn save_draft(&mut self, draft: &DraftNote) -> StoreResult<DraftId> {
        let tags_json = serde_json::to_string(&draft.tags)
            .map_err(|err| StoreError::InvalidData(format!("unserializable tags: {err}")))?;
        let now = now_millis();

        match draft.id {
            None => {
                self.conn.execute(
                    "INSERT INTO drafts (
                        title, subtitle, cover, content, tags,
                        created_at, updated_at, publication_id
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
                    params![
                        draft.title,
                        draft.subtitle,
                        draft.cover,
                        draft.content,
                        tags_json,
                        now,
                        now,
                        draft.publication_id,
                    ],
                )?;
                Ok(self.conn.last_insert_rowid())
            }
            Some(id) => {
                let tx = self
                    .conn
                    .transaction_with_behavior(TransactionBehavior::Immediate)?;
                let stored: Option<(i64, i64)> = tx
                    .query_row(
                        "SELECT created_at, updated_at FROM drafts WHERE id = ?1;",
                        [id],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?;
                // Updating a missing id is a caller defect; failing loudly
                // beats silently inserting under a fabricated identifier.
                let (created_at, last_updated_at) = stored.ok_or(StoreError::NotFound(id))?;
                let updated_at = now.max(last_updated_at + 1);

                tx.execute(
                    "UPDATE drafts
                     SET
                        title = ?1,
                        subtitle = ?2,
                        cover = ?3,
                        content = ?4,
                        tags = ?5,
                        created_at = ?6,
                        updated_at = ?7,
                        publication_id = ?8
                     WHERE id = ?9;",
                    params![
                        draft.title,
                        draft.subtitle,
                        draft.cover,
                        draft.content,
                        tags_json,
                        created_at,
                        updated_at,
                        draft.publication_id,
                        id,
                    ],
                )?;
                tx.commit()?;
                Ok(id)
            }
        }
    }

    fn list_drafts(&self) -> StoreResult<Vec<DraftNote>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{DRAFT_SELECT_SQL} ORDER BY updated_at DESC, id DESC;"))?;
        let mut rows = stmt.query([])?;
        let mut drafts = Vec::new();
        while let Some(row) = rows.next()? {
            drafts.push(parse_draft_row(row)?);
        }
        Ok(drafts)
    }

    fn get_draft(&self, id: DraftId) -> StoreResult<Option<DraftNote>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{DRAFT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_draft_row(row)?));
        }
        Ok(None)
    }

    fn delete_draft(&mut self, id: DraftId) -> StoreResult<()> {
        self.cascade_delete(id)
    }

    fn save_media_file(&mut self, media: &MediaFile) -> StoreResult<MediaId> {
        let (kind, reference) = local_ref_to_db(&media.local_ref);
        self.conn.execute(
            "INSERT INTO media_files (
                draft_id, local_ref_kind, local_ref, data,
                mime_type, file_name, created_at, publication_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                media.draft_id,
                kind,
                reference,
                media.data,
                media.mime_type,
                media.file_name,
                now_millis(),
                media.publication_id,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn media_files_by_draft(&self, draft_id: DraftId) -> StoreResult<Vec<MediaFile>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{MEDIA_SELECT_SQL} WHERE draft_id = ?1;"))?;
        let mut rows = stmt.query([draft_id])?;
        let mut media = Vec::new();
        while let Some(row) = rows.next()? {
            media.push(parse_media_row(row)?);
        }
        Ok(media)
    }

    fn set_media_publication_id(&mut self, id: MediaId, publication_id: &str) -> StoreResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let stored: Option<Option<String>> = tx
            .query_row(
                "SELECT publication_id FROM media_files WHERE id = ?1;",
                [id],
                |row| row.get(0),
            )
            .optional()?;

        match stored.ok_or(StoreError::MediaNotFound(id))? {
            Some(existing) if existing == publication_id => {
                // Idempotent re-promotion with the same value.
            }
            Some(existing) => {
                return Err(StoreError::AlreadyPublished {
                    media_id: id,
                    existing,
                });
            }
            None => {
                tx.execute(
                    "UPDATE media_files SET publication_id = ?2 WHERE id = ?1;",
                    params![id, publication_id],
                )?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_media_file(&mut self, id: MediaId) -> StoreResult<()> {
        let handle = {
            let tx = self
                .conn
                .transaction_with_behavior(TransactionBehavior::Immediate)?;
            let stored: Option<(String, String)> = tx
                .query_row(
                    "SELECT local_ref_kind, local_ref FROM media_files WHERE id = ?1;",
                    [id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            match stored {
                None => return Ok(()),
                Some((kind, reference)) => {
                    tx.execute("DELETE FROM media_files WHERE id = ?1;", [id])?;
                    tx.commit()?;
                    (kind == LOCAL_REF_REVOCABLE).then_some(reference)
                }
            }
        };

        if let Some(handle) = &handle {
            self.releaser.release(handle);
        }
        Ok(())
    }

    fn delete_draft_by_publication_id(&mut self, publication_id: &str) -> StoreResult<()> {
        let draft_id: Option<DraftId> = self
            .conn
            .query_row(
                "SELECT id FROM drafts WHERE publication_id = ?1 LIMIT 1;",
                [publication_id],
                |row| row.get(0),
            )
            .optional()?;

        match draft_id {
            Some(id) => self.cascade_delete(id),
            None => Ok(()),
        }
    }
}

const LOCAL_REF_INLINE: &str = "inline";
const LOCAL_REF_REVOCABLE: &str = "revocable";

fn local_ref_to_db(local_ref: &LocalRef) -> (&'static str, &str) {
    match local_ref {
        LocalRef::Inline(value) => (LOCAL_REF_INLINE, value),
        LocalRef::Revocable(handle) => (LOCAL_REF_REVOCABLE, handle),
    }
}

fn parse_local_ref(kind: &str, value: String) -> StoreResult<LocalRef> {
    match kind {
        LOCAL_REF_INLINE => Ok(LocalRef::Inline(value)),
        LOCAL_REF_REVOCABLE => Ok(LocalRef::Revocable(value)),
        other => Err(StoreError::InvalidData(format!(
            "invalid local_ref_kind `{other}` in media_files.local_ref_kind"
        ))),
    }
}

fn parse_draft_row(row: &Row<'_>) -> StoreResult<DraftNote> {
    let tags_json: String = row.get("tags")?;
    let tags = serde_json::from_str(&tags_json).map_err(|err| {
        StoreError::InvalidData(format!("invalid tags value in drafts.tags: {err}"))
    })?;

    Ok(DraftNote {
        id: Some(row.get("id")?),
        title: row.get("title")?,
        subtitle: row.get("subtitle")?,
        cover: row.get("cover")?,
        content: row.get("content")?,
        tags,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        publication_id: row.get("publication_id")?,
    })
}

fn parse_media_row(row: &Row<'_>) -> StoreResult<MediaFile> {
    let kind: String = row.get("local_ref_kind")?;
    let local_ref = parse_local_ref(&kind, row.get("local_ref")?)?;

    Ok(MediaFile {
        id: Some(row.get("id")?),
        draft_id: row.get("draft_id")?,
        local_ref,
        data: row.get("data")?,
        mime_type: row.get("mime_type")?,
        file_name: row.get("file_name")?,
        created_at: row.get("created_at")?,
        publication_id: row.get("publication_id")?,
    })
}

fn revocable_handles_for_draft(tx: &Transaction<'_>, draft_id: DraftId) -> StoreResult<Vec<String>> {
    let mut stmt = tx.prepare(
        "SELECT local_ref FROM media_files
         WHERE draft_id = ?1 AND local_ref_kind = ?2;",
    )?;
    let mut rows = stmt.query(params![draft_id, LOCAL_REF_REVOCABLE])?;
    let mut handles = Vec::new();
    while let Some(row) = rows.next()? {
        handles.push(row.get(0)?);
    }
    Ok(handles)
}

fn ensure_connection_ready(conn: &Connection) -> StoreResult<()> {
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let expected_version = latest_version();
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in ["drafts", "media_files", "kv_slots"] {
        if !table_exists(conn, table)? {
            return Err(StoreError::MissingRequiredTable(table));
        }
    }

    for column in ["created_at", "updated_at", "publication_id"] {
        if !table_has_column(conn, "drafts", column)? {
            return Err(StoreError::MissingRequiredColumn {
                table: "drafts",
                column,
            });
        }
    }

    for column in ["draft_id", "local_ref_kind", "local_ref", "publication_id"] {
        if !table_has_column(conn, "media_files", column)? {
            return Err(StoreError::MissingRequiredColumn {
                table: "media_files",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> StoreResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
