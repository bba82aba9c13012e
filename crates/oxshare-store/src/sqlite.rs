//! SQLite implementation of the ShareStore trait.
//!
//! rusqlite with bundled SQLite, wrapped in async via tokio::spawn_blocking.
//! The view compare-and-swap is a single guarded `UPDATE`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use oxshare_core::{
    BlobRef, PasswordDigest, PayloadKind, SealedBlob, SealedPayload, ShareId, ShareRecord,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{InsertResult, Orphan, ShareStore, UpdateResult};

const SHARE_COLUMNS: &str = "id, kind, sealed_text, file_ref, file_name, file_size, key_hint, \
     created_at, expires_at, burn_after_read, max_views, view_count, consumed, password_digest";

/// SQLite-based share store.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking closure against the connection on the blocking pool.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(StoreError::poisoned)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("spawn_blocking failed: {}", e)))?
    }
}

/// Column values of one `shares` row, before validation.
struct ShareRow {
    id: String,
    kind: String,
    sealed_text: Option<Vec<u8>>,
    file_ref: Option<String>,
    file_name: Option<String>,
    file_size: Option<i64>,
    key_hint: String,
    created_at: i64,
    expires_at: i64,
    burn_after_read: bool,
    max_views: Option<u32>,
    view_count: u32,
    consumed: bool,
    password_digest: Option<Vec<u8>>,
}

impl ShareRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            kind: row.get("kind")?,
            sealed_text: row.get("sealed_text")?,
            file_ref: row.get("file_ref")?,
            file_name: row.get("file_name")?,
            file_size: row.get("file_size")?,
            key_hint: row.get("key_hint")?,
            created_at: row.get("created_at")?,
            expires_at: row.get("expires_at")?,
            burn_after_read: row.get("burn_after_read")?,
            max_views: row.get("max_views")?,
            view_count: row.get("view_count")?,
            consumed: row.get("consumed")?,
            password_digest: row.get("password_digest")?,
        })
    }

    fn into_record(self) -> Result<ShareRecord> {
        let id = ShareId::parse(&self.id)
            .map_err(|e| StoreError::InvalidData(format!("share id {:?}: {}", self.id, e)))?;

        let payload = match PayloadKind::from_str_opt(&self.kind) {
            Some(PayloadKind::Text) => SealedPayload::Text {
                sealed: SealedBlob::from_bytes(self.sealed_text.ok_or_else(|| {
                    StoreError::InvalidData(format!("text share {} has no ciphertext", id))
                })?),
            },
            Some(PayloadKind::File) => match (self.file_ref, self.file_name, self.file_size) {
                (Some(file_ref), Some(file_name), Some(file_size)) => SealedPayload::File {
                    blob: BlobRef::new(file_ref),
                    file_name,
                    file_size: u64::try_from(file_size).map_err(|_| {
                        StoreError::InvalidData(format!("share {} has negative file size", id))
                    })?,
                },
                _ => {
                    return Err(StoreError::InvalidData(format!(
                        "file share {} is missing its blob columns",
                        id
                    )))
                }
            },
            None => {
                return Err(StoreError::InvalidData(format!(
                    "share {} has unknown kind {:?}",
                    id, self.kind
                )))
            }
        };

        let password_digest = self
            .password_digest
            .map(|bytes| {
                <[u8; 32]>::try_from(bytes.as_slice())
                    .map(PasswordDigest::from_bytes)
                    .map_err(|_| {
                        StoreError::InvalidData(format!("share {} has a malformed digest", id))
                    })
            })
            .transpose()?;

        Ok(ShareRecord {
            id,
            payload,
            key_hint: self.key_hint,
            created_at: self.created_at,
            expires_at: self.expires_at,
            burn_after_read: self.burn_after_read,
            max_views: self.max_views,
            view_count: self.view_count,
            consumed: self.consumed,
            password_digest,
        })
    }
}

/// Delete rows that cannot be decoded, moving any blob they point at to the
/// orphan log so the sweep still removes it.
fn purge_rows(conn: &mut Connection, rows: &[(String, Option<String>)], now: i64) -> Result<()> {
    let tx = conn.transaction()?;
    for (id, file_ref) in rows {
        if let Some(file_ref) = file_ref {
            if BlobRef::new(file_ref.as_str()).is_well_formed() {
                tx.execute(
                    "INSERT OR IGNORE INTO orphan_blobs (file_ref, recorded_at) VALUES (?1, ?2)",
                    params![file_ref, now],
                )?;
            } else {
                warn!(share = %id, file_ref = %file_ref, "dropping malformed blob reference");
            }
        }
        tx.execute("DELETE FROM shares WHERE id = ?1", params![id])?;
    }
    tx.commit()?;
    Ok(())
}

#[async_trait]
impl ShareStore for SqliteStore {
    async fn insert(&self, record: &ShareRecord) -> Result<InsertResult> {
        let record = record.clone();

        self.run(move |conn| {
            let (sealed_text, file_ref, file_name, file_size) = match &record.payload {
                SealedPayload::Text { sealed } => {
                    (Some(sealed.as_bytes().to_vec()), None, None, None)
                }
                SealedPayload::File {
                    blob,
                    file_name,
                    file_size,
                } => (
                    None,
                    Some(blob.as_str().to_string()),
                    Some(file_name.clone()),
                    Some(i64::try_from(*file_size).map_err(|_| {
                        StoreError::InvalidData(format!("file size {} out of range", file_size))
                    })?),
                ),
            };

            let inserted = conn.execute(
                "INSERT INTO shares (
                    id, kind, sealed_text, file_ref, file_name, file_size, key_hint,
                    created_at, expires_at, burn_after_read, max_views, view_count,
                    consumed, password_digest
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                ON CONFLICT(id) DO NOTHING",
                params![
                    record.id.to_string(),
                    record.kind().as_str(),
                    sealed_text,
                    file_ref,
                    file_name,
                    file_size,
                    record.key_hint,
                    record.created_at,
                    record.expires_at,
                    record.burn_after_read,
                    record.max_views,
                    record.view_count,
                    record.consumed,
                    record.password_digest.as_ref().map(|d| d.as_bytes().to_vec()),
                ],
            )?;

            Ok(if inserted == 1 {
                InsertResult::Inserted
            } else {
                InsertResult::AlreadyExists
            })
        })
        .await
    }

    async fn get(&self, id: &ShareId) -> Result<Option<ShareRecord>> {
        let id = id.to_string();

        self.run(move |conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {} FROM shares WHERE id = ?1", SHARE_COLUMNS),
                    params![id],
                    ShareRow::from_row,
                )
                .optional()?;

            row.map(ShareRow::into_record).transpose()
        })
        .await
    }

    async fn conditional_update(
        &self,
        id: &ShareId,
        expected: u32,
        new_view_count: u32,
        consume: bool,
    ) -> Result<UpdateResult> {
        let id = id.to_string();

        self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE shares SET view_count = ?3, consumed = ?4
                 WHERE id = ?1 AND view_count = ?2 AND consumed = 0",
                params![id, expected, new_view_count, consume],
            )?;

            if changed == 1 {
                return Ok(UpdateResult::Applied);
            }

            let current: Option<(u32, bool)> = conn
                .query_row(
                    "SELECT view_count, consumed FROM shares WHERE id = ?1",
                    params![id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            Ok(match current {
                Some((current_view_count, consumed)) => UpdateResult::Conflict {
                    current_view_count,
                    consumed,
                },
                None => UpdateResult::Missing,
            })
        })
        .await
    }

    async fn delete(&self, id: &ShareId) -> Result<bool> {
        let id = id.to_string();

        self.run(move |conn| {
            let deleted = conn.execute("DELETE FROM shares WHERE id = ?1", params![id])?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn sweepable(&self, now: i64) -> Result<Vec<ShareRecord>> {
        self.run(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM shares
                 WHERE expires_at <= ?1 OR consumed = 1
                 ORDER BY expires_at",
                SHARE_COLUMNS
            ))?;

            let rows = stmt
                .query_map(params![now], ShareRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            drop(stmt);

            let mut due = Vec::with_capacity(rows.len());
            let mut corrupt = Vec::new();
            for row in rows {
                let (id, file_ref) = (row.id.clone(), row.file_ref.clone());
                match row.into_record() {
                    Ok(record) => due.push(record),
                    Err(e) => {
                        warn!(share = %id, error = %e, "purging undecodable share row");
                        corrupt.push((id, file_ref));
                    }
                }
            }

            if !corrupt.is_empty() {
                purge_rows(conn, &corrupt, now)?;
            }

            Ok(due)
        })
        .await
    }

    async fn count(&self) -> Result<u64> {
        self.run(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM shares", [], |row| row.get(0))?;
            Ok(count.max(0) as u64)
        })
        .await
    }

    async fn record_orphan(&self, blob: &BlobRef, at: i64) -> Result<()> {
        let blob = blob.as_str().to_string();

        self.run(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO orphan_blobs (file_ref, recorded_at) VALUES (?1, ?2)",
                params![blob, at],
            )?;
            Ok(())
        })
        .await
    }

    async fn orphans(&self) -> Result<Vec<Orphan>> {
        self.run(|conn| {
            let mut stmt = conn.prepare(
                "SELECT file_ref, recorded_at FROM orphan_blobs ORDER BY recorded_at, file_ref",
            )?;

            let orphans = stmt
                .query_map([], |row| {
                    Ok(Orphan {
                        blob: BlobRef::new(row.get::<_, String>(0)?),
                        recorded_at: row.get(1)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(orphans)
        })
        .await
    }

    async fn clear_orphan(&self, blob: &BlobRef) -> Result<()> {
        let blob = blob.as_str().to_string();

        self.run(move |conn| {
            conn.execute("DELETE FROM orphan_blobs WHERE file_ref = ?1", params![blob])?;
            Ok(())
        })
        .await
    }
}
