//! SQLite schema, applied as an ordered list of versioned steps.
//!
//! Each step runs in its own transaction together with its row in
//! `schema_migrations`, so a crash mid-upgrade leaves the database at the
//! last completed version.

use rusqlite::{params, Connection};

use oxshare_core::unix_millis;

use crate::error::{Result, StoreError};

struct Step {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const STEPS: &[Step] = &[Step {
    version: 1,
    name: "shares and orphan log",
    sql: r#"
        -- One row per live share. Never holds a key or plaintext.
        CREATE TABLE shares (
            id TEXT PRIMARY KEY,                -- hyphenated UUID
            kind TEXT NOT NULL CHECK (kind IN ('text', 'file')),
            sealed_text BLOB,                   -- nonce || ciphertext || tag, text shares only
            file_ref TEXT,                      -- blob store reference, file shares only
            file_name TEXT,
            file_size INTEGER,                  -- plaintext bytes
            key_hint TEXT NOT NULL,
            created_at INTEGER NOT NULL,        -- Unix ms
            expires_at INTEGER NOT NULL,        -- Unix ms
            burn_after_read INTEGER NOT NULL DEFAULT 0,
            max_views INTEGER CHECK (max_views IS NULL OR max_views > 0),
            view_count INTEGER NOT NULL DEFAULT 0,
            consumed INTEGER NOT NULL DEFAULT 0,
            password_digest BLOB,               -- 32 bytes

            CHECK (
                (kind = 'text' AND sealed_text IS NOT NULL AND file_ref IS NULL)
                OR (kind = 'file' AND sealed_text IS NULL AND file_ref IS NOT NULL
                    AND file_name IS NOT NULL AND file_size IS NOT NULL)
            ),
            CHECK (max_views IS NULL OR view_count <= max_views)
        );

        -- Blobs whose row is gone but whose own deletion failed.
        CREATE TABLE orphan_blobs (
            file_ref TEXT PRIMARY KEY,
            recorded_at INTEGER NOT NULL
        );

        CREATE INDEX idx_shares_expires_at ON shares(expires_at);
        CREATE INDEX idx_shares_consumed ON shares(consumed) WHERE consumed = 1;
    "#,
}];

/// Schema version this build writes.
pub const CURRENT_VERSION: u32 = 1;

/// Bring `conn` up to [`CURRENT_VERSION`]. Safe to call on every open.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at INTEGER NOT NULL
        );",
    )?;

    let applied = schema_version(conn)?;
    if applied > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "schema is at version {}, this build only knows up to {}",
            applied, CURRENT_VERSION
        )));
    }

    for step in STEPS.iter().filter(|s| s.version > applied) {
        let tx = conn.transaction()?;
        tx.execute_batch(step.sql).map_err(|e| {
            StoreError::Migration(format!("step {} ({}) failed: {}", step.version, step.name, e))
        })?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![step.version, step.name, unix_millis()],
        )?;
        tx.commit()?;
    }

    Ok(())
}

/// Highest applied version, 0 for a fresh database.
pub fn schema_version(conn: &Connection) -> Result<u32> {
    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}
