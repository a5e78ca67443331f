#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use rusqlite::{Connection, OptionalExtension};

/// Cache of serialized patch results keyed by (object, idempotency key)
pub struct IdempotencyRepo;

impl IdempotencyRepo {
    /// Cached result JSON, exactly as stored
    pub fn get(conn: &Connection, object_id: &str, key: &str) -> Result<Option<String>> {
        conn.query_row(
            "SELECT result_json FROM idempotency WHERE object_id = ?1 AND key = ?2",
            [object_id, key],
            |row| row.get(0),
        )
        .optional()
        .map_err(from_rusqlite)
    }

    /// Record a result; a second write for the same key is a storage error
    pub fn put(
        conn: &Connection,
        object_id: &str,
        key: &str,
        result_json: &str,
        now_ms: i64,
    ) -> Result<()> {
        conn.execute(
            "INSERT INTO idempotency (object_id, key, result_json, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![object_id, key, result_json, now_ms],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }

    /// Drop entries created before `cutoff_ms`; returns how many were removed
    pub fn prune_older_than(conn: &Connection, cutoff_ms: i64) -> Result<usize> {
        let removed = conn
            .execute("DELETE FROM idempotency WHERE created_at < ?1", [cutoff_ms])
            .map_err(from_rusqlite)?;
        tracing::debug!(removed, cutoff_ms, "idempotency cache pruned");
        Ok(removed)
    }
}
