#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use rusqlite::{Connection, OptionalExtension};

/// FTS match on a live block of a live object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtsHit {
    pub block_id: String,
    pub object_id: String,
    pub object_title: String,
}

/// Quote `text` as a single FTS5 phrase
///
/// Embedded double quotes are doubled, so no input can inject query syntax.
pub fn phrase_query(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

/// The `block_fts` full-text table
pub struct FtsRepo;

impl FtsRepo {
    /// Replace the FTS row of a block
    pub fn upsert(conn: &Connection, block_id: &str, object_id: &str, text: &str) -> Result<()> {
        Self::delete_for_block(conn, block_id)?;
        conn.execute(
            "INSERT INTO block_fts (block_id, object_id, content_text) VALUES (?1, ?2, ?3)",
            rusqlite::params![block_id, object_id, text],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn delete_for_block(conn: &Connection, block_id: &str) -> Result<usize> {
        conn.execute("DELETE FROM block_fts WHERE block_id = ?1", [block_id])
            .map_err(from_rusqlite)
    }

    pub fn text_for_block(conn: &Connection, block_id: &str) -> Result<Option<String>> {
        conn.query_row(
            "SELECT content_text FROM block_fts WHERE block_id = ?1",
            [block_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(from_rusqlite)
    }

    /// Number of FTS rows for a block; more than one means drift
    pub fn count_for_block(conn: &Connection, block_id: &str) -> Result<usize> {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM block_fts WHERE block_id = ?1",
                [block_id],
                |row| row.get(0),
            )
            .map_err(from_rusqlite)?;
        Ok(count as usize)
    }

    /// Run an FTS5 `MATCH` and keep hits on live blocks of live objects
    pub fn search_live(conn: &Connection, match_query: &str) -> Result<Vec<FtsHit>> {
        let mut stmt = conn
            .prepare(
                "SELECT block_fts.block_id, block_fts.object_id, o.title
                 FROM block_fts
                 JOIN live_blocks b ON b.id = block_fts.block_id
                 JOIN live_objects o ON o.id = block_fts.object_id
                 WHERE block_fts MATCH ?1
                 ORDER BY o.title, block_fts.block_id",
            )
            .map_err(from_rusqlite)?;
        let hits = stmt
            .query_map([match_query], |row| {
                Ok(FtsHit {
                    block_id: row.get(0)?,
                    object_id: row.get(1)?,
                    object_title: row.get(2)?,
                })
            })
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(hits)
    }
}
