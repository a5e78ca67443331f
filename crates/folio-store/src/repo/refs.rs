#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use rusqlite::Connection;
use std::collections::HashSet;

/// One stored reference from a block to an object or block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefRow {
    pub id: String,
    pub source_block_id: String,
    pub source_object_id: String,
    pub target_object_id: String,
    pub target_block_id: Option<String>,
    pub created_at: i64,
}

/// Ref joined with its live source, as returned to backlink readers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BacklinkRow {
    pub source_block_id: String,
    pub source_object_id: String,
    pub source_object_title: String,
    pub target_block_id: Option<String>,
}

/// Refs table (the derived reference graph)
pub struct RefRepo;

impl RefRepo {
    pub fn insert_ref(conn: &Connection, row: &RefRow) -> Result<()> {
        conn.execute(
            "INSERT INTO refs (id, source_block_id, source_object_id, target_object_id, target_block_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                row.id,
                row.source_block_id,
                row.source_object_id,
                row.target_object_id,
                row.target_block_id,
                row.created_at,
            ],
        )
        .map_err(from_rusqlite)?;

        Ok(())
    }

    /// Remove every ref sourced from `block_id`; returns the number removed
    pub fn delete_for_block(conn: &Connection, block_id: &str) -> Result<usize> {
        conn.execute("DELETE FROM refs WHERE source_block_id = ?1", [block_id])
            .map_err(from_rusqlite)
    }

    /// Refs sourced from `block_id`, in insertion order
    pub fn refs_for_block(conn: &Connection, block_id: &str) -> Result<Vec<RefRow>> {
        let mut stmt = conn
            .prepare(
                "SELECT id, source_block_id, source_object_id, target_object_id, target_block_id, created_at
                 FROM refs WHERE source_block_id = ?1 ORDER BY rowid",
            )
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([block_id], |row| {
                Ok(RefRow {
                    id: row.get(0)?,
                    source_block_id: row.get(1)?,
                    source_object_id: row.get(2)?,
                    target_object_id: row.get(3)?,
                    target_block_id: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(rows)
    }

    /// Distinct refs to `object_id` (or its blocks) from live blocks of live objects
    ///
    /// Sorted by source title, then source block id, then target block id.
    pub fn backlinks_to(conn: &Connection, object_id: &str) -> Result<Vec<BacklinkRow>> {
        let mut stmt = conn
            .prepare(
                "SELECT DISTINCT r.source_block_id, r.source_object_id, o.title, r.target_block_id
                 FROM refs r
                 JOIN live_blocks b ON b.id = r.source_block_id
                 JOIN live_objects o ON o.id = r.source_object_id
                 WHERE r.target_object_id = ?1
                 ORDER BY o.title, r.source_block_id, r.target_block_id",
            )
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([object_id], |row| {
                Ok(BacklinkRow {
                    source_block_id: row.get(0)?,
                    source_object_id: row.get(1)?,
                    source_object_title: row.get(2)?,
                    target_block_id: row.get(3)?,
                })
            })
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(rows)
    }

    /// Ids of blocks holding at least one ref to `object_id` or its blocks
    pub fn source_blocks_referencing(conn: &Connection, object_id: &str) -> Result<HashSet<String>> {
        let mut stmt = conn
            .prepare("SELECT DISTINCT source_block_id FROM refs WHERE target_object_id = ?1")
            .map_err(from_rusqlite)?;
        let ids = stmt
            .query_map([object_id], |row| row.get(0))
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<HashSet<String>, _>>()
            .map_err(from_rusqlite)?;
        Ok(ids)
    }
}
