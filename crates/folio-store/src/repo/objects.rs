#![allow(clippy::result_large_err)]

use crate::errors::{conversion_error, from_rusqlite, Result};
use folio_core::model::Object;
use rusqlite::{Connection, OptionalExtension, Row};

const OBJECT_COLUMNS: &str =
    "id, type_id, title, properties, doc_version, created_at, updated_at, deleted_at";

fn row_to_object(row: &Row<'_>) -> rusqlite::Result<Object> {
    let properties: String = row.get(3)?;
    let properties = serde_json::from_str(&properties).map_err(|e| conversion_error(3, e))?;
    let doc_version: i64 = row.get(4)?;
    Ok(Object {
        id: row.get(0)?,
        type_id: row.get(1)?,
        title: row.get(2)?,
        properties,
        doc_version: doc_version as u64,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
        deleted_at: row.get(7)?,
    })
}

/// Objects table
///
/// The engine only reads objects and bumps their version; `insert_object`
/// and `soft_delete_object` serve the object service and tests.
pub struct ObjectRepo;

impl ObjectRepo {
    pub fn insert_object(conn: &Connection, object: &Object) -> Result<()> {
        conn.execute(
            "INSERT INTO objects (id, type_id, title, properties, doc_version, created_at, updated_at, deleted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                object.id,
                object.type_id,
                object.title,
                object.properties.to_string(),
                object.doc_version as i64,
                object.created_at,
                object.updated_at,
                object.deleted_at,
            ],
        )
        .map_err(from_rusqlite)?;

        Ok(())
    }

    /// Load an object whether live or soft-deleted
    pub fn get_object(conn: &Connection, object_id: &str) -> Result<Option<Object>> {
        conn.query_row(
            &format!("SELECT {} FROM objects WHERE id = ?1", OBJECT_COLUMNS),
            [object_id],
            row_to_object,
        )
        .optional()
        .map_err(from_rusqlite)
    }

    pub fn is_live(conn: &Connection, object_id: &str) -> Result<bool> {
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM live_objects WHERE id = ?1",
                [object_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(from_rusqlite)?;
        Ok(found.is_some())
    }

    /// Returns false if the object was missing or already deleted
    pub fn soft_delete_object(conn: &Connection, object_id: &str, now_ms: i64) -> Result<bool> {
        let changed = conn
            .execute(
                "UPDATE objects SET deleted_at = ?2, updated_at = ?2
                 WHERE id = ?1 AND deleted_at IS NULL",
                rusqlite::params![object_id, now_ms],
            )
            .map_err(from_rusqlite)?;
        Ok(changed == 1)
    }

    /// Increment `doc_version` only if it still equals `expected`
    ///
    /// Returns false when another writer got there first.
    pub fn compare_and_bump_version(
        conn: &Connection,
        object_id: &str,
        expected: u64,
        now_ms: i64,
    ) -> Result<bool> {
        let changed = conn
            .execute(
                "UPDATE objects SET doc_version = doc_version + 1, updated_at = ?3
                 WHERE id = ?1 AND doc_version = ?2 AND deleted_at IS NULL",
                rusqlite::params![object_id, expected as i64, now_ms],
            )
            .map_err(from_rusqlite)?;
        Ok(changed == 1)
    }
}
