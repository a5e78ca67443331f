#![allow(clippy::result_large_err)]

use crate::errors::{conversion_error, from_rusqlite, Result};
use folio_core::model::{Block, BlockMeta, BlockType, SiblingKey};
use rusqlite::{Connection, OptionalExtension, Row};

const BLOCK_COLUMNS: &str = "id, object_id, parent_block_id, order_key, block_type, content, meta, \
                             created_at, updated_at, deleted_at";

fn row_to_block(row: &Row<'_>) -> rusqlite::Result<Block> {
    let block_type: String = row.get(4)?;
    let block_type: BlockType = block_type.parse().map_err(|e| conversion_error(4, e))?;
    let content: String = row.get(5)?;
    let content = serde_json::from_str(&content).map_err(|e| conversion_error(5, e))?;
    let meta: Option<String> = row.get(6)?;
    let meta = meta
        .map(|m| serde_json::from_str::<BlockMeta>(&m))
        .transpose()
        .map_err(|e| conversion_error(6, e))?;
    Ok(Block {
        id: row.get(0)?,
        object_id: row.get(1)?,
        parent_block_id: row.get(2)?,
        order_key: row.get(3)?,
        block_type,
        content,
        meta,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
        deleted_at: row.get(9)?,
    })
}

fn meta_to_sql(meta: Option<&BlockMeta>) -> Result<Option<String>> {
    meta.map(serde_json::to_string)
        .transpose()
        .map_err(|e| folio_core::FolioError::from(e).into())
}

/// Blocks table and the `live_blocks` view
pub struct BlockRepo;

impl BlockRepo {
    pub fn insert_block(conn: &Connection, block: &Block) -> Result<()> {
        conn.execute(
            "INSERT INTO blocks (id, object_id, parent_block_id, order_key, block_type, content, meta, created_at, updated_at, deleted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            rusqlite::params![
                block.id,
                block.object_id,
                block.parent_block_id,
                block.order_key,
                block.block_type.as_str(),
                block.content.to_string(),
                meta_to_sql(block.meta.as_ref())?,
                block.created_at,
                block.updated_at,
                block.deleted_at,
            ],
        )
        .map_err(from_rusqlite)?;

        Ok(())
    }

    /// Load a block whether live or soft-deleted
    pub fn get_block(conn: &Connection, block_id: &str) -> Result<Option<Block>> {
        conn.query_row(
            &format!("SELECT {} FROM blocks WHERE id = ?1", BLOCK_COLUMNS),
            [block_id],
            row_to_block,
        )
        .optional()
        .map_err(from_rusqlite)
    }

    /// Live block of `object_id`, or `None` if missing, deleted or foreign
    pub fn get_live_block(
        conn: &Connection,
        object_id: &str,
        block_id: &str,
    ) -> Result<Option<Block>> {
        conn.query_row(
            &format!(
                "SELECT {} FROM live_blocks WHERE id = ?1 AND object_id = ?2",
                BLOCK_COLUMNS
            ),
            [block_id, object_id],
            row_to_block,
        )
        .optional()
        .map_err(from_rusqlite)
    }

    /// Whether `block_id` is a live block, in any object
    pub fn is_live(conn: &Connection, block_id: &str) -> Result<bool> {
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM live_blocks WHERE id = ?1",
                [block_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(from_rusqlite)?;
        Ok(found.is_some())
    }

    /// Replace type, content and meta of a block
    pub fn update_block(conn: &Connection, block: &Block) -> Result<()> {
        conn.execute(
            "UPDATE blocks SET block_type = ?2, content = ?3, meta = ?4, updated_at = ?5
             WHERE id = ?1",
            rusqlite::params![
                block.id,
                block.block_type.as_str(),
                block.content.to_string(),
                meta_to_sql(block.meta.as_ref())?,
                block.updated_at,
            ],
        )
        .map_err(from_rusqlite)?;

        Ok(())
    }

    pub fn move_block(
        conn: &Connection,
        block_id: &str,
        new_parent_block_id: Option<&str>,
        order_key: &str,
        now_ms: i64,
    ) -> Result<()> {
        conn.execute(
            "UPDATE blocks SET parent_block_id = ?2, order_key = ?3, updated_at = ?4
             WHERE id = ?1",
            rusqlite::params![block_id, new_parent_block_id, order_key, now_ms],
        )
        .map_err(from_rusqlite)?;

        Ok(())
    }

    /// Returns false if the block was already deleted
    pub fn soft_delete_block(conn: &Connection, block_id: &str, now_ms: i64) -> Result<bool> {
        let changed = conn
            .execute(
                "UPDATE blocks SET deleted_at = ?2, updated_at = ?2
                 WHERE id = ?1 AND deleted_at IS NULL",
                rusqlite::params![block_id, now_ms],
            )
            .map_err(from_rusqlite)?;
        Ok(changed == 1)
    }

    /// Live children of `parent_block_id` (or the roots), sorted by order key
    pub fn live_siblings(
        conn: &Connection,
        object_id: &str,
        parent_block_id: Option<&str>,
    ) -> Result<Vec<SiblingKey>> {
        let mut stmt = conn
            .prepare(
                "SELECT id, order_key FROM live_blocks
                 WHERE object_id = ?1 AND parent_block_id IS ?2
                 ORDER BY order_key",
            )
            .map_err(from_rusqlite)?;
        let siblings = stmt
            .query_map(rusqlite::params![object_id, parent_block_id], |row| {
                Ok(SiblingKey::new(
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                ))
            })
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(siblings)
    }

    /// Ids of every live descendant of `block_id`, parents before children
    ///
    /// The walk passes through soft-deleted blocks, so live blocks below a
    /// deleted intermediate parent are still found.
    pub fn live_descendant_ids(conn: &Connection, block_id: &str) -> Result<Vec<String>> {
        let mut stmt = conn
            .prepare(
                "WITH RECURSIVE subtree(id, depth, deleted_at) AS (
                     SELECT id, 1, deleted_at FROM blocks WHERE parent_block_id = ?1
                     UNION
                     SELECT b.id, s.depth + 1, b.deleted_at FROM blocks b
                     JOIN subtree s ON b.parent_block_id = s.id
                 )
                 SELECT id FROM subtree WHERE deleted_at IS NULL ORDER BY depth, id",
            )
            .map_err(from_rusqlite)?;
        let ids = stmt
            .query_map([block_id], |row| row.get(0))
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<String>, _>>()
            .map_err(from_rusqlite)?;
        Ok(ids)
    }

    /// Parent of a live block; `None` for roots and for non-live blocks
    pub fn live_parent_of(conn: &Connection, block_id: &str) -> Result<Option<String>> {
        let parent: Option<Option<String>> = conn
            .query_row(
                "SELECT parent_block_id FROM live_blocks WHERE id = ?1",
                [block_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(from_rusqlite)?;
        Ok(parent.flatten())
    }

    /// Number of blocks of the object, live or deleted
    pub fn count_blocks(conn: &Connection, object_id: &str) -> Result<usize> {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM blocks WHERE object_id = ?1",
                [object_id],
                |row| row.get(0),
            )
            .map_err(from_rusqlite)?;
        Ok(count as usize)
    }

    /// Every live block of the object, grouped by parent and sorted by key
    pub fn list_live_blocks(conn: &Connection, object_id: &str) -> Result<Vec<Block>> {
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM live_blocks WHERE object_id = ?1
                 ORDER BY COALESCE(parent_block_id, ''), order_key",
                BLOCK_COLUMNS
            ))
            .map_err(from_rusqlite)?;
        let blocks = stmt
            .query_map([object_id], row_to_block)
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(blocks)
    }

    /// Ids of the object's soft-deleted blocks
    pub fn list_deleted_block_ids(conn: &Connection, object_id: &str) -> Result<Vec<String>> {
        let mut stmt = conn
            .prepare(
                "SELECT id FROM blocks WHERE object_id = ?1 AND deleted_at IS NOT NULL ORDER BY id",
            )
            .map_err(from_rusqlite)?;
        let ids = stmt
            .query_map([object_id], |row| row.get(0))
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<String>, _>>()
            .map_err(from_rusqlite)?;
        Ok(ids)
    }
}
