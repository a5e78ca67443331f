//! Shared fixtures for engine integration tests
#![allow(dead_code)]

use folio_core::model::{BlockType, Object};
use folio_core::patch::{BlockOp, PatchRequest, PatchResult, Place};
use folio_engine::apply_block_patch;
use folio_store::db::{self, StoreConfig};
use folio_store::migrations::apply_migrations;
use folio_store::repo::{FtsRepo, ObjectRepo, RefRepo};
use rusqlite::Connection;
use serde_json::{json, Value};

/// Configured, migrated in-memory database
pub fn setup_db() -> Connection {
    let mut conn = db::open_in_memory().unwrap();
    db::configure(&conn, &StoreConfig::default()).unwrap();
    apply_migrations(&mut conn).unwrap();
    conn
}

pub fn create_object(conn: &Connection, id: &str, title: &str) {
    ObjectRepo::insert_object(conn, &Object::new(id, "page", title)).unwrap();
}

pub fn text(s: &str) -> Value {
    json!({"t": "text", "text": s})
}

pub fn object_ref(object_id: &str) -> Value {
    json!({"t": "ref", "mode": "link", "target": {"kind": "object", "objectId": object_id}})
}

pub fn block_ref(object_id: &str, block_id: &str) -> Value {
    json!({"t": "ref", "mode": "link",
           "target": {"kind": "block", "objectId": object_id, "blockId": block_id}})
}

pub fn paragraph(inline: Vec<Value>) -> Value {
    json!({ "inline": inline })
}

pub fn insert(block_id: &str, parent: Option<&str>, content: Value) -> BlockOp {
    BlockOp::Insert {
        block_id: block_id.to_string(),
        parent_block_id: parent.map(str::to_string),
        order_key: None,
        place: None,
        block_type: BlockType::Paragraph,
        content,
        meta: None,
    }
}

pub fn insert_at(block_id: &str, parent: Option<&str>, place: Place) -> BlockOp {
    BlockOp::Insert {
        block_id: block_id.to_string(),
        parent_block_id: parent.map(str::to_string),
        order_key: None,
        place: Some(place),
        block_type: BlockType::Paragraph,
        content: paragraph(vec![]),
        meta: None,
    }
}

pub fn insert_with_key(block_id: &str, parent: Option<&str>, key: &str) -> BlockOp {
    BlockOp::Insert {
        block_id: block_id.to_string(),
        parent_block_id: parent.map(str::to_string),
        order_key: Some(key.to_string()),
        place: None,
        block_type: BlockType::Paragraph,
        content: paragraph(vec![]),
        meta: None,
    }
}

pub fn move_to(block_id: &str, new_parent: Option<&str>, place: Option<Place>) -> BlockOp {
    BlockOp::Move {
        block_id: block_id.to_string(),
        new_parent_block_id: new_parent.map(str::to_string),
        order_key: None,
        place,
        subtree: None,
    }
}

pub fn delete(block_id: &str, subtree: bool) -> BlockOp {
    BlockOp::Delete {
        block_id: block_id.to_string(),
        subtree: Some(subtree),
    }
}

/// Apply ops without version check and expect success
pub fn apply(conn: &mut Connection, object_id: &str, ops: Vec<BlockOp>) -> PatchResult {
    apply_block_patch(conn, PatchRequest::new(object_id, ops)).unwrap()
}

pub fn doc_version(conn: &Connection, object_id: &str) -> u64 {
    ObjectRepo::get_object(conn, object_id)
        .unwrap()
        .unwrap()
        .doc_version
}

pub fn order_key(conn: &Connection, block_id: &str) -> String {
    conn.query_row(
        "SELECT order_key FROM blocks WHERE id = ?1",
        [block_id],
        |row| row.get(0),
    )
    .unwrap()
}

/// Stored ref targets of a block as sorted (object, block) pairs
pub fn stored_ref_targets(conn: &Connection, block_id: &str) -> Vec<(String, Option<String>)> {
    let mut targets: Vec<_> = RefRepo::refs_for_block(conn, block_id)
        .unwrap()
        .into_iter()
        .map(|r| (r.target_object_id, r.target_block_id))
        .collect();
    targets.sort();
    targets
}

pub fn fts_text(conn: &Connection, block_id: &str) -> Option<String> {
    FtsRepo::text_for_block(conn, block_id).unwrap()
}

pub fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
        row.get(0)
    })
    .unwrap()
}
