#![allow(clippy::result_large_err)]

use std::collections::HashMap;

use folio_core::errors::FolioError;
use folio_core::model::{Block, Object};
use folio_core::{log_op_end, log_op_error, log_op_start};
use folio_core_types::RequestId;
use folio_store::errors::Result;
use folio_store::repo::BlockRepo;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use super::load_object;

/// A live block with its live children in order-key order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockNode {
    #[serde(flatten)]
    pub block: Block,
    pub children: Vec<BlockNode>,
}

/// An object with its live block tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTree {
    pub object: Object,
    /// Root blocks
    pub blocks: Vec<BlockNode>,
}

impl DocumentTree {
    /// Block ids in depth-first document order
    pub fn block_ids(&self) -> Vec<&str> {
        fn walk<'a>(nodes: &'a [BlockNode], out: &mut Vec<&'a str>) {
            for node in nodes {
                out.push(&node.block.id);
                walk(&node.children, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.blocks, &mut out);
        out
    }
}

/// The live document of an object
///
/// Live blocks under a soft-deleted ancestor are not reachable from a root
/// and are left out.
///
/// # Errors
///
/// `NOT_FOUND_OBJECT` when the object is missing or soft-deleted.
pub fn get_document(conn: &Connection, object_id: &str) -> Result<DocumentTree> {
    let request_id = RequestId::new();
    log_op_start!(
        "document_get",
        request_id = request_id.as_str(),
        object_id = object_id
    );
    let start = std::time::Instant::now();

    let document = get_document_impl(conn, object_id).map_err(|e| {
        let e = e.with_request_id(request_id.clone());
        log_op_error!(
            "document_get",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64,
            request_id = request_id.as_str()
        );
        e
    })?;

    log_op_end!(
        "document_get",
        duration_ms = start.elapsed().as_millis() as u64,
        request_id = request_id.as_str()
    );
    Ok(document)
}

fn get_document_impl(conn: &Connection, object_id: &str) -> Result<DocumentTree> {
    let object = load_object(conn, object_id)?;
    if object.is_deleted() {
        return Err(FolioError::ObjectDeleted {
            object_id: object.id,
        }
        .into());
    }

    // Rows arrive sorted by key within each parent.
    let mut by_parent: HashMap<Option<String>, Vec<Block>> = HashMap::new();
    for block in BlockRepo::list_live_blocks(conn, object_id)? {
        by_parent
            .entry(block.parent_block_id.clone())
            .or_default()
            .push(block);
    }

    let blocks = build_children(&mut by_parent, None);
    Ok(DocumentTree { object, blocks })
}

fn build_children(
    by_parent: &mut HashMap<Option<String>, Vec<Block>>,
    parent: Option<String>,
) -> Vec<BlockNode> {
    let children = by_parent.remove(&parent).unwrap_or_default();
    children
        .into_iter()
        .map(|block| {
            let children = build_children(by_parent, Some(block.id.clone()));
            BlockNode { block, children }
        })
        .collect()
}
