#![allow(clippy::result_large_err)]

use folio_core::{log_op_end, log_op_error, log_op_start};
use folio_core_types::RequestId;
use folio_store::errors::Result;
use folio_store::repo::{BacklinkRow, RefRepo};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use super::load_object;

/// A live block that references an object or one of its blocks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backlink {
    pub source_block_id: String,
    pub source_object_id: String,
    pub source_object_title: String,
    /// Referenced block; `None` when the whole object is referenced
    pub target_block_id: Option<String>,
}

impl From<BacklinkRow> for Backlink {
    fn from(row: BacklinkRow) -> Self {
        Self {
            source_block_id: row.source_block_id,
            source_object_id: row.source_object_id,
            source_object_title: row.source_object_title,
            target_block_id: row.target_block_id,
        }
    }
}

/// Backlinks to `object_id`, ordered by source title, source block, target block
///
/// Identical rows (the same block referencing the same target twice) collapse
/// into one; refs from deleted blocks or deleted objects are skipped.
///
/// # Errors
///
/// `NOT_FOUND_OBJECT` when no object with this id was ever created.
pub fn get_backlinks(conn: &Connection, object_id: &str) -> Result<Vec<Backlink>> {
    let request_id = RequestId::new();
    log_op_start!(
        "backlinks_get",
        request_id = request_id.as_str(),
        object_id = object_id
    );
    let start = std::time::Instant::now();

    let backlinks = get_backlinks_impl(conn, object_id).map_err(|e| {
        let e = e.with_request_id(request_id.clone());
        log_op_error!(
            "backlinks_get",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64,
            request_id = request_id.as_str()
        );
        e
    })?;

    log_op_end!(
        "backlinks_get",
        duration_ms = start.elapsed().as_millis() as u64,
        request_id = request_id.as_str(),
        count = backlinks.len() as u64
    );
    Ok(backlinks)
}

fn get_backlinks_impl(conn: &Connection, object_id: &str) -> Result<Vec<Backlink>> {
    load_object(conn, object_id)?;
    let rows = RefRepo::backlinks_to(conn, object_id)?;
    Ok(rows.into_iter().map(Backlink::from).collect())
}
