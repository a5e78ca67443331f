#![allow(clippy::result_large_err)]

use std::collections::HashSet;

use folio_core::{log_op_end, log_op_error, log_op_start};
use folio_core_types::RequestId;
use folio_store::errors::Result;
use folio_store::repo::fts::phrase_query;
use folio_store::repo::{FtsRepo, RefRepo};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use super::load_object;

/// A block whose text mentions an object's title without referencing it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlinkedMention {
    pub source_block_id: String,
    pub source_object_id: String,
    pub source_object_title: String,
}

/// Blocks of other objects whose plain text contains the title of `object_id`
/// as a phrase but hold no ref to it
///
/// Empty for deleted objects and for titles without letters or digits.
///
/// # Errors
///
/// `NOT_FOUND_OBJECT` when no object with this id was ever created.
pub fn get_unlinked_mentions_to(conn: &Connection, object_id: &str) -> Result<Vec<UnlinkedMention>> {
    let request_id = RequestId::new();
    log_op_start!(
        "unlinked_mentions_get",
        request_id = request_id.as_str(),
        object_id = object_id
    );
    let start = std::time::Instant::now();

    let mentions = get_unlinked_mentions_impl(conn, object_id).map_err(|e| {
        let e = e.with_request_id(request_id.clone());
        log_op_error!(
            "unlinked_mentions_get",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64,
            request_id = request_id.as_str()
        );
        e
    })?;

    log_op_end!(
        "unlinked_mentions_get",
        duration_ms = start.elapsed().as_millis() as u64,
        request_id = request_id.as_str(),
        count = mentions.len() as u64
    );
    Ok(mentions)
}

fn get_unlinked_mentions_impl(conn: &Connection, object_id: &str) -> Result<Vec<UnlinkedMention>> {
    let object = load_object(conn, object_id)?;
    if object.is_deleted() || !object.has_searchable_title() {
        return Ok(Vec::new());
    }

    let hits = FtsRepo::search_live(conn, &phrase_query(object.title.trim()))?;
    let linked = RefRepo::source_blocks_referencing(conn, &object.id)?;

    let mut seen = HashSet::new();
    let mentions = hits
        .into_iter()
        .filter(|hit| hit.object_id != object.id && !linked.contains(&hit.block_id))
        .filter(|hit| seen.insert(hit.block_id.clone()))
        .map(|hit| UnlinkedMention {
            source_block_id: hit.block_id,
            source_object_id: hit.object_id,
            source_object_title: hit.object_title,
        })
        .collect();
    Ok(mentions)
}
