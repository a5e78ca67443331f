//! Derived index maintenance
//!
//! Ref rows and the FTS row of a block are always recomputed as a whole
//! (delete then reinsert) from the block's current content. Callers run these
//! functions inside their own transaction.

#![allow(clippy::result_large_err)]

use folio_core::errors::{ExError, ExErrorKind, FolioError};
use folio_core::extract::{extract_plain_text, extract_references};
use folio_core::model::{Block, BlockContent, RefTarget};
use folio_core::patch::PatchWarning;
use folio_core::{log_op_end, log_op_error, log_op_start};
use folio_core_types::RequestId;
use folio_store::errors::{from_rusqlite, Result};
use folio_store::repo::{BlockRepo, FtsRepo, ObjectRepo, RefRepo, RefRow};
use rusqlite::{Connection, TransactionBehavior};
use uuid::Uuid;

/// Replace the ref rows sourced from `block_id` with the refs in `content`
///
/// Returns the extracted targets in document order, duplicates included.
pub fn update_refs_for_block(
    conn: &Connection,
    block_id: &str,
    object_id: &str,
    content: &BlockContent,
    now_ms: i64,
) -> Result<Vec<RefTarget>> {
    RefRepo::delete_for_block(conn, block_id)?;

    let targets = extract_references(content);
    for target in &targets {
        RefRepo::insert_ref(
            conn,
            &RefRow {
                id: Uuid::now_v7().to_string(),
                source_block_id: block_id.to_string(),
                source_object_id: object_id.to_string(),
                target_object_id: target.object_id().to_string(),
                target_block_id: target.block_id().map(str::to_string),
                created_at: now_ms,
            },
        )?;
    }

    tracing::debug!(block_id, ref_count = targets.len() as u64, "refs updated");
    Ok(targets)
}

/// Replace the FTS row of `block_id` with the plain text of `content`
pub fn update_fts_for_block(
    conn: &Connection,
    block_id: &str,
    object_id: &str,
    content: &BlockContent,
) -> Result<()> {
    FtsRepo::upsert(conn, block_id, object_id, &extract_plain_text(content))
}

/// Drop every derived row of a block
pub fn clear_indexes_for_block(conn: &Connection, block_id: &str) -> Result<()> {
    RefRepo::delete_for_block(conn, block_id)?;
    FtsRepo::delete_for_block(conn, block_id)?;
    Ok(())
}

/// Recompute refs and FTS for a block and report targets that are not live
pub(crate) fn reindex_block(
    conn: &Connection,
    block: &Block,
    content: &BlockContent,
    now_ms: i64,
) -> Result<Vec<PatchWarning>> {
    let targets = update_refs_for_block(conn, &block.id, &block.object_id, content, now_ms)?;
    update_fts_for_block(conn, &block.id, &block.object_id, content)?;
    missing_target_warnings(conn, &block.id, &targets)
}

fn missing_target_warnings(
    conn: &Connection,
    block_id: &str,
    targets: &[RefTarget],
) -> Result<Vec<PatchWarning>> {
    let mut warnings = Vec::new();
    let mut checked: Vec<&RefTarget> = Vec::new();
    for target in targets {
        if checked.contains(&target) {
            continue;
        }
        checked.push(target);

        let live = match target.block_id() {
            None => ObjectRepo::is_live(conn, target.object_id())?,
            Some(target_block_id) => {
                ObjectRepo::is_live(conn, target.object_id())?
                    && BlockRepo::get_live_block(conn, target.object_id(), target_block_id)?
                        .is_some()
            }
        };
        if !live {
            warnings.push(PatchWarning::ref_target_missing(
                block_id,
                target.object_id(),
                target.block_id(),
            ));
        }
    }
    Ok(warnings)
}

/// Recompute every derived row of one object
///
/// Live blocks are reindexed from their stored content and deleted blocks
/// lose any rows left behind. Runs in its own transaction and leaves
/// `doc_version` untouched. Returns the number of live blocks indexed.
///
/// # Errors
///
/// `NOT_FOUND_OBJECT` for an unknown object; `INTERNAL` if a stored block no
/// longer satisfies its content schema.
pub fn rebuild_object_indexes(conn: &mut Connection, object_id: &str) -> Result<usize> {
    let request_id = RequestId::new();
    log_op_start!(
        "object_indexes_rebuild",
        request_id = request_id.as_str(),
        object_id = object_id
    );
    let start = std::time::Instant::now();

    let indexed = rebuild_object_indexes_impl(conn, object_id).map_err(|e| {
        let e = e.with_request_id(request_id.clone());
        log_op_error!(
            "object_indexes_rebuild",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64,
            request_id = request_id.as_str()
        );
        e
    })?;

    log_op_end!(
        "object_indexes_rebuild",
        duration_ms = start.elapsed().as_millis() as u64,
        request_id = request_id.as_str(),
        indexed = indexed as u64
    );
    Ok(indexed)
}

fn rebuild_object_indexes_impl(conn: &mut Connection, object_id: &str) -> Result<usize> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(from_rusqlite)?;

    if ObjectRepo::get_object(&tx, object_id)?.is_none() {
        return Err(FolioError::ObjectNotFound {
            object_id: object_id.to_string(),
        }
        .into());
    }

    let now = chrono::Utc::now().timestamp_millis();
    let blocks = BlockRepo::list_live_blocks(&tx, object_id)?;
    for block in &blocks {
        let content = block.parsed_content().map_err(|e| {
            ExError::new(ExErrorKind::Internal)
                .with_op("object_indexes_rebuild")
                .with_object_id(object_id)
                .with_block_id(block.id.as_str())
                .with_message(format!("stored content is invalid: {}", e))
        })?;
        update_refs_for_block(&tx, &block.id, object_id, &content, now)?;
        update_fts_for_block(&tx, &block.id, object_id, &content)?;
    }

    for block_id in BlockRepo::list_deleted_block_ids(&tx, object_id)? {
        clear_indexes_for_block(&tx, &block_id)?;
    }

    tx.commit().map_err(from_rusqlite)?;
    Ok(blocks.len())
}
