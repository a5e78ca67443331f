//! Block patch application
//!
//! `apply_block_patch` validates a batch of block ops, applies them in order
//! inside one `IMMEDIATE` transaction and bumps the object's `doc_version`
//! by exactly one. Any failure drops the transaction, so a patch lands
//! completely or not at all.
//!
//! Order of checks inside the transaction:
//! 1. idempotency replay (before the object and version checks)
//! 2. object exists and is live
//! 3. `baseDocVersion` check
//! 4. ops in sequence, each seeing the effects of the earlier ones

#![allow(clippy::result_large_err)]

use folio_core::errors::{ExError, FolioError};
use folio_core::model::{Block, BlockContent, BlockMeta, BlockType, SiblingKey};
use folio_core::ordering::{generate_order_key, is_order_key_unique};
use folio_core::patch::{
    AppliedOps, BlockOp, BlockPatch, PatchRequest, PatchResult, PatchWarning, Place,
};
use folio_core::rules::{ensure_no_cycle, validate_envelope, validate_op, API_VERSION};
use folio_core::{log_op_end, log_op_error, log_op_start};
use folio_core_types::RequestId;
use folio_store::errors::{from_rusqlite, Result};
use folio_store::repo::{BlockRepo, IdempotencyRepo, ObjectRepo};
use rusqlite::{Connection, TransactionBehavior};

use super::indexing::{clear_indexes_for_block, reindex_block};

/// Apply a patch request to one object's block tree
///
/// Replaying a request with an idempotency key that was already applied
/// returns the stored result unchanged and writes nothing.
///
/// # Errors
///
/// - `VALIDATION` for a malformed envelope or op, bad content, duplicate ids or keys
/// - `NOT_FOUND_OBJECT` when the object is missing or soft-deleted
/// - `NOT_FOUND_BLOCK` when a target, parent or sibling block is not live
/// - `CYCLE_DETECTED` when a move would put a block under itself
/// - `CONFLICT_VERSION` when `baseDocVersion` is stale
/// - `INTERNAL` for storage failures, including lock timeouts
///
/// Op-level errors carry the index of the failing op.
pub fn apply_block_patch(conn: &mut Connection, request: PatchRequest) -> Result<PatchResult> {
    let request_id = RequestId::new();
    log_op_start!(
        "block_patch_apply",
        request_id = request_id.as_str(),
        object_id = request.object_id.as_str(),
        op_count = request.ops.len() as u64
    );
    let start = std::time::Instant::now();

    let (result, replayed) = apply_block_patch_impl(conn, &request).map_err(|e| {
        let e = e.with_request_id(request_id.clone());
        log_op_error!(
            "block_patch_apply",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64,
            request_id = request_id.as_str()
        );
        e
    })?;

    log_op_end!(
        "block_patch_apply",
        duration_ms = start.elapsed().as_millis() as u64,
        request_id = request_id.as_str(),
        previous_doc_version = result.previous_doc_version,
        new_doc_version = result.new_doc_version,
        replayed = replayed
    );
    Ok(result)
}

fn apply_block_patch_impl(
    conn: &mut Connection,
    request: &PatchRequest,
) -> Result<(PatchResult, bool)> {
    validate_envelope(request)?;
    for (index, op) in request.ops.iter().enumerate() {
        validate_op(op).map_err(|e| at_op(e.into(), index, op))?;
    }

    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(from_rusqlite)?;

    if let Some(key) = &request.idempotency_key {
        if let Some(cached) = IdempotencyRepo::get(&tx, &request.object_id, key)? {
            let result: PatchResult = serde_json::from_str(&cached).map_err(FolioError::from)?;
            tracing::debug!(object_id = request.object_id.as_str(), "idempotent replay");
            return Ok((result, true));
        }
    }

    let object = ObjectRepo::get_object(&tx, &request.object_id)?.ok_or_else(|| {
        FolioError::ObjectNotFound {
            object_id: request.object_id.clone(),
        }
    })?;
    if object.is_deleted() {
        return Err(FolioError::ObjectDeleted {
            object_id: object.id,
        }
        .into());
    }

    if let Some(base) = request.base_doc_version {
        if base != object.doc_version {
            return Err(FolioError::VersionConflict {
                object_id: object.id,
                expected: base,
                actual: object.doc_version,
            }
            .into());
        }
    }

    let mut state = PatchState {
        conn: &tx,
        object_id: &object.id,
        now_ms: chrono::Utc::now().timestamp_millis(),
        applied: AppliedOps::default(),
        warnings: Vec::new(),
    };
    for (index, op) in request.ops.iter().enumerate() {
        state.apply(op).map_err(|e| at_op(e, index, op))?;
    }
    let PatchState {
        now_ms,
        applied,
        warnings,
        ..
    } = state;

    if !ObjectRepo::compare_and_bump_version(&tx, &object.id, object.doc_version, now_ms)? {
        let actual = ObjectRepo::get_object(&tx, &object.id)?
            .map(|o| o.doc_version)
            .unwrap_or(object.doc_version);
        return Err(FolioError::VersionConflict {
            object_id: object.id,
            expected: object.doc_version,
            actual,
        }
        .into());
    }

    let result = PatchResult {
        api_version: API_VERSION.to_string(),
        object_id: object.id.clone(),
        previous_doc_version: object.doc_version,
        new_doc_version: object.doc_version + 1,
        applied,
        warnings,
    };

    if let Some(key) = &request.idempotency_key {
        let json = serde_json::to_string(&result).map_err(FolioError::from)?;
        IdempotencyRepo::put(&tx, &object.id, key, &json, now_ms)?;
    }

    tx.commit().map_err(from_rusqlite)?;
    Ok((result, false))
}

/// Attach the failing op's position and wire name; storage errors keep theirs
fn at_op(err: ExError, index: usize, op: &BlockOp) -> ExError {
    let err = err.with_op_index(index);
    match err.op() {
        Some(_) => err,
        None => err.with_op(op.name()),
    }
}

/// Mutable state threaded through the ops of one patch
struct PatchState<'a> {
    conn: &'a Connection,
    object_id: &'a str,
    now_ms: i64,
    applied: AppliedOps,
    warnings: Vec<PatchWarning>,
}

impl PatchState<'_> {
    fn apply(&mut self, op: &BlockOp) -> Result<()> {
        match op {
            BlockOp::Insert {
                block_id,
                parent_block_id,
                order_key,
                place,
                block_type,
                content,
                meta,
            } => self.insert(
                block_id,
                parent_block_id.as_deref(),
                order_key.as_deref(),
                place.as_ref(),
                *block_type,
                content,
                meta.as_ref(),
            ),
            BlockOp::Update { block_id, patch } => self.update(block_id, patch),
            BlockOp::Move {
                block_id,
                new_parent_block_id,
                order_key,
                place,
                subtree: _,
            } => self.move_block(
                block_id,
                new_parent_block_id.as_deref(),
                order_key.as_deref(),
                place.as_ref(),
            ),
            BlockOp::Delete { block_id, subtree } => {
                self.delete(block_id, subtree.unwrap_or(false))
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn insert(
        &mut self,
        block_id: &str,
        parent_block_id: Option<&str>,
        order_key: Option<&str>,
        place: Option<&Place>,
        block_type: BlockType,
        content: &serde_json::Value,
        meta: Option<&BlockMeta>,
    ) -> Result<()> {
        if BlockRepo::get_block(self.conn, block_id)?.is_some() {
            return Err(FolioError::BlockAlreadyExists {
                block_id: block_id.to_string(),
            }
            .into());
        }
        if let Some(parent) = parent_block_id {
            self.require_live_parent(parent)?;
        }

        let parsed = BlockContent::parse(block_type, content)?;
        let siblings = BlockRepo::live_siblings(self.conn, self.object_id, parent_block_id)?;
        let key = resolve_order_key(block_id, &siblings, place, order_key)?;

        let block = Block {
            id: block_id.to_string(),
            object_id: self.object_id.to_string(),
            parent_block_id: parent_block_id.map(str::to_string),
            order_key: key,
            block_type,
            content: parsed.to_value()?,
            meta: meta.cloned(),
            created_at: self.now_ms,
            updated_at: self.now_ms,
            deleted_at: None,
        };
        BlockRepo::insert_block(self.conn, &block)?;

        let warnings = reindex_block(self.conn, &block, &parsed, self.now_ms)?;
        self.warnings.extend(warnings);
        self.applied.record_inserted(block_id);
        Ok(())
    }

    fn update(&mut self, block_id: &str, patch: &BlockPatch) -> Result<()> {
        let mut block = self.require_live_block(block_id)?;

        let new_type = patch.block_type.unwrap_or(block.block_type);
        let reparse = patch.content.is_some() || new_type != block.block_type;
        let parsed = if reparse {
            let raw = patch.content.as_ref().unwrap_or(&block.content);
            Some(BlockContent::parse(new_type, raw)?)
        } else {
            None
        };

        if let Some(parsed) = &parsed {
            block.block_type = new_type;
            block.content = parsed.to_value()?;
        }
        if let Some(meta) = &patch.meta {
            block.meta = meta.clone();
        }
        block.updated_at = self.now_ms;
        BlockRepo::update_block(self.conn, &block)?;

        if let Some(parsed) = &parsed {
            let warnings = reindex_block(self.conn, &block, parsed, self.now_ms)?;
            self.warnings.extend(warnings);
        }
        self.applied.record_updated(block_id);
        Ok(())
    }

    fn move_block(
        &mut self,
        block_id: &str,
        new_parent_block_id: Option<&str>,
        order_key: Option<&str>,
        place: Option<&Place>,
    ) -> Result<()> {
        self.require_live_block(block_id)?;
        if let Some(parent) = new_parent_block_id {
            self.require_live_parent(parent)?;
        }

        let max_steps = BlockRepo::count_blocks(self.conn, self.object_id)?;
        ensure_no_cycle(block_id, new_parent_block_id, max_steps, |id| {
            BlockRepo::live_parent_of(self.conn, id)
        })?;

        let siblings: Vec<SiblingKey> =
            BlockRepo::live_siblings(self.conn, self.object_id, new_parent_block_id)?
                .into_iter()
                .filter(|s| s.id != block_id)
                .collect();
        let key = resolve_order_key(block_id, &siblings, place, order_key)?;

        BlockRepo::move_block(self.conn, block_id, new_parent_block_id, &key, self.now_ms)?;
        self.applied.record_moved(block_id);
        Ok(())
    }

    fn delete(&mut self, block_id: &str, subtree: bool) -> Result<()> {
        let block = BlockRepo::get_block(self.conn, block_id)?
            .filter(|b| b.object_id == self.object_id)
            .ok_or_else(|| FolioError::BlockNotFound {
                block_id: block_id.to_string(),
            })?;
        if block.is_deleted() {
            return Ok(());
        }

        // Without subtree the descendants stay live, hidden under a deleted parent.
        let descendants = if subtree {
            BlockRepo::live_descendant_ids(self.conn, block_id)?
        } else {
            Vec::new()
        };

        for id in std::iter::once(block_id).chain(descendants.iter().map(String::as_str)) {
            if BlockRepo::soft_delete_block(self.conn, id, self.now_ms)? {
                clear_indexes_for_block(self.conn, id)?;
                self.applied.record_deleted(id);
            }
        }
        Ok(())
    }

    fn require_live_block(&self, block_id: &str) -> Result<Block> {
        match BlockRepo::get_block(self.conn, block_id)? {
            Some(block) if block.object_id == self.object_id => {
                if block.is_deleted() {
                    Err(FolioError::BlockDeleted {
                        block_id: block_id.to_string(),
                    }
                    .into())
                } else {
                    Ok(block)
                }
            }
            _ => Err(FolioError::BlockNotFound {
                block_id: block_id.to_string(),
            }
            .into()),
        }
    }

    fn require_live_parent(&self, parent_block_id: &str) -> Result<Block> {
        BlockRepo::get_live_block(self.conn, self.object_id, parent_block_id)?.ok_or_else(|| {
            FolioError::ParentNotFound {
                parent_block_id: parent_block_id.to_string(),
            }
            .into()
        })
    }
}

/// Explicit keys must be free among the new siblings; otherwise generate one
fn resolve_order_key(
    block_id: &str,
    siblings: &[SiblingKey],
    place: Option<&Place>,
    explicit_key: Option<&str>,
) -> Result<String> {
    if let Some(key) = explicit_key {
        if !is_order_key_unique(siblings, key) {
            return Err(FolioError::DuplicateOrderKey {
                block_id: block_id.to_string(),
                order_key: key.to_string(),
            }
            .into());
        }
    }
    let key = generate_order_key(siblings, place, explicit_key).map_err(FolioError::from)?;
    Ok(key)
}
