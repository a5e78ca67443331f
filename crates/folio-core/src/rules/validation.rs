use crate::errors::{FolioError, Result};
use crate::ordering::validate_order_key;
use crate::patch::{BlockOp, PatchRequest, Place};

/// The only accepted `apiVersion`
pub const API_VERSION: &str = "v1";

pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 255;

fn invalid_request(reason: impl Into<String>) -> FolioError {
    FolioError::InvalidRequest {
        reason: reason.into(),
    }
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && !id.chars().any(char::is_whitespace)
}

/// Validate the request envelope, excluding the individual ops
///
/// # Errors
///
/// Returns `InvalidRequest` for a wrong api version, a malformed object id, an
/// empty op list, or an empty or overlong idempotency key.
pub fn validate_envelope(request: &PatchRequest) -> Result<()> {
    if request.api_version != API_VERSION {
        return Err(invalid_request(format!(
            "unsupported apiVersion {:?}, expected {:?}",
            request.api_version, API_VERSION
        )));
    }
    if !is_valid_id(&request.object_id) {
        return Err(invalid_request(
            "objectId must be non-empty and contain no whitespace",
        ));
    }
    if request.ops.is_empty() {
        return Err(invalid_request("ops must contain at least one op"));
    }
    if let Some(key) = &request.idempotency_key {
        if key.is_empty() {
            return Err(invalid_request("idempotencyKey must not be empty"));
        }
        if key.chars().count() > MAX_IDEMPOTENCY_KEY_LEN {
            return Err(invalid_request(format!(
                "idempotencyKey exceeds {} characters",
                MAX_IDEMPOTENCY_KEY_LEN
            )));
        }
    }
    Ok(())
}

/// Validate one op in isolation: id syntax, explicit key syntax, non-empty patch
///
/// Everything that depends on stored state is checked by the engine.
///
/// # Errors
///
/// Returns `InvalidOp` or `OrderKey(InvalidKey)`.
pub fn validate_op(op: &BlockOp) -> Result<()> {
    let block_id = op.block_id();
    let bad_id = |field: &str| FolioError::InvalidOp {
        block_id: block_id.to_string(),
        reason: format!("{} must be non-empty and contain no whitespace", field),
    };

    if !is_valid_id(block_id) {
        return Err(bad_id("blockId"));
    }

    match op {
        BlockOp::Insert {
            parent_block_id,
            order_key,
            place,
            ..
        } => {
            check_optional_id(parent_block_id.as_deref(), || bad_id("parentBlockId"))?;
            check_placement(order_key.as_deref(), place.as_ref(), || bad_id("siblingBlockId"))?;
        }
        BlockOp::Move {
            new_parent_block_id,
            order_key,
            place,
            ..
        } => {
            check_optional_id(new_parent_block_id.as_deref(), || bad_id("newParentBlockId"))?;
            check_placement(order_key.as_deref(), place.as_ref(), || bad_id("siblingBlockId"))?;
        }
        BlockOp::Update { patch, .. } => {
            if patch.is_empty() {
                return Err(FolioError::InvalidOp {
                    block_id: block_id.to_string(),
                    reason: "patch must set at least one of blockType, content, meta".to_string(),
                });
            }
        }
        BlockOp::Delete { .. } => {}
    }
    Ok(())
}

fn check_optional_id(id: Option<&str>, err: impl FnOnce() -> FolioError) -> Result<()> {
    match id {
        Some(id) if !is_valid_id(id) => Err(err()),
        _ => Ok(()),
    }
}

fn check_placement(
    order_key: Option<&str>,
    place: Option<&Place>,
    err: impl FnOnce() -> FolioError,
) -> Result<()> {
    if let Some(key) = order_key {
        validate_order_key(key)?;
    }
    check_optional_id(place.and_then(Place::sibling_block_id), err)
}
