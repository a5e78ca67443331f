use folio_core_types::RequestId;
use thiserror::Error;

/// Result type alias using FolioError
pub type Result<T> = std::result::Result<T, FolioError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every failure crossing the engine boundary is classified into one of these
/// kinds. Each kind maps to a stable code that transport layers forward
/// unchanged to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExErrorKind {
    /// Malformed envelope, op, order key or block content
    Validation,
    /// Object missing or soft-deleted
    NotFoundObject,
    /// Block missing, soft-deleted, or owned by another object
    NotFoundBlock,
    /// A move would make a block its own descendant
    CycleDetected,
    /// `baseDocVersion` does not match the object's current version
    ConflictVersion,
    /// Storage, serialization or invariant failure
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::Validation => "VALIDATION",
            ExErrorKind::NotFoundObject => "NOT_FOUND_OBJECT",
            ExErrorKind::NotFoundBlock => "NOT_FOUND_BLOCK",
            ExErrorKind::CycleDetected => "CYCLE_DETECTED",
            ExErrorKind::ConflictVersion => "CONFLICT_VERSION",
            ExErrorKind::Internal => "INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries the classification plus the context needed to locate the failure:
/// which object, which block, and which op of a patch batch.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    object_id: Option<String>,
    block_id: Option<String>,
    op_index: Option<usize>,
    request_id: Option<RequestId>,
    message: String,
    details: Option<serde_json::Value>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            object_id: None,
            block_id: None,
            op_index: None,
            request_id: None,
            message: String::new(),
            details: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add object ID context
    pub fn with_object_id(mut self, id: impl Into<String>) -> Self {
        self.object_id = Some(id.into());
        self
    }

    /// Add block ID context
    pub fn with_block_id(mut self, id: impl Into<String>) -> Self {
        self.block_id = Some(id.into());
        self
    }

    /// Add the index of the failing op within a patch batch
    pub fn with_op_index(mut self, index: usize) -> Self {
        self.op_index = Some(index);
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add structured details (forwarded to clients in the error envelope)
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the object ID context, if any
    pub fn object_id(&self) -> Option<&str> {
        self.object_id.as_deref()
    }

    /// Get the block ID context, if any
    pub fn block_id(&self) -> Option<&str> {
        self.block_id.as_deref()
    }

    /// Get the failing op index, if any
    pub fn op_index(&self) -> Option<usize> {
        self.op_index
    }

    /// Get the request ID context, if any
    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get structured details, if any
    pub fn details(&self) -> Option<&serde_json::Value> {
        self.details.as_ref()
    }

    /// Whether an automated caller should refetch state and resubmit
    ///
    /// Only version conflicts qualify; every other kind points at a caller
    /// defect or a genuine inconsistency.
    pub fn is_retryable(&self) -> bool {
        self.kind == ExErrorKind::ConflictVersion
    }

    /// Render the `{code, message, details?}` error envelope
    pub fn to_envelope(&self) -> serde_json::Value {
        let mut details = match &self.details {
            Some(serde_json::Value::Object(map)) => map.clone(),
            Some(other) => {
                let mut map = serde_json::Map::new();
                map.insert("info".to_string(), other.clone());
                map
            }
            None => serde_json::Map::new(),
        };
        if let Some(object_id) = &self.object_id {
            details.insert("objectId".to_string(), object_id.clone().into());
        }
        if let Some(block_id) = &self.block_id {
            details.insert("blockId".to_string(), block_id.clone().into());
        }
        if let Some(index) = self.op_index {
            details.insert("opIndex".to_string(), index.into());
        }

        let mut envelope = serde_json::json!({
            "code": self.code(),
            "message": self.message,
        });
        if !details.is_empty() {
            envelope["details"] = serde_json::Value::Object(details);
        }
        envelope
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(object_id) = &self.object_id {
            write!(f, " (object_id: {})", object_id)?;
        }
        if let Some(block_id) = &self.block_id {
            write!(f, " (block_id: {})", block_id)?;
        }
        if let Some(index) = self.op_index {
            write!(f, " (op_index: {})", index)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Failures of the order key generator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderKeyError {
    /// `before`/`after` placement names a block that is not a sibling
    #[error("Sibling block not found among siblings: {sibling_block_id}")]
    SiblingNotFound { sibling_block_id: String },

    /// Key is empty, uses characters outside the alphabet, or ends in the zero digit
    #[error("Invalid order key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// Lower bound is not strictly below upper bound
    #[error("No order key exists between {lower:?} and {upper:?}")]
    NoKeyBetween { lower: String, upper: String },
}

/// Comprehensive error taxonomy for pure Folio operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FolioError {
    // ===== Validation Errors =====
    /// Request envelope is malformed
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// A single op in the batch is malformed
    #[error("Invalid op on block {block_id}: {reason}")]
    InvalidOp { block_id: String, reason: String },

    /// Content does not satisfy the schema of its block type
    #[error("Invalid content for block type {block_type}: {reason}")]
    InvalidContent { block_type: String, reason: String },

    /// Unknown block type name
    #[error("Unknown block type: {name}")]
    UnknownBlockType { name: String },

    /// Block id already used (live or deleted)
    #[error("Block already exists: {block_id}")]
    BlockAlreadyExists { block_id: String },

    /// Explicit order key collides with a live sibling
    #[error("Order key {order_key:?} already used by a sibling of block {block_id}")]
    DuplicateOrderKey { block_id: String, order_key: String },

    /// Order key generation failed
    #[error(transparent)]
    OrderKey(#[from] OrderKeyError),

    // ===== Not Found Errors =====
    /// Object not found
    #[error("Object not found: {object_id}")]
    ObjectNotFound { object_id: String },

    /// Object was soft-deleted
    #[error("Object was deleted: {object_id}")]
    ObjectDeleted { object_id: String },

    /// Block not found in the object
    #[error("Block not found: {block_id}")]
    BlockNotFound { block_id: String },

    /// Block was soft-deleted
    #[error("Block was deleted: {block_id}")]
    BlockDeleted { block_id: String },

    /// Parent block missing, deleted, or owned by another object
    #[error("Parent block not found: {parent_block_id}")]
    ParentNotFound { parent_block_id: String },

    // ===== Structural Errors =====
    /// Move would create a cycle
    #[error("Cycle detected: moving block {block_id} under {new_parent_block_id}")]
    CycleDetected {
        block_id: String,
        new_parent_block_id: String,
    },

    // ===== Concurrency Errors =====
    /// Stale base version
    #[error("Version conflict on object {object_id}: expected {expected}, current {actual}")]
    VersionConflict {
        object_id: String,
        expected: u64,
        actual: u64,
    },

    // ===== Generic Errors =====
    /// Serialization error (JSON encoding/decoding)
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Conversion from FolioError to ExError
///
/// Core functions return `FolioError`; the store and engine boundaries speak
/// `ExError`. This mapping is the single place where a domain failure gets
/// its stable code.
impl From<FolioError> for ExError {
    fn from(err: FolioError) -> Self {
        let message = err.to_string();
        match err {
            FolioError::InvalidRequest { .. } => ExError::new(ExErrorKind::Validation)
                .with_op("validate_request")
                .with_message(message),
            FolioError::InvalidOp { block_id, .. } => ExError::new(ExErrorKind::Validation)
                .with_block_id(block_id)
                .with_message(message),
            FolioError::InvalidContent { block_type, .. } => ExError::new(ExErrorKind::Validation)
                .with_message(message)
                .with_details(serde_json::json!({ "blockType": block_type })),
            FolioError::UnknownBlockType { name } => ExError::new(ExErrorKind::Validation)
                .with_message(message)
                .with_details(serde_json::json!({ "blockType": name })),
            FolioError::BlockAlreadyExists { block_id } => ExError::new(ExErrorKind::Validation)
                .with_block_id(block_id)
                .with_message(message),
            FolioError::DuplicateOrderKey {
                block_id,
                order_key,
            } => ExError::new(ExErrorKind::Validation)
                .with_block_id(block_id)
                .with_message(message)
                .with_details(serde_json::json!({ "orderKey": order_key })),
            FolioError::OrderKey(inner) => {
                let ex = ExError::new(ExErrorKind::Validation).with_message(message);
                match inner {
                    OrderKeyError::SiblingNotFound { sibling_block_id } => {
                        ex.with_details(serde_json::json!({ "siblingBlockId": sibling_block_id }))
                    }
                    OrderKeyError::InvalidKey { key, .. } => {
                        ex.with_details(serde_json::json!({ "orderKey": key }))
                    }
                    OrderKeyError::NoKeyBetween { lower, upper } => {
                        ex.with_details(serde_json::json!({ "lower": lower, "upper": upper }))
                    }
                }
            }
            FolioError::ObjectNotFound { object_id } | FolioError::ObjectDeleted { object_id } => {
                ExError::new(ExErrorKind::NotFoundObject)
                    .with_object_id(object_id)
                    .with_message(message)
            }
            FolioError::BlockNotFound { block_id } | FolioError::BlockDeleted { block_id } => {
                ExError::new(ExErrorKind::NotFoundBlock)
                    .with_block_id(block_id)
                    .with_message(message)
            }
            FolioError::ParentNotFound { parent_block_id } => {
                ExError::new(ExErrorKind::NotFoundBlock)
                    .with_block_id(parent_block_id)
                    .with_message(message)
            }
            FolioError::CycleDetected {
                block_id,
                new_parent_block_id,
            } => ExError::new(ExErrorKind::CycleDetected)
                .with_block_id(block_id)
                .with_message(message)
                .with_details(serde_json::json!({ "newParentBlockId": new_parent_block_id })),
            FolioError::VersionConflict {
                object_id,
                expected,
                actual,
            } => ExError::new(ExErrorKind::ConflictVersion)
                .with_object_id(object_id)
                .with_message(message)
                .with_details(serde_json::json!({
                    "baseDocVersion": expected,
                    "currentDocVersion": actual,
                })),
            FolioError::Serialization { .. } => ExError::new(ExErrorKind::Internal)
                .with_op("serialization")
                .with_message(message),
            FolioError::Internal { .. } => {
                ExError::new(ExErrorKind::Internal).with_message(message)
            }
        }
    }
}

impl From<serde_json::Error> for FolioError {
    fn from(err: serde_json::Error) -> Self {
        FolioError::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FolioError::BlockNotFound {
            block_id: "b1".to_string(),
        };
        assert_eq!(err.to_string(), "Block not found: b1");
    }

    #[test]
    fn test_order_key_error_is_transparent() {
        let err: FolioError = OrderKeyError::SiblingNotFound {
            sibling_block_id: "s1".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Sibling block not found among siblings: s1");
    }

    #[test]
    fn test_ex_error_display_includes_context() {
        let err = ExError::new(ExErrorKind::NotFoundBlock)
            .with_op("block.update")
            .with_block_id("b1")
            .with_op_index(2)
            .with_message("Block not found");
        let rendered = err.to_string();
        assert!(rendered.starts_with("[NOT_FOUND_BLOCK]"));
        assert!(rendered.contains("block.update"));
        assert!(rendered.contains("(op_index: 2)"));
    }
}
