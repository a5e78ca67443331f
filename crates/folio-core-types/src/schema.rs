//! Canonical schema constants for structured logging and events
//!
//! These constants keep field names identical across the engine, store and tests.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_REQUEST_ID: &str = "request_id";

// Entity identifiers
pub const FIELD_OBJECT_ID: &str = "object_id";

// Patch outcome
pub const FIELD_OP_COUNT: &str = "op_count";
pub const FIELD_PREVIOUS_DOC_VERSION: &str = "previous_doc_version";
pub const FIELD_NEW_DOC_VERSION: &str = "new_doc_version";
pub const FIELD_REPLAYED: &str = "replayed";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
