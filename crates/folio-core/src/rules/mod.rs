//! Request validation and tree rules that need no storage

pub mod tree;
pub mod validation;

pub use tree::ensure_no_cycle;
pub use validation::{validate_envelope, validate_op, API_VERSION, MAX_IDEMPOTENCY_KEY_LEN};
