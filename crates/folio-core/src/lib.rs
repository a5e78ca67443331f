//! Folio Core - pure domain kernel of the block engine
//!
//! This crate holds everything that does not touch storage:
//! - Object and block models with the closed block-type content schema
//! - Fractional order keys for sibling ordering
//! - Reference and plain-text extractors over inline content
//! - Patch request/result envelopes and request validation
//! - The two-layer error facility and the structured logging facility

pub use folio_core_types as core_types;

pub mod errors;
pub mod extract;
pub mod logging_facility;
pub mod model;
pub mod ordering;
pub mod patch;
pub mod rules;

// Re-export commonly used types
pub use errors::{ExError, ExErrorKind, FolioError, OrderKeyError, Result};
pub use extract::{extract_plain_text, extract_references};
pub use model::{Block, BlockContent, BlockMeta, BlockType, Object, RefTarget};
pub use patch::{BlockOp, PatchRequest, PatchResult, Place};
