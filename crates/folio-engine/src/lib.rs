//! Folio Engine - Orchestration layer
//!
//! Applies block patches transactionally and answers the read queries that
//! span the store and the derived indexes. The engine owns lifecycle logging:
//! every public operation emits start/end events tagged with a `RequestId`.

pub mod commands;
pub mod queries;

pub use commands::indexing::rebuild_object_indexes;
pub use commands::patch::apply_block_patch;
pub use queries::backlinks::{get_backlinks, Backlink};
pub use queries::document::{get_document, BlockNode, DocumentTree};
pub use queries::mentions::{get_unlinked_mentions_to, UnlinkedMention};
