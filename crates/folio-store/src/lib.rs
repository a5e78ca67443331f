//! Folio Store - SQLite persistence for the block engine
//!
//! Provides:
//! - Connection opening and configuration (`StoreConfig`)
//! - Embedded SQL migrations with checksum verification
//! - Repositories for objects, blocks, refs, FTS rows and the idempotency cache
//!
//! Every function takes an explicit `&Connection`; a `Transaction` derefs to
//! one, so the engine runs the same calls inside its patch transaction.

pub mod db;
pub mod errors;
pub mod migrations;
pub mod repo;

// Re-export key types
pub use db::{JournalMode, StoreConfig};
pub use errors::Result;
