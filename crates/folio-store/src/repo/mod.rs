//! Repository layer: one unit struct per table, associated functions over an
//! explicit connection

pub mod blocks;
pub mod fts;
pub mod idempotency;
pub mod objects;
pub mod refs;

pub use blocks::BlockRepo;
pub use fts::{FtsHit, FtsRepo};
pub use idempotency::IdempotencyRepo;
pub use objects::ObjectRepo;
pub use refs::{BacklinkRow, RefRepo, RefRow};
