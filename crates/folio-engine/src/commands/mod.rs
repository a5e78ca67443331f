//! Write-side operations.
//!
//! `patch` applies a batch of block ops in one transaction; `indexing` keeps
//! the reference graph and the FTS table in step with block content.

pub mod indexing;
pub mod patch;
