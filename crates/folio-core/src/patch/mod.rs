//! Patch request and result envelopes
//!
//! These are the wire types of `apply_block_patch`. All of them are camelCase
//! on the wire; ops are tagged on `op` and places on `where`.

pub mod ops;
pub mod result;

pub use ops::{BlockOp, BlockPatch, ClientInfo, PatchRequest, Place};
pub use result::{AppliedOps, PatchResult, PatchWarning, REF_TARGET_MISSING};
