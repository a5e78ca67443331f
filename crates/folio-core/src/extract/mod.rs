//! Pure extractors feeding the derived indexes
//!
//! Both walk typed block content through [`InlineVisitor`](crate::model::InlineVisitor)
//! and never touch storage.

pub mod plain_text;
pub mod references;

pub use plain_text::extract_plain_text;
pub use references::extract_references;
