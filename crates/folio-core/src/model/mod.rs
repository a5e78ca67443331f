//! Domain model: objects, blocks, typed content and inline runs

pub mod block;
pub mod content;
pub mod inline;
pub mod object;

pub use block::{Block, BlockMeta, SiblingKey};
pub use content::{BlockContent, BlockType};
pub use inline::{InlineNode, InlineVisitor, LinkChild, Mark, RefMode, RefNode, RefTarget};
pub use object::Object;
