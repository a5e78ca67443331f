use serde::{Deserialize, Serialize};

use super::content::{BlockContent, BlockType};
use crate::errors::Result;

/// Optional per-block flags
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BlockMeta {
    /// Children hidden in the editor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collapsed: Option<bool>,
}

/// Block - one node of an object's document tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Client-chosen identifier, unique across all objects
    pub id: String,

    /// Owning object
    pub object_id: String,

    /// Parent block; `None` for top-level blocks
    pub parent_block_id: Option<String>,

    /// Sort key among live siblings
    pub order_key: String,

    pub block_type: BlockType,

    /// Stored content, valid for `block_type`
    pub content: serde_json::Value,

    pub meta: Option<BlockMeta>,

    pub created_at: i64,

    pub updated_at: i64,

    pub deleted_at: Option<i64>,
}

impl Block {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_root(&self) -> bool {
        self.parent_block_id.is_none()
    }

    /// Re-validate the stored content into its typed form
    ///
    /// # Errors
    ///
    /// Returns `InvalidContent` if the stored JSON no longer fits the schema.
    pub fn parsed_content(&self) -> Result<BlockContent> {
        BlockContent::parse(self.block_type, &self.content)
    }
}

/// Sibling entry handed to the order key generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiblingKey {
    pub id: String,
    pub order_key: String,
}

impl SiblingKey {
    pub fn new(id: impl Into<String>, order_key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            order_key: order_key.into(),
        }
    }
}

impl From<&Block> for SiblingKey {
    fn from(block: &Block) -> Self {
        Self::new(block.id.clone(), block.order_key.clone())
    }
}
