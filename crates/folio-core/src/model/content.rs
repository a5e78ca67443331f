//! Block types and their content schemas
//!
//! `BlockType` is closed: adding a variant forces every `match` below to
//! handle it, so no block type can reach storage without a validator.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::inline::{validate_inline, walk_inline, InlineNode, InlineVisitor};
use crate::errors::{FolioError, Result};

/// Closed set of block types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Paragraph,
    Heading,
    List,
    ListItem,
    Blockquote,
    Callout,
    CodeBlock,
    ThematicBreak,
    Table,
    MathBlock,
    FootnoteDef,
}

impl BlockType {
    pub const ALL: [BlockType; 11] = [
        BlockType::Paragraph,
        BlockType::Heading,
        BlockType::List,
        BlockType::ListItem,
        BlockType::Blockquote,
        BlockType::Callout,
        BlockType::CodeBlock,
        BlockType::ThematicBreak,
        BlockType::Table,
        BlockType::MathBlock,
        BlockType::FootnoteDef,
    ];

    /// Wire and storage name
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Paragraph => "paragraph",
            BlockType::Heading => "heading",
            BlockType::List => "list",
            BlockType::ListItem => "list_item",
            BlockType::Blockquote => "blockquote",
            BlockType::Callout => "callout",
            BlockType::CodeBlock => "code_block",
            BlockType::ThematicBreak => "thematic_break",
            BlockType::Table => "table",
            BlockType::MathBlock => "math_block",
            BlockType::FootnoteDef => "footnote_def",
        }
    }

    /// Containers carry no text of their own; their children are blocks
    pub fn is_container(&self) -> bool {
        matches!(self, BlockType::List | BlockType::Blockquote)
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockType {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self> {
        BlockType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| FolioError::UnknownBlockType {
                name: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParagraphContent {
    pub inline: Vec<InlineNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeadingContent {
    pub level: u8,
    pub inline: Vec<InlineNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Bullet,
    Ordered,
    Task,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListContent {
    pub kind: ListKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListItemContent {
    pub inline: Vec<InlineNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmptyContent {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalloutContent {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub inline: Vec<InlineNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CodeBlockContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableRow {
    pub cells: Vec<Vec<InlineNode>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableContent {
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MathBlockContent {
    pub latex: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FootnoteDefContent {
    pub key: String,
    pub inline: Vec<InlineNode>,
}

/// Validated, typed block content
#[derive(Debug, Clone, PartialEq)]
pub enum BlockContent {
    Paragraph(ParagraphContent),
    Heading(HeadingContent),
    List(ListContent),
    ListItem(ListItemContent),
    Blockquote(EmptyContent),
    Callout(CalloutContent),
    CodeBlock(CodeBlockContent),
    ThematicBreak(EmptyContent),
    Table(TableContent),
    MathBlock(MathBlockContent),
    FootnoteDef(FootnoteDefContent),
}

fn decode<T: DeserializeOwned>(block_type: BlockType, value: &serde_json::Value) -> Result<T> {
    T::deserialize(value).map_err(|e| FolioError::InvalidContent {
        block_type: block_type.to_string(),
        reason: e.to_string(),
    })
}

fn invalid(block_type: BlockType, reason: impl Into<String>) -> FolioError {
    FolioError::InvalidContent {
        block_type: block_type.to_string(),
        reason: reason.into(),
    }
}

impl BlockContent {
    /// Validate raw JSON content against the schema of `block_type`
    ///
    /// # Errors
    ///
    /// Returns `InvalidContent` when the shape or a semantic rule (heading
    /// level, table width, non-empty ids) does not hold.
    pub fn parse(block_type: BlockType, value: &serde_json::Value) -> Result<Self> {
        let name = block_type.as_str();
        let content = match block_type {
            BlockType::Paragraph => {
                let c: ParagraphContent = decode(block_type, value)?;
                validate_inline(&c.inline, name)?;
                BlockContent::Paragraph(c)
            }
            BlockType::Heading => {
                let c: HeadingContent = decode(block_type, value)?;
                if !(1..=6).contains(&c.level) {
                    return Err(invalid(
                        block_type,
                        format!("heading level must be 1..=6, got {}", c.level),
                    ));
                }
                validate_inline(&c.inline, name)?;
                BlockContent::Heading(c)
            }
            BlockType::List => BlockContent::List(decode(block_type, value)?),
            BlockType::ListItem => {
                let c: ListItemContent = decode(block_type, value)?;
                validate_inline(&c.inline, name)?;
                BlockContent::ListItem(c)
            }
            BlockType::Blockquote => BlockContent::Blockquote(decode(block_type, value)?),
            BlockType::Callout => {
                let c: CalloutContent = decode(block_type, value)?;
                if c.kind.trim().is_empty() {
                    return Err(invalid(block_type, "callout kind must not be empty"));
                }
                validate_inline(&c.inline, name)?;
                BlockContent::Callout(c)
            }
            BlockType::CodeBlock => BlockContent::CodeBlock(decode(block_type, value)?),
            BlockType::ThematicBreak => BlockContent::ThematicBreak(decode(block_type, value)?),
            BlockType::Table => {
                let c: TableContent = decode(block_type, value)?;
                let width = c.rows.first().map(|r| r.cells.len()).unwrap_or(0);
                if width == 0 {
                    return Err(invalid(block_type, "table needs at least one row and one cell"));
                }
                if let Some(pos) = c.rows.iter().position(|r| r.cells.len() != width) {
                    return Err(invalid(
                        block_type,
                        format!("row {} has {} cells, expected {}", pos, c.rows[pos].cells.len(), width),
                    ));
                }
                for cell in c.rows.iter().flat_map(|r| r.cells.iter()) {
                    validate_inline(cell, name)?;
                }
                BlockContent::Table(c)
            }
            BlockType::MathBlock => BlockContent::MathBlock(decode(block_type, value)?),
            BlockType::FootnoteDef => {
                let c: FootnoteDefContent = decode(block_type, value)?;
                if c.key.trim().is_empty() {
                    return Err(invalid(block_type, "footnote key must not be empty"));
                }
                validate_inline(&c.inline, name)?;
                BlockContent::FootnoteDef(c)
            }
        };
        Ok(content)
    }

    /// The block type this content belongs to
    pub fn block_type(&self) -> BlockType {
        match self {
            BlockContent::Paragraph(_) => BlockType::Paragraph,
            BlockContent::Heading(_) => BlockType::Heading,
            BlockContent::List(_) => BlockType::List,
            BlockContent::ListItem(_) => BlockType::ListItem,
            BlockContent::Blockquote(_) => BlockType::Blockquote,
            BlockContent::Callout(_) => BlockType::Callout,
            BlockContent::CodeBlock(_) => BlockType::CodeBlock,
            BlockContent::ThematicBreak(_) => BlockType::ThematicBreak,
            BlockContent::Table(_) => BlockType::Table,
            BlockContent::MathBlock(_) => BlockType::MathBlock,
            BlockContent::FootnoteDef(_) => BlockType::FootnoteDef,
        }
    }

    /// Canonical JSON form, as stored
    pub fn to_value(&self) -> Result<serde_json::Value> {
        let value = match self {
            BlockContent::Paragraph(c) => serde_json::to_value(c),
            BlockContent::Heading(c) => serde_json::to_value(c),
            BlockContent::List(c) => serde_json::to_value(c),
            BlockContent::ListItem(c) => serde_json::to_value(c),
            BlockContent::Blockquote(c) | BlockContent::ThematicBreak(c) => serde_json::to_value(c),
            BlockContent::Callout(c) => serde_json::to_value(c),
            BlockContent::CodeBlock(c) => serde_json::to_value(c),
            BlockContent::Table(c) => serde_json::to_value(c),
            BlockContent::MathBlock(c) => serde_json::to_value(c),
            BlockContent::FootnoteDef(c) => serde_json::to_value(c),
        }?;
        Ok(value)
    }

    /// Walk every textual leaf of this block in document order
    pub fn accept<V: InlineVisitor + ?Sized>(&self, visitor: &mut V) {
        match self {
            BlockContent::Paragraph(c) => walk_inline(&c.inline, visitor),
            BlockContent::Heading(c) => walk_inline(&c.inline, visitor),
            BlockContent::ListItem(c) => walk_inline(&c.inline, visitor),
            BlockContent::Callout(c) => {
                if let Some(title) = &c.title {
                    visitor.visit_callout_title(title);
                    visitor.visit_separator();
                }
                walk_inline(&c.inline, visitor);
            }
            BlockContent::CodeBlock(c) => visitor.visit_code(&c.code),
            BlockContent::Table(c) => {
                for cell in c.rows.iter().flat_map(|r| r.cells.iter()) {
                    walk_inline(cell, visitor);
                    visitor.visit_separator();
                }
            }
            BlockContent::MathBlock(c) => visitor.visit_math(&c.latex),
            BlockContent::FootnoteDef(c) => walk_inline(&c.inline, visitor),
            BlockContent::List(_) | BlockContent::Blockquote(_) | BlockContent::ThematicBreak(_) => {}
        }
    }
}
