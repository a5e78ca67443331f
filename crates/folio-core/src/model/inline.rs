//! Inline content: the recursive run structure inside text-bearing blocks
//!
//! Links may only contain [`LinkChild`] nodes, which exclude links, so every
//! walk over inline content terminates.

use serde::{Deserialize, Serialize};

use crate::errors::{FolioError, Result};

/// Target of an explicit reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RefTarget {
    /// Reference to a whole object
    Object {
        #[serde(rename = "objectId")]
        object_id: String,
    },
    /// Reference to one block inside an object
    Block {
        #[serde(rename = "objectId")]
        object_id: String,
        #[serde(rename = "blockId")]
        block_id: String,
    },
}

impl RefTarget {
    pub fn object_id(&self) -> &str {
        match self {
            RefTarget::Object { object_id } | RefTarget::Block { object_id, .. } => object_id,
        }
    }

    pub fn block_id(&self) -> Option<&str> {
        match self {
            RefTarget::Object { .. } => None,
            RefTarget::Block { block_id, .. } => Some(block_id),
        }
    }
}

/// How a reference renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefMode {
    Link,
    Embed,
}

/// Text formatting mark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mark {
    Strong,
    Em,
    Code,
    Strike,
    Highlight,
    Underline,
}

/// An explicit reference node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefNode {
    pub mode: RefMode,
    pub target: RefTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// Top-level inline node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case", deny_unknown_fields)]
pub enum InlineNode {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        marks: Vec<Mark>,
    },
    HardBreak,
    Link {
        href: String,
        children: Vec<LinkChild>,
    },
    Ref(RefNode),
    Tag {
        value: String,
    },
    MathInline {
        latex: String,
    },
    FootnoteRef {
        key: String,
    },
}

/// Node allowed inside a link: everything except another link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case", deny_unknown_fields)]
pub enum LinkChild {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        marks: Vec<Mark>,
    },
    HardBreak,
    Ref(RefNode),
    Tag {
        value: String,
    },
    MathInline {
        latex: String,
    },
}

/// Visitor over the leaves of inline and block content
///
/// Every method defaults to a no-op so extractors only implement what they
/// care about.
pub trait InlineVisitor {
    fn visit_text(&mut self, _text: &str) {}
    fn visit_hard_break(&mut self) {}
    fn visit_ref(&mut self, _node: &RefNode) {}
    fn visit_tag(&mut self, _value: &str) {}
    fn visit_math(&mut self, _latex: &str) {}
    fn visit_footnote_ref(&mut self, _key: &str) {}
    /// Called before and after the children of a link
    fn enter_link(&mut self, _href: &str) {}
    fn exit_link(&mut self) {}
    /// Code of a code block
    fn visit_code(&mut self, _code: &str) {}
    /// Title of a callout
    fn visit_callout_title(&mut self, _title: &str) {}
    /// Boundary between two separately extracted regions (table cells)
    fn visit_separator(&mut self) {}
}

/// Walk a run of inline nodes in document order
pub fn walk_inline<V: InlineVisitor + ?Sized>(nodes: &[InlineNode], visitor: &mut V) {
    for node in nodes {
        match node {
            InlineNode::Text { text, .. } => visitor.visit_text(text),
            InlineNode::HardBreak => visitor.visit_hard_break(),
            InlineNode::Link { href, children } => {
                visitor.enter_link(href);
                for child in children {
                    walk_link_child(child, visitor);
                }
                visitor.exit_link();
            }
            InlineNode::Ref(node) => visitor.visit_ref(node),
            InlineNode::Tag { value } => visitor.visit_tag(value),
            InlineNode::MathInline { latex } => visitor.visit_math(latex),
            InlineNode::FootnoteRef { key } => visitor.visit_footnote_ref(key),
        }
    }
}

fn walk_link_child<V: InlineVisitor + ?Sized>(child: &LinkChild, visitor: &mut V) {
    match child {
        LinkChild::Text { text, .. } => visitor.visit_text(text),
        LinkChild::HardBreak => visitor.visit_hard_break(),
        LinkChild::Ref(node) => visitor.visit_ref(node),
        LinkChild::Tag { value } => visitor.visit_tag(value),
        LinkChild::MathInline { latex } => visitor.visit_math(latex),
    }
}

/// Semantic checks serde cannot express
pub(crate) fn validate_inline(nodes: &[InlineNode], block_type: &str) -> Result<()> {
    let mut checker = InlineChecker {
        block_type,
        error: None,
    };
    walk_inline(nodes, &mut checker);
    match checker.error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct InlineChecker<'a> {
    block_type: &'a str,
    error: Option<FolioError>,
}

impl InlineChecker<'_> {
    fn fail(&mut self, reason: impl Into<String>) {
        if self.error.is_none() {
            self.error = Some(FolioError::InvalidContent {
                block_type: self.block_type.to_string(),
                reason: reason.into(),
            });
        }
    }
}

impl InlineVisitor for InlineChecker<'_> {
    fn visit_ref(&mut self, node: &RefNode) {
        if node.target.object_id().trim().is_empty() {
            self.fail("ref target objectId must not be empty");
        }
        if matches!(node.target.block_id(), Some(id) if id.trim().is_empty()) {
            self.fail("ref target blockId must not be empty");
        }
    }

    fn visit_tag(&mut self, value: &str) {
        if value.is_empty() {
            self.fail("tag value must not be empty");
        } else if value.chars().any(char::is_whitespace) {
            self.fail(format!("tag value {:?} contains whitespace", value));
        }
    }

    fn visit_footnote_ref(&mut self, key: &str) {
        if key.trim().is_empty() {
            self.fail("footnote key must not be empty");
        }
    }

    fn enter_link(&mut self, href: &str) {
        if href.trim().is_empty() {
            self.fail("link href must not be empty");
        }
    }
}
