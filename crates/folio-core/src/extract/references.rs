use crate::model::{BlockContent, InlineVisitor, RefNode, RefTarget};

#[derive(Default)]
struct RefCollector {
    targets: Vec<RefTarget>,
}

impl InlineVisitor for RefCollector {
    fn visit_ref(&mut self, node: &RefNode) {
        self.targets.push(node.target.clone());
    }
}

/// Every reference target in the block, in document order
///
/// Repeated mentions of the same target are kept: each one becomes its own
/// ref row.
pub fn extract_references(content: &BlockContent) -> Vec<RefTarget> {
    let mut collector = RefCollector::default();
    content.accept(&mut collector);
    collector.targets
}
