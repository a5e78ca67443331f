use crate::model::{BlockContent, InlineVisitor, RefNode};

#[derive(Default)]
struct TextCollector {
    out: String,
}

impl TextCollector {
    fn push_word(&mut self, word: &str) {
        self.out.push(' ');
        self.out.push_str(word);
        self.out.push(' ');
    }
}

impl InlineVisitor for TextCollector {
    fn visit_text(&mut self, text: &str) {
        // Adjacent runs join directly: "Road" + "map" reads as "Roadmap".
        self.out.push_str(text);
    }

    fn visit_hard_break(&mut self) {
        self.out.push(' ');
    }

    fn visit_ref(&mut self, node: &RefNode) {
        if let Some(alias) = &node.alias {
            self.push_word(alias);
        }
    }

    fn visit_tag(&mut self, value: &str) {
        self.push_word(value);
    }

    fn visit_code(&mut self, code: &str) {
        self.out.push_str(code);
    }

    fn visit_callout_title(&mut self, title: &str) {
        self.out.push_str(title);
    }

    fn visit_separator(&mut self) {
        self.out.push(' ');
    }
}

/// Searchable text of a block
///
/// Math, thematic breaks and container blocks contribute nothing. Whitespace
/// runs collapse to one space and the result is trimmed.
pub fn extract_plain_text(content: &BlockContent) -> String {
    let mut collector = TextCollector::default();
    content.accept(&mut collector);
    collector
        .out
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
