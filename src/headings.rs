//! Heading extraction.
//!
//! Produces every heading of a document in order, with its depth and its
//! plain text: all descendant text concatenated left to right, inline
//! formatting dropped (`## The *real* \`main\`` → `The real main`).

use crate::tree::{Heading, Node, Visitor, Walk};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingRecord {
    pub depth: u8,
    pub text: String,
}

#[derive(Default)]
struct HeadingCollector {
    headings: Vec<HeadingRecord>,
}

impl Visitor for HeadingCollector {
    fn visit_heading(&mut self, heading: &Heading) -> Walk {
        let text: String = heading.children.iter().map(Node::text_content).collect();
        self.headings.push(HeadingRecord {
            depth: heading.depth,
            text,
        });
        Walk::SkipChildren
    }
}

pub fn extract_headings(tree: &Node) -> Vec<HeadingRecord> {
    let mut collector = HeadingCollector::default();
    tree.walk(&mut collector);
    collector.headings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::parse_markdown;

    fn records(source: &str) -> Vec<(u8, String)> {
        extract_headings(&parse_markdown(source))
            .into_iter()
            .map(|h| (h.depth, h.text))
            .collect()
    }

    #[test]
    fn empty_document_has_no_headings() {
        assert!(records("").is_empty());
        assert!(records("Just a paragraph.\n\n- and a list\n").is_empty());
    }

    #[test]
    fn headings_in_document_order() {
        let found = records("# Intro\n\ntext\n\n### Setup\n\n## Usage\n");
        assert_eq!(
            found,
            vec![
                (1, "Intro".to_string()),
                (3, "Setup".to_string()),
                (2, "Usage".to_string()),
            ]
        );
    }

    #[test]
    fn formatting_is_discarded() {
        let found = records("## The *real* `main` **function**\n");
        assert_eq!(found, vec![(2, "The real main function".to_string())]);
    }

    #[test]
    fn link_text_is_kept() {
        let found = records("## See [the docs](https://example.com)\n");
        assert_eq!(found, vec![(2, "See the docs".to_string())]);
    }

    #[test]
    fn setext_headings_are_found() {
        let found = records("Title\n=====\n\nSub\n---\n");
        assert_eq!(found, vec![(1, "Title".to_string()), (2, "Sub".to_string())]);
    }

    #[test]
    fn hash_lines_inside_code_are_not_headings() {
        let found = records("```sh\n# not a heading\n```\n\n# Real\n");
        assert_eq!(found, vec![(1, "Real".to_string())]);
    }
}
