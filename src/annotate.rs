//! Code-block annotation around highlighting.
//!
//! Highlighting replaces a plain code block with a rich subtree and throws
//! the original text away, but the copy button on the page needs the exact
//! source. Three passes keep it:
//!
//! 1. [`pre_pass`]: every code block gets a sequential [`BlockId`]; its raw
//!    text goes into a [`RawCodeStash`] keyed by that id.
//! 2. [`highlight_code_blocks`]: each code block is replaced by the
//!    highlighter's subtree, whose root is tagged with a `data-block-id`
//!    marker. Non-element output is wrapped in a `div` to carry the marker.
//! 3. [`post_pass`]: each marker is removed and the stashed text is set as
//!    `data-raw-code` on the single `pre` inside the marked subtree.
//!
//! Every stash entry must be claimed exactly once. A marked subtree without
//! a `pre`, with several, or a stash entry nobody claimed, is an error rather
//! than a silently missing copy button.

use crate::highlight::Highlighter;
use crate::transform::TransformError;
use crate::tree::{BlockId, Element, Node, Walk};
use std::collections::BTreeMap;

/// Attribute linking a highlighted subtree back to its stash entry.
pub const BLOCK_MARKER: &str = "data-block-id";
/// Attribute carrying the verbatim source on the final `pre`.
pub const RAW_CODE_ATTR: &str = "data-raw-code";

/// Raw code of every block, keyed by block id.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RawCodeStash {
    entries: BTreeMap<BlockId, String>,
}

impl RawCodeStash {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: BlockId) -> Option<&str> {
        self.entries.get(&id).map(String::as_str)
    }

    fn insert(&mut self, id: BlockId, code: String) {
        self.entries.insert(id, code);
    }

    fn take(&mut self, id: BlockId) -> Option<String> {
        self.entries.remove(&id)
    }

    fn first_unclaimed(&self) -> Option<BlockId> {
        self.entries.keys().next().copied()
    }
}

/// Number every code block and stash its raw text.
pub fn pre_pass(tree: &mut Node) -> RawCodeStash {
    let mut stash = RawCodeStash::default();
    let mut next = 0u32;
    let _ = tree.walk_mut(&mut |node: &mut Node| -> Result<Walk, std::convert::Infallible> {
        if let Node::CodeBlock(block) = node {
            let id = BlockId(next);
            next += 1;
            block.block_id = Some(id);
            stash.insert(id, block.code.clone());
            return Ok(Walk::SkipChildren);
        }
        Ok(Walk::Continue)
    });
    stash
}

/// Replace every numbered code block with its highlighted, marked subtree.
pub fn highlight_code_blocks(
    tree: &mut Node,
    highlighter: &dyn Highlighter,
) -> Result<(), TransformError> {
    tree.walk_mut(&mut |node: &mut Node| -> Result<Walk, TransformError> {
        let Node::CodeBlock(block) = node else {
            return Ok(Walk::Continue);
        };
        let id = block.block_id.ok_or(TransformError::UnnumberedCodeBlock)?;
        let highlighted = highlighter
            .highlight(block)
            .map_err(|source| TransformError::Highlight {
                block: id,
                language: block.language.clone().unwrap_or_else(|| "plaintext".into()),
                source,
            })?;
        let mut root = match highlighted {
            Node::Element(element) => element,
            other => Element::new("div").with_children(vec![other]),
        };
        root.properties.insert(BLOCK_MARKER.into(), id.to_string());
        *node = root.into();
        Ok(Walk::SkipChildren)
    })
}

/// Move stashed raw text onto the `pre` of each marked subtree.
pub fn post_pass(tree: &mut Node, stash: &mut RawCodeStash) -> Result<(), TransformError> {
    tree.walk_mut(&mut |node: &mut Node| -> Result<Walk, TransformError> {
        let Node::Element(element) = node else {
            return Ok(Walk::Continue);
        };
        let Some(marker) = element.properties.remove(BLOCK_MARKER) else {
            return Ok(Walk::Continue);
        };
        let id = marker
            .parse::<u32>()
            .map(BlockId)
            .map_err(|_| TransformError::InvalidBlockMarker(marker.clone()))?;

        let pres = node.count_elements(&is_pre);
        if pres == 0 {
            return Err(TransformError::LostCodeBlock(id));
        }
        if pres > 1 {
            return Err(TransformError::AmbiguousCodeBlock {
                block: id,
                count: pres,
            });
        }
        let raw = stash.take(id).ok_or(TransformError::LostCodeBlock(id))?;
        if let Some(pre) = node.find_element_mut(&is_pre) {
            pre.properties.insert(RAW_CODE_ATTR.into(), raw);
        }
        unwrap_bare_wrapper(node);
        Ok(Walk::SkipChildren)
    })?;

    match stash.first_unclaimed() {
        Some(id) => Err(TransformError::LostCodeBlock(id)),
        None => Ok(()),
    }
}

/// Highlight every code block in `tree`, keeping raw text on each `pre`.
pub fn annotate_code_blocks(
    tree: &mut Node,
    highlighter: &dyn Highlighter,
) -> Result<(), TransformError> {
    let mut stash = pre_pass(tree);
    highlight_code_blocks(tree, highlighter)?;
    post_pass(tree, &mut stash)
}

fn is_pre(element: &Element) -> bool {
    element.tag == "pre"
}

/// A `div` added only to carry the marker dissolves into its children.
fn unwrap_bare_wrapper(node: &mut Node) {
    if let Node::Element(element) = node
        && element.tag == "div"
        && element.properties.is_empty()
    {
        let children = std::mem::take(&mut element.children);
        *node = Node::Root(children);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::backend::tests::{MockHighlighter, MockShape};
    use crate::tree::{CodeBlock, parse_markdown};
    use proptest::prelude::*;

    fn raw_codes(tree: &Node) -> Vec<String> {
        fn collect(node: &Node, out: &mut Vec<String>) {
            if let Node::Element(e) = node
                && let Some(raw) = e.property(RAW_CODE_ATTR)
            {
                out.push(raw.to_string());
            }
            node.children().iter().for_each(|c| collect(c, out));
        }
        let mut out = Vec::new();
        collect(tree, &mut out);
        out
    }

    const TWO_BLOCKS: &str = "Intro\n\n```rust\nfn main() {\n    println!(\"hi\");\n}\n```\n\ntext\n\n```\n  indented  \n\n```\n";

    #[test]
    fn pre_pass_numbers_blocks_in_order() {
        let mut tree = parse_markdown(TWO_BLOCKS);
        let stash = pre_pass(&mut tree);
        assert_eq!(stash.len(), 2);
        assert_eq!(
            stash.get(BlockId(0)),
            Some("fn main() {\n    println!(\"hi\");\n}\n")
        );
        assert_eq!(stash.get(BlockId(1)), Some("  indented  \n\n"));
    }

    #[test]
    fn raw_text_lands_on_pre_verbatim() {
        let mut tree = parse_markdown(TWO_BLOCKS);
        let highlighter = MockHighlighter::new();
        annotate_code_blocks(&mut tree, &highlighter).unwrap();

        assert_eq!(
            raw_codes(&tree),
            vec![
                "fn main() {\n    println!(\"hi\");\n}\n".to_string(),
                "  indented  \n\n".to_string()
            ]
        );
        assert_eq!(highlighter.get_calls(), vec![Some("rust".to_string()), None]);
        assert!(!tree.to_html().contains(BLOCK_MARKER));
    }

    #[test]
    fn raw_attribute_is_on_pre_not_figure() {
        let mut tree = parse_markdown("```js\nlet a = 1;\n```\n");
        annotate_code_blocks(&mut tree, &MockHighlighter::new()).unwrap();
        let html = tree.to_html();
        assert!(html.starts_with("<figure data-code-figure=\"\"><pre data-raw-code=\"let a = 1;\n\">"));
    }

    #[test]
    fn bare_pre_output_is_supported() {
        let mut tree = parse_markdown("```js\nx\n```\n");
        annotate_code_blocks(&mut tree, &MockHighlighter::with_shape(MockShape::BarePre)).unwrap();
        assert_eq!(tree.to_html(), "<pre data-raw-code=\"x\n\"><code>HL[x]</code></pre>");
    }

    #[test]
    fn text_output_loses_the_block() {
        let mut tree = parse_markdown("```js\nx\n```\n");
        let err = annotate_code_blocks(&mut tree, &MockHighlighter::with_shape(MockShape::Text))
            .unwrap_err();
        assert!(matches!(err, TransformError::LostCodeBlock(BlockId(0))));
    }

    #[test]
    fn missing_pre_is_lost_block() {
        let mut tree = parse_markdown("```js\nx\n```\n");
        let err = annotate_code_blocks(&mut tree, &MockHighlighter::with_shape(MockShape::NoPre))
            .unwrap_err();
        assert!(matches!(err, TransformError::LostCodeBlock(BlockId(0))));
    }

    #[test]
    fn two_pres_is_ambiguous() {
        let mut tree = parse_markdown("```js\nx\n```\n");
        let err =
            annotate_code_blocks(&mut tree, &MockHighlighter::with_shape(MockShape::TwoPres))
                .unwrap_err();
        assert!(matches!(
            err,
            TransformError::AmbiguousCodeBlock {
                block: BlockId(0),
                count: 2
            }
        ));
    }

    #[test]
    fn unclaimed_stash_entry_is_lost_block() {
        let mut tree = parse_markdown("```js\nx\n```\n");
        let mut stash = pre_pass(&mut tree);
        // Highlighting never ran, so nothing claims block 0.
        let err = post_pass(&mut tree, &mut stash).unwrap_err();
        assert!(matches!(err, TransformError::LostCodeBlock(BlockId(0))));
    }

    #[test]
    fn highlight_failure_names_language() {
        let mut tree = parse_markdown("```cobol\nDISPLAY 'HI'.\n```\n");
        let err = annotate_code_blocks(&mut tree, &MockHighlighter::failing_on("cobol"))
            .unwrap_err();
        assert!(matches!(&err, TransformError::Highlight { language, .. } if language == "cobol"));
    }

    #[test]
    fn code_inside_list_items_is_annotated() {
        let mut tree = parse_markdown("- item\n\n  ```sh\n  ls -la\n  ```\n");
        annotate_code_blocks(&mut tree, &MockHighlighter::new()).unwrap();
        assert_eq!(raw_codes(&tree), vec!["ls -la\n".to_string()]);
    }

    #[test]
    fn no_code_blocks_is_a_no_op() {
        let mut tree = parse_markdown("# Title\n\nJust text.\n");
        let before = tree.clone();
        annotate_code_blocks(&mut tree, &MockHighlighter::new()).unwrap();
        assert_eq!(tree, before);
    }

    fn code_strategy() -> impl Strategy<Value = String> {
        let piece = prop_oneof![
            Just("\r\n".to_string()),
            Just("\n".to_string()),
            Just("\t".to_string()),
            Just("```".to_string()),
            Just("<&\">".to_string()),
            Just("data-block-id=\"0\"".to_string()),
            "[ -~]{0,12}",
            any::<String>(),
        ];
        (prop::collection::vec(piece, 0..12), 0usize..4)
            .prop_map(|(pieces, blank_lines)| pieces.concat() + &"\n".repeat(blank_lines))
    }

    fn document(codes: &[(Option<String>, String)]) -> Node {
        let mut children = vec![Element::new("p").with_children(vec![Node::text("intro")]).into()];
        for (language, code) in codes {
            children.push(Node::CodeBlock(CodeBlock {
                language: language.clone(),
                code: code.clone(),
                ..CodeBlock::default()
            }));
            children.push(Element::new("p").with_children(vec![Node::text("between")]).into());
        }
        Node::Root(children)
    }

    proptest! {
        #[test]
        fn every_block_keeps_its_raw_text_once(
            codes in prop::collection::vec(
                (prop::option::of("[a-z]{1,8}"), code_strategy()),
                0..6,
            ),
            bare in any::<bool>(),
        ) {
            let shape = if bare { MockShape::BarePre } else { MockShape::Figure };
            let mut tree = document(&codes);
            annotate_code_blocks(&mut tree, &MockHighlighter::with_shape(shape)).unwrap();

            let expected: Vec<String> = codes.iter().map(|(_, code)| code.clone()).collect();
            prop_assert_eq!(raw_codes(&tree), expected);
            prop_assert_eq!(tree.count_elements(&|e: &Element| e.properties.contains_key(BLOCK_MARKER)), 0);
        }
    }
}
