//! Table-of-contents construction.
//!
//! The outline is built from the flat heading list with an explicit stack of
//! indices into an arena of nodes. The stack starts with a synthetic root
//! that is never popped; for every heading:
//!
//! 1. pop while the top of the stack is at the same depth or deeper
//! 2. attach the heading as the last child of the top
//! 3. push the heading
//!
//! so a heading always nests under the nearest preceding heading with a
//! strictly smaller depth. Skipped levels are tolerated (`#` then `###` nests
//! the `###` directly under the `#`), and document order is never changed.
//!
//! ```text
//! [(1, Intro), (3, Setup), (2, Usage), (2, Usage)]
//!
//! root
//! └── Intro        #intro
//!     ├── Setup    #setup
//!     ├── Usage    #usage
//!     └── Usage    #usage-1
//! ```
//!
//! The result is stored on each post as a JSON string ([`TocNode::to_json`])
//! and rendered by the presentation layer; [`render_outline`] produces the
//! same nested-list markup for the CLI preview. Every node carries a `type`
//! of `"root"` or `"heading"`:
//!
//! ```json
//! {"type":"root","children":[{"type":"heading","depth":1,"title":"Intro","id":"intro","children":[]}]}
//! ```

use crate::headings::extract_headings;
use crate::slug::Slugger;
use crate::tree::Node;
use maud::{Markup, html};
use serde::{Deserialize, Serialize};

/// One heading ready to be placed in the outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub depth: u8,
    pub title: String,
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TocNodeKind {
    #[default]
    Root,
    Heading,
}

/// Node of the outline tree. The root has no depth, title or id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TocNode {
    #[serde(rename = "type", default)]
    pub kind: TocNodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub children: Vec<TocNode>,
}

impl TocNode {
    /// Whether the outline has anything to show.
    pub fn has_toc(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Number of headings in the outline (the root is not counted).
    pub fn len(&self) -> usize {
        self.children.iter().map(|c| 1 + c.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

struct Slot {
    depth: Option<u8>,
    title: Option<String>,
    id: Option<String>,
    children: Vec<usize>,
}

/// Build the outline tree for `entries`, in order.
pub fn build_toc(entries: &[TocEntry]) -> TocNode {
    let mut arena = vec![Slot {
        depth: None,
        title: None,
        id: None,
        children: Vec::new(),
    }];
    let mut stack: Vec<usize> = vec![0];

    for entry in entries {
        // The root (depth None) sits at the bottom and compares below every depth.
        while let Some(&top) = stack.last() {
            match arena[top].depth {
                Some(depth) if depth >= entry.depth => {
                    stack.pop();
                }
                _ => break,
            }
        }
        let index = arena.len();
        arena.push(Slot {
            depth: Some(entry.depth),
            title: Some(entry.title.clone()),
            id: Some(entry.id.clone()),
            children: Vec::new(),
        });
        let parent = stack.last().copied().unwrap_or(0);
        arena[parent].children.push(index);
        stack.push(index);
    }

    materialize(&mut arena, 0)
}

fn materialize(arena: &mut [Slot], index: usize) -> TocNode {
    let children = std::mem::take(&mut arena[index].children);
    let children = children.into_iter().map(|c| materialize(arena, c)).collect();
    let slot = &mut arena[index];
    TocNode {
        kind: if slot.depth.is_some() {
            TocNodeKind::Heading
        } else {
            TocNodeKind::Root
        },
        depth: slot.depth,
        title: slot.title.take(),
        id: slot.id.take(),
        children,
    }
}

/// Outline of a parsed document: headings are extracted, given ids by a
/// fresh slugger, then nested.
pub fn toc_for_tree(tree: &Node) -> TocNode {
    let mut slugger = Slugger::new();
    let entries: Vec<TocEntry> = extract_headings(tree)
        .into_iter()
        .map(|heading| TocEntry {
            depth: heading.depth,
            id: slugger.slug(&heading.text),
            title: heading.text,
        })
        .collect();
    build_toc(&entries)
}

/// Nested `<ul>` outline linking to each heading, or `None` when empty.
pub fn render_outline(toc: &TocNode) -> Option<Markup> {
    if !toc.has_toc() {
        return None;
    }
    Some(outline_list(&toc.children))
}

fn outline_list(nodes: &[TocNode]) -> Markup {
    html! {
        ul {
            @for node in nodes {
                li {
                    a href={ "#" (node.id.as_deref().unwrap_or_default()) } {
                        (node.title.as_deref().unwrap_or_default())
                    }
                    @if !node.children.is_empty() {
                        (outline_list(&node.children))
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::parse_markdown;
    use proptest::prelude::*;

    fn entry(depth: u8, title: &str, id: &str) -> TocEntry {
        TocEntry {
            depth,
            title: title.to_string(),
            id: id.to_string(),
        }
    }

    fn titles(nodes: &[TocNode]) -> Vec<&str> {
        nodes.iter().filter_map(|n| n.title.as_deref()).collect()
    }

    #[test]
    fn empty_input_gives_empty_root() {
        let toc = build_toc(&[]);
        assert_eq!(toc, TocNode::default());
        assert!(!toc.has_toc());
        assert_eq!(toc.len(), 0);
    }

    #[test]
    fn skipped_level_nests_under_nearest_shallower() {
        let doc = parse_markdown("# Intro\n\n### Setup\n\n## Usage\n\n## Usage\n");
        let toc = toc_for_tree(&doc);

        assert_eq!(toc.children.len(), 1);
        let intro = &toc.children[0];
        assert_eq!(intro.title.as_deref(), Some("Intro"));
        assert_eq!(intro.id.as_deref(), Some("intro"));
        assert_eq!(intro.depth, Some(1));

        let ids: Vec<_> = intro.children.iter().map(|c| c.id.as_deref()).collect();
        assert_eq!(ids, vec![Some("setup"), Some("usage"), Some("usage-1")]);
        assert!(intro.children.iter().all(|c| c.children.is_empty()));
    }

    #[test]
    fn shallower_heading_closes_deeper_branch() {
        let toc = build_toc(&[
            entry(2, "A", "a"),
            entry(3, "A.1", "a1"),
            entry(4, "A.1.a", "a1a"),
            entry(2, "B", "b"),
            entry(3, "B.1", "b1"),
        ]);
        assert_eq!(titles(&toc.children), vec!["A", "B"]);
        assert_eq!(titles(&toc.children[0].children), vec!["A.1"]);
        assert_eq!(titles(&toc.children[0].children[0].children), vec!["A.1.a"]);
        assert_eq!(titles(&toc.children[1].children), vec!["B.1"]);
        assert_eq!(toc.len(), 5);
    }

    #[test]
    fn deeper_first_heading_then_shallower_become_siblings_at_root() {
        let toc = build_toc(&[entry(3, "Deep", "deep"), entry(1, "Top", "top")]);
        assert_eq!(titles(&toc.children), vec!["Deep", "Top"]);
    }

    #[test]
    fn json_round_trip() {
        let doc = parse_markdown("# A\n\n## B\n\n### C\n\n## D\n");
        let toc = toc_for_tree(&doc);
        let json = toc.to_json().unwrap();
        assert_eq!(TocNode::from_json(&json).unwrap(), toc);
    }

    #[test]
    fn empty_json_is_bare_root() {
        assert_eq!(build_toc(&[]).to_json().unwrap(), r#"{"type":"root","children":[]}"#);
    }

    #[test]
    fn json_tags_root_and_headings() {
        let toc = build_toc(&[entry(1, "Intro", "intro")]);
        assert_eq!(
            toc.to_json().unwrap(),
            r#"{"type":"root","children":[{"type":"heading","depth":1,"title":"Intro","id":"intro","children":[]}]}"#
        );
        assert_eq!(toc.children[0].kind, TocNodeKind::Heading);
    }

    #[test]
    fn json_without_type_reads_as_root() {
        let toc = TocNode::from_json(r#"{"children":[]}"#).unwrap();
        assert_eq!(toc, TocNode::default());
    }

    #[test]
    fn render_outline_links_headings() {
        let toc = build_toc(&[entry(2, "Setup & Run", "setup--run"), entry(3, "Linux", "linux")]);
        let html = render_outline(&toc).unwrap().into_string();
        assert_eq!(
            html,
            "<ul><li><a href=\"#setup--run\">Setup &amp; Run</a><ul><li><a href=\"#linux\">Linux</a></li></ul></li></ul>"
        );
    }

    #[test]
    fn render_outline_none_when_empty() {
        assert!(render_outline(&TocNode::default()).is_none());
    }

    fn check_nesting(node: &TocNode, floor: Option<u8>) -> bool {
        node.children.iter().all(|child| {
            let deeper = match (floor, child.depth) {
                (Some(parent), Some(depth)) => depth > parent,
                (None, Some(_)) => true,
                _ => false,
            };
            deeper && check_nesting(child, child.depth)
        })
    }

    fn flatten<'a>(node: &'a TocNode, out: &mut Vec<&'a str>) {
        for child in &node.children {
            out.push(child.id.as_deref().unwrap_or_default());
            flatten(child, out);
        }
    }

    fn title_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            any::<String>(),
            r#"[a-z "\\\n\t<>&']{0,24}"#,
            prop::collection::vec(prop_oneof![Just('"'), Just('\\'), Just('\u{0}'), any::<char>()], 0..16)
                .prop_map(|chars| chars.into_iter().collect()),
        ]
    }

    proptest! {
        #[test]
        fn json_round_trips_any_outline(
            headings in prop::collection::vec((1u8..=6, title_strategy()), 0..30)
        ) {
            let mut slugger = Slugger::new();
            let entries: Vec<TocEntry> = headings
                .iter()
                .map(|(depth, title)| TocEntry {
                    depth: *depth,
                    id: slugger.slug(title),
                    title: title.clone(),
                })
                .collect();
            let toc = build_toc(&entries);
            let json = toc.to_json().unwrap();
            prop_assert_eq!(TocNode::from_json(&json).unwrap(), toc);
        }

        #[test]
        fn children_are_strictly_deeper(depths in prop::collection::vec(1u8..=6, 0..40)) {
            let entries: Vec<TocEntry> = depths
                .iter()
                .enumerate()
                .map(|(i, d)| entry(*d, &format!("h{i}"), &format!("h{i}")))
                .collect();
            let toc = build_toc(&entries);
            prop_assert!(check_nesting(&toc, None));
        }

        #[test]
        fn pre_order_matches_document_order(depths in prop::collection::vec(1u8..=6, 0..40)) {
            let entries: Vec<TocEntry> = depths
                .iter()
                .enumerate()
                .map(|(i, d)| entry(*d, &format!("h{i}"), &format!("h{i}")))
                .collect();
            let toc = build_toc(&entries);
            let mut order = Vec::new();
            flatten(&toc, &mut order);
            let expected: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
            prop_assert_eq!(order, expected);
        }
    }
}
