//! Heading ids and self-link anchors for the rendered body.
//!
//! Every heading without an explicit id gets one from a per-document
//! [`Slugger`], in document order, so ids match the ones the TOC computes
//! from the same capitalized text. Each heading then gets a hidden anchor
//! prepended that links to itself:
//!
//! ```html
//! <h2 id="usage"><a aria-hidden="true" href="#usage" tabindex="-1"><span class="icon icon-link"></span></a>Usage</h2>
//! ```

use crate::slug::Slugger;
use crate::tree::{Element, Node, Walk};
use std::convert::Infallible;

/// Assign slug ids to headings that lack one.
pub fn assign_heading_ids(tree: &mut Node, slugger: &mut Slugger) {
    let _ = tree.walk_mut(&mut |node: &mut Node| -> Result<Walk, Infallible> {
        if let Node::Heading(heading) = node {
            if heading.id.is_none() {
                let text: String = heading.children.iter().map(Node::text_content).collect();
                heading.id = Some(slugger.slug(&text));
            }
            return Ok(Walk::SkipChildren);
        }
        Ok(Walk::Continue)
    });
}

/// Prepend a self-link to every heading that has an id.
pub fn autolink_headings(tree: &mut Node) {
    let _ = tree.walk_mut(&mut |node: &mut Node| -> Result<Walk, Infallible> {
        if let Node::Heading(heading) = node {
            if let Some(id) = &heading.id {
                heading.children.insert(0, anchor(id));
            }
            return Ok(Walk::SkipChildren);
        }
        Ok(Walk::Continue)
    });
}

fn anchor(id: &str) -> Node {
    Element::new("a")
        .with_property("aria-hidden", "true")
        .with_property("tabindex", "-1")
        .with_property("href", format!("#{id}"))
        .with_children(vec![
            Element::new("span")
                .with_property("class", "icon icon-link")
                .into(),
        ])
        .into()
}
