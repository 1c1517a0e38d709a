//! Typed document tree built from Markdown/MDX source.
//!
//! Every stage of the transform pipeline operates on this tree instead of on
//! raw parser events. The node set is closed:
//!
//! | Variant | Meaning |
//! |---------|---------|
//! | [`Node::Root`] | Document (or fragment) root |
//! | [`Node::Element`] | Generic element: tag name, properties, children |
//! | [`Node::Text`] | Literal text |
//! | [`Node::Heading`] | `#`–`######` heading with its depth and optional anchor id |
//! | [`Node::CodeBlock`] | Fenced or indented code block, raw text untouched |
//! | [`Node::Other`] | Raw HTML / MDX JSX, serialized verbatim |
//!
//! Read-only traversal goes through the [`Visitor`] trait (one method per
//! variant, dispatched with `match` in [`Node::walk`]). In-place rewriting goes
//! through [`Node::walk_mut`], which hands each node to a closure that may
//! replace it.
//!
//! ## Parsing
//!
//! [`parse_markdown`] drives `pulldown-cmark` with the GFM extensions the site
//! uses (tables, footnotes, strikethrough, task lists) and folds the event
//! stream into a tree with an explicit frame stack.
//!
//! ## Serialization
//!
//! [`Node::to_html`] renders the tree. Text and property values are escaped
//! with maud's escaper; [`Node::Other`] is emitted as-is.

use maud::Escaper;
use pulldown_cmark::{Alignment, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

/// Stable identifier assigned to a code block before highlighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockId(pub u32);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Root(Vec<Node>),
    Element(Element),
    Text(String),
    Heading(Heading),
    CodeBlock(CodeBlock),
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub tag: String,
    pub properties: BTreeMap<String, String>,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Heading {
    /// 1 for `#`, up to 6 for `######`.
    pub depth: u8,
    pub id: Option<String>,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CodeBlock {
    /// First word of the fence info string (`rust` in ```` ```rust title="x" ````).
    pub language: Option<String>,
    /// Remainder of the info string after the language.
    pub meta: Option<String>,
    /// Raw code, exactly as written between the fences.
    pub code: String,
    pub block_id: Option<BlockId>,
}

/// Traversal control returned by visitor callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Continue,
    SkipChildren,
}

/// Read-only visitor over a [`Node`] tree.
///
/// Every method has a no-op default so implementors override only the
/// variants they care about. Container callbacks return a [`Walk`] to decide
/// whether the walker descends.
pub trait Visitor {
    fn visit_root(&mut self, _children: &[Node]) -> Walk {
        Walk::Continue
    }

    fn visit_element(&mut self, _element: &Element) -> Walk {
        Walk::Continue
    }

    fn visit_text(&mut self, _text: &str) {}

    fn visit_heading(&mut self, _heading: &Heading) -> Walk {
        Walk::Continue
    }

    fn visit_code_block(&mut self, _block: &CodeBlock) {}

    fn visit_other(&mut self, _raw: &str) {}
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            properties: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl Node {
    pub fn text(value: impl Into<String>) -> Self {
        Node::Text(value.into())
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Root(children) => children,
            Node::Element(element) => &element.children,
            Node::Heading(heading) => &heading.children,
            Node::Text(_) | Node::CodeBlock(_) | Node::Other(_) => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Root(children) => Some(children),
            Node::Element(element) => Some(&mut element.children),
            Node::Heading(heading) => Some(&mut heading.children),
            Node::Text(_) | Node::CodeBlock(_) | Node::Other(_) => None,
        }
    }

    /// Walk the tree depth-first, in document order.
    pub fn walk<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        let descend = match self {
            Node::Root(children) => visitor.visit_root(children),
            Node::Element(element) => visitor.visit_element(element),
            Node::Heading(heading) => visitor.visit_heading(heading),
            Node::Text(text) => {
                visitor.visit_text(text);
                Walk::SkipChildren
            }
            Node::CodeBlock(block) => {
                visitor.visit_code_block(block);
                Walk::SkipChildren
            }
            Node::Other(raw) => {
                visitor.visit_other(raw);
                Walk::SkipChildren
            }
        };
        if descend == Walk::Continue {
            for child in self.children() {
                child.walk(visitor);
            }
        }
    }

    /// Pre-order mutable walk.
    ///
    /// The callback sees each node before its children and may replace it
    /// wholesale; the walker then descends into whatever the node is *after*
    /// the callback returns, unless told to skip.
    pub fn walk_mut<F, E>(&mut self, f: &mut F) -> Result<(), E>
    where
        F: FnMut(&mut Node) -> Result<Walk, E>,
    {
        if f(self)? == Walk::SkipChildren {
            return Ok(());
        }
        if let Some(children) = self.children_mut() {
            for child in children.iter_mut() {
                child.walk_mut(f)?;
            }
        }
        Ok(())
    }

    /// Concatenated text of all descendants, markup discarded.
    pub fn text_content(&self) -> String {
        struct Collect(String);
        impl Visitor for Collect {
            fn visit_text(&mut self, text: &str) {
                self.0.push_str(text);
            }
            fn visit_code_block(&mut self, block: &CodeBlock) {
                self.0.push_str(&block.code);
            }
        }
        let mut collect = Collect(String::new());
        self.walk(&mut collect);
        collect.0
    }

    /// Number of elements in this subtree (including `self`) matching `pred`.
    pub fn count_elements(&self, pred: &dyn Fn(&Element) -> bool) -> usize {
        let own = matches!(self, Node::Element(e) if pred(e)) as usize;
        own + self
            .children()
            .iter()
            .map(|c| c.count_elements(pred))
            .sum::<usize>()
    }

    /// First element in this subtree (pre-order, including `self`) matching `pred`.
    pub fn find_element_mut(&mut self, pred: &dyn Fn(&Element) -> bool) -> Option<&mut Element> {
        if matches!(self, Node::Element(e) if pred(e)) {
            return match self {
                Node::Element(e) => Some(e),
                _ => None,
            };
        }
        self.children_mut()?
            .iter_mut()
            .find_map(|child| child.find_element_mut(pred))
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        write_html(self, &mut out);
        out
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Markdown extensions enabled for every document.
pub fn parser_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
}

/// Parse Markdown/MDX source into a [`Node::Root`].
///
/// JSX and raw HTML are carried through as [`Node::Other`]. Parsing never
/// fails; pulldown-cmark recovers from any input.
pub fn parse_markdown(source: &str) -> Node {
    TreeBuilder::default().build(Parser::new_ext(source, parser_options()))
}

#[derive(Default)]
struct TreeBuilder {
    stack: Vec<Node>,
    alignments: Vec<Alignment>,
    cell_index: usize,
    in_table_head: bool,
}

impl TreeBuilder {
    fn build<'a>(mut self, events: impl Iterator<Item = Event<'a>>) -> Node {
        self.stack.push(Node::Root(Vec::new()));
        for event in events {
            self.event(event);
        }
        // Unbalanced input cannot happen with pulldown-cmark, but never lose content.
        while self.stack.len() > 1 {
            self.close();
        }
        self.stack.pop().unwrap_or(Node::Root(Vec::new()))
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.open(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.push(
                Element::new("code")
                    .with_children(vec![Node::text(code.to_string())])
                    .into(),
            ),
            Event::InlineMath(math) => self.push(
                Element::new("code")
                    .with_property("class", "math-inline")
                    .with_children(vec![Node::text(math.to_string())])
                    .into(),
            ),
            Event::DisplayMath(math) => self.push(
                Element::new("code")
                    .with_property("class", "math-display")
                    .with_children(vec![Node::text(math.to_string())])
                    .into(),
            ),
            Event::Html(raw) | Event::InlineHtml(raw) => self.push(Node::Other(raw.to_string())),
            Event::FootnoteReference(label) => self.push(
                Element::new("sup")
                    .with_property("class", "footnote-ref")
                    .with_children(vec![
                        Element::new("a")
                            .with_property("href", format!("#fn-{label}"))
                            .with_children(vec![Node::text(label.to_string())])
                            .into(),
                    ])
                    .into(),
            ),
            Event::SoftBreak => self.text("\n"),
            Event::HardBreak => self.push(Element::new("br").into()),
            Event::Rule => self.push(Element::new("hr").into()),
            Event::TaskListMarker(checked) => {
                let mut input = Element::new("input")
                    .with_property("type", "checkbox")
                    .with_property("disabled", "");
                if checked {
                    input.properties.insert("checked".into(), String::new());
                }
                self.push(input.into());
            }
            #[allow(unreachable_patterns)]
            _ => {}
        }
    }

    fn open(&mut self, tag: Tag<'_>) {
        let node = match tag {
            Tag::Paragraph => Element::new("p").into(),
            Tag::Heading { level, id, .. } => Node::Heading(Heading {
                depth: heading_depth(level),
                id: id.map(|i| i.to_string()),
                children: Vec::new(),
            }),
            Tag::BlockQuote(kind) => {
                let mut quote = Element::new("blockquote");
                if let Some(kind) = kind {
                    quote
                        .properties
                        .insert("data-callout".into(), format!("{kind:?}").to_lowercase());
                }
                quote.into()
            }
            Tag::CodeBlock(kind) => {
                let (language, meta) = match kind {
                    CodeBlockKind::Fenced(info) => split_info_string(&info),
                    CodeBlockKind::Indented => (None, None),
                };
                Node::CodeBlock(CodeBlock {
                    language,
                    meta,
                    ..CodeBlock::default()
                })
            }
            // Transparent frame: raw HTML events inside are hoisted into the parent.
            Tag::HtmlBlock => Node::Root(Vec::new()),
            Tag::List(Some(start)) => {
                let mut list = Element::new("ol");
                if start != 1 {
                    list.properties.insert("start".into(), start.to_string());
                }
                list.into()
            }
            Tag::List(None) => Element::new("ul").into(),
            Tag::Item => Element::new("li").into(),
            Tag::FootnoteDefinition(label) => Element::new("div")
                .with_property("class", "footnote-definition")
                .with_property("id", format!("fn-{label}"))
                .into(),
            Tag::DefinitionList => Element::new("dl").into(),
            Tag::DefinitionListTitle => Element::new("dt").into(),
            Tag::DefinitionListDefinition => Element::new("dd").into(),
            Tag::Table(alignments) => {
                self.alignments = alignments;
                Element::new("table").into()
            }
            Tag::TableHead => {
                self.in_table_head = true;
                self.cell_index = 0;
                // thead > tr; the row frame is closed together with the head.
                self.stack.push(Element::new("thead").into());
                Element::new("tr").into()
            }
            Tag::TableRow => {
                self.cell_index = 0;
                Element::new("tr").into()
            }
            Tag::TableCell => {
                let mut cell = Element::new(if self.in_table_head { "th" } else { "td" });
                if let Some(align) = self.alignments.get(self.cell_index).and_then(alignment_name) {
                    cell.properties.insert("align".into(), align.into());
                }
                self.cell_index += 1;
                cell.into()
            }
            Tag::Emphasis => Element::new("em").into(),
            Tag::Strong => Element::new("strong").into(),
            Tag::Strikethrough => Element::new("del").into(),
            Tag::Superscript => Element::new("sup").into(),
            Tag::Subscript => Element::new("sub").into(),
            Tag::Link {
                dest_url, title, ..
            } => {
                let mut link = Element::new("a").with_property("href", dest_url.to_string());
                if !title.is_empty() {
                    link.properties.insert("title".into(), title.to_string());
                }
                link.into()
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                let mut image = Element::new("img").with_property("src", dest_url.to_string());
                if !title.is_empty() {
                    image.properties.insert("title".into(), title.to_string());
                }
                image.into()
            }
            Tag::MetadataBlock(_) => Element::new("metadata").into(),
            #[allow(unreachable_patterns)]
            _ => Element::new("span").into(),
        };
        self.stack.push(node);
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::TableHead => {
                self.close();
                self.close();
                self.in_table_head = false;
            }
            TagEnd::Table => {
                self.close();
                self.alignments.clear();
            }
            TagEnd::HtmlBlock => {
                if let Some(Node::Root(children)) = self.stack.pop() {
                    for child in children {
                        self.push(child);
                    }
                }
            }
            TagEnd::Image => {
                if let Some(Node::Element(mut image)) = self.stack.pop() {
                    let alt = Node::Root(std::mem::take(&mut image.children)).text_content();
                    image.properties.insert("alt".into(), alt);
                    self.push(image.into());
                }
            }
            TagEnd::MetadataBlock(_) => {
                self.stack.pop();
            }
            _ => self.close(),
        }
    }

    fn close(&mut self) {
        if self.stack.len() > 1
            && let Some(node) = self.stack.pop()
        {
            self.push(node);
        }
    }

    fn text(&mut self, text: &str) {
        if let Some(Node::CodeBlock(block)) = self.stack.last_mut() {
            block.code.push_str(text);
            return;
        }
        // Merge adjacent text so headings like `Foo & Bar` are one node.
        if let Some(Node::Text(last)) = self.stack.last_mut().and_then(|top| {
            top.children_mut().and_then(|c| c.last_mut())
        }) {
            last.push_str(text);
            return;
        }
        self.push(Node::text(text));
    }

    fn push(&mut self, node: Node) {
        if let Some(children) = self.stack.last_mut().and_then(Node::children_mut) {
            children.push(node);
        }
    }
}

fn heading_depth(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn alignment_name(alignment: &Alignment) -> Option<&'static str> {
    match alignment {
        Alignment::None => None,
        Alignment::Left => Some("left"),
        Alignment::Center => Some("center"),
        Alignment::Right => Some("right"),
    }
}

/// Split a fence info string into language and meta: `ts title="a.ts" {1,3}`
/// → (`ts`, `title="a.ts" {1,3}`).
fn split_info_string(info: &str) -> (Option<String>, Option<String>) {
    let info = info.trim();
    if info.is_empty() {
        return (None, None);
    }
    match info.split_once(char::is_whitespace) {
        Some((language, meta)) => {
            let meta = meta.trim();
            (
                Some(language.to_string()),
                (!meta.is_empty()).then(|| meta.to_string()),
            )
        }
        None => (Some(info.to_string()), None),
    }
}

// ============================================================================
// Serialization
// ============================================================================

const VOID_ELEMENTS: &[&str] = &["br", "hr", "img", "input"];

fn write_html(node: &Node, out: &mut String) {
    match node {
        Node::Root(children) => children.iter().for_each(|c| write_html(c, out)),
        Node::Text(text) => escape_into(out, text),
        Node::Other(raw) => out.push_str(raw),
        Node::Element(element) => {
            out.push('<');
            out.push_str(&element.tag);
            write_properties(element.properties.iter(), out);
            out.push('>');
            if VOID_ELEMENTS.contains(&element.tag.as_str()) {
                return;
            }
            element.children.iter().for_each(|c| write_html(c, out));
            let _ = write!(out, "</{}>", element.tag);
        }
        Node::Heading(heading) => {
            let _ = write!(out, "<h{}", heading.depth);
            write_properties(heading.id.iter().map(|id| ("id", id)), out);
            out.push('>');
            heading.children.iter().for_each(|c| write_html(c, out));
            let _ = write!(out, "</h{}>", heading.depth);
        }
        Node::CodeBlock(block) => {
            out.push_str("<pre><code");
            let class = block.language.as_ref().map(|l| format!("language-{l}"));
            write_properties(class.iter().map(|c| ("class", c)), out);
            out.push('>');
            escape_into(out, &block.code);
            out.push_str("</code></pre>");
        }
    }
}

fn write_properties<K, V>(properties: impl Iterator<Item = (K, V)>, out: &mut String)
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    for (key, value) in properties {
        out.push(' ');
        out.push_str(key.as_ref());
        out.push_str("=\"");
        escape_into(out, value.as_ref());
        out.push('"');
    }
}

fn escape_into(out: &mut String, text: &str) {
    let _ = Escaper::new(out).write_str(text);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headings(node: &Node) -> Vec<(u8, String)> {
        struct Collect(Vec<(u8, String)>);
        impl Visitor for Collect {
            fn visit_heading(&mut self, heading: &Heading) -> Walk {
                let text = Node::Root(heading.children.clone()).text_content();
                self.0.push((heading.depth, text));
                Walk::SkipChildren
            }
        }
        let mut c = Collect(Vec::new());
        node.walk(&mut c);
        c.0
    }

    #[test]
    fn parses_headings_with_depth() {
        let tree = parse_markdown("# One\n\n## Two\n\n###### Six\n");
        assert_eq!(
            headings(&tree),
            vec![
                (1, "One".to_string()),
                (2, "Two".to_string()),
                (6, "Six".to_string())
            ]
        );
    }

    #[test]
    fn fenced_code_keeps_raw_text_and_info() {
        let tree = parse_markdown("```rust title=\"main.rs\"\nfn main() {\n    println!(\"<hi>\");\n}\n```\n");
        let Node::CodeBlock(block) = &tree.children()[0] else {
            panic!("expected code block, got {:?}", tree.children());
        };
        assert_eq!(block.language.as_deref(), Some("rust"));
        assert_eq!(block.meta.as_deref(), Some("title=\"main.rs\""));
        assert_eq!(block.code, "fn main() {\n    println!(\"<hi>\");\n}\n");
    }

    #[test]
    fn indented_code_has_no_language() {
        let tree = parse_markdown("    let x = 1;\n");
        let Node::CodeBlock(block) = &tree.children()[0] else {
            panic!("expected code block");
        };
        assert_eq!(block.language, None);
        assert_eq!(block.code, "let x = 1;\n");
    }

    #[test]
    fn text_content_strips_formatting() {
        let tree = parse_markdown("# Hello *big* `world`\n");
        assert_eq!(tree.text_content(), "Hello big world");
    }

    #[test]
    fn renders_inline_markup() {
        let html = parse_markdown("This is **bold** and *italic*.").to_html();
        assert_eq!(html, "<p>This is <strong>bold</strong> and <em>italic</em>.</p>");
    }

    #[test]
    fn escapes_text_and_properties() {
        let html = parse_markdown("1 < 2 & [x](https://x.test/?a=1&b=2)").to_html();
        assert!(html.contains("1 &lt; 2 &amp; "));
        assert!(html.contains("href=\"https://x.test/?a=1&amp;b=2\""));
    }

    #[test]
    fn raw_html_passes_through() {
        let html = parse_markdown("<Callout type=\"info\">\nHi\n</Callout>\n").to_html();
        assert!(html.contains("<Callout type=\"info\">"));
    }

    #[test]
    fn image_alt_from_children() {
        let html = parse_markdown("![A *cat*](cat.png)").to_html();
        assert!(html.contains("<img alt=\"A cat\" src=\"cat.png\">"));
    }

    #[test]
    fn tables_get_head_and_alignment() {
        let html = parse_markdown("| a | b |\n|:--|--:|\n| 1 | 2 |\n").to_html();
        assert!(html.contains("<thead><tr><th align=\"left\">a</th><th align=\"right\">b</th></tr></thead>"));
        assert!(html.contains("<tr><td align=\"left\">1</td><td align=\"right\">2</td></tr>"));
    }

    #[test]
    fn walk_mut_can_replace_nodes() {
        let mut tree = parse_markdown("```\ncode\n```\n");
        tree.walk_mut(&mut |node: &mut Node| -> Result<Walk, ()> {
            if matches!(node, Node::CodeBlock(_)) {
                *node = Node::text("replaced");
                return Ok(Walk::SkipChildren);
            }
            Ok(Walk::Continue)
        })
        .unwrap();
        assert_eq!(tree.to_html(), "replaced");
    }

    #[test]
    fn find_element_mut_is_preorder() {
        let mut tree = Node::Root(vec![
            Element::new("figure")
                .with_children(vec![Element::new("pre").with_property("n", "1").into()])
                .into(),
            Element::new("pre").with_property("n", "2").into(),
        ]);
        let pre = tree.find_element_mut(&|e| e.tag == "pre").unwrap();
        assert_eq!(pre.property("n"), Some("1"));
        assert_eq!(tree.count_elements(&|e| e.tag == "pre"), 2);
    }

    #[test]
    fn split_info_string_variants() {
        assert_eq!(split_info_string(""), (None, None));
        assert_eq!(split_info_string("js"), (Some("js".into()), None));
        assert_eq!(
            split_info_string("js  {1,3} "),
            (Some("js".into()), Some("{1,3}".into()))
        );
    }
}
