//! Document transform: one source file in, one [`CompiledPost`] out.
//!
//! ```text
//! source ──► frontmatter::parse ──► RawDocument
//!                                      │
//!    body ─► parse ─► capitalize ─► heading ids ─► autolinks ─► annotate/highlight ─► HTML
//!    body ─► parse ─► capitalize ─► headings ─► slugger ─► TOC ─► JSON
//!    body ─► reading time
//!    path ─► locale / folder / slug ─► url
//! ```
//!
//! The body is parsed twice. Anchors injected into the rendered headings must
//! not leak into TOC titles. Both paths use the same capitalizer and a fresh
//! slugger each, so TOC ids and heading ids agree.
//!
//! Every function here is pure given its inputs; the pipeline runs them in
//! parallel.

use crate::anchors::{assign_heading_ids, autolink_headings};
use crate::annotate::annotate_code_blocks;
use crate::capitalize::Capitalizer;
use crate::config::SiteConfig;
use crate::frontmatter::{self, SchemaError};
use crate::highlight::{HighlightError, Highlighter};
use crate::naming::{PathError, derive_post_path, post_url};
use crate::reading_time::reading_time;
use crate::slug::Slugger;
use crate::toc::{TocNode, toc_for_tree};
use crate::tree::{BlockId, parse_markdown};
use crate::types::{CompiledPost, RawDocument};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Failed to highlight code block {block} ({language}): {source}")]
    Highlight {
        block: BlockId,
        language: String,
        source: HighlightError,
    },
    #[error("Code block {0} lost its raw text during highlighting")]
    LostCodeBlock(BlockId),
    #[error("Code block {block} rendered {count} <pre> elements, expected exactly one")]
    AmbiguousCodeBlock { block: BlockId, count: usize },
    #[error("Code block reached the highlighter without a block id")]
    UnnumberedCodeBlock,
    #[error("Malformed code block marker: {0:?}")]
    InvalidBlockMarker(String),
    #[error("Failed to serialize table of contents: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Everything that can fail for a single document.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Invalid front matter: {0}")]
    Schema(#[from] SchemaError),
    #[error("Transform failed: {0}")]
    Transform(#[from] TransformError),
    #[error("Invalid post path: {0}")]
    Path(#[from] PathError),
}

/// Shared, read-only inputs of every document transform.
pub struct TransformContext<'a> {
    pub config: &'a SiteConfig,
    pub highlighter: &'a dyn Highlighter,
    pub capitalizer: Capitalizer,
}

impl<'a> TransformContext<'a> {
    pub fn new(config: &'a SiteConfig, highlighter: &'a dyn Highlighter) -> Self {
        Self {
            config,
            highlighter,
            capitalizer: Capitalizer::from_config(&config.capitalization),
        }
    }
}

/// Split front matter off `source`, validate it, and compile the document.
pub fn compile_source(
    path: &str,
    source: &str,
    ctx: &TransformContext<'_>,
) -> Result<CompiledPost, CompileError> {
    let (front_matter, body) = frontmatter::parse(source)?;
    let document = RawDocument {
        path: path.to_string(),
        body: body.to_string(),
        front_matter,
    };
    compile_document(&document, ctx)
}

pub fn compile_document(
    document: &RawDocument,
    ctx: &TransformContext<'_>,
) -> Result<CompiledPost, CompileError> {
    let config = ctx.config;
    let post_path = derive_post_path(
        &document.path,
        &config.locales,
        &config.content.extension,
    )?;

    let rendered_body = render_body(&document.body, ctx)?;
    let toc = build_outline(&document.body, &ctx.capitalizer)
        .to_json()
        .map_err(TransformError::from)?;
    let reading = reading_time(&document.body, config.reading.words_per_minute);

    Ok(CompiledPost {
        path: document.path.clone(),
        front_matter: document.front_matter.clone(),
        content: document.body.clone(),
        rendered_body,
        toc,
        reading_time: reading.text,
        url: post_url(&config.urls.posts_prefix, &post_path.slug),
        slug: post_path.slug,
        locale: post_path.locale,
        folder: post_path.folder,
    })
}

/// Render the body to HTML: capitalized headings with ids and self-links,
/// highlighted code blocks carrying their raw text.
pub fn render_body(body: &str, ctx: &TransformContext<'_>) -> Result<String, TransformError> {
    let mut tree = parse_markdown(body);
    ctx.capitalizer.apply(&mut tree);
    assign_heading_ids(&mut tree, &mut Slugger::new());
    autolink_headings(&mut tree);
    annotate_code_blocks(&mut tree, ctx.highlighter)?;
    Ok(tree.to_html())
}

/// Outline of the body, with headings capitalized like the rendered body.
pub fn build_outline(body: &str, capitalizer: &Capitalizer) -> TocNode {
    let mut tree = parse_markdown(body);
    capitalizer.apply(&mut tree);
    toc_for_tree(&tree)
}
