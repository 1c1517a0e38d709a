//! # Postmill
//!
//! A build-time content pipeline for MDX blogs. Posts live on disk as
//! `[locale]/[folder]/slug.mdx` files with YAML front matter; postmill
//! compiles each one into a structured record (rendered HTML, a table of
//! contents, reading time, URL) and writes them all to `posts.json` for the
//! presentation layer to consume.
//!
//! # Architecture: Two-Stage Pipeline
//!
//! ```text
//! 1. Scan      content/          →  ScannedContent    (filesystem → sources in memory)
//! 2. Build     ScannedContent    →  dist/posts.json   (parallel per-document compile)
//! ```
//!
//! Each document compiles independently of every other one:
//!
//! ```text
//! source ─► front matter ─► body ─┬─► HTML  (capitalize, heading ids, autolinks, highlight)
//!                                 ├─► TOC   (capitalize, headings, slugs, nesting)
//!                                 └─► reading time
//! path   ─► locale / folder / slug / url
//! ```
//!
//! A document that fails is reported with its path and the build carries
//! on with the others.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Stage 1: walks the content directory and reads every post source |
//! | [`pipeline`] | Stage 2: parallel compile, slug uniqueness, `posts.json` |
//! | [`transform`] | One document in, one [`types::CompiledPost`] out |
//! | [`frontmatter`] | Front-matter splitting and validation |
//! | [`tree`] | Markdown parsing into a typed syntax tree, HTML serialization |
//! | [`headings`] | Heading extraction in document order |
//! | [`slug`] | GitHub-compatible heading slugs with per-document deduplication |
//! | [`toc`] | Nested table of contents from a flat heading list |
//! | [`capitalize`] | Title-casing of headings with special-case terms |
//! | [`anchors`] | Heading ids and self-link anchors |
//! | [`annotate`] | Raw code preserved across syntax highlighting |
//! | [`highlight`] | Syntax highlighting backends (syntect, plus a test mock) |
//! | [`reading_time`] | Reading-time estimate |
//! | [`naming`] | `[locale]/[folder]/slug.ext` path convention |
//! | [`collection`] | Queries over compiled posts: lookup, raw markdown, listings, sitemap |
//! | [`cache`] | Content-addressed compile cache for incremental builds |
//! | [`config`] | `config.toml` loading, merging and validation |
//! | [`types`] | Shared types (`FrontMatter`, `CompiledPost`) |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Typed Tree Over Stringly Transforms
//!
//! Every transform works on [`tree::Node`], a closed enum with dedicated
//! variants for headings and code blocks. Passes pattern-match instead of
//! inspecting tag names, and HTML is produced once at the end.
//!
//! ## Raw Code Survives Highlighting
//!
//! Highlighted code is a forest of colored spans; the copy button needs the
//! original text. [`annotate`] numbers each code block before highlighting,
//! stashes its text by number, and attaches it to the resulting `<pre>`
//! afterwards. A block that loses its `<pre>` is an error, never silently
//! dropped.
//!
//! ## Dual-Theme Highlighting Without JavaScript
//!
//! [`highlight::SyntectHighlighter`] emits both theme colors per token as CSS
//! custom properties. The page picks one with a media query; no re-render,
//! no client-side highlighter.
//!
//! ## One Slugger Per Document
//!
//! Heading ids must be unique within a post and stable across builds. The
//! [`slug::Slugger`] is a plain value created per document, so parallel
//! compiles never share state and the same source always yields the same ids.

pub mod anchors;
pub mod annotate;
pub mod cache;
pub mod capitalize;
pub mod collection;
pub mod config;
pub mod frontmatter;
pub mod headings;
pub mod highlight;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod reading_time;
pub mod scan;
pub mod slug;
pub mod toc;
pub mod transform;
pub mod tree;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
