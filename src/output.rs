//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. Every post leads with
//! its positional index and title; the source path, URL and other details
//! follow as indented context lines. Failures are listed after the posts,
//! one per line, with the path that caused them.
//!
//! # Output Format
//!
//! ## Build / Check
//!
//! ```text
//! Posts
//! 001 Scaling LLM Training [en]
//!     Source: en/tech/scaling-llms.mdx
//!     URL: /posts/scaling-llms
//!     Description: Notes from a month of FSDP runs
//!     2 min read, 4 headings
//!
//! Failed
//!     en/broken.mdx: Invalid front matter: Missing required field `title`
//!
//! Compiled 1 post, 1 failed (1 compiled)
//! ```
//!
//! ## Table of contents
//!
//! ```text
//! Intro to FSDP #intro-to-fsdp
//!     Setup #setup
//!     Usage #usage
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::collection::NotFoundError;
use crate::pipeline::BuildReport;
use crate::toc::TocNode;
use crate::types::CompiledPost;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_desc(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

fn post_lines(index: usize, post: &CompiledPost) -> Vec<String> {
    let headings = TocNode::from_json(&post.toc).map(|t| t.len()).unwrap_or(0);
    let mut title = format!(
        "{} {} [{}]",
        format_index(index),
        post.front_matter.title,
        post.locale
    );
    if post.front_matter.archived {
        title.push_str(" (archived)");
    }

    let mut lines = vec![
        title,
        format!("{}Source: {}", indent(1), post.path),
        format!("{}URL: {}", indent(1), post.url),
    ];
    if !post.front_matter.description.is_empty() {
        lines.push(format!(
            "{}Description: {}",
            indent(1),
            truncate_desc(&post.front_matter.description, 60)
        ));
    }
    lines.push(format!(
        "{}{}, {}",
        indent(1),
        post.reading_time,
        plural(headings, "heading")
    ));
    lines
}

// ============================================================================
// Build / Check output
// ============================================================================

/// Format the result of compiling the site.
pub fn format_build_report(report: &BuildReport) -> Vec<String> {
    let mut lines = Vec::new();

    if !report.posts.is_empty() {
        lines.push("Posts".to_string());
        for (i, post) in report.posts.iter().enumerate() {
            lines.extend(post_lines(i + 1, post));
        }
        lines.push(String::new());
    }

    if !report.diagnostics.is_empty() {
        lines.push("Failed".to_string());
        for diag in &report.diagnostics {
            lines.push(format!("{}{}: {}", indent(1), diag.path, diag.error));
        }
        lines.push(String::new());
    }

    let mut summary = format!("Compiled {}", plural(report.posts.len(), "post"));
    if !report.diagnostics.is_empty() {
        summary.push_str(&format!(", {} failed", report.diagnostics.len()));
    }
    summary.push_str(&format!(" ({})", report.cache_stats));
    lines.push(summary);
    lines
}

pub fn print_build_report(report: &BuildReport) {
    for line in format_build_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Table of contents
// ============================================================================

/// Format an outline: one heading per line, nested entries indented.
pub fn format_toc(toc: &TocNode) -> Vec<String> {
    let mut lines = Vec::new();
    if toc.has_toc() {
        format_toc_children(&toc.children, 0, &mut lines);
    } else {
        lines.push("(no headings)".to_string());
    }
    lines
}

fn format_toc_children(children: &[TocNode], depth: usize, lines: &mut Vec<String>) {
    for node in children {
        let title = node.title.as_deref().unwrap_or_default();
        match &node.id {
            Some(id) => lines.push(format!("{}{} #{}", indent(depth), title, id)),
            None => lines.push(format!("{}{}", indent(depth), title)),
        }
        format_toc_children(&node.children, depth + 1, lines);
    }
}

pub fn print_toc(toc: &TocNode) {
    for line in format_toc(toc) {
        println!("{}", line);
    }
}

// ============================================================================
// Raw markdown
// ============================================================================

pub fn format_not_found(err: &NotFoundError) -> Vec<String> {
    vec![
        format!("Not found: {}", err),
        format!(
            "{}Posts are looked up by file name without extension, per locale.",
            indent(1)
        ),
    ]
}

pub fn print_not_found(err: &NotFoundError) {
    for line in format_not_found(err) {
        eprintln!("{}", line);
    }
}
