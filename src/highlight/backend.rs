//! Highlighter trait and shared error type.
//!
//! A highlighter turns one [`CodeBlock`] into a subtree of the document. The
//! only contract the rest of the pipeline relies on is that the subtree
//! contains exactly one `pre` element; the code-block annotator attaches the
//! raw source to it after highlighting.

use crate::tree::{CodeBlock, Node};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HighlightError {
    #[error("Unknown theme: {0}")]
    UnknownTheme(String),
    #[error("Failed to parse {language} code: {message}")]
    Parse { language: String, message: String },
}

/// Trait for syntax highlighting backends.
///
/// `Sync` so one instance can be shared by every rayon worker.
pub trait Highlighter: Sync {
    /// Render `block` as highlighted markup.
    fn highlight(&self, block: &CodeBlock) -> Result<Node, HighlightError>;
}
