//! Syntax highlighting for fenced code blocks.
//!
//! | Step | Crate / function |
//! |---|---|
//! | **Grammar lookup** | `SyntaxSet::find_syntax_by_token` (falls back to plain text) |
//! | **Tokenize** | `syntect::parsing::ParseState`, one pass per line |
//! | **Color** | one `HighlightIterator` per theme (light and dark) |
//! | **Markup** | figure / pre / code / per-line spans as [`Node`](crate::tree::Node)s |
//!
//! The module is split into:
//! - **Backend**: the [`Highlighter`] trait the code-block annotator calls
//! - **Syntect backend**: [`SyntectHighlighter`], the production implementation

pub mod backend;
pub mod syntect_backend;

pub use backend::{HighlightError, Highlighter};
pub use syntect_backend::SyntectHighlighter;
