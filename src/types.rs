//! Shared types used across all pipeline stages.
//!
//! [`CompiledPost`] is the record written to `posts.json` and read back by
//! the collection queries and the build cache, so its serialized form is the
//! contract with the presentation layer: camelCase keys, front-matter fields
//! flattened next to the derived ones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Validated front matter of one post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontMatter {
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A source file after front-matter validation, before any transform.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    /// Path relative to the content root, `/`-separated (`ar/tech/my-post.mdx`).
    pub path: String,
    /// Everything after the front-matter block.
    pub body: String,
    pub front_matter: FrontMatter,
}

/// A fully compiled post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledPost {
    pub path: String,
    #[serde(flatten)]
    pub front_matter: FrontMatter,
    /// Raw body, unmodified.
    pub content: String,
    pub rendered_body: String,
    /// Outline as a JSON string (see [`crate::toc::TocNode`]).
    pub toc: String,
    /// e.g. `"5 min read"`.
    pub reading_time: String,
    pub slug: String,
    pub url: String,
    pub locale: String,
    pub folder: Option<String>,
}

impl CompiledPost {
    /// The date shown as "last modified": the update date when there is one.
    pub fn last_modified(&self) -> DateTime<Utc> {
        self.front_matter
            .last_updated
            .unwrap_or(self.front_matter.date)
    }
}
