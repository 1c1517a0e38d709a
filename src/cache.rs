//! Compile cache for incremental builds.
//!
//! Highlighting dominates compile time: every code block is tokenized once and
//! colored twice. This module lets the pipeline skip compiling a document
//! when neither its source nor the transform settings changed since the last
//! build.
//!
//! ## Cache keys
//!
//! Entries are keyed by the document's relative path (slug, locale and folder
//! all derive from it, so a moved file is a different post) and validated by
//! two hashes:
//!
//! - **`source_hash`**: SHA-256 of the full source text, front matter
//!   included. Content-based rather than mtime-based so it survives
//!   `git checkout` (which resets modification times).
//!
//! - **`params_hash`**: SHA-256 of every setting that changes compiled output
//!   (locales, content extension, URL prefix, reading speed, capitalization
//!   rules, highlight themes) plus the crate version. Editing any of them
//!   recompiles everything.
//!
//! A hit returns the stored [`CompiledPost`] as-is.
//!
//! ## Storage
//!
//! The manifest is a JSON file at `<output_dir>/.postmill-cache.json`, next to
//! `posts.json`, so it travels with the output directory when cached in CI.
//!
//! ## Bypassing the cache
//!
//! Pass `--no-cache` to `build` to force a full rebuild. This starts from an
//! empty manifest; the manifest written afterwards replaces the old one.

use crate::config::SiteConfig;
use crate::types::CompiledPost;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the cache manifest file within the output directory.
const MANIFEST_FILENAME: &str = ".postmill-cache.json";

/// Version of the cache manifest format. Bump this to invalidate all
/// existing caches when the format or key computation changes.
const MANIFEST_VERSION: u32 = 2;

/// A compiled document with the hashes it was compiled from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    pub source_hash: String,
    pub params_hash: String,
    pub post: CompiledPost,
}

/// On-disk cache manifest mapping document paths to their cache entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheManifest {
    pub version: u32,
    pub entries: BTreeMap<String, CacheEntry>,
}

impl CacheManifest {
    /// Create an empty manifest (used for `--no-cache` or first build).
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: BTreeMap::new(),
        }
    }

    /// Load from the output directory. Returns an empty manifest if the
    /// file doesn't exist or can't be parsed (version mismatch, corruption).
    pub fn load(output_dir: &Path) -> Self {
        let path = manifest_path(output_dir);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        let manifest: Self = match serde_json::from_str(&content) {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "discarding unreadable cache manifest");
                return Self::empty();
            }
        };
        if manifest.version != MANIFEST_VERSION {
            return Self::empty();
        }
        manifest
    }

    /// Save to the output directory.
    pub fn save(&self, output_dir: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(manifest_path(output_dir), json)
    }

    /// The cached post for `path`, if it was compiled from the same source
    /// with the same settings.
    pub fn find_cached(
        &self,
        path: &str,
        source_hash: &str,
        params_hash: &str,
    ) -> Option<&CompiledPost> {
        self.entries
            .get(path)
            .filter(|e| e.source_hash == source_hash && e.params_hash == params_hash)
            .map(|e| &e.post)
    }

    /// Record a freshly compiled post.
    pub fn insert(&mut self, source_hash: String, params_hash: String, post: CompiledPost) {
        self.entries.insert(
            post.path.clone(),
            CacheEntry {
                source_hash,
                params_hash,
                post,
            },
        );
    }

    /// Drop entries for documents that no longer exist.
    pub fn retain_paths(&mut self, live: &HashSet<&str>) {
        self.entries.retain(|path, _| live.contains(path.as_str()));
    }
}

/// SHA-256 hash of a document's source text, returned as a hex string.
pub fn hash_source(source: &str) -> String {
    format!("{:x}", Sha256::digest(source.as_bytes()))
}

/// SHA-256 hash of every setting that affects compiled output.
pub fn hash_transform_params(config: &SiteConfig) -> String {
    let mut hasher = Sha256::new();
    let mut field = |bytes: &[u8]| {
        hasher.update(bytes);
        hasher.update(b"\0");
    };
    field(env!("CARGO_PKG_VERSION").as_bytes());
    field(config.locales.default.as_bytes());
    for locale in &config.locales.allowed {
        field(locale.as_bytes());
    }
    field(b"|");
    field(config.content.extension.as_bytes());
    field(config.urls.posts_prefix.as_bytes());
    field(&config.reading.words_per_minute.to_le_bytes());
    field(&[u8::from(config.capitalization.title_case)]);
    for term in &config.capitalization.special_cases {
        field(term.as_bytes());
    }
    field(b"|");
    field(config.highlight.theme_light.as_bytes());
    field(config.highlight.theme_dark.as_bytes());
    field(&[u8::from(config.highlight.keep_background)]);
    format!("{:x}", hasher.finalize())
}

/// Summary of cache performance for a build run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} compiled ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        } else {
            write!(f, "{} compiled", self.misses)
        }
    }
}

/// Resolve the cache manifest path for an output directory.
pub fn manifest_path(output_dir: &Path) -> PathBuf {
    output_dir.join(MANIFEST_FILENAME)
}
