//! Whole-site build.
//!
//! Stage 2 of the postmill build: takes the scanned sources and compiles each
//! one into a [`CompiledPost`]. Documents are independent, so they compile in
//! parallel on the rayon pool; results come back in input order.
//!
//! A document that fails (unreadable file, bad front matter, unknown
//! extension, a highlighter error) becomes a [`Diagnostic`] and the rest of
//! the site still builds.
//! After compiling, slugs are checked per locale: when two documents claim
//! the same slug in one locale, the one later in path order is rejected.
//!
//! ## Output
//!
//! ```text
//! dist/
//! ├── posts.json               # Array of compiled posts, in path order
//! └── .postmill-cache.json     # Compile cache (see `cache`)
//! ```

use crate::cache::{self, CacheManifest, CacheStats};
use crate::scan::{ScannedContent, SourceFile};
use crate::transform::{CompileError, TransformContext, compile_source};
use crate::types::CompiledPost;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const POSTS_FILENAME: &str = "posts.json";

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error("Duplicate slug '{slug}' in locale '{locale}' (already used by {first})")]
    DuplicateSlug {
        slug: String,
        locale: String,
        first: String,
    },
    #[error("Failed to read source: {0}")]
    Unreadable(#[source] std::io::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A document that did not make it into the build.
#[derive(Debug)]
pub struct Diagnostic {
    pub path: String,
    pub error: BuildError,
}

#[derive(Debug, Default)]
pub struct BuildReport {
    pub posts: Vec<CompiledPost>,
    pub diagnostics: Vec<Diagnostic>,
    pub cache_stats: CacheStats,
}

impl BuildReport {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

enum Outcome {
    Cached(CompiledPost),
    Compiled {
        post: CompiledPost,
        source_hash: String,
    },
    Failed(CompileError),
}

/// Compile every source.
///
/// With a cache, unchanged documents are taken from it, freshly compiled
/// ones are recorded in it, and entries for vanished documents are dropped.
pub fn build(
    sources: &[SourceFile],
    ctx: &TransformContext<'_>,
    mut cache: Option<&mut CacheManifest>,
) -> BuildReport {
    let params_hash = cache::hash_transform_params(ctx.config);
    let lookup = cache.as_deref();

    let outcomes: Vec<Outcome> = sources
        .par_iter()
        .map(|file| {
            let source_hash = cache::hash_source(&file.source);
            if let Some(post) =
                lookup.and_then(|c| c.find_cached(&file.path, &source_hash, &params_hash))
            {
                return Outcome::Cached(post.clone());
            }
            match compile_source(&file.path, &file.source, ctx) {
                Ok(post) => {
                    tracing::debug!(path = %file.path, slug = %post.slug, locale = %post.locale, "compiled");
                    Outcome::Compiled { post, source_hash }
                }
                Err(error) => Outcome::Failed(error),
            }
        })
        .collect();

    let mut report = BuildReport::default();
    let mut claimed: HashMap<(String, String), String> = HashMap::new();

    for (file, outcome) in sources.iter().zip(outcomes) {
        let post = match outcome {
            Outcome::Cached(post) => {
                report.cache_stats.hit();
                post
            }
            Outcome::Compiled { post, source_hash } => {
                report.cache_stats.miss();
                if let Some(cache) = cache.as_deref_mut() {
                    cache.insert(source_hash, params_hash.clone(), post.clone());
                }
                post
            }
            Outcome::Failed(error) => {
                report.cache_stats.miss();
                tracing::warn!(path = %file.path, error = %error, "failed to compile");
                report.diagnostics.push(Diagnostic {
                    path: file.path.clone(),
                    error: error.into(),
                });
                continue;
            }
        };

        let key = (post.locale.clone(), post.slug.clone());
        if let Some(first) = claimed.get(&key) {
            tracing::warn!(path = %file.path, first = %first, "duplicate slug");
            report.diagnostics.push(Diagnostic {
                path: file.path.clone(),
                error: BuildError::DuplicateSlug {
                    slug: post.slug,
                    locale: post.locale,
                    first: first.clone(),
                },
            });
            continue;
        }
        claimed.insert(key, file.path.clone());
        report.posts.push(post);
    }

    if let Some(cache) = cache {
        let live: HashSet<&str> = sources.iter().map(|s| s.path.as_str()).collect();
        cache.retain_paths(&live);
    }

    tracing::info!(
        posts = report.posts.len(),
        failed = report.diagnostics.len(),
        cache = %report.cache_stats,
        "build finished"
    );
    report
}

/// Compile everything a scan found.
///
/// Files the scan could not read are reported alongside compile failures,
/// and all diagnostics come back in path order.
pub fn build_content(
    content: ScannedContent,
    ctx: &TransformContext<'_>,
    cache: Option<&mut CacheManifest>,
) -> BuildReport {
    let mut report = build(&content.sources, ctx, cache);
    if content.unreadable.is_empty() {
        return report;
    }
    report
        .diagnostics
        .extend(content.unreadable.into_iter().map(|file| Diagnostic {
            path: file.path,
            error: BuildError::Unreadable(file.error),
        }));
    report.diagnostics.sort_by(|a, b| a.path.cmp(&b.path));
    report
}

/// Write `posts.json` into `output_dir`, creating the directory if needed.
pub fn write_posts_json(output_dir: &Path, posts: &[CompiledPost]) -> Result<PathBuf, BuildError> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(POSTS_FILENAME);
    let json = serde_json::to_string_pretty(posts)?;
    std::fs::write(&path, json)?;
    Ok(path)
}

/// Read back a `posts.json` written by [`write_posts_json`].
pub fn read_posts_json(output_dir: &Path) -> Result<Vec<CompiledPost>, BuildError> {
    let content = std::fs::read_to_string(output_dir.join(POSTS_FILENAME))?;
    Ok(serde_json::from_str(&content)?)
}

/// Posts from the last build in `output_dir`, or `None` if it has not been built.
pub fn load_posts(output_dir: &Path) -> Result<Option<Vec<CompiledPost>>, BuildError> {
    match read_posts_json(output_dir) {
        Ok(posts) => Ok(Some(posts)),
        Err(BuildError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}
