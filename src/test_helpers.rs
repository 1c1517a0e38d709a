//! Shared test utilities for the postmill test suite.
//!
//! Provides fixture setup and lookup helpers that panic with a useful message
//! on a miss, so tests read as a sequence of assertions.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let report = build_fixtures(tmp.path());
//!
//! let post = find_post(&report.posts, "my-post", "ar");
//! assert_eq!(post.folder.as_deref(), Some("tech"));
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::config::load_config;
use crate::highlight::backend::tests::MockHighlighter;
use crate::pipeline::{BuildReport, build_content};
use crate::scan::scan;
use crate::transform::TransformContext;
use crate::types::CompiledPost;

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/content/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/content");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Scan and compile a content root with the mock highlighter, no cache.
pub fn build_fixtures(root: &Path) -> BuildReport {
    let config = load_config(root).unwrap();
    let content = scan(root, &config).unwrap();
    let highlighter = MockHighlighter::new();
    let ctx = TransformContext::new(&config, &highlighter);
    build_content(content, &ctx, None)
}

// =========================================================================
// Post lookups (panic with a clear message on miss)
// =========================================================================

/// Find a post by slug and locale. Panics if not found.
pub fn find_post<'a>(posts: &'a [CompiledPost], slug: &str, locale: &str) -> &'a CompiledPost {
    posts
        .iter()
        .find(|p| p.slug == slug && p.locale == locale)
        .unwrap_or_else(|| {
            let keys: Vec<String> = posts
                .iter()
                .map(|p| format!("{}/{}", p.locale, p.slug))
                .collect();
            panic!("post '{locale}/{slug}' not found. Available: {keys:?}")
        })
}

/// Find a post by its source path. Panics if not found.
pub fn find_post_by_path<'a>(posts: &'a [CompiledPost], path: &str) -> &'a CompiledPost {
    posts.iter().find(|p| p.path == path).unwrap_or_else(|| {
        let paths: Vec<&str> = posts.iter().map(|p| p.path.as_str()).collect();
        panic!("post at '{path}' not found. Available: {paths:?}")
    })
}

/// Slugs of `posts`, in order.
pub fn slugs(posts: &[CompiledPost]) -> Vec<&str> {
    posts.iter().map(|p| p.slug.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixtures_build_cleanly() {
        let tmp = setup_fixtures();
        let report = build_fixtures(tmp.path());
        assert!(
            report.is_clean(),
            "diagnostics: {:?}",
            report.diagnostics
        );
        assert!(!report.posts.is_empty());
    }

    #[test]
    fn find_post_by_slug_and_locale() {
        let tmp = setup_fixtures();
        let report = build_fixtures(tmp.path());
        let post = find_post(&report.posts, "my-post", "ar");
        assert_eq!(post.path, "ar/tech/my-post.mdx");
        assert_eq!(find_post_by_path(&report.posts, "ar/tech/my-post.mdx").slug, "my-post");
    }

    #[test]
    fn fixtures_compile_in_path_order() {
        let tmp = setup_fixtures();
        let report = build_fixtures(tmp.path());
        assert_eq!(
            slugs(&report.posts),
            vec![
                "my-post",
                "hello-world",
                "gpu-notes",
                "my-post",
                "scaling-llms",
                "legacy-post"
            ]
        );
    }

    #[test]
    #[should_panic(expected = "not found")]
    fn find_post_panics_on_miss() {
        find_post(&[], "nope", "en");
    }
}
