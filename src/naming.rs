//! Centralized path parsing for the `[locale]/[folder]/slug.ext` convention.
//!
//! Every post's locale, folder, slug and URL come from its path relative to
//! the content root. The locale segment is optional:
//!
//! - `ar/tech/my-post.mdx` → locale `ar`, folder `tech`, slug `my-post`
//! - `tech/my-post.mdx` → locale `en` (default), folder `tech`, slug `my-post`
//! - `en/hello.mdx` → locale `en`, no folder, slug `hello`
//! - `hello.mdx` → locale `en`, no folder, slug `hello`
//!
//! Only the first segment after the locale is the folder; deeper directories
//! (`en/tech/rust/post.mdx`) still file the post under `tech`.

use crate::config::LocalesConfig;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PathError {
    #[error("Path has no file name: {0}")]
    MissingFileName(String),
    #[error("Unexpected extension for {path} (expected .{expected})")]
    UnexpectedExtension { path: String, expected: String },
}

/// Result of parsing a post path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostPath {
    pub locale: String,
    /// First directory after the locale, if any.
    pub folder: Option<String>,
    /// File name with the extension stripped.
    pub slug: String,
}

/// Parse a relative, `/`-separated post path.
pub fn derive_post_path(
    path: &str,
    locales: &LocalesConfig,
    extension: &str,
) -> Result<PostPath, PathError> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let (file_name, dirs) = segments
        .split_last()
        .ok_or_else(|| PathError::MissingFileName(path.to_string()))?;

    let slug = file_name
        .strip_suffix(extension)
        .and_then(|stem| stem.strip_suffix('.'))
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| PathError::UnexpectedExtension {
            path: path.to_string(),
            expected: extension.to_string(),
        })?;

    let (locale, dirs) = match dirs.split_first() {
        Some((first, rest)) if locales.is_allowed(first) => (first.to_string(), rest),
        _ => (locales.default.clone(), dirs),
    };

    Ok(PostPath {
        locale,
        folder: dirs.first().map(|s| s.to_string()),
        slug: slug.to_string(),
    })
}

/// Public URL of a post: `{prefix}/{slug}`.
pub fn post_url(prefix: &str, slug: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(path: &str) -> PostPath {
        derive_post_path(path, &LocalesConfig::default(), "mdx").unwrap()
    }

    #[test]
    fn locale_folder_and_slug() {
        let p = parse("ar/tech/my-post.mdx");
        assert_eq!(p.locale, "ar");
        assert_eq!(p.folder.as_deref(), Some("tech"));
        assert_eq!(p.slug, "my-post");
    }

    #[test]
    fn missing_locale_uses_default() {
        let p = parse("tech/my-post.mdx");
        assert_eq!(p.locale, "en");
        assert_eq!(p.folder.as_deref(), Some("tech"));
        assert_eq!(p.slug, "my-post");
    }

    #[test]
    fn file_in_locale_root_has_no_folder() {
        let p = parse("ru/hello.mdx");
        assert_eq!(p.locale, "ru");
        assert_eq!(p.folder, None);
        assert_eq!(p.slug, "hello");
    }

    #[test]
    fn file_in_content_root() {
        let p = parse("hello.mdx");
        assert_eq!(p.locale, "en");
        assert_eq!(p.folder, None);
    }

    #[test]
    fn only_first_folder_is_kept() {
        let p = parse("en/tech/rust/deep-dive.mdx");
        assert_eq!(p.folder.as_deref(), Some("tech"));
        assert_eq!(p.slug, "deep-dive");
    }

    #[test]
    fn unknown_locale_like_segment_is_a_folder() {
        let p = parse("de/post.mdx");
        assert_eq!(p.locale, "en");
        assert_eq!(p.folder.as_deref(), Some("de"));
    }

    #[test]
    fn slug_keeps_inner_dots() {
        assert_eq!(parse("en/v1.2-release.mdx").slug, "v1.2-release");
    }

    #[test]
    fn wrong_extension_is_error() {
        let err = derive_post_path("en/post.md", &LocalesConfig::default(), "mdx").unwrap_err();
        assert!(matches!(err, PathError::UnexpectedExtension { .. }));

        let err = derive_post_path("en/postmdx", &LocalesConfig::default(), "mdx").unwrap_err();
        assert!(matches!(err, PathError::UnexpectedExtension { .. }));

        let err = derive_post_path("en/.mdx", &LocalesConfig::default(), "mdx").unwrap_err();
        assert!(matches!(err, PathError::UnexpectedExtension { .. }));
    }

    #[test]
    fn empty_path_is_error() {
        let err = derive_post_path("", &LocalesConfig::default(), "mdx").unwrap_err();
        assert_eq!(err, PathError::MissingFileName(String::new()));
    }

    #[test]
    fn url_is_pure_function_of_slug() {
        assert_eq!(post_url("/posts", "my-post"), "/posts/my-post");
        assert_eq!(post_url("/blog/", "my-post"), "/blog/my-post");
        assert_eq!(post_url("/", "x"), "/x");
    }
}
