//! Content discovery.
//!
//! Stage 1 of the postmill build. Walks the content root and reads every post
//! source into memory so the compile stage never touches the filesystem.
//!
//! ## Directory Structure
//!
//! ```text
//! content/                         # Content root
//! ├── config.toml                  # Site configuration (optional)
//! ├── en/                          # Locale directory (must be an allowed locale)
//! │   ├── tech/                    # Folder
//! │   │   └── scaling-llms.mdx
//! │   └── life/
//! │       └── hello-world.mdx
//! ├── ar/
//! │   └── tech/
//! │       └── my-post.mdx          # Same slug may exist once per locale
//! ├── tech/
//! │   └── legacy-post.mdx          # No locale segment: default locale
//! └── .drafts/                     # Hidden: never scanned
//! ```
//!
//! Only files with the configured extension are read. Hidden files and
//! directories (leading `.`) are skipped. Results are sorted by relative
//! path so later stages see a stable order on every platform.
//!
//! A file that cannot be read (not UTF-8, permission denied) does not stop
//! the scan; it is returned in [`ScannedContent::unreadable`] and reported
//! against its path by the build.

use crate::config::SiteConfig;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to walk content directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Content directory not found: {0}")]
    MissingRoot(PathBuf),
    #[error("Path is not valid UTF-8: {0}")]
    NonUtf8Path(PathBuf),
}

/// A post source as read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Relative to the content root, `/`-separated on every platform.
    pub path: String,
    pub source: String,
}

/// A post file that was found but could not be read.
#[derive(Debug)]
pub struct Unreadable {
    pub path: String,
    pub error: std::io::Error,
}

/// Everything found under the content root.
#[derive(Debug, Default)]
pub struct ScannedContent {
    pub sources: Vec<SourceFile>,
    pub unreadable: Vec<Unreadable>,
}

/// Collect every post source under `root`, sorted by relative path.
pub fn scan(root: &Path, config: &SiteConfig) -> Result<ScannedContent, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::MissingRoot(root.to_path_buf()));
    }

    let extension = config.content.extension.as_str();
    let mut sources = Vec::new();
    let mut unreadable = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() || !has_extension(entry.path(), extension) {
            continue;
        }
        let path = relative_slash_path(root, entry.path())?;
        match fs::read_to_string(entry.path()) {
            Ok(source) => sources.push(SourceFile { path, source }),
            Err(error) => {
                tracing::warn!(path = %path, error = %error, "unreadable source");
                unreadable.push(Unreadable { path, error });
            }
        }
    }

    sources.sort_by(|a, b| a.path.cmp(&b.path));
    unreadable.sort_by(|a, b| a.path.cmp(&b.path));
    tracing::debug!(
        root = %root.display(),
        count = sources.len(),
        unreadable = unreadable.len(),
        "scanned content"
    );
    Ok(ScannedContent {
        sources,
        unreadable,
    })
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(extension)
}

fn relative_slash_path(root: &Path, path: &Path) -> Result<String, ScanError> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let segments = relative
        .components()
        .map(|c| {
            c.as_os_str()
                .to_str()
                .ok_or_else(|| ScanError::NonUtf8Path(path.to_path_buf()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(segments.join("/"))
}
