//! Site configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! the base layer; a `config.toml` in the content root overrides any subset of
//! them.
//!
//! ## Config File Location
//!
//! ```text
//! content/
//! ├── config.toml              # Overrides stock defaults
//! ├── en/
//! │   └── tech/
//! │       └── my-post.mdx
//! └── ar/
//!     └── ...
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [locales]
//! default = "en"                           # Locale for files outside a locale folder
//! allowed = ["en", "ar", "ru", "cs", "sk"] # First path segments treated as locales
//!
//! [content]
//! extension = "mdx"         # Content file extension, without the dot
//!
//! [urls]
//! posts_prefix = "/posts"   # Post URLs are {posts_prefix}/{slug}
//! base_url = "https://example.com"
//!
//! [reading]
//! words_per_minute = 200
//!
//! [capitalization]
//! title_case = true
//! special_cases = ["EJS", "TensorFlow.js", "GPU", ...]
//!
//! [highlight]
//! theme_light = "InspiredGitHub"
//! theme_dark = "base16-ocean.dark"
//! keep_background = false
//!
//! [raw_markdown]
//! fallback_to_default_locale = false
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse; override just the values you want:
//!
//! ```toml
//! [urls]
//! base_url = "https://blog.example.org"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Locale detection from the first path segment.
    pub locales: LocalesConfig,
    /// Which files count as posts.
    pub content: ContentConfig,
    /// URL templates for compiled posts.
    pub urls: UrlsConfig,
    pub reading: ReadingConfig,
    /// Heading capitalization rules.
    pub capitalization: CapitalizationConfig,
    /// Code block highlighting themes.
    pub highlight: HighlightConfig,
    pub raw_markdown: RawMarkdownConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.locales.allowed.is_empty() {
            return Err(ConfigError::Validation(
                "locales.allowed must not be empty".into(),
            ));
        }
        if !self.locales.allowed.contains(&self.locales.default) {
            return Err(ConfigError::Validation(format!(
                "locales.default \"{}\" must be one of locales.allowed",
                self.locales.default
            )));
        }
        if self.reading.words_per_minute == 0 {
            return Err(ConfigError::Validation(
                "reading.words_per_minute must be greater than 0".into(),
            ));
        }
        if self.content.extension.is_empty() {
            return Err(ConfigError::Validation(
                "content.extension must not be empty".into(),
            ));
        }
        if self.content.extension.starts_with('.') {
            return Err(ConfigError::Validation(
                "content.extension must not start with '.'".into(),
            ));
        }
        if !self.urls.posts_prefix.starts_with('/') {
            return Err(ConfigError::Validation(
                "urls.posts_prefix must start with '/'".into(),
            ));
        }
        Ok(())
    }
}

/// Locale detection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocalesConfig {
    /// Locale assigned when the first path segment is not an allowed locale.
    pub default: String,
    /// Path segments recognized as locales.
    pub allowed: Vec<String>,
}

impl Default for LocalesConfig {
    fn default() -> Self {
        Self {
            default: "en".to_string(),
            allowed: ["en", "ar", "ru", "cs", "sk"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl LocalesConfig {
    pub fn is_allowed(&self, segment: &str) -> bool {
        self.allowed.iter().any(|l| l == segment)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContentConfig {
    /// File extension of post sources, without the leading dot.
    pub extension: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            extension: "mdx".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UrlsConfig {
    /// Prefix of every post URL (`/posts` → `/posts/{slug}`).
    pub posts_prefix: String,
    /// Absolute site origin, used for sitemap entries.
    pub base_url: String,
}

impl Default for UrlsConfig {
    fn default() -> Self {
        Self {
            posts_prefix: "/posts".to_string(),
            base_url: "https://example.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReadingConfig {
    pub words_per_minute: u32,
}

impl Default for ReadingConfig {
    fn default() -> Self {
        Self {
            words_per_minute: 200,
        }
    }
}

/// Heading capitalization settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CapitalizationConfig {
    /// Apply title case to heading text before special cases.
    pub title_case: bool,
    /// Terms whose exact casing is forced wherever they appear as whole words.
    pub special_cases: Vec<String>,
}

impl Default for CapitalizationConfig {
    fn default() -> Self {
        Self {
            title_case: true,
            special_cases: [
                "EJS",
                "TensorFlow.js",
                "GPU",
                "LLMs",
                "FSDP",
                "vs",
                "DeepSpeed",
                "HPC",
                "ML",
                "gom",
                "nvidia-smi",
                "TL;DR",
                "LLM",
                "AI",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Syntax highlighting settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HighlightConfig {
    /// Theme used for the light color scheme (a syntect default theme name).
    pub theme_light: String,
    /// Theme used for the dark color scheme.
    pub theme_dark: String,
    /// Emit the theme background color on `<pre>`.
    pub keep_background: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            theme_light: "InspiredGitHub".to_string(),
            theme_dark: "base16-ocean.dark".to_string(),
            keep_background: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawMarkdownConfig {
    /// When a post is missing in the requested locale, serve the default
    /// locale's version instead of reporting not-found.
    pub fallback_to_default_locale: bool,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel compile workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(SiteConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Postmill Configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file at the root of the content directory:
#   content/config.toml
#
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Locales
# ---------------------------------------------------------------------------
[locales]
# Locale assigned to posts that do not live under a locale folder.
default = "en"

# First path segments recognized as locales (content/ar/tech/post.mdx -> "ar").
allowed = ["en", "ar", "ru", "cs", "sk"]

# ---------------------------------------------------------------------------
# Content
# ---------------------------------------------------------------------------
[content]
# Extension of post source files, without the dot.
extension = "mdx"

# ---------------------------------------------------------------------------
# URLs
# ---------------------------------------------------------------------------
[urls]
# Every post is served at {posts_prefix}/{slug}.
posts_prefix = "/posts"

# Absolute site origin, used for sitemap entries.
base_url = "https://example.com"

# ---------------------------------------------------------------------------
# Reading time
# ---------------------------------------------------------------------------
[reading]
words_per_minute = 200

# ---------------------------------------------------------------------------
# Heading capitalization
# ---------------------------------------------------------------------------
[capitalization]
# Title-case heading text ("error handling in rust" -> "Error Handling in Rust").
title_case = true

# Terms that keep this exact casing wherever they appear as whole words.
special_cases = [
    "EJS", "TensorFlow.js", "GPU", "LLMs", "FSDP", "vs", "DeepSpeed",
    "HPC", "ML", "gom", "nvidia-smi", "TL;DR", "LLM", "AI",
]

# ---------------------------------------------------------------------------
# Code highlighting
# ---------------------------------------------------------------------------
[highlight]
# Themes for the light and dark color schemes. Both are emitted per token as
# CSS custom properties (--code-light / --code-dark).
theme_light = "InspiredGitHub"
theme_dark = "base16-ocean.dark"

# Emit the theme background color on <pre>.
keep_background = false

# ---------------------------------------------------------------------------
# Raw markdown retrieval
# ---------------------------------------------------------------------------
[raw_markdown]
# Serve the default locale's post when the requested locale has none.
fallback_to_default_locale = false

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel compile workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
