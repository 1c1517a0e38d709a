//! Queries over the compiled posts.
//!
//! Everything the presentation layer asks of `posts.json`: single-post
//! lookup, raw markdown retrieval, per-locale listings, tag counts, sitemap
//! entries and the slug list used to pre-render post pages.
//!
//! Listings are newest first (by `date`, ties broken by path so the order is
//! stable across builds).

use crate::types::CompiledPost;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

pub const MARKDOWN_CONTENT_TYPE: &str = "text/markdown; charset=utf-8";
pub const MARKDOWN_CACHE_CONTROL: &str = "public, max-age=604800, immutable";
pub const MARKDOWN_CONTENT_SOURCE: &str = "raw-markdown";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("No post with slug '{slug}' in locale '{locale}'")]
pub struct NotFoundError {
    pub slug: String,
    pub locale: String,
}

/// The unmodified body of a post, with the headers it is served under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMarkdownResponse {
    pub body: String,
    pub content_type: &'static str,
    pub cache_control: &'static str,
    pub content_source: &'static str,
}

impl RawMarkdownResponse {
    fn new(body: &str) -> Self {
        Self {
            body: body.to_string(),
            content_type: MARKDOWN_CONTENT_TYPE,
            cache_control: MARKDOWN_CACHE_CONTROL,
            content_source: MARKDOWN_CONTENT_SOURCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SitemapEntry {
    pub url: String,
    pub last_modified: DateTime<Utc>,
    pub change_frequency: &'static str,
    pub priority: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

/// Compiled posts, indexed for lookup.
#[derive(Debug, Clone, Default)]
pub struct PostCollection {
    posts: Vec<CompiledPost>,
    by_key: HashMap<(String, String), usize>,
}

impl PostCollection {
    /// Index `posts`. When a (locale, slug) pair repeats, the first post wins.
    pub fn new(posts: Vec<CompiledPost>) -> Self {
        let mut by_key = HashMap::new();
        for (idx, post) in posts.iter().enumerate() {
            by_key
                .entry((post.locale.clone(), post.slug.clone()))
                .or_insert(idx);
        }
        Self { posts, by_key }
    }

    pub fn posts(&self) -> &[CompiledPost] {
        &self.posts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn find(&self, slug: &str, locale: &str) -> Option<&CompiledPost> {
        self.by_key
            .get(&(locale.to_string(), slug.to_string()))
            .map(|&idx| &self.posts[idx])
    }

    /// Raw markdown for `slug` in `locale`.
    ///
    /// With `fallback_locale` set, a miss in `locale` retries there before
    /// giving up. The error always names the locale that was asked for.
    pub fn raw_markdown(
        &self,
        slug: &str,
        locale: &str,
        fallback_locale: Option<&str>,
    ) -> Result<RawMarkdownResponse, NotFoundError> {
        self.find(slug, locale)
            .or_else(|| fallback_locale.and_then(|fallback| self.find(slug, fallback)))
            .map(|post| RawMarkdownResponse::new(&post.content))
            .ok_or_else(|| NotFoundError {
                slug: slug.to_string(),
                locale: locale.to_string(),
            })
    }

    /// All posts of a locale, archived included, newest first.
    pub fn for_locale(&self, locale: &str) -> Vec<&CompiledPost> {
        let mut posts: Vec<&CompiledPost> =
            self.posts.iter().filter(|p| p.locale == locale).collect();
        posts.sort_by(|a, b| {
            b.front_matter
                .date
                .cmp(&a.front_matter.date)
                .then_with(|| a.path.cmp(&b.path))
        });
        posts
    }

    /// Non-archived posts of a locale, optionally restricted to one tag.
    pub fn listed(&self, locale: &str, tag: Option<&str>) -> Vec<&CompiledPost> {
        self.for_locale(locale)
            .into_iter()
            .filter(|p| !p.front_matter.archived)
            .filter(|p| tag.is_none_or(|t| p.front_matter.tags.iter().any(|pt| pt == t)))
            .collect()
    }

    pub fn archived(&self, locale: &str) -> Vec<&CompiledPost> {
        self.for_locale(locale)
            .into_iter()
            .filter(|p| p.front_matter.archived)
            .collect()
    }

    /// Tags of a locale's listed posts, most used first, then alphabetical.
    pub fn tag_counts(&self, locale: &str) -> Vec<TagCount> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for post in self.listed(locale, None) {
            for tag in &post.front_matter.tags {
                *counts.entry(tag.as_str()).or_default() += 1;
            }
        }
        let mut tags: Vec<TagCount> = counts
            .into_iter()
            .map(|(tag, count)| TagCount {
                tag: tag.to_string(),
                count,
            })
            .collect();
        tags.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
        tags
    }

    pub fn sitemap_entries(&self, locale: &str, base_url: &str) -> Vec<SitemapEntry> {
        let base = base_url.trim_end_matches('/');
        self.listed(locale, None)
            .into_iter()
            .map(|post| SitemapEntry {
                url: format!("{base}{}", post.url),
                last_modified: post.last_modified(),
                change_frequency: "weekly",
                priority: 0.8,
            })
            .collect()
    }

    /// Every slug once, in first-seen order.
    pub fn static_slugs(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.posts
            .iter()
            .map(|p| p.slug.as_str())
            .filter(|slug| seen.insert(*slug))
            .collect()
    }
}
