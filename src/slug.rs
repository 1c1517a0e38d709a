//! GitHub-compatible heading slugs.
//!
//! Slugs follow the convention GitHub uses for heading anchors (the same one
//! `github-slugger` implements), so links copied from a rendered README keep
//! working on the site:
//!
//! - lowercase the text
//! - drop every character that is not a letter, number, combining mark,
//!   connector punctuation (`_`, `‿`, ...), `-` or space
//! - turn each space into `-` (runs are *not* collapsed: `a  b` → `a--b`)
//!
//! Duplicates within one document get `-1`, `-2`, … appended, in order of
//! appearance. A [`Slugger`] holds that state, so build one per document and
//! never share it between documents.

use std::collections::HashMap;
use unicode_properties::{GeneralCategory, GeneralCategoryGroup, UnicodeGeneralCategory};

/// Stateless base slug for `text`, without de-duplication.
pub fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('-'),
            '-' => Some(c),
            c if is_kept(c) => Some(c),
            _ => None,
        })
        .collect()
}

fn is_kept(c: char) -> bool {
    matches!(
        c.general_category_group(),
        GeneralCategoryGroup::Letter | GeneralCategoryGroup::Number | GeneralCategoryGroup::Mark
    ) || c.general_category() == GeneralCategory::ConnectorPunctuation
}

/// Per-document slug generator.
#[derive(Debug, Default)]
pub struct Slugger {
    /// Every slug issued so far, with the suffix counter of its base form.
    occurrences: HashMap<String, usize>,
}

impl Slugger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slug for `text`, unique among the slugs this slugger has issued.
    pub fn slug(&mut self, text: &str) -> String {
        let base = slugify(text);
        let mut result = base.clone();
        while self.occurrences.contains_key(&result) {
            let count = self.occurrences.entry(base.clone()).or_insert(0);
            *count += 1;
            result = format!("{base}-{count}");
        }
        self.occurrences.insert(result.clone(), 0);
        result
    }

    /// Forget every issued slug.
    pub fn reset(&mut self) {
        self.occurrences.clear();
    }
}
