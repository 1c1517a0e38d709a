//! Heading capitalization.
//!
//! Two passes over the text of every heading:
//!
//! 1. **Title case**: each word gets an uppercase first letter, except small
//!    words (`a`, `of`, `the`, …) that are neither first nor last. Words that
//!    already carry deliberate casing (`iPhone`, paths like `src/main.rs`,
//!    `node.js`) are left alone.
//! 2. **Special cases**: configured terms (`GPU`, `TensorFlow.js`, `vs`) are
//!    forced to their exact casing wherever they occur as whole words,
//!    matched case-insensitively. Longer terms win over their prefixes, so
//!    `LLMs` is not turned into `LLMS`.
//!
//! Inline code inside a heading is never touched. The same [`Capitalizer`]
//! runs on the rendered body and on the TOC parse, so anchor text and
//! outline titles always agree.

use crate::config::CapitalizationConfig;
use crate::tree::{Node, Walk};
use std::convert::Infallible;

const SMALL_WORDS: &[&str] = &[
    "a", "an", "and", "as", "at", "but", "by", "en", "for", "if", "in", "nor", "of", "on", "or",
    "per", "the", "to", "v", "v.", "via", "vs", "vs.",
];

#[derive(Debug, Clone, Default)]
pub struct Capitalizer {
    title_case: bool,
    /// Sorted longest first.
    special_cases: Vec<String>,
}

impl Capitalizer {
    pub fn new(title_case: bool, special_cases: &[String]) -> Self {
        let mut special_cases: Vec<String> = special_cases
            .iter()
            .filter(|s| !s.is_empty())
            .cloned()
            .collect();
        special_cases.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        Self {
            title_case,
            special_cases,
        }
    }

    pub fn from_config(config: &CapitalizationConfig) -> Self {
        Self::new(config.title_case, &config.special_cases)
    }

    /// Capitalize a complete heading text.
    pub fn capitalize(&self, text: &str) -> String {
        self.capitalize_run(text, true, true)
    }

    /// Capitalize one text run of a heading. `starts` / `ends` say whether
    /// the run holds the first / last word of the heading.
    fn capitalize_run(&self, text: &str, starts: bool, ends: bool) -> String {
        let titled = if self.title_case {
            title_case(text, starts, ends)
        } else {
            text.to_string()
        };
        self.special_cases
            .iter()
            .fold(titled, |acc, term| replace_whole_word(&acc, term))
    }

    /// Rewrite the text of every heading in `tree`.
    pub fn apply(&self, tree: &mut Node) {
        let _ = tree.walk_mut(&mut |node: &mut Node| -> Result<Walk, Infallible> {
            if let Node::Heading(heading) = node {
                let mut runs = Vec::new();
                collect_runs(&mut heading.children, &mut runs);
                let last = runs.len().saturating_sub(1);
                for (i, run) in runs.into_iter().enumerate() {
                    if let Some(text) = run {
                        *text = self.capitalize_run(text, i == 0, i == last);
                    }
                }
                return Ok(Walk::SkipChildren);
            }
            Ok(Walk::Continue)
        });
    }
}

/// Inline leaves of a heading in order: text runs are `Some`, leaves that
/// must not be rewritten (inline code, raw HTML) are `None`.
fn collect_runs<'a>(nodes: &'a mut [Node], runs: &mut Vec<Option<&'a mut String>>) {
    for node in nodes {
        match node {
            Node::Text(text) => runs.push(Some(text)),
            Node::Element(element) if element.tag == "code" => runs.push(None),
            Node::Element(element) => collect_runs(&mut element.children, runs),
            _ => runs.push(None),
        }
    }
}

fn title_case(text: &str, starts: bool, ends: bool) -> String {
    let words: Vec<(usize, &str)> = split_words(text);
    let last = words.len().saturating_sub(1);
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (i, (start, word)) in words.iter().enumerate() {
        out.push_str(&text[cursor..*start]);
        let is_edge = (starts && i == 0) || (ends && i == last);
        out.push_str(&title_word(word, is_edge));
        cursor = start + word.len();
    }
    out.push_str(&text[cursor..]);
    out
}

/// Whitespace-separated words with their byte offsets.
fn split_words(text: &str) -> Vec<(usize, &str)> {
    let mut words = Vec::new();
    let mut start = None;
    for (i, c) in text.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                words.push((s, &text[s..i]));
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        words.push((s, &text[s..]));
    }
    words
}

fn title_word(word: &str, is_edge: bool) -> String {
    let core = word.trim_matches(|c: char| !c.is_alphanumeric() && c != '.');
    if !is_edge && SMALL_WORDS.contains(&core.to_lowercase().as_str()) {
        return word.to_lowercase();
    }
    if has_deliberate_casing(core) {
        return word.to_string();
    }
    let mut out = String::with_capacity(word.len());
    let mut done = false;
    for c in word.chars() {
        if !done && c.is_alphabetic() {
            out.extend(c.to_uppercase());
            done = true;
        } else {
            out.push(c);
        }
    }
    out
}

fn has_deliberate_casing(core: &str) -> bool {
    let trimmed = core.trim_end_matches('.');
    core.chars().skip(1).any(char::is_uppercase) || trimmed.contains('.') || trimmed.contains('/')
}

/// Replace every whole-word, ASCII-case-insensitive occurrence of `term`.
fn replace_whole_word(text: &str, term: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    let mut i = 0;
    while i < text.len() {
        let matched = text
            .get(i..i + term.len())
            .is_some_and(|candidate| candidate.eq_ignore_ascii_case(term))
            && is_boundary_before(text, i)
            && is_boundary_after(text, i + term.len());
        if matched {
            out.push_str(&text[cursor..i]);
            out.push_str(term);
            i += term.len();
            cursor = i;
        } else {
            i += text[i..].chars().next().map_or(1, char::len_utf8);
        }
    }
    out.push_str(&text[cursor..]);
    out
}

fn is_boundary_before(text: &str, index: usize) -> bool {
    text[..index]
        .chars()
        .next_back()
        .is_none_or(|c| !c.is_alphanumeric())
}

fn is_boundary_after(text: &str, index: usize) -> bool {
    text[index..]
        .chars()
        .next()
        .is_none_or(|c| !c.is_alphanumeric())
}
