//! Syntect highlighting backend.
//!
//! Pure Rust: grammars and themes are the syntect defaults compiled into the
//! binary, regexes run on `fancy-regex`.
//!
//! Each block is tokenized once; the scope operations of every line feed two
//! highlight iterators, one per theme. Every token carries both colors as CSS
//! custom properties so the page can switch schemes without re-rendering:
//!
//! ```html
//! <figure data-code-figure="">
//!   <figcaption data-code-title="">main.rs</figcaption>
//!   <pre data-language="rust" data-theme="light dark" tabindex="0">
//!     <code data-language="rust" data-theme="light dark">
//!       <span data-line=""><span style="--code-light:#a71d5d;--code-dark:#b48ead">fn</span>…</span>
//!     </code>
//!   </pre>
//! </figure>
//! ```
//!
//! (whitespace added for readability; lines are joined by a bare `\n`.)

use super::backend::{HighlightError, Highlighter};
use crate::config::HighlightConfig;
use crate::tree::{CodeBlock, Element, Node};
use syntect::highlighting::{
    Color, FontStyle, HighlightIterator, HighlightState, Highlighter as ThemeHighlighter, Style,
    Theme, ThemeSet,
};
use syntect::parsing::{ParseState, ScopeStack, SyntaxSet};
use syntect::util::LinesWithEndings;

const THEME_ATTR: &str = "light dark";
const PLAIN_LANGUAGE: &str = "plaintext";

/// Production highlighter built on syntect's default grammars and themes.
pub struct SyntectHighlighter {
    syntaxes: SyntaxSet,
    light: Theme,
    dark: Theme,
    keep_background: bool,
}

impl SyntectHighlighter {
    /// Load the default grammars and the two configured themes.
    pub fn new(config: &HighlightConfig) -> Result<Self, HighlightError> {
        let themes = ThemeSet::load_defaults();
        let theme = |name: &str| {
            themes
                .themes
                .get(name)
                .cloned()
                .ok_or_else(|| HighlightError::UnknownTheme(name.to_string()))
        };
        Ok(Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            light: theme(&config.theme_light)?,
            dark: theme(&config.theme_dark)?,
            keep_background: config.keep_background,
        })
    }

    fn render_lines(&self, block: &CodeBlock, language: &str) -> Result<Vec<Node>, HighlightError> {
        let syntax = block
            .language
            .as_deref()
            .and_then(|token| self.syntaxes.find_syntax_by_token(token))
            .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text());

        let light = ThemeHighlighter::new(&self.light);
        let dark = ThemeHighlighter::new(&self.dark);
        let mut parse_state = ParseState::new(syntax);
        let mut light_state = HighlightState::new(&light, ScopeStack::new());
        let mut dark_state = HighlightState::new(&dark, ScopeStack::new());

        let mut children = Vec::new();
        for (index, line) in LinesWithEndings::from(&block.code).enumerate() {
            let ops = parse_state
                .parse_line(line, &self.syntaxes)
                .map_err(|e| HighlightError::Parse {
                    language: language.to_string(),
                    message: e.to_string(),
                })?;
            let light_regions: Vec<(Style, &str)> =
                HighlightIterator::new(&mut light_state, &ops, line, &light).collect();
            let dark_regions: Vec<(Style, &str)> =
                HighlightIterator::new(&mut dark_state, &ops, line, &dark).collect();

            if index > 0 {
                children.push(Node::text("\n"));
            }
            children.push(render_line(&light_regions, &dark_regions));
        }
        Ok(children)
    }
}

impl Highlighter for SyntectHighlighter {
    fn highlight(&self, block: &CodeBlock) -> Result<Node, HighlightError> {
        let language = block.language.as_deref().unwrap_or(PLAIN_LANGUAGE);
        let lines = self.render_lines(block, language)?;

        let code = Element::new("code")
            .with_property("data-language", language)
            .with_property("data-theme", THEME_ATTR)
            .with_children(lines);

        let mut pre = Element::new("pre")
            .with_property("data-language", language)
            .with_property("data-theme", THEME_ATTR)
            .with_property("tabindex", "0")
            .with_children(vec![code.into()]);
        if self.keep_background
            && let Some(background) = self.light.settings.background
        {
            pre.properties
                .insert("style".into(), format!("background-color:{}", hex(background)));
        }

        let mut figure = Element::new("figure").with_property("data-code-figure", "");
        if let Some(title) = block.meta.as_deref().and_then(meta_title) {
            figure.children.push(
                Element::new("figcaption")
                    .with_property("data-code-title", "")
                    .with_children(vec![Node::text(title)])
                    .into(),
            );
        }
        figure.children.push(pre.into());
        Ok(figure.into())
    }
}

/// One `span[data-line]` holding a token span per light-theme region. The dark
/// color of a token is the dark region covering the token's first byte.
fn render_line(light: &[(Style, &str)], dark: &[(Style, &str)]) -> Node {
    let mut dark_spans = Vec::with_capacity(dark.len());
    let mut offset = 0;
    for (style, text) in dark {
        dark_spans.push((offset, offset + text.len(), *style));
        offset += text.len();
    }

    let mut tokens = Vec::new();
    let mut offset = 0;
    for (style, text) in light {
        let start = offset;
        offset += text.len();
        let text = text.trim_end_matches(['\n', '\r']);
        if text.is_empty() {
            continue;
        }
        let dark_style = dark_spans
            .iter()
            .find(|(s, e, _)| *s <= start && start < *e)
            .map(|(_, _, style)| *style)
            .unwrap_or(*style);
        tokens.push(
            Element::new("span")
                .with_property("style", token_style(style, &dark_style))
                .with_children(vec![Node::text(text)])
                .into(),
        );
    }

    Element::new("span")
        .with_property("data-line", "")
        .with_children(tokens)
        .into()
}

fn token_style(light: &Style, dark: &Style) -> String {
    let mut css = format!(
        "--code-light:{};--code-dark:{}",
        hex(light.foreground),
        hex(dark.foreground)
    );
    if light.font_style.contains(FontStyle::BOLD) {
        css.push_str(";font-weight:bold");
    }
    if light.font_style.contains(FontStyle::ITALIC) {
        css.push_str(";font-style:italic");
    }
    css
}

fn hex(color: Color) -> String {
    if color.a == 0xff {
        format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
    } else {
        format!("#{:02x}{:02x}{:02x}{:02x}", color.r, color.g, color.b, color.a)
    }
}

/// `title="app.ts"` from a fence meta string.
fn meta_title(meta: &str) -> Option<&str> {
    let start = meta.find("title=\"")? + "title=\"".len();
    let len = meta[start..].find('"')?;
    Some(&meta[start..start + len])
}
