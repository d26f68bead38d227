//! Class-based syntax highlighting for fenced code blocks.

use std::sync::LazyLock;

use syntect::highlighting::ThemeSet;
use syntect::html::{css_for_theme_with_class_style, ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;
use tracing::warn;

/// Prefix applied to every generated span class, e.g. `hl-keyword`.
pub const CLASS_PREFIX: &str = "hl-";

const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed {
    prefix: CLASS_PREFIX,
};

const PLAIN_TEXT_LABEL: &str = "plaintext";

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

/// A highlighted code block ready to be wrapped in `<pre><code>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightedBlock {
    /// Label for the `language-*` class.
    pub language: String,
    /// Inner HTML (spans and escaped text).
    pub html: String,
}

/// Highlight `code` using the declared language when it is known, then
/// first-line detection, then plain text. Highlighting errors fall back to
/// the escaped source.
///
/// Detection only looks at the first line (a shebang or editor modeline), so
/// an unlabelled fence of ordinary Python or JavaScript renders as plain text.
pub fn highlight_block(code: &str, declared: Option<&str>) -> HighlightedBlock {
    let syntax = find_syntax(code, declared);
    let language = match declared {
        Some(lang) => lang.to_string(),
        None => syntax_label(syntax),
    };

    let html = match classed_html(code, syntax) {
        Ok(html) => html,
        Err(e) => {
            warn!(language = %language, error = %e, "Highlighting failed, emitting raw code");
            escape_html(code)
        }
    };

    HighlightedBlock { language, html }
}

/// Stylesheet for the span classes produced by [`highlight_block`].
///
/// Returns `None` for an unknown theme name.
pub fn highlight_css(theme: &str) -> Option<String> {
    let Some(theme_data) = THEME_SET.themes.get(theme) else {
        warn!(theme, available = ?available_themes(), "Unknown highlight theme");
        return None;
    };
    match css_for_theme_with_class_style(theme_data, CLASS_STYLE) {
        Ok(css) => Some(css),
        Err(e) => {
            warn!(theme, error = %e, "Failed to build highlight stylesheet");
            None
        }
    }
}

/// Names accepted by [`highlight_css`].
pub fn available_themes() -> Vec<&'static str> {
    THEME_SET.themes.keys().map(String::as_str).collect()
}

// -- Private helpers --

/// Declared token, else `find_syntax_by_first_line`, else plain text. There
/// is no content-based guessing past the first line.
fn find_syntax(code: &str, declared: Option<&str>) -> &'static SyntaxReference {
    let set: &'static SyntaxSet = &SYNTAX_SET;
    declared
        .map(normalize_token)
        .and_then(|token| set.find_syntax_by_token(token))
        .or_else(|| {
            code.lines()
                .next()
                .and_then(|line| set.find_syntax_by_first_line(line))
        })
        .unwrap_or_else(|| set.find_syntax_plain_text())
}

/// Map fence labels the bundled grammars don't know onto close relatives.
fn normalize_token(lang: &str) -> &str {
    match lang.to_ascii_lowercase().as_str() {
        "typescript" | "ts" | "tsx" | "jsx" | "javascript" => "js",
        "shell" | "bash" | "zsh" | "console" => "sh",
        "python3" => "py",
        "yml" => "yaml",
        _ => lang,
    }
}

fn syntax_label(syntax: &SyntaxReference) -> String {
    if syntax.name == "Plain Text" {
        return PLAIN_TEXT_LABEL.to_string();
    }
    syntax
        .file_extensions
        .first()
        .cloned()
        .unwrap_or_else(|| syntax.name.to_lowercase())
}

fn classed_html(code: &str, syntax: &SyntaxReference) -> Result<String, syntect::Error> {
    let mut generator =
        ClassedHTMLGenerator::new_with_class_style(syntax, &SYNTAX_SET, CLASS_STYLE);
    for line in LinesWithEndings::from(code) {
        generator.parse_html_for_line_which_includes_newline(line)?;
    }
    Ok(generator.finalize())
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
