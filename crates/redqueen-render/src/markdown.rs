//! Markdown rendering with GitHub-flavored extensions.

use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};

use crate::highlight::{escape_html, highlight_block};

fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES
}

/// Render message text to HTML.
///
/// Single newlines become `<br />`, fenced code is syntax highlighted, and
/// raw HTML in the source is escaped instead of passed through. Link and
/// image targets with a script-capable scheme are replaced with `#`.
pub fn render(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut events: Vec<Event<'_>> = Vec::new();
    let mut code: Option<(Option<String>, String)> = None;

    for event in Parser::new_ext(text, options()) {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => fence_language(&info),
                    CodeBlockKind::Indented => None,
                };
                code = Some((lang, String::new()));
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some((lang, source)) = code.take() {
                    events.push(Event::Html(CowStr::from(code_block_html(
                        &source,
                        lang.as_deref(),
                    ))));
                }
            }
            Event::Text(t) if code.is_some() => {
                if let Some((_, source)) = code.as_mut() {
                    source.push_str(&t);
                }
            }
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            }) => events.push(Event::Start(Tag::Link {
                link_type,
                dest_url: safe_url(dest_url),
                title,
                id,
            })),
            Event::Start(Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            }) => events.push(Event::Start(Tag::Image {
                link_type,
                dest_url: safe_url(dest_url),
                title,
                id,
            })),
            Event::SoftBreak => events.push(Event::HardBreak),
            Event::Html(raw) | Event::InlineHtml(raw) => events.push(Event::Text(raw)),
            other => events.push(other),
        }
    }

    let mut out = String::with_capacity(text.len() * 2);
    html::push_html(&mut out, events.into_iter());
    out
}

/// Schemes a browser will execute or inline when the target is followed.
const UNSAFE_SCHEMES: [&str; 3] = ["javascript:", "vbscript:", "data:"];

/// Browsers ignore case, surrounding whitespace and embedded tabs or
/// newlines in a scheme, so compare with all of those stripped.
fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    let normalized: String = url
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_control())
        .flat_map(char::to_lowercase)
        .collect();
    if UNSAFE_SCHEMES
        .iter()
        .any(|scheme| normalized.starts_with(scheme))
    {
        CowStr::Borrowed("#")
    } else {
        url
    }
}

/// First word of a fence info string, e.g. `rust` from "rust,ignore".
fn fence_language(info: &str) -> Option<String> {
    info.split(|c: char| c.is_whitespace() || c == ',')
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn code_block_html(source: &str, lang: Option<&str>) -> String {
    let block = highlight_block(source, lang);
    format!(
        "<pre><code class=\"language-{}\">{}</code></pre>\n",
        escape_html(&block.language),
        block.html
    )
}
