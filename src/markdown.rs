//! Markdown to HTML conversion with heading anchors and a table of contents.
//!
//! Every call to [`render`] builds its own parser and its own id registry, so
//! converting one post never affects the heading ids of the next.

use maud::{Markup, html};
use pulldown_cmark::{CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd, html::push_html};
use std::collections::HashMap;

/// Output of a single markdown conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub html: String,
    /// Nested `<ul>` outline of the headings, `None` when there are none.
    pub toc: Option<String>,
}

/// One heading collected for the table of contents.
#[derive(Debug, Clone, PartialEq)]
pub struct TocEntry {
    pub level: u8,
    pub id: String,
    pub text: String,
}

/// Convert a markdown body into HTML.
///
/// Tables and strikethrough are enabled on top of CommonMark, which already
/// covers fenced code blocks.
pub fn render(body: &str) -> Rendered {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let parser = Parser::new_ext(body, options);

    let mut ids = IdRegistry::default();
    let mut toc = Vec::new();
    let events = anchor_headings(parser, &mut ids, &mut toc);

    let mut html = String::with_capacity(body.len() * 2);
    push_html(&mut html, events.into_iter());

    Rendered {
        html,
        toc: render_toc(&toc),
    }
}

/// Hands out unique heading ids within one document.
#[derive(Default)]
struct IdRegistry {
    seen: HashMap<String, usize>,
}

impl IdRegistry {
    fn unique(&mut self, text: &str) -> String {
        let base = match slugify(text) {
            s if s.is_empty() => "section".to_string(),
            s => s,
        };
        match self.seen.get_mut(&base) {
            Some(count) => {
                *count += 1;
                let id = format!("{base}_{count}");
                self.seen.insert(id.clone(), 0);
                id
            }
            None => {
                self.seen.insert(base.clone(), 0);
                base
            }
        }
    }
}

/// Lowercase, collapse non-alphanumeric runs into `-`, strip edge hyphens.
fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut prev_hyphen = true;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
            prev_hyphen = false;
        } else if !prev_hyphen {
            slug.push('-');
            prev_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

fn level_number(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Replace heading start/end events with raw `<hN id="...">` tags and record
/// each heading for the outline.
///
/// Headings that already carry an explicit id keep it.
fn anchor_headings<'a>(
    parser: Parser<'a>,
    ids: &mut IdRegistry,
    toc: &mut Vec<TocEntry>,
) -> Vec<Event<'a>> {
    let mut events = Vec::new();
    let mut current: Option<(HeadingLevel, Option<CowStr<'a>>)> = None;
    let mut text = String::new();
    let mut inner: Vec<Event<'a>> = Vec::new();

    for event in parser {
        match &event {
            Event::Start(Tag::Heading { level, id, .. }) => {
                current = Some((*level, id.clone()));
                text.clear();
                inner.clear();
            }
            Event::End(TagEnd::Heading(level)) if current.is_some() => {
                let explicit_id = current.take().and_then(|(_, id)| id);
                let n = level_number(*level);
                let id = match explicit_id {
                    Some(id) => id.to_string(),
                    None => ids.unique(&text),
                };
                events.push(Event::Html(format!("<h{n} id=\"{id}\">").into()));
                events.append(&mut inner);
                events.push(Event::Html(format!("</h{n}>\n").into()));
                toc.push(TocEntry {
                    level: n,
                    id,
                    text: text.trim().to_string(),
                });
            }
            Event::Text(t) | Event::Code(t) if current.is_some() => {
                text.push_str(t);
                inner.push(event);
            }
            _ if current.is_some() => inner.push(event),
            _ => events.push(event),
        }
    }

    events
}

fn escaped(text: &str) -> Markup {
    html! { (text) }
}

/// Render collected headings as nested lists wrapped in `<div class="toc">`.
pub fn render_toc(entries: &[TocEntry]) -> Option<String> {
    if entries.is_empty() {
        return None;
    }

    let mut out = String::from("<div class=\"toc\">\n");
    let mut open: Vec<u8> = Vec::new();

    for entry in entries {
        match open.last() {
            None => {
                out.push_str("<ul>\n");
                open.push(entry.level);
            }
            Some(&top) if entry.level > top => {
                out.push_str("\n<ul>\n");
                open.push(entry.level);
            }
            Some(_) => {
                while open.len() > 1 && open.last().is_some_and(|&top| entry.level < top) {
                    out.push_str("</li>\n</ul>\n");
                    open.pop();
                }
                // Skipped level: still deeper than the remaining parent
                if open.last().is_some_and(|&top| entry.level > top) {
                    out.push_str("<ul>\n");
                    open.push(entry.level);
                } else {
                    out.push_str("</li>\n");
                }
            }
        }
        out.push_str(&format!(
            "<li><a href=\"#{}\">{}</a>",
            entry.id,
            escaped(&entry.text).into_string()
        ));
    }
    while open.pop().is_some() {
        out.push_str("</li>\n</ul>\n");
    }
    out.push_str("</div>");
    Some(out)
}
