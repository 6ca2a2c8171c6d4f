//! Frontmatter parsing.
//!
//! A post may open with a metadata block delimited by `---` lines:
//!
//! ```text
//! ---
//! title: "Hello"
//! date: 2026-02-01
//! summary: A test
//! ---
//! # Body starts here
//! ```
//!
//! Each line is a `key: value` pair split on the first colon. Values wrapped
//! in a matching pair of quotes are unquoted. Blank lines and `#` comments
//! inside the block are ignored. This is deliberately not YAML: nested
//! values, lists, and multi-line strings are not supported.

use std::collections::BTreeMap;
use thiserror::Error;

const DELIMITER: &str = "---";

#[derive(Error, Debug, PartialEq)]
pub enum FrontmatterError {
    #[error("frontmatter opened on line 1 but never closed with '---'")]
    Unclosed,
    #[error("frontmatter line {line} is not a `key: value` pair: {text:?}")]
    MalformedLine { line: usize, text: String },
}

/// Parsed metadata block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frontmatter {
    fields: BTreeMap<String, String>,
}

impl Frontmatter {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Interpret a field as a boolean flag (`true`/`yes`/`1`).
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| {
            matches!(
                v.to_ascii_lowercase().as_str(),
                "true" | "yes" | "1"
            )
        })
    }

    /// Serialize back into a delimited block. Values are always double-quoted,
    /// so parsing the result yields the same mapping.
    pub fn to_block(&self) -> String {
        let mut out = String::from("---\n");
        for (key, value) in &self.fields {
            out.push_str(&format!("{key}: \"{value}\"\n"));
        }
        out.push_str("---\n");
        out
    }
}

/// Split a document into its frontmatter and body.
///
/// Without an opening `---` line the mapping is empty and the body is the
/// input, unchanged. With one, the body is everything after the closing
/// delimiter, trimmed.
pub fn parse_frontmatter(text: &str) -> Result<(Frontmatter, &str), FrontmatterError> {
    let content = text.strip_prefix('\u{feff}').unwrap_or(text);

    let Some((first_line, rest)) = split_line(content) else {
        return Ok((Frontmatter::default(), text));
    };
    if first_line.trim_end() != DELIMITER {
        return Ok((Frontmatter::default(), text));
    }

    let mut fields = BTreeMap::new();
    let mut remaining = rest;
    let mut line_no = 1;

    loop {
        let Some((line, after)) = split_line(remaining) else {
            return Err(FrontmatterError::Unclosed);
        };
        line_no += 1;
        remaining = after;

        let trimmed = line.trim();
        if line.trim_end() == DELIMITER {
            return Ok((Frontmatter { fields }, remaining.trim()));
        }
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (key, value) = match trimmed.split_once(':') {
            Some((k, v)) if !k.trim().is_empty() => (k.trim(), v.trim()),
            _ => {
                return Err(FrontmatterError::MalformedLine {
                    line: line_no,
                    text: trimmed.to_string(),
                });
            }
        };
        fields.insert(key.to_string(), unquote(value).to_string());
    }
}

/// Split off the first line (without its terminator). `None` at end of input.
fn split_line(text: &str) -> Option<(&str, &str)> {
    if text.is_empty() {
        return None;
    }
    match text.find('\n') {
        Some(pos) => {
            let line = &text[..pos];
            Some((line.strip_suffix('\r').unwrap_or(line), &text[pos + 1..]))
        }
        None => Some((text, "")),
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2
            && let Some(inner) = value
                .strip_prefix(quote)
                .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}
