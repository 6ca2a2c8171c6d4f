//! `{{ name }}` variable substitution.
//!
//! Templates are plain HTML with placeholders. Filling is a single
//! left-to-right pass: each placeholder is looked up once, and inserted values
//! are never scanned again. A post whose content happens to contain
//! `{{ title }}` keeps that text literally.
//!
//! Unknown placeholders are left as-is and reported back to the caller, who
//! decides whether that is a warning or an error.

use crate::components::{Components, inject_components};
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("valid placeholder regex")
});

/// Variable values for one page.
#[derive(Debug, Clone, Default)]
pub struct Vars {
    values: BTreeMap<String, String>,
}

impl Vars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Site-wide variables shared by every page: `root` and `year`.
    pub fn globals(root: &str, year: i32) -> Self {
        Self::new().set("root", root).set("year", year.to_string())
    }

    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filled {
    pub text: String,
    /// Placeholder names with no value, in order of first appearance.
    pub unresolved: Vec<String>,
}

pub fn fill(template: &str, vars: &Vars) -> Filled {
    let mut unresolved: Vec<String> = Vec::new();
    let text = PLACEHOLDER
        .replace_all(template, |caps: &Captures| match vars.get(&caps[1]) {
            Some(value) => value.to_string(),
            None => {
                let name = caps[1].to_string();
                if !unresolved.contains(&name) {
                    unresolved.push(name);
                }
                caps[0].to_string()
            }
        })
        .into_owned();
    Filled { text, unresolved }
}

/// A template turned into a finished page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub html: String,
    pub unresolved: Vec<String>,
    pub missing_components: Vec<String>,
}

/// Inject components into `template`, then fill variables in one pass.
///
/// Components are expanded first so they can use `{{ root }}` and
/// `{{ year }}` themselves. Variable values are inserted last and never
/// expanded, whether they contain placeholders or component markers.
pub fn render_page(template: &str, components: &Components, vars: &Vars) -> Page {
    let injected = inject_components(template, components);
    let filled = fill(&injected.html, vars);
    Page {
        html: filled.text,
        unresolved: filled.unresolved,
        missing_components: injected.missing,
    }
}
