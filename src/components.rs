//! Shared HTML fragments.
//!
//! Every `*.html` file in the components directory becomes a component named
//! after its file stem. Templates reference them with comment markers:
//!
//! ```html
//! <body>
//!   <!-- component:header -->
//!   <main>{{ content }}</main>
//!   <!-- component:footer -->
//! </body>
//! ```
//!
//! A marker naming an unknown component is left in place, so the gap shows up
//! in the generated page instead of silently disappearing.

use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::LazyLock;

static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!--\s*component:\s*([A-Za-z0-9_-]+)\s*-->").expect("valid marker regex")
});

/// Component name → HTML fragment.
pub type Components = BTreeMap<String, String>;

/// Result of injecting components into a page.
#[derive(Debug, Clone, PartialEq)]
pub struct Injected {
    pub html: String,
    /// Names referenced by markers but not present in the component set,
    /// in order of first appearance.
    pub missing: Vec<String>,
}

/// Read every `*.html` file directly inside `dir`.
pub fn load_components(dir: &Path) -> io::Result<Components> {
    let mut components = Components::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_html = path.is_file()
            && path
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("html"));
        if !is_html {
            continue;
        }
        let Some(name) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        components.insert(name, fs::read_to_string(&path)?);
    }
    Ok(components)
}

/// Replace `<!-- component:NAME -->` markers with their fragments.
///
/// Fragments are inserted verbatim; markers inside an inserted fragment are
/// not expanded.
pub fn inject_components(html: &str, components: &Components) -> Injected {
    let mut missing: Vec<String> = Vec::new();
    let html = MARKER
        .replace_all(html, |caps: &Captures| match components.get(&caps[1]) {
            Some(fragment) => fragment.clone(),
            None => {
                let name = caps[1].to_string();
                if !missing.contains(&name) {
                    missing.push(name);
                }
                caps[0].to_string()
            }
        })
        .into_owned();
    Injected { html, missing }
}
