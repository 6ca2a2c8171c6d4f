//! CLI output formatting.
//!
//! Posts are shown by positional index and title, with file paths as
//! indented context lines:
//!
//! ```text
//! Assets
//!     img/
//!
//! Posts
//! 001 Hello → pages/blog/2026-02-01-hello.html
//!     Source: 2026-02-01-hello.md
//! 002 First Steps → pages/blog/2026-01-15-first-steps.html
//!     Source: 2026-01-15-first-steps.md
//!
//! Skipped
//!     2025-10-01-broken.md: frontmatter opened on line 1 but never closed with '---'
//!
//! Listing → pages/blog.html (2 posts)
//!
//! Built 2 posts, 1 skipped
//! ```
//!
//! Every `format_*` function returns `Vec<String>` and does no I/O; the
//! matching `print_*` wrapper writes the lines to stdout.

use crate::pipeline::{BuildReport, CheckReport, Warning};
use crate::posts::SkippedPost;
use crate::watch::Changes;
use std::path::{Path, PathBuf};

// ============================================================================
// Shared helpers
// ============================================================================

/// 1-based positional index, 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate to `max` characters, appending `...` if truncated.
fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

fn skipped_section(skipped: &[SkippedPost], lines: &mut Vec<String>) {
    if skipped.is_empty() {
        return;
    }
    lines.push(String::new());
    lines.push("Skipped".to_string());
    for post in skipped {
        lines.push(format!("{}{}: {}", indent(1), file_name(&post.source), post.error));
    }
}

fn drafts_section(drafts: &[PathBuf], lines: &mut Vec<String>) {
    if drafts.is_empty() {
        return;
    }
    lines.push(String::new());
    lines.push("Drafts".to_string());
    for draft in drafts {
        lines.push(format!("{}{}", indent(1), file_name(draft)));
    }
}

fn format_warning(warning: &Warning) -> String {
    match warning {
        Warning::UnresolvedVariable { page, name } => {
            format!("{}: unresolved {{{{ {name} }}}}", page.display())
        }
        Warning::MissingComponent { page, name } => {
            format!("{}: missing component {name}", page.display())
        }
    }
}

// ============================================================================
// Build
// ============================================================================

pub fn format_build_report(report: &BuildReport) -> Vec<String> {
    let mut lines = Vec::new();

    if !report.assets.is_empty() {
        lines.push("Assets".to_string());
        for dir in &report.assets {
            lines.push(format!("{}{dir}/", indent(1)));
        }
        lines.push(String::new());
    }

    lines.push("Posts".to_string());
    for (i, post) in report.posts.iter().enumerate() {
        lines.push(format!(
            "{} {} → {}",
            format_index(i + 1),
            post.title,
            post.output.display()
        ));
        lines.push(format!("{}Source: {}", indent(1), file_name(&post.source)));
    }

    skipped_section(&report.skipped, &mut lines);
    drafts_section(&report.drafts, &mut lines);

    if !report.warnings.is_empty() {
        lines.push(String::new());
        lines.push("Warnings".to_string());
        for warning in &report.warnings {
            lines.push(format!("{}{}", indent(1), format_warning(warning)));
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "Listing → {} ({})",
        report.listing.display(),
        plural(report.summaries.len(), "post")
    ));
    lines.push(String::new());

    let mut total = format!("Built {}", plural(report.posts.len(), "post"));
    if !report.skipped.is_empty() {
        total.push_str(&format!(", {} skipped", report.skipped.len()));
    }
    lines.push(total);
    lines
}

pub fn print_build_report(report: &BuildReport) {
    for line in format_build_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Post inventory: title, display date, and a short summary.
///
/// ```text
/// 001 Hello (February 1, 2026)
///     Slug: 2026-02-01-hello
///     Summary: A test
/// ```
pub fn format_check_report(report: &CheckReport) -> Vec<String> {
    let mut lines = vec!["Posts".to_string()];
    for (i, post) in report.summaries.iter().enumerate() {
        if post.date_display.is_empty() {
            lines.push(format!("{} {}", format_index(i + 1), post.title));
        } else {
            lines.push(format!(
                "{} {} ({})",
                format_index(i + 1),
                post.title,
                post.date_display
            ));
        }
        lines.push(format!("{}Slug: {}", indent(1), post.slug));
        if !post.summary.is_empty() {
            lines.push(format!("{}Summary: {}", indent(1), truncate(&post.summary, 60)));
        }
        if let Some(thumb) = &post.thumbnail {
            lines.push(format!("{}Thumbnail: {thumb}", indent(1)));
        }
    }

    skipped_section(&report.skipped, &mut lines);
    drafts_section(&report.drafts, &mut lines);
    lines
}

pub fn print_check_report(report: &CheckReport) {
    for line in format_check_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Watch
// ============================================================================

/// One line per changed file, relative to `root` where possible.
///
/// ```text
/// + posts/2026-03-01-new.md
/// ~ src/templates/post.html
/// - posts/img/old.png
/// ```
pub fn format_changes(changes: &Changes, root: &Path) -> Vec<String> {
    let rel = |p: &Path| p.strip_prefix(root).unwrap_or(p).display().to_string();
    let mut lines = Vec::new();
    lines.extend(changes.added.iter().map(|p| format!("+ {}", rel(p))));
    lines.extend(changes.modified.iter().map(|p| format!("~ {}", rel(p))));
    lines.extend(changes.removed.iter().map(|p| format!("- {}", rel(p))));
    lines
}

pub fn print_changes(changes: &Changes, root: &Path) {
    for line in format_changes(changes, root) {
        println!("{}", line);
    }
}
