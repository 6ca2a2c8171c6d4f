//! Blog post conversion.
//!
//! A post is one markdown file directly inside the posts directory. Its file
//! stem is the slug, which names the output page. Posts are processed in
//! reverse lexical order of filename, so date-prefixed names
//! (`2026-02-01-hello.md`) come out newest first:
//!
//! ```text
//! posts/
//! ├── 2026-02-01-hello.md    → pages/blog/2026-02-01-hello.html
//! ├── 2026-01-15-first.md    → pages/blog/2026-01-15-first.html
//! └── img/                   → public/blog-files/img/
//! ```
//!
//! ## Frontmatter fields
//!
//! | Field | Fallback |
//! |-------|----------|
//! | `title` | the slug |
//! | `date` | empty |
//! | `summary` | empty |
//! | `draft` | `false`; drafts are skipped unless `posts.include_drafts` |
//!
//! A post whose frontmatter cannot be parsed is skipped and reported; the
//! rest of the build carries on.

use crate::components::Components;
use crate::dates;
use crate::frontmatter::{FrontmatterError, parse_frontmatter};
use crate::markdown;
use crate::paths;
use crate::template::{self, Vars};
use crate::types::{Layout, PostSummary};
use maud::{PreEscaped, html};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The posts directory or a post file could not be read.
#[derive(Error, Debug)]
#[error("{}: {source}", .path.display())]
pub struct ReadError {
    pub path: PathBuf,
    pub source: io::Error,
}

/// A converted post, before it is placed into the page template.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub slug: String,
    pub title: String,
    pub date: String,
    pub date_display: String,
    pub summary: String,
    /// Body HTML with image paths still as authored.
    pub html: String,
    pub toc: Option<String>,
    /// First local image src, as authored.
    pub thumbnail: Option<String>,
    pub draft: bool,
}

impl Post {
    /// Parse frontmatter and convert the markdown body.
    pub fn parse(slug: &str, text: &str) -> Result<Self, FrontmatterError> {
        let (meta, body) = parse_frontmatter(text)?;
        let rendered = markdown::render(body);
        let thumbnail = paths::extract_first_image_src(&rendered.html).map(str::to_string);

        let date = meta.get("date").unwrap_or_default().to_string();
        Ok(Self {
            slug: slug.to_string(),
            title: meta.get("title").unwrap_or(slug).to_string(),
            date_display: dates::format_date(&date),
            date,
            summary: meta.get("summary").unwrap_or_default().to_string(),
            html: rendered.html,
            toc: rendered.toc,
            thumbnail,
            draft: meta.flag("draft"),
        })
    }

    /// Listing record for this post. The thumbnail is made relative to the
    /// listing page.
    pub fn summary(&self, layout: &Layout) -> PostSummary {
        let thumbnail = self.thumbnail.as_deref().map(|src| {
            format!(
                "{}{}/{}",
                layout.listing_root(),
                layout.assets_url,
                paths::clean_local_path(src)
            )
        });
        PostSummary {
            title: self.title.clone(),
            date: self.date.clone(),
            date_display: self.date_display.clone(),
            summary: self.summary.clone(),
            slug: self.slug.clone(),
            thumbnail,
        }
    }

    /// Fill the post template. Returns the output path (relative to the site
    /// root) and the finished page.
    pub fn render(
        &self,
        template: &str,
        components: &Components,
        layout: &Layout,
        year: i32,
    ) -> (PathBuf, template::Page) {
        let output = layout.post_output(&self.slug);
        let root = paths::compute_root(&output);
        let content = paths::rewrite_image_paths_with(&self.html, &root, &layout.assets_url);
        let toc = self
            .toc
            .as_deref()
            .map(|toc| toc_block(toc, &layout.toc_title))
            .unwrap_or_default();

        // Frontmatter text is escaped the same way listing tiles escape it
        let vars = Vars::globals(&root, year)
            .set("title", escape(&self.title))
            .set("date", escape(&self.date))
            .set("date_display", escape(&self.date_display))
            .set("toc", toc)
            .set("content", content);
        (output, template::render_page(template, components, &vars))
    }
}

fn escape(text: &str) -> String {
    html! { (text) }.into_string()
}

/// Wrap a table of contents in its navigation block.
pub fn toc_block(toc: &str, title: &str) -> String {
    html! {
        nav.toc aria-label="Table of contents" {
            h2 { (title) }
            (PreEscaped(toc))
        }
    }
    .into_string()
}

/// Markdown files directly in `posts_dir`, newest first (reverse lexical).
pub fn discover_posts(posts_dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(posts_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .map(|e| e.eq_ignore_ascii_case("md"))
                    .unwrap_or(false)
        })
        .collect();
    files.sort();
    files.reverse();
    Ok(files)
}

/// A post file that could not be converted.
#[derive(Debug)]
pub struct SkippedPost {
    pub source: PathBuf,
    pub error: FrontmatterError,
}

/// Every post in a posts directory, parsed but not yet written.
#[derive(Debug, Default)]
pub struct LoadedPosts {
    /// `(source file, post)` in build order.
    pub posts: Vec<(PathBuf, Post)>,
    pub skipped: Vec<SkippedPost>,
    /// Draft posts left out of the build.
    pub drafts: Vec<PathBuf>,
}

/// Read and parse every post. IO errors abort; frontmatter errors are
/// collected per file.
pub fn load_posts(posts_dir: &Path, include_drafts: bool) -> Result<LoadedPosts, ReadError> {
    let files = discover_posts(posts_dir).map_err(|source| ReadError {
        path: posts_dir.to_path_buf(),
        source,
    })?;

    let mut loaded = LoadedPosts::default();
    for source in files {
        let text = fs::read_to_string(&source).map_err(|e| ReadError {
            path: source.clone(),
            source: e,
        })?;
        let slug = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        match Post::parse(&slug, &text) {
            Ok(post) if post.draft && !include_drafts => loaded.drafts.push(source),
            Ok(post) => loaded.posts.push((source, post)),
            Err(error) => loaded.skipped.push(SkippedPost { source, error }),
        }
    }
    Ok(loaded)
}
