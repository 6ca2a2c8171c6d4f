//! Types shared between the post builder, the listing builder, and CLI output.

use crate::config::SiteConfig;
use crate::paths;
use serde::Serialize;
use std::path::{Component, Path, PathBuf};

/// One post as it appears on the listing page.
///
/// Collected while posts are built, in build order (newest first), and
/// serialized as-is by `check --json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostSummary {
    pub title: String,
    /// Raw frontmatter date, used for the `datetime` attribute.
    pub date: String,
    pub date_display: String,
    pub summary: String,
    /// Output file stem; the post lives at `{blog_output}/{slug}.html`.
    pub slug: String,
    /// Thumbnail URL relative to the listing page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

/// Output locations derived from the config, relative to the site root.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub blog_output: PathBuf,
    pub listing_output: PathBuf,
    /// URL segment of the mirrored assets, without surrounding slashes.
    pub assets_url: String,
    pub toc_title: String,
}

impl Layout {
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            blog_output: PathBuf::from(&config.paths.blog_output),
            listing_output: PathBuf::from(&config.paths.listing_output),
            assets_url: url_segment(&config.paths.assets_output),
            toc_title: config.posts.toc_title.clone(),
        }
    }

    /// `{blog_output}/{slug}.html`
    pub fn post_output(&self, slug: &str) -> PathBuf {
        self.blog_output.join(format!("{slug}.html"))
    }

    /// Root prefix of the listing page.
    pub fn listing_root(&self) -> String {
        paths::compute_root(&self.listing_output)
    }

    /// Link prefix from the listing page to the post pages.
    pub fn blog_href(&self) -> String {
        let listing_dir = self.listing_output.parent().unwrap_or(Path::new(""));
        paths::relative_dir(listing_dir, &self.blog_output)
    }
}

/// `./public/blog-files/` → `public/blog-files`
fn url_segment(dir: &str) -> String {
    Path::new(dir)
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
