//! Project configuration.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults
//! describe the conventional project layout; a user config file only needs
//! the keys it wants to change.
//!
//! ## Config File Location
//!
//! Place `config.toml` in the project root (or pass `--config <file>`):
//!
//! ```text
//! project/
//! ├── config.toml              # Optional, overrides stock defaults
//! ├── src/components/          # Shared HTML fragments
//! ├── src/templates/           # post.html and blog.html
//! └── posts/                   # Markdown posts and their image directories
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [paths]
//! posts = "posts"
//! components = "src/components"
//! templates = "src/templates"
//! blog_output = "pages/blog"          # One HTML file per post
//! listing_output = "pages/blog.html"  # The listing page
//! assets_output = "public/blog-files" # Mirrored post image directories
//!
//! [templates]
//! post = "post.html"
//! listing = "blog.html"
//! strict = false            # Unresolved placeholders become build errors
//!
//! [posts]
//! toc_title = "Outline"
//! include_drafts = false
//!
//! [watch]
//! interval_ms = 1000
//! native = true             # OS file notifications, polling as fallback
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path};
use thiserror::Error;

/// Name of the config file looked up in the project root.
pub const CONFIG_FILENAME: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Where sources live and where output goes, relative to the project root.
    pub paths: PathsConfig,
    /// Template file names and unresolved-placeholder policy.
    pub templates: TemplatesConfig,
    /// Post rendering options.
    pub posts: PostsConfig,
    /// Watch mode settings.
    pub watch: WatchConfig,
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("paths.blog_output", &self.paths.blog_output),
            ("paths.listing_output", &self.paths.listing_output),
            ("paths.assets_output", &self.paths.assets_output),
        ] {
            if !is_plain_relative(value) {
                return Err(ConfigError::Validation(format!(
                    "{key} must be a relative path without '..' (got \"{value}\")"
                )));
            }
        }
        if !self.paths.listing_output.ends_with(".html") {
            return Err(ConfigError::Validation(
                "paths.listing_output must name an .html file".into(),
            ));
        }
        if self.templates.post.is_empty() || self.templates.listing.is_empty() {
            return Err(ConfigError::Validation(
                "templates.post and templates.listing must not be empty".into(),
            ));
        }
        if self.watch.interval_ms == 0 {
            return Err(ConfigError::Validation(
                "watch.interval_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Output locations are turned into relative URLs, so they must stay inside
/// the project root.
fn is_plain_relative(value: &str) -> bool {
    let path = Path::new(value);
    !value.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Source and output locations, relative to the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Markdown posts; immediate subdirectories are post assets.
    pub posts: String,
    /// Component fragments (`*.html`, keyed by file stem).
    pub components: String,
    /// Directory holding the post and listing templates.
    pub templates: String,
    /// Directory receiving one HTML file per post.
    pub blog_output: String,
    /// Path of the generated listing page.
    pub listing_output: String,
    /// Directory receiving mirrored post asset directories.
    pub assets_output: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            posts: "posts".to_string(),
            components: "src/components".to_string(),
            templates: "src/templates".to_string(),
            blog_output: "pages/blog".to_string(),
            listing_output: "pages/blog.html".to_string(),
            assets_output: "public/blog-files".to_string(),
        }
    }
}

/// Template file names inside `paths.templates`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplatesConfig {
    pub post: String,
    pub listing: String,
    /// Treat unknown `{{ name }}` placeholders and missing components as errors.
    pub strict: bool,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            post: "post.html".to_string(),
            listing: "blog.html".to_string(),
            strict: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PostsConfig {
    /// Heading shown above each post's table of contents.
    pub toc_title: String,
    /// Build posts marked `draft: true`.
    pub include_drafts: bool,
}

impl Default for PostsConfig {
    fn default() -> Self {
        Self {
            toc_title: "Outline".to_string(),
            include_drafts: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    /// Delay between filesystem scans, in milliseconds. With native
    /// notifications this is the quiet period that closes a batch.
    pub interval_ms: u64,
    /// Wake on OS file notifications instead of scanning on a timer.
    pub native: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            native: true,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// Base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(config_path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(config_path).map_err(|source| ConfigError::Io {
        path: config_path.to_path_buf(),
        source,
    })?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the given file, falling back to stock defaults when the
/// file is absent.
pub fn load_config(config_path: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(config_path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# postsmith configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Paths (relative to the project root)
# ---------------------------------------------------------------------------
[paths]
# Markdown posts. Every immediate subdirectory is mirrored as post assets.
posts = "posts"

# Shared HTML fragments, referenced as <!-- component:NAME -->.
components = "src/components"

# Directory holding the post and listing templates.
templates = "src/templates"

# One HTML file per post is written here.
blog_output = "pages/blog"

# The listing page with one tile per post.
listing_output = "pages/blog.html"

# Post image directories are copied here; local <img> paths point here.
assets_output = "public/blog-files"

# ---------------------------------------------------------------------------
# Templates
# ---------------------------------------------------------------------------
[templates]
post = "post.html"
listing = "blog.html"

# When true, unknown {{ name }} placeholders and missing components fail
# the build instead of being left in the output.
strict = false

# ---------------------------------------------------------------------------
# Posts
# ---------------------------------------------------------------------------
[posts]
# Heading shown above the table of contents.
toc_title = "Outline"

# Build posts whose frontmatter has `draft: true`.
include_drafts = false

# ---------------------------------------------------------------------------
# Watch mode
# ---------------------------------------------------------------------------
[watch]
# Delay between filesystem scans. With native notifications, how long the
# tree must stay quiet before a batch of changes is rebuilt.
interval_ms = 1000

# Use OS file notifications. Falls back to scanning when they are unavailable.
native = true
"##
}
