//! Build orchestration.
//!
//! A build runs strictly in sequence:
//!
//! ```text
//! 1. Load      templates + components
//! 2. Assets    posts/<dir>/   →  {assets_output}/<dir>/
//! 3. Posts     posts/*.md     →  {blog_output}/<slug>.html
//! 4. Listing   summaries      →  {listing_output}
//! ```
//!
//! Any filesystem error aborts the run and names the offending path. Nothing
//! is rolled back: a failure halfway through leaves a mix of old and new
//! pages. A post with broken frontmatter is skipped and reported instead.

use crate::assets::{self, AssetError};
use crate::components::{self, Components};
use crate::config::{self, ConfigError, SiteConfig};
use crate::dates;
use crate::listing;
use crate::posts::{self, ReadError, SkippedPost};
use crate::template::Page;
use crate::types::{Layout, PostSummary};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("{}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("{}: unresolved {}", .page.display(), .names.join(", "))]
    Unresolved { page: PathBuf, names: Vec<String> },
}

impl BuildError {
    /// Attach `path` to an IO error.
    pub fn io_at(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| BuildError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl From<AssetError> for BuildError {
    fn from(err: AssetError) -> Self {
        BuildError::Io {
            path: err.path,
            source: err.source,
        }
    }
}

impl From<ReadError> for BuildError {
    fn from(err: ReadError) -> Self {
        BuildError::Io {
            path: err.path,
            source: err.source,
        }
    }
}

/// A site project: a root directory plus its configuration.
#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub config: SiteConfig,
    /// Config file location, watched for changes even when absent.
    pub config_path: PathBuf,
}

impl Project {
    /// Load `config_path` (default `<root>/config.toml`) over stock defaults.
    pub fn load(root: &Path, config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| root.join(config::CONFIG_FILENAME));
        let config = config::load_config(&config_path)?;
        Ok(Self {
            root: root.to_path_buf(),
            config,
            config_path,
        })
    }

    pub fn new(root: &Path, config: SiteConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            config_path: root.join(config::CONFIG_FILENAME),
            config,
        }
    }

    pub fn posts_dir(&self) -> PathBuf {
        self.root.join(&self.config.paths.posts)
    }

    pub fn components_dir(&self) -> PathBuf {
        self.root.join(&self.config.paths.components)
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.root.join(&self.config.paths.templates)
    }

    pub fn layout(&self) -> Layout {
        Layout::from_config(&self.config)
    }

    /// Everything whose change should trigger a rebuild.
    pub fn watch_paths(&self) -> Vec<PathBuf> {
        let mut paths = vec![
            self.posts_dir(),
            self.components_dir(),
            self.templates_dir(),
            self.config_path.clone(),
        ];
        paths.dedup();
        paths
    }
}

/// One generated post page.
#[derive(Debug, Clone)]
pub struct BuiltPost {
    pub slug: String,
    pub title: String,
    pub source: PathBuf,
    /// Relative to the project root.
    pub output: PathBuf,
}

/// A gap left in a generated page.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    UnresolvedVariable { page: PathBuf, name: String },
    MissingComponent { page: PathBuf, name: String },
}

/// Everything a build did, for display.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Mirrored asset directory names.
    pub assets: Vec<String>,
    pub posts: Vec<BuiltPost>,
    pub skipped: Vec<SkippedPost>,
    pub drafts: Vec<PathBuf>,
    /// Listing output path and the summaries it shows.
    pub listing: PathBuf,
    pub summaries: Vec<PostSummary>,
    pub warnings: Vec<Warning>,
}

/// Run a full build with the current year.
pub fn build(project: &Project) -> Result<BuildReport, BuildError> {
    build_for_year(project, dates::current_year())
}

/// Run a full build with a fixed `{{ year }}`.
pub fn build_for_year(project: &Project, year: i32) -> Result<BuildReport, BuildError> {
    let layout = project.layout();
    let strict = project.config.templates.strict;
    let templates_dir = project.templates_dir();
    let post_template = read_template(&templates_dir.join(&project.config.templates.post))?;
    let listing_template = read_template(&templates_dir.join(&project.config.templates.listing))?;

    let components_dir = project.components_dir();
    let components =
        components::load_components(&components_dir).map_err(BuildError::io_at(&components_dir))?;

    let mut report = BuildReport::default();

    let posts_dir = project.posts_dir();
    let assets_dir = project.root.join(&layout.assets_url);
    report.assets = assets::copy_post_assets(&posts_dir, &assets_dir)?;

    let loaded = posts::load_posts(&posts_dir, project.config.posts.include_drafts)?;
    report.skipped = loaded.skipped;
    report.drafts = loaded.drafts;

    for (source, post) in &loaded.posts {
        let (output, page) = post.render(&post_template, &components, &layout, year);
        check_page(&output, &page, strict, &mut report.warnings)?;
        write_page(&project.root, &output, &page.html)?;

        report.summaries.push(post.summary(&layout));
        report.posts.push(BuiltPost {
            slug: post.slug.clone(),
            title: post.title.clone(),
            source: source.clone(),
            output,
        });
    }

    let page = listing::render_listing(
        &report.summaries,
        &listing_template,
        &components,
        &layout,
        year,
    );
    check_page(&layout.listing_output, &page, strict, &mut report.warnings)?;
    write_page(&project.root, &layout.listing_output, &page.html)?;
    report.listing = layout.listing_output.clone();

    Ok(report)
}

/// Result of validating a project without writing anything.
#[derive(Debug, Default)]
pub struct CheckReport {
    pub summaries: Vec<PostSummary>,
    pub skipped: Vec<SkippedPost>,
    pub drafts: Vec<PathBuf>,
}

impl CheckReport {
    pub fn is_ok(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Parse every post and confirm the templates and components are readable.
pub fn check(project: &Project) -> Result<CheckReport, BuildError> {
    let templates_dir = project.templates_dir();
    read_template(&templates_dir.join(&project.config.templates.post))?;
    read_template(&templates_dir.join(&project.config.templates.listing))?;
    let components_dir = project.components_dir();
    components::load_components(&components_dir).map_err(BuildError::io_at(&components_dir))?;

    let layout = project.layout();
    let loaded = posts::load_posts(&project.posts_dir(), project.config.posts.include_drafts)?;
    Ok(CheckReport {
        summaries: loaded.posts.iter().map(|(_, p)| p.summary(&layout)).collect(),
        skipped: loaded.skipped,
        drafts: loaded.drafts,
    })
}

fn read_template(path: &Path) -> Result<String, BuildError> {
    fs::read_to_string(path).map_err(BuildError::io_at(path))
}

/// Turn page gaps into warnings, or into an error in strict mode.
fn check_page(
    output: &Path,
    page: &Page,
    strict: bool,
    warnings: &mut Vec<Warning>,
) -> Result<(), BuildError> {
    if strict && (!page.unresolved.is_empty() || !page.missing_components.is_empty()) {
        let names = page
            .unresolved
            .iter()
            .map(|n| format!("{{{{ {n} }}}}"))
            .chain(page.missing_components.iter().map(|n| format!("component:{n}")))
            .collect();
        return Err(BuildError::Unresolved {
            page: output.to_path_buf(),
            names,
        });
    }
    warnings.extend(page.unresolved.iter().map(|name| Warning::UnresolvedVariable {
        page: output.to_path_buf(),
        name: name.clone(),
    }));
    warnings.extend(
        page.missing_components
            .iter()
            .map(|name| Warning::MissingComponent {
                page: output.to_path_buf(),
                name: name.clone(),
            }),
    );
    Ok(())
}

/// Write `html` to `root/output`, creating parent directories.
fn write_page(root: &Path, output: &Path, html: &str) -> Result<(), BuildError> {
    let dest = root.join(output);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(BuildError::io_at(parent))?;
    }
    fs::write(&dest, html).map_err(BuildError::io_at(&dest))
}
