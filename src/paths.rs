//! Relative path arithmetic for generated pages.
//!
//! Output pages link to shared assets with relative URLs so the site works
//! from any mount point, including `file://`. Every page therefore needs its
//! own *root prefix*: `./` at the site root, `../` one directory down, and
//! so on.
//!
//! Post images are authored relative to the markdown file (`img/a.png`,
//! `./img/a.png`, `posts/img/a.png`). After the asset directories are
//! mirrored into the public assets location, those references are rewritten
//! to `{root}{assets_url}/img/a.png`.

use regex::{Captures, Regex};
use std::path::{Component, Path};
use std::sync::LazyLock;

/// Default URL segment (relative to the site root) of mirrored post assets.
pub const DEFAULT_ASSETS_URL: &str = "public/blog-files";

static IMG_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(<img[^>]+src=["'])([^"']+)(["'])"#).expect("valid img regex")
});

static LEADING_DOTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\.\./)*(\./)*").expect("valid prefix regex"));

const NON_LOCAL_PREFIXES: &[&str] = &["http://", "https://", "/", "#", "data:"];

/// Relative prefix from `output_path` (relative to the site root) back to the
/// root.
///
/// - `index.html` → `./`
/// - `pages/blog.html` → `../`
/// - `pages/blog/post.html` → `../../`
pub fn compute_root(output_path: &Path) -> String {
    let depth = output_path
        .parent()
        .map(|parent| {
            parent
                .components()
                .filter(|c| matches!(c, Component::Normal(_)))
                .count()
        })
        .unwrap_or(0);
    if depth == 0 {
        "./".to_string()
    } else {
        "../".repeat(depth)
    }
}

/// Whether an image src points at a file inside the site rather than a URL,
/// a root-relative path, a fragment, or inline data.
pub fn is_local_src(src: &str) -> bool {
    !NON_LOCAL_PREFIXES.iter().any(|p| src.starts_with(p))
}

/// Strip leading `../` and `./` segments, then one leading `posts/` segment.
pub fn clean_local_path(src: &str) -> &str {
    let stripped = LEADING_DOTS
        .find(src)
        .map(|m| &src[m.end()..])
        .unwrap_or(src);
    stripped.strip_prefix("posts/").unwrap_or(stripped)
}

/// Rewrite local `<img src>` references to the default public assets location.
pub fn rewrite_image_paths(html: &str, root: &str) -> String {
    rewrite_image_paths_with(html, root, DEFAULT_ASSETS_URL)
}

/// Rewrite local `<img src>` references to `{root}{assets_url}/{clean path}`.
///
/// Non-local references are passed through unchanged.
pub fn rewrite_image_paths_with(html: &str, root: &str, assets_url: &str) -> String {
    let assets_url = assets_url.trim_end_matches('/');
    IMG_SRC
        .replace_all(html, |caps: &Captures| {
            let src = &caps[2];
            if !is_local_src(src) {
                return caps[0].to_string();
            }
            format!(
                "{}{root}{assets_url}/{}{}",
                &caps[1],
                clean_local_path(src),
                &caps[3]
            )
        })
        .into_owned()
}

/// The first local image src in document order, before any rewriting.
pub fn extract_first_image_src(html: &str) -> Option<&str> {
    IMG_SRC
        .captures_iter(html)
        .filter_map(|caps| caps.get(2))
        .map(|m| m.as_str())
        .find(|src| is_local_src(src))
}

/// Relative URL prefix leading from pages in `from_dir` to files in `to_dir`,
/// both relative to the site root. Always ends with `/`.
///
/// - `pages` → `pages/blog` gives `./blog/`
/// - `pages` → `pages` gives `./`
/// - `pages/a` → `pages/b` gives `../b/`
pub fn relative_dir(from_dir: &Path, to_dir: &Path) -> String {
    let normal = |p: &Path| -> Vec<String> {
        p.components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect()
    };
    let from = normal(from_dir);
    let to = normal(to_dir);
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let ups = from.len() - common;
    let mut prefix = if ups == 0 {
        "./".to_string()
    } else {
        "../".repeat(ups)
    };
    for segment in &to[common..] {
        prefix.push_str(segment);
        prefix.push('/');
    }
    prefix
}
