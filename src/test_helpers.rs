//! Shared test utilities.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let project = Project::load(tmp.path(), None).unwrap();
//! let report = build_for_year(&project, 2026).unwrap();
//!
//! let post = find_post(&report, "2026-02-01-hello");
//! assert_eq!(post.title, "Hello");
//! let html = read_output(&tmp, "pages/blog.html");
//! ```

use std::fs;
use std::path::Path;
use tempfile::TempDir;

use crate::pipeline::{BuildReport, BuiltPost};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/site/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Read a generated file, relative to the fixture root. Panics if missing.
pub fn read_output(tmp: &TempDir, rel: &str) -> String {
    fs::read_to_string(tmp.path().join(rel))
        .unwrap_or_else(|e| panic!("cannot read output '{rel}': {e}"))
}

// =========================================================================
// Report lookups
// =========================================================================

/// Find a built post by slug. Panics if not found.
pub fn find_post<'a>(report: &'a BuildReport, slug: &str) -> &'a BuiltPost {
    report
        .posts
        .iter()
        .find(|p| p.slug == slug)
        .unwrap_or_else(|| {
            let slugs = post_slugs(report);
            panic!("post '{slug}' not found. Available: {slugs:?}")
        })
}

/// All built post slugs in build order.
pub fn post_slugs(report: &BuildReport) -> Vec<&str> {
    report.posts.iter().map(|p| p.slug.as_str()).collect()
}
