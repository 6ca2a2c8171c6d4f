//! End-to-end builds of the fixture site through the public API.

use postsmith::config;
use postsmith::pipeline::{self, Project};
use postsmith::types::PostSummary;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use walkdir::WalkDir;

fn fixture_site() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let src = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    for entry in WalkDir::new(&src) {
        let entry = entry.unwrap();
        let target = tmp.path().join(entry.path().strip_prefix(&src).unwrap());
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).unwrap();
        } else {
            fs::copy(entry.path(), &target).unwrap();
        }
    }
    tmp
}

fn read(tmp: &TempDir, rel: &str) -> String {
    fs::read_to_string(tmp.path().join(rel)).unwrap()
}

#[test]
fn builds_fixture_site() {
    let tmp = fixture_site();
    let project = Project::load(tmp.path(), None).unwrap();
    let report = pipeline::build_for_year(&project, 2026).unwrap();

    assert_eq!(report.posts.len(), 3);
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].source.ends_with("2025-10-01-broken.md"));

    for slug in ["2026-02-01-hello", "2026-01-15-first-steps", "2025-11-03-no-frontmatter"] {
        assert!(tmp.path().join(format!("pages/blog/{slug}.html")).exists(), "{slug}");
    }
    assert!(!tmp.path().join("pages/blog/2025-10-01-broken.html").exists());
    assert!(!tmp.path().join("pages/blog/2026-03-01-draft-idea.html").exists());
}

#[test]
fn post_content_is_not_re_expanded() {
    let tmp = fixture_site();
    let project = Project::load(tmp.path(), None).unwrap();
    pipeline::build_for_year(&project, 2026).unwrap();

    let html = read(&tmp, "pages/blog/2026-01-15-first-steps.html");
    assert!(html.contains("<title>First Steps</title>"));
    assert!(html.contains("<code>{{ title }}</code>"));
    assert!(html.contains("src=\"https://example.com/badge.svg\""));
    assert!(html.contains("<table>"));
    assert!(html.contains("<del>no</del>"));
    // No headings, so no table of contents
    assert!(!html.contains("class=\"toc\""));
}

#[test]
fn post_without_frontmatter_uses_slug() {
    let tmp = fixture_site();
    let project = Project::load(tmp.path(), None).unwrap();
    pipeline::build_for_year(&project, 2026).unwrap();

    let html = read(&tmp, "pages/blog/2025-11-03-no-frontmatter.html");
    assert!(html.contains("<title>2025-11-03-no-frontmatter</title>"));
    assert!(html.contains("<h1 id=\"notes-without-metadata\">Notes Without Metadata</h1>"));
}

#[test]
fn listing_tiles_link_to_posts() {
    let tmp = fixture_site();
    let project = Project::load(tmp.path(), None).unwrap();
    pipeline::build_for_year(&project, 2026).unwrap();

    let html = read(&tmp, "pages/blog.html");
    assert_eq!(html.matches("class=\"post-tile\"").count(), 3);
    assert!(html.contains("<h3>First Steps</h3><p>Setting things up</p>"));
    assert!(html.contains(r#"<time datetime="2026-02-01">February 1, 2026</time>"#));
    assert!(html.contains(r#"href="../css/style.css""#));
}

#[test]
fn drafts_build_when_enabled() {
    let tmp = fixture_site();
    fs::write(tmp.path().join("config.toml"), "[posts]\ninclude_drafts = true\n").unwrap();
    let project = Project::load(tmp.path(), None).unwrap();
    let report = pipeline::build_for_year(&project, 2026).unwrap();

    assert_eq!(report.posts[0].slug, "2026-03-01-draft-idea");
    assert!(report.drafts.is_empty());
    assert!(read(&tmp, "pages/blog.html").contains("Draft Idea"));
}

#[test]
fn config_flag_points_elsewhere() {
    let tmp = fixture_site();
    let alt = tmp.path().join("alt.toml");
    fs::write(&alt, "[posts]\ntoc_title = \"Contents\"\n").unwrap();
    let project = Project::load(tmp.path(), Some(alt.as_path())).unwrap();
    pipeline::build_for_year(&project, 2026).unwrap();

    assert!(read(&tmp, "pages/blog/2026-02-01-hello.html").contains("<h2>Contents</h2>"));
}

#[test]
fn invalid_config_is_rejected() {
    let tmp = fixture_site();
    fs::write(tmp.path().join("config.toml"), "[paths]\nblog_output = \"../outside\"\n").unwrap();
    assert!(Project::load(tmp.path(), None).is_err());

    fs::write(tmp.path().join("config.toml"), "[paths]\nunknown = 1\n").unwrap();
    assert!(Project::load(tmp.path(), None).is_err());
}

#[test]
fn check_summaries_serialize_to_json() {
    let tmp = fixture_site();
    let project = Project::load(tmp.path(), None).unwrap();
    let report = pipeline::check(&project).unwrap();

    let json = serde_json::to_value(&report.summaries).unwrap();
    let first = &json[0];
    assert_eq!(first["slug"], "2026-02-01-hello");
    assert_eq!(first["date_display"], "February 1, 2026");
    assert_eq!(first["thumbnail"], "../public/blog-files/img/a.png");
    assert!(json[1].get("thumbnail").is_none());

    let titles: Vec<&str> = report.summaries.iter().map(|s: &PostSummary| s.title.as_str()).collect();
    assert_eq!(titles, vec!["Hello", "First Steps", "2025-11-03-no-frontmatter"]);
}

#[test]
fn stock_config_builds_same_site() {
    let tmp = fixture_site();
    fs::write(tmp.path().join("config.toml"), config::stock_config_toml()).unwrap();
    let project = Project::load(tmp.path(), None).unwrap();
    let report = pipeline::build_for_year(&project, 2026).unwrap();
    assert_eq!(report.listing, Path::new("pages/blog.html"));
}
