//! # Postsmith
//!
//! A small blog generator for sites whose pages are otherwise written by hand.
//! Markdown posts with a frontmatter block become HTML pages built from a
//! post template, shared HTML fragments ("components") are injected into
//! every page, and a listing page shows one tile per post, newest first.
//!
//! # Build Sequence
//!
//! ```text
//! 1. Load      src/templates/, src/components/
//! 2. Assets    posts/<dir>/   →  public/blog-files/<dir>/
//! 3. Posts     posts/*.md     →  pages/blog/<slug>.html
//! 4. Listing   summaries      →  pages/blog.html
//! ```
//!
//! Every output location is configurable; see [`config`].
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | Orchestrates a build and reports what it did |
//! | [`frontmatter`] | `---` delimited `key: value` block at the top of a post |
//! | [`markdown`] | Markdown to HTML with heading anchors and a table of contents |
//! | [`posts`] | Post discovery, parsing, and page rendering |
//! | [`listing`] | Summary tiles and the listing page |
//! | [`components`] | `<!-- component:NAME -->` fragment injection |
//! | [`template`] | Single-pass `{{ name }}` placeholder filling |
//! | [`paths`] | Root prefixes and image path rewriting |
//! | [`assets`] | Mirrors post asset directories into the public tree |
//! | [`watch`] | Rebuild loop on file notifications, polling as fallback |
//! | [`config`] | `config.toml` loading, merging, and validation |
//! | [`types`] | Shared types (`PostSummary`, `Layout`) |
//! | [`dates`] | Display dates and the current year |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Templates Are Plain HTML
//!
//! Templates and components are the site's own HTML files with a handful of
//! placeholders, not a template language. There are no loops or conditionals:
//! anything repeated (listing tiles, the table of contents) is rendered with
//! [Maud](https://maud.lambda.xyz/) and inserted as a single value.
//!
//! ## Relative Links Everywhere
//!
//! Every page links to the rest of the site through `{{ root }}`, a relative
//! prefix computed from the page's own output path (`./`, `../`, `../../`).
//! The generated site works from any base URL and straight from disk.
//!
//! ## Full Rebuilds
//!
//! Every build regenerates every page. With a blog-sized input this is fast
//! enough that change tracking would cost more than it saves; the watch loop
//! only decides *when* to rebuild, never *what*.

pub mod assets;
pub mod components;
pub mod config;
pub mod dates;
pub mod frontmatter;
pub mod listing;
pub mod markdown;
pub mod output;
pub mod paths;
pub mod pipeline;
pub mod posts;
pub mod template;
pub mod types;
pub mod watch;

#[cfg(test)]
pub(crate) mod test_helpers;
