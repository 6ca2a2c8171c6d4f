//! Listing page: one tile per post, newest first.

use crate::components::Components;
use crate::template::{self, Page, Vars};
use crate::types::{Layout, PostSummary};
use maud::{Markup, html};

/// Renders one summary tile linking to the post page.
pub fn render_tile(post: &PostSummary, blog_href: &str) -> Markup {
    html! {
        a.post-tile href={ (blog_href) (post.slug) ".html" } {
            article {
                @if let Some(thumb) = &post.thumbnail {
                    img.post-tile-thumb src=(thumb) alt="" loading="lazy";
                }
                div.post-tile-text {
                    @if !post.date.is_empty() {
                        time datetime=(post.date) { (post.date_display) }
                    }
                    h3 { (post.title) }
                    p { (post.summary) }
                }
            }
        }
    }
}

/// All tiles, one per line, in the order given.
pub fn render_tiles(posts: &[PostSummary], blog_href: &str) -> String {
    posts
        .iter()
        .map(|post| render_tile(post, blog_href).into_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fill the listing template with the tiles for `posts`.
pub fn render_listing(
    posts: &[PostSummary],
    template: &str,
    components: &Components,
    layout: &Layout,
    year: i32,
) -> Page {
    let tiles = render_tiles(posts, &layout.blog_href());
    let vars = Vars::globals(&layout.listing_root(), year).set("post_tiles", tiles);
    template::render_page(template, components, &vars)
}
