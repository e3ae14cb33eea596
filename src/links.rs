//! Link markup shared by the tree builder and the renderer.
//!
//! Every internal link targets the `content` turbo frame and advances
//! browser history, so the client-side router can swap page fragments
//! in place:
//!
//! ```html
//! <a href="/about.html" data-turbo-frame="content" data-turbo-action="advance">About</a>
//! ```
//!
//! Titles are escaped by maud.

use crate::naming;
use crate::types::{Link, TagEntry};
use maud::{Markup, PreEscaped, html};

/// Separator between breadcrumb links.
pub const BREADCRUMB_SEPARATOR: &str = " &raquo; ";

/// One frame-targeted link.
pub fn link(link: &Link) -> Markup {
    html! {
        a href=(link.url) data-turbo-frame="content" data-turbo-action="advance" { (link.title) }
    }
}

/// Links concatenated without separators.
pub fn link_list(links: &[Link]) -> String {
    html! {
        @for l in links {
            (link(l))
        }
    }
    .into_string()
}

fn crumb(url: &str, title: &str) -> Markup {
    html! {
        a.breadcrumb href=(url) data-turbo-frame="content" data-turbo-action="advance" { (title) }
    }
}

/// The lone "Home" crumb.
pub fn home_crumb() -> String {
    crumb("/", "Home").into_string()
}

/// Breadcrumb trail for a page.
///
/// Index pages get just "Home". Every other page extends its parent's trail
/// (or "Home" at the top level) with a crumb for itself.
pub fn breadcrumbs(parent_trail: Option<&str>, page: &Link, is_index: bool) -> String {
    if is_index {
        return home_crumb();
    }
    let home = home_crumb();
    let trail = parent_trail.unwrap_or(&home);
    html! {
        (PreEscaped(trail))
        (PreEscaped(BREADCRUMB_SEPARATOR))
        (crumb(&page.url, &page.title))
    }
    .into_string()
}

/// Tag chips linking to each tag's listing page; empty without tags.
pub fn tag_links(tags: &[String]) -> String {
    if tags.is_empty() {
        return String::new();
    }
    html! {
        div.tags {
            @for tag in tags {
                a.tag
                    href=(naming::tag_url(tag))
                    data-turbo-frame="content"
                    data-turbo-action="advance" { (tag) }
            }
        }
    }
    .into_string()
}

/// Folder index body: one `date: link` item per child, in the given order.
pub fn dated_listing<'a>(items: impl IntoIterator<Item = (&'a str, Link)>) -> String {
    html! {
        ul {
            @for (date, item) in items {
                li { (date) ": " (link(&item)) }
            }
        }
    }
    .into_string()
}

/// Tag page body: the tagged pages as a plain list.
pub fn tagged_listing(entries: &[TagEntry]) -> String {
    html! {
        ul {
            @for entry in entries {
                li {
                    (link(&Link { title: entry.title.clone(), url: entry.url.clone() }))
                }
            }
        }
    }
    .into_string()
}

/// Landing page navigation: "Home" first, then the given links.
pub fn navigation(links: &[Link]) -> String {
    html! {
        nav {
            (link(&Link { title: "Home".to_string(), url: "/".to_string() }))
            @for l in links {
                (link(l))
            }
        }
    }
    .into_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l(title: &str, url: &str) -> Link {
        Link {
            title: title.to_string(),
            url: url.to_string(),
        }
    }

    #[test]
    fn link_carries_turbo_attributes() {
        let html = link(&l("About", "/about.html")).into_string();
        assert_eq!(
            html,
            r#"<a href="/about.html" data-turbo-frame="content" data-turbo-action="advance">About</a>"#
        );
    }

    #[test]
    fn link_title_is_escaped() {
        let html = link(&l("<b>x</b>", "/x.html")).into_string();
        assert!(html.contains("&lt;b&gt;x&lt;/b&gt;"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn index_breadcrumb_is_home_only() {
        let crumbs = breadcrumbs(Some("ignored"), &l("Index", "/"), true);
        assert_eq!(crumbs, home_crumb());
    }

    #[test]
    fn top_level_breadcrumb_starts_at_home() {
        let crumbs = breadcrumbs(None, &l("Blog", "/blog.html"), false);
        assert!(crumbs.starts_with(&home_crumb()));
        assert!(crumbs.contains(" &raquo; "));
        assert!(crumbs.ends_with(">Blog</a>"));
    }

    #[test]
    fn nested_breadcrumb_extends_parent_trail() {
        let blog = breadcrumbs(None, &l("Blog", "/blog.html"), false);
        let post = breadcrumbs(Some(&blog), &l("Post One", "/blog/post-one.html"), false);
        assert!(post.starts_with(&blog));
        assert_eq!(post.matches("class=\"breadcrumb\"").count(), 3);
    }

    #[test]
    fn tag_links_empty_without_tags() {
        assert_eq!(tag_links(&[]), "");
    }

    #[test]
    fn tag_links_point_at_tag_pages() {
        let html = tag_links(&["Web Dev".to_string()]);
        assert!(html.starts_with(r#"<div class="tags">"#));
        assert!(html.contains(r#"href="/tags/web-dev.html""#));
        assert!(html.contains(">Web Dev</a>"));
    }

    #[test]
    fn dated_listing_keeps_order() {
        let html = dated_listing(vec![
            ("Mon", l("B", "/b.html")),
            ("Tue", l("A", "/a.html")),
        ]);
        let b = html.find("/b.html").unwrap();
        let a = html.find("/a.html").unwrap();
        assert!(b < a);
        assert!(html.contains("<li>Mon: <a"));
    }

    #[test]
    fn navigation_starts_with_home() {
        let html = navigation(&[l("About", "/about.html")]);
        assert!(html.starts_with(r#"<nav><a href="/""#));
        assert!(html.contains("/about.html"));
    }
}
