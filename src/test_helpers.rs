//! Shared test utilities for the swifty test suite.
//!
//! Provides a sample project on [`MemoryStorage`], lookup helpers, bulk
//! extractors, and tree-shape assertions that work with the built [`Site`].
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let storage = sample_storage();
//! let site = build_sample(&storage);
//!
//! let post = find_page(&site, "/blog/post-one.html");
//! assert_eq!(post.title, "Post One");
//!
//! assert_tree_shape(&site, &[
//!     ("About", &[]),
//!     ("Blog", &["Post One"]),
//!     ("Welcome", &[]),
//!     ("All Tags", &["Pages tagged with Intro"]),
//! ]);
//! ```

use std::path::Path;

use crate::config::ConfigResolver;
use crate::scan::{self, Site};
use crate::storage::MemoryStorage;
use crate::types::{Link, Page, flatten};

// =========================================================================
// Fixture setup
// =========================================================================

/// Project root used by [`sample_storage`].
pub const SAMPLE_ROOT: &str = "site";

/// A small project: landing page, one top-level page, one tagged blog post.
///
/// ```text
/// site/
/// └── pages/
///     ├── index.md
///     ├── about.md
///     └── blog/
///         └── post-one.md     (tags: [intro])
/// ```
pub fn sample_storage() -> MemoryStorage {
    MemoryStorage::new()
        .with_file("site/pages/index.md", "---\ntitle: Welcome\n---\n# Hello\n")
        .with_file("site/pages/about.md", "About {{ sitename }}.\n")
        .with_file(
            "site/pages/blog/post-one.md",
            "---\ntags: [intro]\n---\nFirst post.\n",
        )
}

/// Build the pages tree of a project rooted at [`SAMPLE_ROOT`].
pub fn build_sample(storage: &MemoryStorage) -> Site {
    let root = Path::new(SAMPLE_ROOT);
    let resolver = ConfigResolver::load(storage, root).unwrap();
    scan::build(storage, &root.join("pages"), &resolver).unwrap()
}

// =========================================================================
// Site lookups: panic with a clear message on miss
// =========================================================================

/// Find a page anywhere in the site by URL. Panics if not found.
pub fn find_page<'a>(site: &'a Site, url: &str) -> &'a Page {
    site.lookup(url).unwrap_or_else(|| {
        let urls = all_urls(site);
        panic!("page '{url}' not found. Available: {urls:?}")
    })
}

// =========================================================================
// Bulk extractors
// =========================================================================

/// Every URL in pre-order.
pub fn all_urls(site: &Site) -> Vec<&str> {
    flatten(site.pages()).iter().map(|p| p.url.as_str()).collect()
}

/// Titles of a page list, in order.
pub fn page_titles(pages: &[Page]) -> Vec<&str> {
    pages.iter().map(|p| p.title.as_str()).collect()
}

/// Titles of a link list, in order.
pub fn link_titles(links: &[Link]) -> Vec<&str> {
    links.iter().map(|l| l.title.as_str()).collect()
}

// =========================================================================
// Tree helpers
// =========================================================================

/// Assert that the two top levels of the tree match an expected shape.
///
/// Each entry is `(title, children)`. Use `&[]` for documents.
pub fn assert_tree_shape(site: &Site, expected: &[(&str, &[&str])]) {
    let actual = page_titles(site.pages());
    let expected_titles: Vec<&str> = expected.iter().map(|(t, _)| *t).collect();
    assert_eq!(actual, expected_titles, "top-level titles mismatch");

    for ((title, children), page) in expected.iter().zip(site.pages()) {
        assert_eq!(
            page_titles(&page.pages),
            children.to_vec(),
            "children of '{title}' mismatch"
        );
    }
}
