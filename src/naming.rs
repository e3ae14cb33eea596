//! Centralized naming rules: titles, routes and URLs.
//!
//! Every page's identity is derived from its path relative to the pages root:
//!
//! | Source                  | `path`             | `url`                   |
//! |-------------------------|--------------------|-------------------------|
//! | `index.md`              | `/`                | `/`                     |
//! | `about.md`              | `/about`           | `/about.html`           |
//! | `blog/` (folder)        | `/blog`            | `/blog.html`            |
//! | `blog/post-one.md`      | `/blog/post-one`   | `/blog/post-one.html`   |
//! | `blog/index.md`         | `/blog/`           | `/blog/`                |
//!
//! A folder's own page lives next to the folder (`blog.html`), its children
//! inside it (`blog/post-one.html`). An `index` document stands for the folder
//! that contains it and is written as `index.html` inside that folder.
//!
//! ## Display Titles
//!
//! Dashes become spaces and every word is capitalized:
//! - `post-one` → "Post One"
//! - `blog` → "Blog"

use std::path::Path;

/// File stem that marks a folder's landing document.
pub const INDEX_STEM: &str = "index";

/// Turn a file stem into a display title.
///
/// - `"post-one"` → `"Post One"`
/// - `"hello_world"` → `"Hello_world"` (underscores are part of the word)
/// - `"already Fine"` → `"Already Fine"`
pub fn title_from_stem(stem: &str) -> String {
    capitalize_words(&stem.replace('-', " "))
}

/// Uppercase the first letter of every word, leaving the rest untouched.
pub fn capitalize_words(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if at_word_start && c.is_alphanumeric() {
            out.extend(c.to_uppercase());
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = !(c.is_alphanumeric() || c == '_');
        }
    }
    out
}

/// Slash-separated route of `path` relative to `base`.
///
/// Documents lose their extension, folders keep their full name:
/// `pages/blog/post-one.md` under `pages` → `"blog/post-one"`.
pub fn relative_route(path: &Path, base: &Path, is_dir: bool) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    let mut parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if !is_dir
        && let Some(last) = parts.last_mut()
        && let Some(stem) = Path::new(last.as_str()).file_stem()
    {
        *last = stem.to_string_lossy().into_owned();
    }
    parts.join("/")
}

/// Logical path for a route: `"blog/post-one"` → `"/blog/post-one"`.
pub fn route_path(route: &str) -> String {
    format!("/{}", route.trim_start_matches('/'))
}

/// URL of a regular page or folder: `"blog/post-one"` → `"/blog/post-one.html"`.
pub fn page_url(route: &str) -> String {
    format!("{}.html", route_path(route))
}

/// URL of an `index` document: the route of the folder containing it, with a
/// trailing slash. `"index"` → `"/"`, `"blog/index"` → `"/blog/"`.
pub fn index_url(route: &str) -> String {
    match route.rsplit_once('/') {
        Some((folder, _)) => format!("/{}/", folder.trim_start_matches('/')),
        None => "/".to_string(),
    }
}

/// URL-safe form of a tag: lowercase, runs of other characters become one dash.
///
/// - `"Rust"` → `"rust"`
/// - `"Web Dev!"` → `"web-dev"`
pub fn tag_slug(tag: &str) -> String {
    let mut slug = String::with_capacity(tag.len());
    let mut pending_dash = false;
    for c in tag.trim().chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// URL of the listing page for one tag.
pub fn tag_url(tag: &str) -> String {
    format!("/tags/{}.html", tag_slug(tag))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_dashes_become_spaces() {
        assert_eq!(title_from_stem("post-one"), "Post One");
    }

    #[test]
    fn title_single_word() {
        assert_eq!(title_from_stem("blog"), "Blog");
    }

    #[test]
    fn title_keeps_existing_capitals() {
        assert_eq!(title_from_stem("my-GitHub-page"), "My GitHub Page");
    }

    #[test]
    fn title_underscore_is_word_character() {
        assert_eq!(title_from_stem("hello_world"), "Hello_world");
    }

    #[test]
    fn title_digits_start_words() {
        assert_eq!(title_from_stem("2024-recap"), "2024 Recap");
    }

    #[test]
    fn capitalize_words_after_punctuation() {
        assert_eq!(capitalize_words("rock'n roll"), "Rock'N Roll");
    }

    #[test]
    fn relative_route_strips_base_and_extension() {
        assert_eq!(
            relative_route(Path::new("pages/blog/post-one.md"), Path::new("pages"), false),
            "blog/post-one"
        );
    }

    #[test]
    fn relative_route_folder() {
        assert_eq!(
            relative_route(Path::new("pages/blog"), Path::new("pages"), true),
            "blog"
        );
        assert_eq!(
            relative_route(Path::new("pages/v1.2"), Path::new("pages"), true),
            "v1.2"
        );
    }

    #[test]
    fn relative_route_keeps_dots_in_folder_names() {
        assert_eq!(
            relative_route(Path::new("pages/v1.2/notes.md"), Path::new("pages"), false),
            "v1.2/notes"
        );
    }

    #[test]
    fn urls_for_pages_and_folders() {
        assert_eq!(route_path("blog/post-one"), "/blog/post-one");
        assert_eq!(page_url("about"), "/about.html");
        assert_eq!(page_url("blog"), "/blog.html");
    }

    #[test]
    fn index_urls() {
        assert_eq!(index_url("index"), "/");
        assert_eq!(index_url("blog/index"), "/blog/");
        assert_eq!(index_url("a/b/index"), "/a/b/");
    }

    #[test]
    fn tag_slugs() {
        assert_eq!(tag_slug("Rust"), "rust");
        assert_eq!(tag_slug("Web Dev!"), "web-dev");
        assert_eq!(tag_slug("  c++ tips "), "c-tips");
        assert_eq!(tag_url("intro"), "/tags/intro.html");
    }
}
