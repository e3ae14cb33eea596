//! Template engine: partials, placeholders and layouts.
//!
//! Page bodies, partials and layouts share one token syntax:
//!
//! ```text
//! {{ key }}            value of `key` from the page's values, verbatim if unknown
//! {{partial: footer}}  partials/footer.md, expanded and converted to HTML
//! {{ content }}        layouts only: where the page's content goes
//! ```
//!
//! Placeholders are substituted in the text around each partial token and the
//! partial's HTML is spliced in afterwards. A partial is expanded the same way
//! against the same values before its markdown is converted, so partials may
//! use placeholders and nested partials. Text inside triple-backtick fences,
//! in the page or in any partial, is never touched, so code samples can show
//! `{{ }}` literally.
//!
//! A missing partial becomes a visible `Include "name" not found.` paragraph;
//! a missing layout means no layout. Both are logged and never fail a page.

use crate::config::{ConfigMap, value_to_string};
use crate::storage::Storage;
use pulldown_cmark::{Options, Parser, html as md_html};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, PoisonError};
use tracing::warn;

/// Nesting limit for partials including partials.
pub const MAX_PARTIAL_DEPTH: usize = 16;

const FENCE: &str = "```";

static PARTIAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*partial:\s*([\w-]+)\s*\}\}").unwrap());

static VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([^}\s]+)\s*\}\}").unwrap());

static CONTENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*content\s*\}\}").unwrap());

/// A layout split at its content marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub before: String,
    pub after: String,
}

impl Layout {
    /// Split `text` at the first `{{ content }}` marker.
    ///
    /// Without a marker the whole text is `before`.
    pub fn parse(text: &str) -> (Self, bool) {
        match CONTENT_RE.find(text) {
            Some(m) => (
                Self {
                    before: text[..m.start()].to_string(),
                    after: text[m.end()..].to_string(),
                },
                true,
            ),
            None => (
                Self {
                    before: text.to_string(),
                    after: String::new(),
                },
                false,
            ),
        }
    }
}

/// Template engine bound to a project's partials and layouts directories.
///
/// Layouts are read once per engine and cached; create one engine per build.
pub struct Templates<'a, S: Storage + ?Sized> {
    storage: &'a S,
    partials_dir: PathBuf,
    layouts_dir: PathBuf,
    layouts: Mutex<HashMap<String, Option<Layout>>>,
}

impl<'a, S: Storage + ?Sized> Templates<'a, S> {
    pub fn new(storage: &'a S, partials_dir: &Path, layouts_dir: &Path) -> Self {
        Self {
            storage,
            partials_dir: partials_dir.to_path_buf(),
            layouts_dir: layouts_dir.to_path_buf(),
            layouts: Mutex::new(HashMap::new()),
        }
    }

    /// Substitute placeholders and include partials.
    pub fn expand(&self, text: &str, values: &ConfigMap) -> String {
        self.expand_at(text, values, 0)
    }

    /// Expand a page body and convert it to HTML.
    pub fn render_markdown(&self, text: &str, values: &ConfigMap) -> String {
        markdown_to_html(&self.expand(text, values))
    }

    /// Placeholders are substituted in the text around each partial token,
    /// then the partial's finished HTML is spliced in. Spliced HTML is never
    /// scanned again, so fences inside a partial keep their `{{ }}` tokens.
    fn expand_at(&self, text: &str, values: &ConfigMap, depth: usize) -> String {
        map_unfenced(text, |segment| {
            let mut out = String::with_capacity(segment.len());
            let mut last = 0;
            for caps in PARTIAL_RE.captures_iter(segment) {
                let Some(token) = caps.get(0) else { continue };
                out.push_str(&replace_values(&segment[last..token.start()], values));
                out.push_str(&self.partial(&caps[1], values, depth));
                last = token.end();
            }
            out.push_str(&replace_values(&segment[last..], values));
            out
        })
    }

    /// Rendered HTML of one partial, or the visible not-found placeholder.
    fn partial(&self, name: &str, values: &ConfigMap, depth: usize) -> String {
        if depth >= MAX_PARTIAL_DEPTH {
            warn!(partial = name, depth, "Partial nesting too deep");
            return missing_partial(name);
        }
        let path = self.partials_dir.join(format!("{name}.md"));
        match self.storage.read_to_string(&path) {
            Ok(body) => markdown_to_html(&self.expand_at(&body, values, depth + 1)),
            Err(e) => {
                warn!(partial = name, path = %path.display(), error = %e, "Partial not found");
                missing_partial(name)
            }
        }
    }

    /// Layout called `name`, read through the cache.
    pub fn layout(&self, name: &str) -> Option<Layout> {
        let mut cache = self.layouts.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = cache.get(name) {
            return cached.clone();
        }
        let loaded = self.load_layout(name);
        cache.insert(name.to_string(), loaded.clone());
        loaded
    }

    fn load_layout(&self, name: &str) -> Option<Layout> {
        let path = self.layouts_dir.join(format!("{name}.html"));
        let text = match self.storage.read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    layout = name,
                    path = %path.display(),
                    error = %e,
                    "Layout not found, rendering without layout"
                );
                return None;
            }
        };
        let (layout, has_marker) = Layout::parse(&text);
        if !has_marker {
            warn!(layout = name, "Layout has no {{{{ content }}}} marker, content goes after it");
        }
        Some(layout)
    }

    /// Expanded `(before, after)` fragments of a layout, empty without one.
    pub fn layout_parts(&self, name: Option<&str>, values: &ConfigMap) -> (String, String) {
        match name.and_then(|n| self.layout(n)) {
            Some(layout) => (
                self.expand(&layout.before, values),
                self.expand(&layout.after, values),
            ),
            None => (String::new(), String::new()),
        }
    }
}

fn missing_partial(name: &str) -> String {
    format!("<p>Include \"{name}\" not found.</p>")
}

/// Replace known `{{ key }}` tokens outside code fences.
///
/// Unknown keys stay verbatim.
pub fn substitute_values(text: &str, values: &ConfigMap) -> String {
    map_unfenced(text, |segment| replace_values(segment, values))
}

fn replace_values(segment: &str, values: &ConfigMap) -> String {
    VALUE_RE
        .replace_all(segment, |caps: &Captures| match values.get(&caps[1]) {
            Some(value) => value_to_string(value),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Apply `f` to every part of `text` outside triple-backtick fences.
///
/// Fences are copied through unchanged, delimiters included. An unclosed
/// fence protects everything after it.
fn map_unfenced(text: &str, mut f: impl FnMut(&str) -> String) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find(FENCE) {
        out.push_str(&f(&rest[..open]));
        let inner = &rest[open + FENCE.len()..];
        let Some(close) = inner.find(FENCE) else {
            out.push_str(&rest[open..]);
            return out;
        };
        let end = open + FENCE.len() + close + FENCE.len();
        out.push_str(&rest[open..end]);
        rest = &rest[end..];
    }
    out.push_str(&f(rest));
    out
}

/// CommonMark to HTML with tables, strikethrough and task lists.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    let parser = Parser::new_ext(markdown, options);
    let mut html = String::with_capacity(markdown.len() * 3 / 2);
    md_html::push_html(&mut html, parser);
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use serde_json::json;

    fn values(value: serde_json::Value) -> ConfigMap {
        match value {
            serde_json::Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    fn engine(storage: &MemoryStorage) -> Templates<'_, MemoryStorage> {
        Templates::new(storage, Path::new("partials"), Path::new("layouts"))
    }

    // =========================================================================
    // Value substitution
    // =========================================================================

    #[test]
    fn substitutes_known_keys() {
        let v = values(json!({"author": "Ada", "count": 3}));
        assert_eq!(
            substitute_values("By {{ author }} ({{count}})", &v),
            "By Ada (3)"
        );
    }

    #[test]
    fn unknown_keys_stay_verbatim() {
        let v = values(json!({}));
        assert_eq!(substitute_values("Hi {{ nobody }}!", &v), "Hi {{ nobody }}!");
    }

    #[test]
    fn null_substitutes_empty() {
        let v = values(json!({"author": null}));
        assert_eq!(substitute_values("[{{author}}]", &v), "[]");
    }

    #[test]
    fn fenced_code_is_untouched() {
        let v = values(json!({"x": "X"}));
        let text = "{{x}}\n```\n{{x}}\n```\n{{x}}";
        assert_eq!(substitute_values(text, &v), "X\n```\n{{x}}\n```\nX");
    }

    #[test]
    fn unclosed_fence_protects_the_rest() {
        let v = values(json!({"x": "X"}));
        assert_eq!(substitute_values("{{x}} ``` {{x}}", &v), "X ``` {{x}}");
    }

    #[test]
    fn fenced_value_survives_markdown() {
        let storage = MemoryStorage::new();
        let v = values(json!({"x": "X"}));
        let html = engine(&storage).render_markdown("```\n{{x}}\n```\n", &v);
        assert!(html.contains("{{x}}"));
        assert!(!html.contains('X'));
    }

    // =========================================================================
    // Partials
    // =========================================================================

    #[test]
    fn partial_is_expanded_and_converted() {
        let storage = MemoryStorage::new().with_file("partials/footer.md", "*by {{ author }}*");
        let v = values(json!({"author": "Ada"}));
        let out = engine(&storage).expand("before\n\n{{partial: footer}}", &v);
        assert!(out.contains("<p><em>by Ada</em></p>"));
        assert!(out.starts_with("before"));
    }

    #[test]
    fn nested_partials() {
        let storage = MemoryStorage::new()
            .with_file("partials/outer.md", "outer {{partial: inner}}")
            .with_file("partials/inner.md", "inner");
        let out = engine(&storage).expand("{{partial:outer}}", &ConfigMap::new());
        assert!(out.contains("outer"));
        assert!(out.contains("inner"));
    }

    #[test]
    fn missing_partial_is_visible() {
        let storage = MemoryStorage::new();
        let out = engine(&storage).expand("{{ partial: nav-bar }}", &ConfigMap::new());
        assert_eq!(out, "<p>Include \"nav-bar\" not found.</p>");
    }

    #[test]
    fn self_including_partial_terminates() {
        let storage = MemoryStorage::new().with_file("partials/loop.md", "again {{partial: loop}}");
        let out = engine(&storage).expand("{{partial: loop}}", &ConfigMap::new());
        assert!(out.contains("Include \"loop\" not found."));
    }

    #[test]
    fn fenced_value_inside_partial_is_untouched() {
        let storage = MemoryStorage::new().with_file("partials/snippet.md", "```\n{{ x }}\n```\n");
        let v = values(json!({"x": "X"}));
        let html = engine(&storage).render_markdown("{{ x }}\n\n{{partial: snippet}}", &v);
        assert!(html.contains("<pre><code>{{ x }}\n</code></pre>"));
        assert!(html.starts_with("<p>X</p>"));
    }

    #[test]
    fn value_containing_partial_token_is_not_included() {
        let storage = MemoryStorage::new().with_file("partials/footer.md", "FOOTER");
        let v = values(json!({"x": "{{partial: footer}}"}));
        let out = engine(&storage).expand("{{ x }}", &v);
        assert_eq!(out, "{{partial: footer}}");
    }

    #[test]
    fn partial_inside_fence_is_untouched() {
        let storage = MemoryStorage::new().with_file("partials/footer.md", "FOOTER");
        let text = "```\n{{partial: footer}}\n```";
        assert_eq!(engine(&storage).expand(text, &ConfigMap::new()), text);
    }

    // =========================================================================
    // Layouts
    // =========================================================================

    #[test]
    fn layout_splits_at_marker() {
        let (layout, found) = Layout::parse("<main>{{ content }}</main>");
        assert!(found);
        assert_eq!(layout.before, "<main>");
        assert_eq!(layout.after, "</main>");
    }

    #[test]
    fn layout_without_marker_is_all_before() {
        let (layout, found) = Layout::parse("<header></header>");
        assert!(!found);
        assert_eq!(layout.before, "<header></header>");
        assert_eq!(layout.after, "");
    }

    #[test]
    fn layout_parts_are_expanded() {
        let storage = MemoryStorage::new()
            .with_file("layouts/post.html", "<h1>{{title}}</h1>{{content}}<p>{{author}}</p>");
        let v = values(json!({"title": "Hello", "author": "Ada"}));
        let (before, after) = engine(&storage).layout_parts(Some("post"), &v);
        assert_eq!(before, "<h1>Hello</h1>");
        assert_eq!(after, "<p>Ada</p>");
    }

    #[test]
    fn missing_layout_is_empty() {
        let storage = MemoryStorage::new();
        let (before, after) = engine(&storage).layout_parts(Some("nope"), &ConfigMap::new());
        assert!(before.is_empty() && after.is_empty());
    }

    #[test]
    fn layouts_are_cached() {
        let storage = MemoryStorage::new().with_file("layouts/a.html", "A{{content}}");
        let templates = engine(&storage);
        assert!(templates.layout("a").is_some());
        storage
            .write(Path::new("layouts/a.html"), "B{{content}}")
            .unwrap();
        assert_eq!(templates.layout("a").unwrap().before, "A");
    }

    #[test]
    fn markdown_extensions_enabled() {
        let html = markdown_to_html("| a |\n|---|\n| b |\n\n~~gone~~\n\n- [x] done\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>gone</del>"));
        assert!(html.contains("checkbox"));
    }
}
