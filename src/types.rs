//! Shared types passed from the tree builder to the renderer.
//!
//! The tree owns every [`Page`]: folders hold their children in
//! [`Page::pages`]. Relationships between pages (`parent`, `children`,
//! `siblings`) are stored by value as [`Link`]s, never as references, so the
//! tree has no cycles. Resolve a link back to its page with
//! [`Site::lookup`](crate::scan::Site::lookup).

use crate::config::{Config, ConfigMap};
use crate::naming;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::SystemTime;

/// A title/url pair pointing at another page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub title: String,
    pub url: String,
}

/// Pre-rendered link markup, exposed to templates under the field names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageLinks {
    pub breadcrumbs: String,
    pub link_to_parent: String,
    pub links_to_children: String,
    pub links_to_siblings: String,
    pub links_to_self_and_siblings: String,
    pub links_to_tags: String,
}

/// One unit of generated output: a document or a folder index.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    /// File stem (`post-one`) or folder name (`blog`).
    pub name: String,
    /// Route without extension (`/blog/post-one`).
    pub path: String,
    /// Public URL (`/blog/post-one.html`, `/` for the landing page).
    pub url: String,
    pub title: String,
    pub is_folder: bool,
    /// True only for documents named `index`.
    pub is_index: bool,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip)]
    pub updated: SystemTime,
    /// Document body after front matter, or the synthesized folder listing.
    pub raw_body: String,
    /// Filled in by the renderer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rendered_content: Option<String>,
    pub parent: Option<Link>,
    pub children: Vec<Link>,
    pub siblings: Vec<Link>,
    pub tags: Vec<String>,
    pub config: Config,
    pub links: PageLinks,
    /// Child pages, folders only.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pages: Vec<Page>,
    /// Source file or folder; `None` for synthesized pages.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Page {
    pub fn link(&self) -> Link {
        Link {
            title: self.title.clone(),
            url: self.url.clone(),
        }
    }

    /// Everything a template can reference: the resolved config, then the
    /// page's own fields and link markup on top.
    pub fn values(&self) -> ConfigMap {
        let mut values = self.config.values().clone();
        let fields = [
            ("title", &self.title),
            ("name", &self.name),
            ("path", &self.path),
            ("url", &self.url),
            ("date", &self.updated_at),
            ("created_at", &self.created_at),
            ("updated_at", &self.updated_at),
            ("breadcrumbs", &self.links.breadcrumbs),
            ("link_to_parent", &self.links.link_to_parent),
            ("links_to_children", &self.links.links_to_children),
            ("links_to_siblings", &self.links.links_to_siblings),
            (
                "links_to_self_and_siblings",
                &self.links.links_to_self_and_siblings,
            ),
            ("links_to_tags", &self.links.links_to_tags),
        ];
        for (key, value) in fields {
            values.insert(key.to_string(), Value::String(value.clone()));
        }
        values
    }
}

/// Depth-first, pre-order list of every page in a forest.
pub fn flatten(pages: &[Page]) -> Vec<&Page> {
    let mut out = Vec::new();
    flatten_into(pages, &mut out);
    out
}

fn flatten_into<'a>(pages: &'a [Page], out: &mut Vec<&'a Page>) {
    for page in pages {
        out.push(page);
        flatten_into(&page.pages, out);
    }
}

/// A page carrying a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagEntry {
    pub title: String,
    pub url: String,
    #[serde(skip)]
    pub updated: SystemTime,
}

/// Pages grouped under one tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagGroup {
    /// Tag as first written by an author.
    pub label: String,
    pub pages: Vec<TagEntry>,
}

/// Tag → pages accumulator.
///
/// Tags are grouped by [`naming::tag_slug`], so `Rust` and `rust` share one
/// listing page. Groups iterate in slug order; pages within a group keep
/// insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagIndex {
    groups: BTreeMap<String, TagGroup>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `entry` under `tag`. Returns false for tags with no usable
    /// characters, which are not indexed.
    pub fn insert(&mut self, tag: &str, entry: TagEntry) -> bool {
        let slug = naming::tag_slug(tag);
        if slug.is_empty() {
            return false;
        }
        self.groups
            .entry(slug)
            .or_insert_with(|| TagGroup {
                label: tag.trim().to_string(),
                pages: Vec::new(),
            })
            .pages
            .push(entry);
        true
    }

    /// Append every group of `other` after this index's entries.
    pub fn merge(&mut self, other: TagIndex) {
        for (slug, group) in other.groups {
            match self.groups.get_mut(&slug) {
                Some(existing) => existing.pages.extend(group.pages),
                None => {
                    self.groups.insert(slug, group);
                }
            }
        }
    }

    pub fn get(&self, tag: &str) -> Option<&TagGroup> {
        self.groups.get(&naming::tag_slug(tag))
    }

    /// `(slug, group)` pairs in slug order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TagGroup)> {
        self.groups.iter().map(|(slug, group)| (slug.as_str(), group))
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }
}
