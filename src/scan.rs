//! Page-tree construction.
//!
//! Stage 1 of the swifty build pipeline. Walks the pages directory depth-first
//! and produces a [`Site`]: a forest of [`Page`]s with parent, child and
//! sibling links wired, derived link markup computed, and a synthesized
//! `tags` folder when any document declares tags.
//!
//! ## Directory Structure
//!
//! ```text
//! pages/                     # Source root; its entries are top-level pages
//! ├── config.yaml            # Settings for everything below (optional)
//! ├── index.md               # Landing page → /            (required)
//! ├── about.md               # Document     → /about.html
//! └── blog/                  # Folder       → /blog.html   (listing of children)
//!     ├── config.json        # Overrides pages/config.yaml for blog/
//!     ├── index.md           # Document     → /blog/       (blog/index.html)
//!     └── post-one.md        # Document     → /blog/post-one.html
//! ```
//!
//! Entries are visited in storage listing order. Dotfiles and files without a
//! document extension (`md`, `markdown`) are skipped.
//!
//! ## Build order
//!
//! A folder's children are built before the folder page itself, because the
//! folder's listing body and `children` links need them. Breadcrumbs flow the
//! other way: each folder hands its finished trail down to its children.
//! Sibling subtrees are independent and are built on the rayon pool; results
//! are joined in listing order, so output never depends on scheduling.
//!
//! Tags are collected into a [`TagIndex`] returned by each subtree and merged
//! by the caller. After the whole tree is built the index becomes one extra
//! top-level folder:
//!
//! ```text
//! /tags.html                 "All Tags"
//! /tags/intro.html           "Pages tagged with Intro"
//! ```
//!
//! ## Validation
//!
//! - An unreadable subdirectory is logged and contributes no pages
//! - An unreadable source root is an error
//! - Malformed settings files and front matter are errors
//! - Every URL must be unique
//! - The source root must hold an `index` document
//! - Once any document declares a tag, `tags` is reserved: a top-level
//!   `tags.md` or `tags/` folder is an error

use crate::config::{Config, ConfigError, ConfigResolver, Layer, value_to_string};
use crate::links;
use crate::metadata::{self, FrontMatterError};
use crate::naming;
use crate::storage::{DirEntry, Storage, StorageError};
use crate::types::{Link, Page, PageLinks, TagEntry, TagIndex, flatten};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, warn};

/// Recognized document extensions, compared case-insensitively.
pub const DOCUMENT_EXTENSIONS: &[&str] = &["md", "markdown"];

/// Name of the synthesized tags folder.
pub const TAGS_FOLDER: &str = "tags";

pub const TAGS_TITLE: &str = "All Tags";

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Front matter error in {path}: {source}")]
    FrontMatter {
        path: PathBuf,
        #[source]
        source: FrontMatterError,
    },
    #[error("Landing document not found: {0}")]
    MissingLanding(PathBuf),
    #[error("{0} uses the reserved `tags` route, which holds the tag listing pages")]
    ReservedTagsRoute(PathBuf),
    #[error("Two pages map to {url}: {first} and {second}")]
    DuplicateUrl {
        url: String,
        first: String,
        second: String,
    },
}

/// The built page forest plus its tag index.
///
/// Pages are addressed by URL through an index of tree positions, so links
/// stored on pages resolve back to pages without references between them.
#[derive(Debug, Clone, Serialize)]
pub struct Site {
    pages: Vec<Page>,
    pub tags: TagIndex,
    #[serde(skip)]
    index: HashMap<String, Vec<usize>>,
}

impl Site {
    /// Index `pages` by URL. Fails on the first URL seen twice.
    pub fn new(pages: Vec<Page>, tags: TagIndex) -> Result<Self, BuildError> {
        check_unique_urls(&pages)?;
        let mut index = HashMap::new();
        index_positions(&pages, &mut Vec::new(), &mut index);
        Ok(Self { pages, tags, index })
    }

    /// Top-level pages in build order.
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Mutable access for the renderer. The tree shape must not change.
    pub(crate) fn pages_mut(&mut self) -> &mut [Page] {
        &mut self.pages
    }

    /// The top-level `index` document.
    pub fn landing(&self) -> Option<&Page> {
        self.pages.iter().find(|p| p.is_index)
    }

    /// Every page, depth-first pre-order.
    pub fn all_pages(&self) -> Vec<&Page> {
        flatten(&self.pages)
    }

    pub fn lookup(&self, url: &str) -> Option<&Page> {
        let (first, rest) = self.index.get(url)?.split_first()?;
        rest.iter()
            .try_fold(self.pages.get(*first)?, |page, &i| page.pages.get(i))
    }

    /// Resolve links to pages, skipping any that point outside the site.
    pub fn resolve(&self, links: &[Link]) -> Vec<&Page> {
        links.iter().filter_map(|l| self.lookup(&l.url)).collect()
    }

    pub fn parent_of(&self, page: &Page) -> Option<&Page> {
        page.parent.as_ref().and_then(|l| self.lookup(&l.url))
    }
}

fn check_unique_urls(pages: &[Page]) -> Result<(), BuildError> {
    let mut seen: HashMap<&str, &str> = HashMap::new();
    for page in flatten(pages) {
        if let Some(first) = seen.insert(&page.url, &page.path) {
            return Err(BuildError::DuplicateUrl {
                url: page.url.clone(),
                first: first.to_string(),
                second: page.path.clone(),
            });
        }
    }
    Ok(())
}

fn index_positions(
    pages: &[Page],
    position: &mut Vec<usize>,
    index: &mut HashMap<String, Vec<usize>>,
) {
    for (i, page) in pages.iter().enumerate() {
        position.push(i);
        index.insert(page.url.clone(), position.clone());
        index_positions(&page.pages, position, index);
        position.pop();
    }
}

/// Build the site rooted at `source`.
///
/// The settings file of `source` itself applies to every page. The tags
/// folder, when present, is appended after the top-level pages.
pub fn build<S: Storage + ?Sized>(
    storage: &S,
    source: &Path,
    resolver: &ConfigResolver,
) -> Result<Site, BuildError> {
    let entries = storage.list_dir(source)?;
    let config = resolver.resolve(storage, source, None)?;
    let builder = TreeBuilder::new(storage, source, resolver);
    let Level { mut pages, tags } = builder.build_entries(&entries, None, &config)?;

    if !pages.iter().any(|p| p.is_index) {
        return Err(BuildError::MissingLanding(
            source.join(format!("{}.md", naming::INDEX_STEM)),
        ));
    }
    if !tags.is_empty() {
        check_tags_route_free(&pages)?;
        pages.push(tags_folder(&tags, &config));
    }
    Site::new(pages, tags)
}

/// The `tags` route belongs to the synthesized tags folder once any tag exists.
fn check_tags_route_free(pages: &[Page]) -> Result<(), BuildError> {
    let folder_url = naming::page_url(TAGS_FOLDER);
    let folder_dir = format!("/{TAGS_FOLDER}/");
    match flatten(pages)
        .into_iter()
        .find(|p| p.url == folder_url || p.url.starts_with(&folder_dir))
    {
        Some(taken) => Err(BuildError::ReservedTagsRoute(
            taken.source.clone().unwrap_or_else(|| PathBuf::from(&taken.path)),
        )),
        None => Ok(()),
    }
}

/// What a folder hands down to its children.
#[derive(Debug, Clone)]
pub struct ParentRef {
    pub link: Link,
    /// The folder's finished breadcrumb trail.
    pub breadcrumbs: String,
}

/// Pages of one directory level plus the tags they declared.
#[derive(Debug, Default)]
pub struct Level {
    pub pages: Vec<Page>,
    pub tags: TagIndex,
}

/// Recursive builder over one source tree.
pub struct TreeBuilder<'a, S: Storage + ?Sized> {
    storage: &'a S,
    base: &'a Path,
    resolver: &'a ConfigResolver,
}

impl<'a, S: Storage + ?Sized> TreeBuilder<'a, S> {
    /// `base` is the source root that routes and URLs are relative to.
    pub fn new(storage: &'a S, base: &'a Path, resolver: &'a ConfigResolver) -> Self {
        Self {
            storage,
            base,
            resolver,
        }
    }

    /// Build every page under `dir`.
    ///
    /// A directory that cannot be listed is logged and yields an empty level.
    pub fn build_dir(
        &self,
        dir: &Path,
        parent: Option<&ParentRef>,
        config: &Config,
    ) -> Result<Level, BuildError> {
        let entries = match self.storage.list_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Cannot read directory, skipping subtree");
                return Ok(Level::default());
            }
        };
        self.build_entries(&entries, parent, config)
    }

    fn build_entries(
        &self,
        entries: &[DirEntry],
        parent: Option<&ParentRef>,
        config: &Config,
    ) -> Result<Level, BuildError> {
        let built: Vec<Option<(Page, TagIndex)>> = entries
            .par_iter()
            .map(|entry| self.build_entry(entry, parent, config))
            .collect::<Result<_, _>>()?;

        let mut level = Level::default();
        for (page, tags) in built.into_iter().flatten() {
            level.tags.merge(tags);
            level.pages.push(page);
        }
        link_siblings(&mut level.pages);
        Ok(level)
    }

    fn build_entry(
        &self,
        entry: &DirEntry,
        parent: Option<&ParentRef>,
        config: &Config,
    ) -> Result<Option<(Page, TagIndex)>, BuildError> {
        if entry.name.starts_with('.') {
            return Ok(None);
        }
        if entry.is_dir {
            return self.build_folder(entry, parent, config).map(Some);
        }
        if !is_document(&entry.path) {
            return Ok(None);
        }
        self.build_document(entry, parent, config).map(Some)
    }

    fn build_folder(
        &self,
        entry: &DirEntry,
        parent: Option<&ParentRef>,
        parent_config: &Config,
    ) -> Result<(Page, TagIndex), BuildError> {
        let config = self
            .resolver
            .resolve(self.storage, &entry.path, Some(parent_config))?;
        let times = self.storage.file_times(&entry.path)?;
        let route = naming::relative_route(&entry.path, self.base, true);
        let link = Link {
            title: naming::title_from_stem(&entry.name),
            url: naming::page_url(&route),
        };
        let breadcrumbs = links::breadcrumbs(parent.map(|p| p.breadcrumbs.as_str()), &link, false);
        let handed_down = ParentRef {
            link: link.clone(),
            breadcrumbs: breadcrumbs.clone(),
        };

        let Level { pages, tags } = self.build_dir(&entry.path, Some(&handed_down), &config)?;
        let children: Vec<Link> = pages.iter().map(Page::link).collect();
        let raw_body =
            links::dated_listing(pages.iter().map(|p| (p.updated_at.as_str(), p.link())));

        let page = Page {
            name: entry.name.clone(),
            path: naming::route_path(&route),
            url: link.url.clone(),
            title: link.title.clone(),
            is_folder: true,
            is_index: false,
            created_at: config.format_date(times.created_or_modified()),
            updated_at: config.format_date(times.modified),
            updated: times.modified,
            raw_body,
            rendered_content: None,
            parent: parent.map(|p| p.link.clone()),
            links: PageLinks {
                breadcrumbs,
                link_to_parent: parent_link(parent),
                links_to_children: links::link_list(&children),
                ..PageLinks::default()
            },
            children,
            siblings: Vec::new(),
            tags: Vec::new(),
            config,
            pages,
            source: Some(entry.path.clone()),
        };
        debug!(url = %page.url, children = page.children.len(), "Built folder");
        Ok((page, tags))
    }

    fn build_document(
        &self,
        entry: &DirEntry,
        parent: Option<&ParentRef>,
        dir_config: &Config,
    ) -> Result<(Page, TagIndex), BuildError> {
        let text = self.storage.read_to_string(&entry.path)?;
        let front = metadata::parse(&text).map_err(|source| BuildError::FrontMatter {
            path: entry.path.clone(),
            source,
        })?;
        let times = self.storage.file_times(&entry.path)?;

        let route = naming::relative_route(&entry.path, self.base, false);
        let name = entry
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| entry.name.clone());
        let is_index = name == naming::INDEX_STEM;
        let (path, url) = if is_index {
            let url = naming::index_url(&route);
            (url.clone(), url)
        } else {
            (naming::route_path(&route), naming::page_url(&route))
        };

        let declared_title = front.data.get("title").map(value_to_string);
        let fallback_title = naming::title_from_stem(&name);
        let title = metadata::resolve(&[declared_title.as_deref(), Some(fallback_title.as_str())])
            .unwrap_or(fallback_title);

        let config = dir_config.with_layer(Layer::FrontMatter, front.data);
        let mut tags = config.tags();
        tags.retain(|tag| !naming::tag_slug(tag).is_empty());

        let mut tag_index = TagIndex::new();
        for tag in &tags {
            tag_index.insert(
                tag,
                TagEntry {
                    title: title.clone(),
                    url: url.clone(),
                    updated: times.modified,
                },
            );
        }

        let link = Link {
            title: title.clone(),
            url: url.clone(),
        };
        let page = Page {
            name,
            path,
            url,
            title,
            is_folder: false,
            is_index,
            created_at: config.format_date(times.created_or_modified()),
            updated_at: config.format_date(times.modified),
            updated: times.modified,
            raw_body: front.body,
            rendered_content: None,
            parent: parent.map(|p| p.link.clone()),
            children: Vec::new(),
            siblings: Vec::new(),
            links: PageLinks {
                breadcrumbs: links::breadcrumbs(
                    parent.map(|p| p.breadcrumbs.as_str()),
                    &link,
                    is_index,
                ),
                link_to_parent: parent_link(parent),
                links_to_tags: links::tag_links(&tags),
                ..PageLinks::default()
            },
            tags,
            config,
            pages: Vec::new(),
            source: Some(entry.path.clone()),
        };
        debug!(url = %page.url, "Built document");
        Ok((page, tag_index))
    }
}

fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            DOCUMENT_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

fn parent_link(parent: Option<&ParentRef>) -> String {
    parent
        .map(|p| links::link(&p.link).into_string())
        .unwrap_or_default()
}

/// Give every page of one level the links of the others, by position.
fn link_siblings(pages: &mut [Page]) {
    let all: Vec<Link> = pages.iter().map(Page::link).collect();
    let self_and_siblings = links::link_list(&all);
    for (i, page) in pages.iter_mut().enumerate() {
        page.siblings = all
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, l)| l.clone())
            .collect();
        page.links.links_to_siblings = links::link_list(&page.siblings);
        page.links.links_to_self_and_siblings = self_and_siblings.clone();
    }
}

fn latest(times: impl Iterator<Item = SystemTime>) -> SystemTime {
    times.max().unwrap_or(UNIX_EPOCH)
}

/// Synthesize the top-level tags folder: one listing page per tag.
///
/// Synthetic pages are dated by the newest page they list.
fn tags_folder(tags: &TagIndex, config: &Config) -> Page {
    let folder_route = TAGS_FOLDER;
    let folder_link = Link {
        title: TAGS_TITLE.to_string(),
        url: naming::page_url(folder_route),
    };
    let folder_crumbs = links::breadcrumbs(None, &folder_link, false);

    let mut pages: Vec<Page> = tags
        .iter()
        .map(|(slug, group)| {
            let updated = latest(group.pages.iter().map(|e| e.updated));
            let link = Link {
                title: format!("Pages tagged with {}", naming::capitalize_words(&group.label)),
                url: naming::tag_url(slug),
            };
            let date = config.format_date(updated);
            Page {
                name: slug.to_string(),
                path: naming::route_path(&format!("{folder_route}/{slug}")),
                url: link.url.clone(),
                title: link.title.clone(),
                is_folder: false,
                is_index: false,
                created_at: date.clone(),
                updated_at: date,
                updated,
                raw_body: links::tagged_listing(&group.pages),
                rendered_content: None,
                parent: Some(folder_link.clone()),
                children: Vec::new(),
                siblings: Vec::new(),
                tags: Vec::new(),
                config: config.clone(),
                links: PageLinks {
                    breadcrumbs: links::breadcrumbs(Some(&folder_crumbs), &link, false),
                    link_to_parent: links::link(&folder_link).into_string(),
                    ..PageLinks::default()
                },
                pages: Vec::new(),
                source: None,
            }
        })
        .collect();
    link_siblings(&mut pages);

    let updated = latest(pages.iter().map(|p| p.updated));
    let children: Vec<Link> = pages.iter().map(Page::link).collect();
    let date = config.format_date(updated);
    Page {
        name: TAGS_FOLDER.to_string(),
        path: naming::route_path(folder_route),
        url: folder_link.url.clone(),
        title: folder_link.title.clone(),
        is_folder: true,
        is_index: false,
        created_at: date.clone(),
        updated_at: date,
        updated,
        raw_body: links::dated_listing(pages.iter().map(|p| (p.updated_at.as_str(), p.link()))),
        rendered_content: None,
        parent: None,
        links: PageLinks {
            breadcrumbs: folder_crumbs,
            links_to_children: links::link_list(&children),
            ..PageLinks::default()
        },
        children,
        siblings: Vec::new(),
        tags: Vec::new(),
        config: config.clone(),
        pages,
        source: None,
    }
}
