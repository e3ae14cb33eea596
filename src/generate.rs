//! HTML rendering and emission.
//!
//! Stage 2 of the swifty build pipeline. Takes the built [`Site`], renders
//! every page to an HTML fragment, and writes the output tree.
//!
//! ## Page fragments
//!
//! Every page except the landing page is written as a fragment the client
//! router swaps into the landing document:
//!
//! ```html
//! <turbo-frame id="content">
//!   <head><title>Post One || My Swifty Site</title></head>
//!   <!-- layout before {{ content }} -->
//!   <!-- page body: partials, placeholders, markdown -->
//!   <!-- layout after {{ content }} -->
//! </turbo-frame>
//! ```
//!
//! ## Landing document
//!
//! The top-level `index` page is wrapped in a full HTML document. A project
//! can supply its own `index.html` with `{{ content }}` and `{{ nav }}`
//! placeholders; the turbo refresh meta tag and asset imports are injected
//! before `</head>` and the router script before `</body>`. Without one a
//! stock document with the same parts is used.
//!
//! ## Output Structure
//!
//! ```text
//! dist/
//! ├── index.html                 # Landing document
//! ├── about.html                 # Document fragment
//! ├── blog.html                  # Folder listing
//! ├── blog/
//! │   └── post-one.html
//! ├── tags.html                  # Synthesized tags folder
//! ├── tags/
//! │   └── intro.html
//! ├── css/ js/ images/           # Copied assets
//! ```
//!
//! A folder's own page is written first, then its output directory is
//! created, then its children are written.
//!
//! ## HTML Generation
//!
//! Uses [maud](https://maud.lambda.xyz/) for the document shells. Titles are
//! escaped; rendered content and link markup are spliced in verbatim.

use crate::assets::{self, AssetReport};
use crate::config::{ConfigError, ConfigResolver, ProjectPaths};
use crate::links;
use crate::scan::{self, BuildError, Site};
use crate::storage::{Storage, StorageError};
use crate::template::Templates;
use crate::types::{Link, Page, flatten};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use rayon::prelude::*;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

const ROUTER_JS: &str = include_str!("../static/router.js");

const TURBO_REFRESH_META: &str = r#"<meta name="turbo-refresh-method" content="morph">"#;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Build error: {0}")]
    Build(#[from] BuildError),
}

/// One written page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Written {
    pub title: String,
    pub url: String,
    pub path: PathBuf,
    /// Nesting level in the page tree, 0 for top-level pages.
    pub depth: usize,
    pub is_folder: bool,
}

/// Everything a build wrote.
#[derive(Debug, Clone, Default)]
pub struct GenerateReport {
    /// Pages in emission order.
    pub pages: Vec<Written>,
    pub assets: AssetReport,
    /// Number of tag listing pages.
    pub tags: usize,
}

/// Full build: tree, assets, rendering, emission.
pub fn generate<S: Storage + ?Sized>(
    storage: &S,
    paths: &ProjectPaths,
) -> Result<GenerateReport, GenerateError> {
    let resolver = ConfigResolver::load(storage, &paths.root)?;
    let mut site = scan::build(storage, &paths.pages, &resolver)?;

    storage.create_dir_all(&paths.output)?;
    let assets = assets::copy_assets(storage, paths)?;

    let renderer = Renderer::new(storage, paths);
    renderer.render_all(&mut site);
    let pages = renderer.emit(&site, &paths.output)?;

    info!(
        pages = pages.len(),
        assets = assets.total(),
        output = %paths.output.display(),
        "Site generated"
    );
    Ok(GenerateReport {
        pages,
        assets,
        tags: site.tags.len(),
    })
}

/// Renders pages of one project and writes them out.
pub struct Renderer<'a, S: Storage + ?Sized> {
    storage: &'a S,
    paths: &'a ProjectPaths,
    templates: Templates<'a, S>,
}

impl<'a, S: Storage + ?Sized> Renderer<'a, S> {
    pub fn new(storage: &'a S, paths: &'a ProjectPaths) -> Self {
        Self {
            storage,
            paths,
            templates: Templates::new(storage, &paths.partials, &paths.layouts),
        }
    }

    /// The page's fragment: body through the template engine and markdown,
    /// wrapped in its layout and the content frame.
    pub fn render_page(&self, page: &Page) -> String {
        let values = page.values();
        let content = self.templates.render_markdown(&page.raw_body, &values);
        let (before, after) = self.templates.layout_parts(page.config.layout(), &values);
        fragment(&page.title, page.config.sitename(), &before, &content, &after).into_string()
    }

    /// Attach rendered content to every page of the site.
    pub fn render_all(&self, site: &mut Site) {
        render_pages(self, site.pages_mut());
    }

    fn page_html(&self, page: &Page) -> String {
        page.rendered_content
            .clone()
            .unwrap_or_else(|| self.render_page(page))
    }

    /// Full HTML document for the landing page.
    pub fn landing_document(&self, site: &Site, landing: &Page) -> Result<String, GenerateError> {
        let content = self.page_html(landing);
        let nav = links::navigation(&nav_links(site));
        let imports = assets::import_tags(self.storage, self.paths)?;

        let template = &self.paths.document_template;
        if self.storage.exists(template) && !self.storage.is_dir(template) {
            let text = self.storage.read_to_string(template)?;
            Ok(self.fill_document_template(&text, landing, &content, &nav, &imports))
        } else {
            Ok(stock_document(landing, &content, &nav, &imports).into_string())
        }
    }

    fn fill_document_template(
        &self,
        text: &str,
        landing: &Page,
        content: &str,
        nav: &str,
        imports: &str,
    ) -> String {
        let head = format!("{TURBO_REFRESH_META}\n{imports}\n");
        let with_head = inject_before(text, "</head>", &head).unwrap_or_else(|| {
            warn!(
                template = %self.paths.document_template.display(),
                "Document template has no </head>"
            );
            format!("{head}{text}")
        });

        let mut values = landing.values();
        values.insert("content".to_string(), Value::String(content.to_string()));
        values.insert("nav".to_string(), Value::String(nav.to_string()));
        let filled = self.templates.expand(&with_head, &values);

        let script = router_script();
        inject_before(&filled, "</body>", &script).unwrap_or_else(|| {
            warn!(
                template = %self.paths.document_template.display(),
                "Document template has no </body>"
            );
            format!("{filled}{script}")
        })
    }

    /// Write every page under `output`, parents before children.
    pub fn emit(&self, site: &Site, output: &Path) -> Result<Vec<Written>, GenerateError> {
        self.storage.create_dir_all(output)?;
        let mut written = Vec::new();
        self.emit_level(site, site.pages(), output, 0, &mut written)?;
        Ok(written)
    }

    fn emit_level(
        &self,
        site: &Site,
        pages: &[Page],
        output: &Path,
        depth: usize,
        written: &mut Vec<Written>,
    ) -> Result<(), GenerateError> {
        for page in pages {
            let html = if depth == 0 && page.is_index {
                self.landing_document(site, page)?
            } else {
                self.page_html(page)
            };
            let target = output_path(output, page);
            self.storage.write(&target, &html)?;
            info!(url = %page.url, path = %target.display(), "Wrote page");
            written.push(Written {
                title: page.title.clone(),
                url: page.url.clone(),
                path: target,
                depth,
                is_folder: page.is_folder,
            });

            if page.is_folder {
                let dir = output.join(page.path.trim_start_matches('/'));
                self.storage.create_dir_all(&dir)?;
                self.emit_level(site, &page.pages, output, depth + 1, written)?;
            }
        }
        Ok(())
    }
}

fn render_pages<S: Storage + ?Sized>(renderer: &Renderer<'_, S>, pages: &mut [Page]) {
    pages.par_iter_mut().for_each(|page| {
        page.rendered_content = Some(renderer.render_page(page));
        render_pages(renderer, &mut page.pages);
    });
}

/// File a page is written to: `index` documents as `index.html` inside
/// their folder, everything else at its URL.
pub fn output_path(output: &Path, page: &Page) -> PathBuf {
    if page.is_index {
        let dir = page.url.trim_matches('/');
        if dir.is_empty() {
            output.join("index.html")
        } else {
            output.join(dir).join("index.html")
        }
    } else {
        output.join(page.url.trim_start_matches('/'))
    }
}

/// Landing page navigation entries.
///
/// Top-level pages are listed unless they set `nav: false`; the landing
/// page and synthesized pages are left out unless they set `nav: true`.
/// Nested pages are listed only when they opt in themselves, through front
/// matter or their own folder's settings file.
pub fn nav_links(site: &Site) -> Vec<Link> {
    let mut nav = Vec::new();
    for page in site.pages() {
        let listed_by_default = !page.is_index && page.source.is_some();
        if page.config.get_bool("nav").unwrap_or(listed_by_default) {
            nav.push(page.link());
        }
        for nested in flatten(&page.pages) {
            if own_nav(site, nested) == Some(true) {
                nav.push(nested.link());
            }
        }
    }
    nav
}

/// `nav` as set by the page itself, not inherited from a folder above it.
fn own_nav(site: &Site, page: &Page) -> Option<bool> {
    let inherited = site
        .parent_of(page)
        .map(|parent| parent.config.layers().count())
        .unwrap_or(0);
    // A folder without a settings file carries exactly its parent's layers
    if page.config.layers().count() <= inherited {
        return None;
    }
    page.config.get_own("nav").and_then(Value::as_bool)
}

/// Insert `snippet` before the last `marker`, matched case-insensitively.
fn inject_before(text: &str, marker: &str, snippet: &str) -> Option<String> {
    let at = text.to_ascii_lowercase().rfind(marker)?;
    Some(format!("{}{}{}", &text[..at], snippet, &text[at..]))
}

fn router_script() -> String {
    html! {
        script type="module" { (PreEscaped(ROUTER_JS)) }
    }
    .into_string()
}

// ============================================================================
// HTML Components
// ============================================================================

/// Renders a page fragment inside the content frame
fn fragment(title: &str, sitename: &str, before: &str, content: &str, after: &str) -> Markup {
    html! {
        turbo-frame id="content" {
            head { title { (title) " || " (sitename) } }
            (PreEscaped(before))
            (PreEscaped(content))
            (PreEscaped(after))
        }
    }
}

/// Renders the stock landing document
fn stock_document(landing: &Page, content: &str, nav: &str, imports: &str) -> Markup {
    let sitename = landing.config.sitename();
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                (PreEscaped(TURBO_REFRESH_META))
                title { (sitename) }
                (PreEscaped(imports))
            }
            body {
                header {
                    (PreEscaped(nav))
                    h1 { (sitename) }
                }
                main { (PreEscaped(content)) }
                (PreEscaped(router_script()))
            }
        }
    }
}
