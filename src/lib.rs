//! # Swifty
//!
//! A small static site generator. Your pages directory is the site: folders
//! become listing pages, markdown documents become pages, and settings files
//! cascade from the project root down to every document.
//!
//! # Architecture: Two-Stage Pipeline
//!
//! ```text
//! 1. Build   pages/  →  Site      (page tree, links, tags; no writes)
//! 2. Emit    Site    →  dist/     (templates, markdown, HTML files)
//! ```
//!
//! The build stage is pure apart from reading through [`storage::Storage`].
//! It produces the whole page forest before anything is written, so every
//! page's links are final by the time it is rendered. The emit stage renders
//! each page and writes the output tree, parents before children.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Stage 1: walks the pages directory, builds the page tree and tag index |
//! | [`generate`] | Stage 2: renders fragments and the landing document, writes the output |
//! | [`template`] | Partials, `{{ key }}` placeholders, layouts, markdown conversion |
//! | [`config`] | Settings files, layered config resolution, project layout |
//! | [`metadata`] | Front matter parsing and field resolution |
//! | [`naming`] | Titles, routes, URLs and tag slugs derived from file names |
//! | [`links`] | Link, breadcrumb, listing and navigation markup |
//! | [`types`] | Shared types: `Page`, `Link`, `TagIndex` |
//! | [`assets`] | CSS, JS and image passthrough plus import tags |
//! | [`storage`] | Filesystem abstraction with a real and an in-memory backend |
//! | [`output`] | CLI output formatting: tree display of build results |
//!
//! # Design Decisions
//!
//! ## Links by Value
//!
//! Pages refer to their parent, children and siblings by `{title, url}`
//! pairs, never by reference. The tree owns every page; [`scan::Site`]
//! resolves a link back to its page through a URL index. No cycles, no
//! shared ownership, and the whole tree can be built on the rayon pool.
//!
//! ## Layered Config
//!
//! A resolved [`config::Config`] remembers its layers:
//!
//! ```text
//! Stock < Project < Directory (root → leaf) < FrontMatter
//! ```
//!
//! Merging is shallow and by key. A directory without a settings file
//! resolves to exactly its parent's config.
//!
//! ## Tags as a Returned Accumulator
//!
//! Each subtree returns the tags its documents declared; the caller merges
//! them in listing order. There is no global tag registry, so concurrent
//! subtrees never contend and the result never depends on scheduling.
//!
//! ## Turbo Frames
//!
//! Every page except the landing page is written as a
//! `<turbo-frame id="content">` fragment. The landing document loads them
//! into its content frame, and every generated link targets that frame.

pub mod assets;
pub mod config;
pub mod generate;
pub mod links;
pub mod metadata;
pub mod naming;
pub mod output;
pub mod scan;
pub mod storage;
pub mod template;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
