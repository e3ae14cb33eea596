//! CLI output formatting for the `check` and `build` commands.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. Every page is shown
//! by its positional index and title, followed by where it lives on the site.
//! Source files are secondary context on indented `Source:` lines, so the
//! output reads as a content inventory that still traces back to files.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Pages
//! 001 About → /about.html
//!     Source: about.md
//! 002 Blog (1 page) → /blog.html
//!     Source: blog
//!     001 Post One → /blog/post-one.html
//!         Source: blog/post-one.md
//!         Tags: intro
//! 003 Welcome → /
//!     Source: index.md
//! 004 All Tags (1 page) → /tags.html
//!     001 Pages tagged with Intro → /tags/intro.html
//!
//! Tags
//! intro (1 page)
//! ```
//!
//! ## Build
//!
//! ```text
//! 001 About → about.html
//! 002 Blog → blog.html
//!     001 Post One → blog/post-one.html
//! 003 Welcome → index.html
//!
//! Copied 1 stylesheet, 0 scripts, 2 images
//! Generated 4 pages, 0 tags
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::generate::GenerateReport;
use crate::scan::Site;
use crate::types::Page;
use std::path::Path;

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 page`, `2 pages`.
fn count(n: usize, singular: &str, plural: &str) -> String {
    if n == 1 {
        format!("{n} {singular}")
    } else {
        format!("{n} {plural}")
    }
}

/// Format an entity header: positional index + title, with a child count
/// for folders.
///
/// ```text
/// 001 About
/// 002 Blog (3 pages)
/// ```
fn entity_header(index: usize, title: &str, children: Option<usize>) -> String {
    match children {
        Some(n) => format!("{} {} ({})", format_index(index), title, count(n, "page", "pages")),
        None => format!("{} {}", format_index(index), title),
    }
}

// ============================================================================
// Check output
// ============================================================================

/// Format the built page tree.
pub fn format_check_output(site: &Site, source_root: &Path) -> Vec<String> {
    let mut lines = vec!["Pages".to_string()];
    format_pages(site.pages(), source_root, 0, &mut lines);

    if !site.tags.is_empty() {
        lines.push(String::new());
        lines.push("Tags".to_string());
        for (_, group) in site.tags.iter() {
            lines.push(format!(
                "{} ({})",
                group.label,
                count(group.pages.len(), "page", "pages")
            ));
        }
    }
    lines
}

fn format_pages(pages: &[Page], source_root: &Path, depth: usize, lines: &mut Vec<String>) {
    for (i, page) in pages.iter().enumerate() {
        let children = page.is_folder.then_some(page.pages.len());
        lines.push(format!(
            "{}{} \u{2192} {}",
            indent(depth),
            entity_header(i + 1, &page.title, children),
            page.url
        ));

        let context = indent(depth + 1);
        if let Some(source) = &page.source {
            let rel = source.strip_prefix(source_root).unwrap_or(source);
            lines.push(format!("{}Source: {}", context, rel.display()));
        }
        if let Some(layout) = page.config.layout() {
            lines.push(format!("{}Layout: {}", context, layout));
        }
        if !page.tags.is_empty() {
            lines.push(format!("{}Tags: {}", context, page.tags.join(", ")));
        }
        format_pages(&page.pages, source_root, depth + 1, lines);
    }
}

/// Print check output to stdout.
pub fn print_check_output(site: &Site, source_root: &Path) {
    for line in format_check_output(site, source_root) {
        println!("{}", line);
    }
}

// ============================================================================
// Build output
// ============================================================================

/// Format what a build wrote, paths relative to the output root.
pub fn format_generate_output(report: &GenerateReport, output_root: &Path) -> Vec<String> {
    let mut lines = Vec::new();

    // Positions restart at 1 on every level
    let mut positions: Vec<usize> = Vec::new();
    for written in &report.pages {
        positions.truncate(written.depth + 1);
        while positions.len() <= written.depth {
            positions.push(0);
        }
        positions[written.depth] += 1;

        let rel = written.path.strip_prefix(output_root).unwrap_or(&written.path);
        lines.push(format!(
            "{}{} {} \u{2192} {}",
            indent(written.depth),
            format_index(positions[written.depth]),
            written.title,
            rel.display()
        ));
    }

    lines.push(String::new());
    lines.push(format!(
        "Copied {}, {}, {}",
        count(report.assets.css.len(), "stylesheet", "stylesheets"),
        count(report.assets.js.len(), "script", "scripts"),
        count(report.assets.images.len(), "image", "images"),
    ));
    lines.push(format!(
        "Generated {}, {}",
        count(report.pages.len(), "page", "pages"),
        count(report.tags, "tag", "tags"),
    ));
    lines
}

/// Print build output to stdout.
pub fn print_generate_output(report: &GenerateReport, output_root: &Path) {
    for line in format_generate_output(report, output_root) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
