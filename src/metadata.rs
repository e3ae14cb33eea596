//! Document metadata: front matter parsing and field resolution.
//!
//! A document may start with a YAML block fenced by `---` lines:
//!
//! ```text
//! ---
//! title: Hello There
//! tags: [intro, rust]
//! layout: post
//! ---
//! # The body starts here
//! ```
//!
//! The block becomes the document's [`Layer::FrontMatter`](crate::config::Layer)
//! and overrides every directory setting for that document only.
//!
//! ## Resolution priority
//!
//! Each field resolves independently; the first non-empty value wins:
//!
//! - **Title**: front matter `title` → filename (`post-one.md` → "Post One")

use crate::config::ConfigMap;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrontMatterError {
    #[error("Invalid front matter YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Front matter must be a mapping")]
    NotAMapping,
}

/// A document split into its metadata and body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontMatter {
    pub data: ConfigMap,
    pub body: String,
}

const DELIMITER: &str = "---";

/// Split `text` into front matter and body.
///
/// No leading `---` line, or no closing one, means no front matter: the
/// metadata is empty and the whole text is the body.
pub fn parse(text: &str) -> Result<FrontMatter, FrontMatterError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let Some((yaml, body)) = split(text) else {
        return Ok(FrontMatter {
            data: ConfigMap::new(),
            body: text.to_string(),
        });
    };

    let data = if yaml.trim().is_empty() {
        ConfigMap::new()
    } else {
        match serde_yaml::from_str::<Value>(yaml)? {
            Value::Object(map) => map,
            Value::Null => ConfigMap::new(),
            _ => return Err(FrontMatterError::NotAMapping),
        }
    };

    Ok(FrontMatter {
        data,
        body: body.to_string(),
    })
}

/// Locate the delimited block; returns `(yaml, body)`.
fn split(text: &str) -> Option<(&str, &str)> {
    let mut lines = text.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim_end() != DELIMITER {
        return None;
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        if line.trim_end() == DELIMITER {
            let yaml = &text[yaml_start..offset];
            let body = &text[offset + line.len()..];
            return Some((yaml, body));
        }
        offset += line.len();
    }
    None
}

/// Resolve a field from several sources.
///
/// Takes optional values in priority order and returns the first non-None,
/// non-blank value, trimmed.
///
/// ```text
/// title: resolve(&[front_matter_title, filename_title])
/// ```
pub fn resolve(sources: &[Option<&str>]) -> Option<String> {
    sources
        .iter()
        .filter_map(|opt| {
            opt.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        })
        .next()
}
