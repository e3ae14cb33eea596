//! Site configuration module.
//!
//! Handles loading and cascading the per-directory settings files. Settings
//! are free-form key/value maps: the generator reads a handful of keys itself
//! (`title`, `sitename`, `author`, `dateFormat`, `layout`, `tags`, `nav`) and
//! every key is also available to templates as a `{{ key }}` placeholder.
//!
//! ## Settings File Location
//!
//! A settings file may sit in the project root and in any directory of the
//! pages tree. The first of `config.yaml`, `config.yml`, `config.json`,
//! `config.toml` found in a directory wins:
//!
//! ```text
//! site/
//! ├── config.yaml              # Project settings (override stock defaults)
//! └── pages/
//!     ├── config.yaml          # Applies to every page below
//!     ├── index.md
//!     └── blog/
//!         ├── config.json      # Overrides pages/config.yaml for blog/
//!         └── post-one.md      # Front matter overrides blog/config.json
//! ```
//!
//! ## Layers
//!
//! A resolved [`Config`] is a stack of layers, lowest precedence first:
//!
//! ```text
//! Stock < Project < Directory (root → leaf) < FrontMatter
//! ```
//!
//! Merging is shallow: a key set in a higher layer replaces the lower value
//! wholesale, nested maps included.

use crate::storage::{Storage, StorageError};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use tracing::warn;

/// Free-form settings map shared by settings files and front matter.
pub type ConfigMap = Map<String, Value>;

/// Settings file names, in lookup order.
pub const SETTINGS_FILES: &[&str] = &["config.yaml", "config.yml", "config.json", "config.toml"];

pub const DEFAULT_TITLE: &str = "My Swifty Site";

/// chrono strftime pattern, e.g. "Tue, November 14, 2023".
pub const DEFAULT_DATE_FORMAT: &str = "%a, %B %-d, %Y";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("YAML parse error in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("JSON parse error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("TOML parse error in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Settings file must hold a mapping at the top level: {0}")]
    NotAMapping(PathBuf),
}

/// Where a layer of configuration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Layer {
    /// Built-in defaults.
    Stock,
    /// Settings file in the project root.
    Project,
    /// Settings file of a directory in the pages tree.
    Directory,
    /// Front matter of a single document.
    FrontMatter,
}

/// A resolved configuration: the merged values plus the layers they came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    #[serde(skip)]
    layers: Vec<(Layer, ConfigMap)>,
    #[serde(flatten)]
    values: ConfigMap,
}

impl Default for Config {
    fn default() -> Self {
        Self::stock()
    }
}

impl Config {
    /// Config holding only the stock defaults.
    pub fn stock() -> Self {
        let empty = Self {
            layers: Vec::new(),
            values: ConfigMap::new(),
        };
        empty.with_layer(Layer::Stock, stock_defaults())
    }

    /// Push a layer on top and return the re-merged config.
    ///
    /// Keys in `layer` replace existing keys; everything else is kept.
    pub fn with_layer(&self, layer: Layer, values: ConfigMap) -> Self {
        let mut merged = self.values.clone();
        for (key, value) in &values {
            merged.insert(key.clone(), value.clone());
        }
        let mut layers = self.layers.clone();
        layers.push((layer, values));
        Self {
            layers,
            values: merged,
        }
    }

    /// The layer that supplied the current value of `key`.
    pub fn origin(&self, key: &str) -> Option<Layer> {
        self.layers
            .iter()
            .rev()
            .find(|(_, values)| values.contains_key(key))
            .map(|(layer, _)| *layer)
    }

    /// Value of `key` as set by the topmost layer alone, ignoring everything
    /// inherited from below it.
    pub fn get_own(&self, key: &str) -> Option<&Value> {
        self.layers.last().and_then(|(_, values)| values.get(key))
    }

    pub fn layers(&self) -> impl Iterator<Item = Layer> + '_ {
        self.layers.iter().map(|(layer, _)| *layer)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(Value::as_bool)
    }

    /// Merged values, as seen by templates.
    pub fn values(&self) -> &ConfigMap {
        &self.values
    }

    /// Site name used in `<title>` elements.
    pub fn sitename(&self) -> &str {
        self.get_str("sitename")
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_TITLE)
    }

    /// Layout name, if one is configured.
    pub fn layout(&self) -> Option<&str> {
        self.get_str("layout").filter(|s| !s.trim().is_empty())
    }

    pub fn date_format(&self) -> &str {
        self.get_str("dateFormat").unwrap_or(DEFAULT_DATE_FORMAT)
    }

    /// Tags declared under `tags`: a list, or a single string.
    ///
    /// Duplicates are dropped, first occurrence wins.
    pub fn tags(&self) -> Vec<String> {
        let raw: Vec<String> = match self.get("tags") {
            Some(Value::Array(items)) => items.iter().map(value_to_string).collect(),
            Some(Value::String(s)) => vec![s.clone()],
            _ => Vec::new(),
        };
        let mut tags: Vec<String> = Vec::with_capacity(raw.len());
        for tag in raw {
            let tag = tag.trim();
            if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }
        tags
    }

    /// Format a timestamp with this config's `dateFormat`.
    ///
    /// An invalid pattern is reported and the stock pattern used instead.
    pub fn format_date(&self, time: SystemTime) -> String {
        let date: DateTime<Utc> = time.into();
        let mut pattern = self.date_format();
        if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
            warn!(date_format = pattern, "Invalid dateFormat, using default");
            pattern = DEFAULT_DATE_FORMAT;
        }
        date.format(pattern).to_string()
    }
}

/// Stock default values, the lowest layer of every config.
pub fn stock_defaults() -> ConfigMap {
    let mut map = ConfigMap::new();
    map.insert("title".into(), Value::String(DEFAULT_TITLE.into()));
    map.insert("sitename".into(), Value::String(DEFAULT_TITLE.into()));
    map.insert("author".into(), Value::Null);
    map.insert("dateFormat".into(), Value::String(DEFAULT_DATE_FORMAT.into()));
    map
}

/// Render a config value the way templates print it.
///
/// Strings verbatim, null as empty, scalar lists joined with ", ",
/// anything else as JSON.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) if items.iter().all(|v| !v.is_array() && !v.is_object()) => items
            .iter()
            .map(value_to_string)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

// =============================================================================
// Settings file loading
// =============================================================================

/// Parse the contents of a settings file, choosing the format by extension.
pub fn parse_settings(path: &Path, content: &str) -> Result<ConfigMap, ConfigError> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let value = match ext.as_str() {
        "json" => serde_json::from_str::<Value>(content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?,
        "toml" => {
            let table = toml::from_str::<toml::Table>(content).map_err(|source| {
                ConfigError::Toml {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
            toml_to_json(toml::Value::Table(table))
        }
        _ => serde_yaml::from_str::<Value>(content).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?,
    };
    match value {
        Value::Object(map) => Ok(map),
        // An empty YAML document parses as null
        Value::Null => Ok(ConfigMap::new()),
        _ => Err(ConfigError::NotAMapping(path.to_path_buf())),
    }
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => Value::from(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Load the first settings file found in `dir`.
///
/// Returns `Ok(None)` when the directory has none.
/// Returns `Err` when the file exists but cannot be read or parsed.
pub fn load_settings(
    storage: &(impl Storage + ?Sized),
    dir: &Path,
) -> Result<Option<(PathBuf, ConfigMap)>, ConfigError> {
    for name in SETTINGS_FILES {
        let path = dir.join(name);
        if storage.exists(&path) && !storage.is_dir(&path) {
            let content = storage.read_to_string(&path)?;
            let map = parse_settings(&path, &content)?;
            return Ok(Some((path, map)));
        }
    }
    Ok(None)
}

/// Resolves the config that applies to each directory of the pages tree.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    defaults: Config,
}

impl ConfigResolver {
    pub fn new(defaults: Config) -> Self {
        Self { defaults }
    }

    /// Stock defaults overlaid with the project root's settings file.
    pub fn load(
        storage: &(impl Storage + ?Sized),
        project_root: &Path,
    ) -> Result<Self, ConfigError> {
        let mut defaults = Config::stock();
        if let Some((_, map)) = load_settings(storage, project_root)? {
            defaults = defaults.with_layer(Layer::Project, map);
        }
        Ok(Self::new(defaults))
    }

    /// The global defaults (stock plus project layer).
    pub fn defaults(&self) -> &Config {
        &self.defaults
    }

    /// Config for `dir`: its settings file, if any, over the parent's config.
    ///
    /// Without a parent the global defaults are the base. A parent config
    /// produced by this resolver already carries the default layers, so a
    /// directory without a settings file resolves to a config equal to its
    /// parent's.
    pub fn resolve(
        &self,
        storage: &(impl Storage + ?Sized),
        dir: &Path,
        parent: Option<&Config>,
    ) -> Result<Config, ConfigError> {
        let base = parent.unwrap_or(&self.defaults);
        match load_settings(storage, dir)? {
            Some((_, map)) => Ok(base.with_layer(Layer::Directory, map)),
            None => Ok(base.clone()),
        }
    }
}

// =============================================================================
// Project layout
// =============================================================================

/// Fixed directory layout of a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    pub root: PathBuf,
    /// Source tree of documents.
    pub pages: PathBuf,
    /// Output tree.
    pub output: PathBuf,
    pub layouts: PathBuf,
    pub partials: PathBuf,
    pub css: PathBuf,
    pub js: PathBuf,
    pub images: PathBuf,
    /// Optional full-document template for the landing page.
    pub document_template: PathBuf,
}

impl ProjectPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            pages: root.join("pages"),
            output: root.join("dist"),
            layouts: root.join("layouts"),
            partials: root.join("partials"),
            css: root.join("css"),
            js: root.join("js"),
            images: root.join("images"),
            document_template: root.join("index.html"),
            root,
        }
    }

    /// Override the pages directory; relative paths are taken from the root.
    #[must_use]
    pub fn with_pages(mut self, pages: impl AsRef<Path>) -> Self {
        self.pages = self.root.join(pages);
        self
    }

    /// Override the output directory; relative paths are taken from the root.
    #[must_use]
    pub fn with_output(mut self, output: impl AsRef<Path>) -> Self {
        self.output = self.root.join(output);
        self
    }
}

/// Returns a fully-commented stock `config.yaml` with all recognized keys.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_yaml() -> &'static str {
    r##"# Swifty Configuration
# ====================
# Place this file in the project root to set site-wide values, or in any
# folder under pages/ to override values for that folder and everything
# below it. Documents can override any key again in their front matter.
#
# Lookup order inside one folder (first found wins):
#   config.yaml, config.yml, config.json, config.toml
#
# Every key is available in pages, layouts and partials as {{ key }}.

# Site title, printed on the landing page.
title: "My Swifty Site"

# Shown after the page title in every <title> element.
sitename: "My Swifty Site"

# Author name; available as {{ author }}.
author: null

# chrono strftime pattern for {{ date }}, {{ created_at }}, {{ updated_at }}.
dateFormat: "%a, %B %-d, %Y"

# Layout from layouts/<name>.html wrapped around every page.
# layout: default

# Set to true on a folder or page to list it in the landing page navigation.
# Top-level pages are listed unless they set it to false.
# nav: true
"##
}
