//! Static asset passthrough.
//!
//! Copies the project's stylesheets, scripts and images into the output tree
//! unchanged, and produces the import tags the landing page links them with.
//!
//! ```text
//! site/css/*.css                    → dist/css/
//! site/js/*.js                      → dist/js/
//! site/images/*.{png,jpg,...}       → dist/images/
//! ```
//!
//! Only files directly inside each directory are copied; extensions are
//! compared case-insensitively. A missing asset directory is not an error.

use crate::config::ProjectPaths;
use crate::storage::{DirEntry, Storage, StorageError};
use maud::html;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One kind of asset and the files it accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Css,
    Js,
    Images,
}

impl AssetKind {
    /// Directory name, identical in the project and the output tree.
    pub fn dir_name(self) -> &'static str {
        match self {
            AssetKind::Css => "css",
            AssetKind::Js => "js",
            AssetKind::Images => "images",
        }
    }

    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            AssetKind::Css => &["css"],
            AssetKind::Js => &["js"],
            AssetKind::Images => &["png", "jpg", "jpeg", "gif", "svg", "webp"],
        }
    }

    fn source(self, paths: &ProjectPaths) -> &Path {
        match self {
            AssetKind::Css => &paths.css,
            AssetKind::Js => &paths.js,
            AssetKind::Images => &paths.images,
        }
    }

    fn accepts(self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let e = e.to_ascii_lowercase();
                self.extensions().contains(&e.as_str())
            })
            .unwrap_or(false)
    }
}

/// Output paths of every copied asset, per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetReport {
    pub css: Vec<PathBuf>,
    pub js: Vec<PathBuf>,
    pub images: Vec<PathBuf>,
}

impl AssetReport {
    pub fn total(&self) -> usize {
        self.css.len() + self.js.len() + self.images.len()
    }
}

/// Files of `kind` in the project, or `None` if its directory is missing.
fn asset_files<S: Storage + ?Sized>(
    storage: &S,
    paths: &ProjectPaths,
    kind: AssetKind,
) -> Result<Option<Vec<DirEntry>>, StorageError> {
    let dir = kind.source(paths);
    if !storage.is_dir(dir) {
        debug!(dir = %dir.display(), "Asset directory missing, skipping");
        return Ok(None);
    }
    let files = storage
        .list_dir(dir)?
        .into_iter()
        .filter(|e| !e.is_dir && !e.name.starts_with('.') && kind.accepts(&e.path))
        .collect();
    Ok(Some(files))
}

fn copy_kind<S: Storage + ?Sized>(
    storage: &S,
    paths: &ProjectPaths,
    kind: AssetKind,
) -> Result<Vec<PathBuf>, StorageError> {
    let Some(files) = asset_files(storage, paths, kind)? else {
        return Ok(Vec::new());
    };
    let out_dir = paths.output.join(kind.dir_name());
    storage.create_dir_all(&out_dir)?;

    let mut copied = Vec::with_capacity(files.len());
    for file in files {
        let dest = out_dir.join(&file.name);
        storage.copy(&file.path, &dest)?;
        info!(asset = %dest.display(), "Copied asset");
        copied.push(dest);
    }
    Ok(copied)
}

/// Copy all three asset kinds concurrently.
///
/// The first copy failure is returned after all three have finished.
pub fn copy_assets<S: Storage + ?Sized>(
    storage: &S,
    paths: &ProjectPaths,
) -> Result<AssetReport, StorageError> {
    let (css, (js, images)) = rayon::join(
        || copy_kind(storage, paths, AssetKind::Css),
        || {
            rayon::join(
                || copy_kind(storage, paths, AssetKind::Js),
                || copy_kind(storage, paths, AssetKind::Images),
            )
        },
    );
    Ok(AssetReport {
        css: css?,
        js: js?,
        images: images?,
    })
}

/// `<link>` tags for every stylesheet, then `<script>` tags for every script.
pub fn import_tags<S: Storage + ?Sized>(
    storage: &S,
    paths: &ProjectPaths,
) -> Result<String, StorageError> {
    let css = asset_files(storage, paths, AssetKind::Css)?.unwrap_or_default();
    let js = asset_files(storage, paths, AssetKind::Js)?.unwrap_or_default();

    let tags: Vec<String> = css
        .iter()
        .map(|f| {
            html! { link rel="stylesheet" href=(format!("/css/{}", f.name)); }.into_string()
        })
        .chain(js.iter().map(|f| {
            html! { script src=(format!("/js/{}", f.name)) {} }.into_string()
        }))
        .collect();
    Ok(tags.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn project() -> (MemoryStorage, ProjectPaths) {
        let storage = MemoryStorage::new()
            .with_file("site/css/main.css", "body {}")
            .with_file("site/css/notes.txt", "skip")
            .with_file("site/js/app.js", "1")
            .with_file("site/images/logo.PNG", "png")
            .with_file("site/images/photo.jpeg", "jpeg")
            .with_file("site/images/.hidden.png", "hidden")
            .with_file("site/images/raw.tiff", "skip")
            .with_dir("site/dist");
        (storage, ProjectPaths::new("site"))
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn copies_matching_files() {
        let (storage, paths) = project();
        let report = copy_assets(&storage, &paths).unwrap();

        assert_eq!(names(&report.css), vec!["main.css"]);
        assert_eq!(names(&report.js), vec!["app.js"]);
        assert_eq!(names(&report.images), vec!["logo.PNG", "photo.jpeg"]);
        assert_eq!(report.total(), 4);
        assert_eq!(
            storage.read_to_string(Path::new("site/dist/css/main.css")).unwrap(),
            "body {}"
        );
        assert!(!storage.exists(Path::new("site/dist/images/raw.tiff")));
    }

    #[test]
    fn missing_directories_are_skipped() {
        let storage = MemoryStorage::new().with_file("site/css/main.css", "x");
        let paths = ProjectPaths::new("site");
        let report = copy_assets(&storage, &paths).unwrap();
        assert_eq!(report.css.len(), 1);
        assert!(report.js.is_empty());
        assert!(report.images.is_empty());
        assert!(!storage.exists(Path::new("site/dist/js")));
    }

    #[test]
    fn import_tags_css_then_js() {
        let (storage, paths) = project();
        let tags = import_tags(&storage, &paths).unwrap();
        assert_eq!(
            tags,
            "<link rel=\"stylesheet\" href=\"/css/main.css\">\n<script src=\"/js/app.js\"></script>"
        );
    }

    #[test]
    fn import_tags_empty_without_assets() {
        let storage = MemoryStorage::new();
        let tags = import_tags(&storage, &ProjectPaths::new("site")).unwrap();
        assert_eq!(tags, "");
    }

    #[test]
    fn extension_matching_ignores_case() {
        assert!(AssetKind::Images.accepts(Path::new("a.JPG")));
        assert!(AssetKind::Css.accepts(Path::new("a.CSS")));
        assert!(!AssetKind::Js.accepts(Path::new("a.mjs")));
        assert!(!AssetKind::Images.accepts(Path::new("noext")));
    }
}
