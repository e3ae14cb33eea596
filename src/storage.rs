//! Storage abstraction for reading the source tree and writing the site.
//!
//! Every filesystem touch in the pipeline goes through the [`Storage`] trait so
//! the tree builder and emitter can run against the real disk ([`FsStorage`])
//! or an in-memory tree with pinned timestamps ([`MemoryStorage`]).
//!
//! ## Listing Order
//!
//! [`Storage::list_dir`] returns entries sorted by file name. The page tree is
//! built in listing order, so a stable listing is what makes two builds of the
//! same input produce identical output.
//!
//! ## Thread Safety
//!
//! The trait requires `Send + Sync`: sibling subtrees are built on a rayon pool
//! and share one storage handle.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(PathBuf),
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Parent directory does not exist: {0}")]
    MissingParent(PathBuf),
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(path.to_path_buf())
        } else {
            StorageError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub path: PathBuf,
    /// File name including extension.
    pub name: String,
    pub is_dir: bool,
}

/// Timestamps of a stored file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileTimes {
    /// Birth time, when the platform records one.
    pub created: Option<SystemTime>,
    pub modified: SystemTime,
}

impl FileTimes {
    /// Creation time, falling back to modification time.
    pub fn created_or_modified(&self) -> SystemTime {
        self.created.unwrap_or(self.modified)
    }
}

/// Backend for every read and write the generator performs.
pub trait Storage: Send + Sync {
    /// List a directory, sorted by file name.
    fn list_dir(&self, dir: &Path) -> Result<Vec<DirEntry>, StorageError>;

    fn read_to_string(&self, path: &Path) -> Result<String, StorageError>;

    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    fn file_times(&self, path: &Path) -> Result<FileTimes, StorageError>;

    /// Write a file. The parent directory must already exist.
    fn write(&self, path: &Path, contents: &str) -> Result<(), StorageError>;

    fn create_dir_all(&self, path: &Path) -> Result<(), StorageError>;

    /// Copy a file. The destination's parent directory must already exist.
    fn copy(&self, from: &Path, to: &Path) -> Result<(), StorageError>;
}

// =============================================================================
// Filesystem backend
// =============================================================================

/// [`Storage`] over the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsStorage;

impl FsStorage {
    pub fn new() -> Self {
        Self
    }
}

impl Storage for FsStorage {
    fn list_dir(&self, dir: &Path) -> Result<Vec<DirEntry>, StorageError> {
        let read = fs::read_dir(dir).map_err(|e| StorageError::io(dir, e))?;
        let mut entries = Vec::new();
        for entry in read {
            let entry = entry.map_err(|e| StorageError::io(dir, e))?;
            let file_type = entry.file_type().map_err(|e| StorageError::io(dir, e))?;
            let path = entry.path();
            // Follow symlinks so linked folders behave like real ones
            let is_dir = if file_type.is_symlink() {
                path.is_dir()
            } else {
                file_type.is_dir()
            };
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                path,
                is_dir,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn read_to_string(&self, path: &Path) -> Result<String, StorageError> {
        fs::read_to_string(path).map_err(|e| StorageError::io(path, e))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn file_times(&self, path: &Path) -> Result<FileTimes, StorageError> {
        let meta = fs::metadata(path).map_err(|e| StorageError::io(path, e))?;
        let modified = meta.modified().map_err(|e| StorageError::io(path, e))?;
        Ok(FileTimes {
            created: meta.created().ok(),
            modified,
        })
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), StorageError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.is_dir()
        {
            return Err(StorageError::MissingParent(parent.to_path_buf()));
        }
        fs::write(path, contents).map_err(|e| StorageError::io(path, e))
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), StorageError> {
        fs::create_dir_all(path).map_err(|e| StorageError::io(path, e))
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<(), StorageError> {
        fs::copy(from, to)
            .map(|_| ())
            .map_err(|e| StorageError::io(from, e))
    }
}

// =============================================================================
// In-memory backend
// =============================================================================

/// Timestamp every [`MemoryStorage`] file gets unless one is given explicitly.
pub const PINNED_TIME: Duration = Duration::from_secs(1_700_000_000);

#[derive(Debug, Clone)]
struct MemFile {
    contents: String,
    times: FileTimes,
}

/// In-memory [`Storage`] with a pinned clock.
///
/// Adding a file implicitly creates its ancestor directories. Files written
/// through [`Storage::write`] still require their parent directory to exist,
/// which mirrors the ordering the emitter has to respect on a real disk.
///
/// ```ignore
/// let storage = MemoryStorage::new()
///     .with_file("pages/index.md", "# Welcome")
///     .with_file("pages/blog/post-one.md", "---\ntags: [intro]\n---\nHello");
/// ```
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: RwLock<BTreeMap<PathBuf, MemFile>>,
    dirs: RwLock<BTreeSet<PathBuf>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file stamped with [`PINNED_TIME`].
    #[must_use]
    pub fn with_file(self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        let time = UNIX_EPOCH + PINNED_TIME;
        self.with_file_at(path, contents, time, time)
    }

    /// Add a file with explicit creation and modification times.
    #[must_use]
    pub fn with_file_at(
        self,
        path: impl Into<PathBuf>,
        contents: impl Into<String>,
        created: SystemTime,
        modified: SystemTime,
    ) -> Self {
        let path = path.into();
        self.add_ancestors(&path);
        self.files.write().unwrap_or_else(PoisonError::into_inner).insert(
            path,
            MemFile {
                contents: contents.into(),
                times: FileTimes {
                    created: Some(created),
                    modified,
                },
            },
        );
        self
    }

    /// Add an empty directory.
    #[must_use]
    pub fn with_dir(self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.add_ancestors(&path);
        self.dirs.write().unwrap_or_else(PoisonError::into_inner).insert(path);
        self
    }

    /// All stored file paths under `prefix`, sorted.
    pub fn files_under(&self, prefix: &Path) -> Vec<PathBuf> {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .filter(|p| p.starts_with(prefix))
            .cloned()
            .collect()
    }

    fn add_ancestors(&self, path: &Path) {
        let mut dirs = self.dirs.write().unwrap_or_else(PoisonError::into_inner);
        for ancestor in path.ancestors().skip(1) {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            dirs.insert(ancestor.to_path_buf());
        }
    }

    fn parent_exists(&self, path: &Path) -> bool {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                self.dirs.read().unwrap_or_else(PoisonError::into_inner).contains(parent)
            }
            _ => true,
        }
    }
}

impl Storage for MemoryStorage {
    fn list_dir(&self, dir: &Path) -> Result<Vec<DirEntry>, StorageError> {
        if !self.is_dir(dir) {
            if self.files.read().unwrap_or_else(PoisonError::into_inner).contains_key(dir) {
                return Err(StorageError::NotADirectory(dir.to_path_buf()));
            }
            return Err(StorageError::NotFound(dir.to_path_buf()));
        }

        let mut entries: Vec<DirEntry> = Vec::new();
        let is_child = |p: &Path| p.parent() == Some(dir);
        let dirs = self.dirs.read().unwrap_or_else(PoisonError::into_inner);
        for sub in dirs.iter().filter(|p| is_child(p)) {
            entries.push(DirEntry {
                path: sub.clone(),
                name: file_name(sub),
                is_dir: true,
            });
        }
        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
        for file in files.keys().filter(|p| is_child(p)) {
            entries.push(DirEntry {
                path: file.clone(),
                name: file_name(file),
                is_dir: false,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn read_to_string(&self, path: &Path) -> Result<String, StorageError> {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .map(|f| f.contents.clone())
            .ok_or_else(|| StorageError::NotFound(path.to_path_buf()))
    }

    fn exists(&self, path: &Path) -> bool {
        self.is_dir(path)
            || self
                .files
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.dirs.read().unwrap_or_else(PoisonError::into_inner).contains(path)
    }

    fn file_times(&self, path: &Path) -> Result<FileTimes, StorageError> {
        if let Some(file) = self.files.read().unwrap_or_else(PoisonError::into_inner).get(path) {
            return Ok(file.times);
        }
        if self.is_dir(path) {
            let time = UNIX_EPOCH + PINNED_TIME;
            return Ok(FileTimes {
                created: Some(time),
                modified: time,
            });
        }
        Err(StorageError::NotFound(path.to_path_buf()))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), StorageError> {
        if !self.parent_exists(path) {
            let parent = path.parent().unwrap_or(path);
            return Err(StorageError::MissingParent(parent.to_path_buf()));
        }
        let time = UNIX_EPOCH + PINNED_TIME;
        self.files.write().unwrap_or_else(PoisonError::into_inner).insert(
            path.to_path_buf(),
            MemFile {
                contents: contents.to_string(),
                times: FileTimes {
                    created: Some(time),
                    modified: time,
                },
            },
        );
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), StorageError> {
        self.add_ancestors(path);
        self.dirs.write().unwrap_or_else(PoisonError::into_inner).insert(path.to_path_buf());
        Ok(())
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<(), StorageError> {
        let contents = self.read_to_string(from)?;
        self.write(to, &contents)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
