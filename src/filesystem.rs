//! Filesystem capability used by the observer and the reconciler.
//!
//! All paths handed to a [`FileSystem`] are relative to the working-tree root.
//! Two backends exist:
//!
//! - [`DiskFS`], rooted at a real directory.
//! - [`MemoryFS`], a shared in-memory tree. Clones share the same storage, so
//!   a test can hand one clone to the reconciler and another to a mock git
//!   backend that "checks out" files into it.

use crate::defaults::GIT_DIR_NAME;
use crate::error::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use walkdir::WalkDir;

/// One immediate child of a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Operations the reconciliation engine needs from a storage backend.
pub trait FileSystem {
    /// Whether a file or directory exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Whether `path` is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Immediate children of a directory, sorted by name.
    fn list_dir(&self, path: &Path) -> Result<Vec<DirEntry>>;

    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write a file, creating parent directories as needed.
    fn write(&self, path: &Path, content: &[u8]) -> Result<()>;

    /// Copy a single file, creating parent directories as needed.
    fn copy_file(&self, from: &Path, to: &Path) -> Result<()>;

    fn create_dir_all(&self, path: &Path) -> Result<()>;

    fn remove_dir_all(&self, path: &Path) -> Result<()>;

    /// Move a file or directory. The destination must not exist.
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;
}

/// Recursively copy the directory `src` to `dst`, skipping `.git` entries.
///
/// Returns the number of files copied.
pub fn copy_tree(fs: &dyn FileSystem, src: &Path, dst: &Path) -> Result<usize> {
    fs.create_dir_all(dst)?;
    let mut copied = 0;
    for entry in fs.list_dir(src)? {
        if entry.name == GIT_DIR_NAME {
            continue;
        }
        let from = src.join(&entry.name);
        let to = dst.join(&entry.name);
        if entry.is_dir {
            copied += copy_tree(fs, &from, &to)?;
        } else {
            fs.copy_file(&from, &to)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Remove a directory if present. Returns whether anything was removed.
pub fn remove_dir_if_exists(fs: &dyn FileSystem, path: &Path) -> Result<bool> {
    if fs.exists(path) {
        fs.remove_dir_all(path)?;
        Ok(true)
    } else {
        Ok(false)
    }
}

/// [`FileSystem`] backed by the host filesystem under `root`.
#[derive(Debug, Clone)]
pub struct DiskFS {
    root: PathBuf,
}

impl DiskFS {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }
}

impl FileSystem for DiskFS {
    fn exists(&self, path: &Path) -> bool {
        self.resolve(path).exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.resolve(path).is_dir()
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let dir = self.resolve(path);
        let mut entries = Vec::new();
        for entry in WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| Error::Filesystem {
                message: format!("cannot list {}: {}", dir.display(), e),
            })?;
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: entry.file_type().is_dir(),
            });
        }
        Ok(entries)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        Ok(fs::read(self.resolve(path))?)
    }

    fn write(&self, path: &Path, content: &[u8]) -> Result<()> {
        let full_path = self.resolve(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full_path, content)?;
        Ok(())
    }

    fn copy_file(&self, from: &Path, to: &Path) -> Result<()> {
        let target = self.resolve(to);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        // fs::copy carries permission bits across
        fs::copy(self.resolve(from), &target)?;
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(self.resolve(path))?;
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        fs::remove_dir_all(self.resolve(path))?;
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let target = self.resolve(to);
        if target.exists() {
            return Err(Error::Filesystem {
                message: format!("rename target already exists: {}", to.display()),
            });
        }
        fs::rename(self.resolve(from), target)?;
        Ok(())
    }
}

/// A file held by [`MemoryFS`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    pub content: Vec<u8>,
}

impl File {
    pub fn new(content: Vec<u8>) -> Self {
        Self { content }
    }
}

#[derive(Debug, Default)]
struct MemoryTree {
    files: BTreeMap<PathBuf, File>,
    dirs: BTreeSet<PathBuf>,
}

impl MemoryTree {
    fn add_ancestors(&mut self, path: &Path) {
        for ancestor in path.ancestors() {
            if !ancestor.as_os_str().is_empty() {
                self.dirs.insert(ancestor.to_path_buf());
            }
        }
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.dirs.contains(path)
            || self
                .files
                .keys()
                .any(|file| file != path && file.starts_with(path))
    }

    fn not_found(path: &Path) -> Error {
        Error::Filesystem {
            message: format!("not found: {}", path.display()),
        }
    }
}

/// In-memory [`FileSystem`]; clones share storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryFS {
    tree: Arc<Mutex<MemoryTree>>,
}

impl MemoryFS {
    /// Create a new empty filesystem
    pub fn new() -> Self {
        Self::default()
    }

    fn tree(&self) -> Result<MutexGuard<'_, MemoryTree>> {
        self.tree.lock().map_err(|_| Error::LockPoisoned {
            context: "memory filesystem".to_string(),
        })
    }

    /// Add a file with string content
    pub fn add_file_string<P: AsRef<Path>>(&self, path: P, content: &str) -> Result<()> {
        self.write(path.as_ref(), content.as_bytes())
    }

    /// Read a file as UTF-8, if it exists.
    pub fn read_string<P: AsRef<Path>>(&self, path: P) -> Option<String> {
        self.read(path.as_ref())
            .ok()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    /// All file paths, sorted.
    pub fn list_files(&self) -> Vec<PathBuf> {
        self.tree()
            .map(|tree| tree.files.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Files under `dir`, relative to it, sorted.
    pub fn list_files_under<P: AsRef<Path>>(&self, dir: P) -> Vec<PathBuf> {
        let dir = dir.as_ref();
        self.list_files()
            .into_iter()
            .filter_map(|f| f.strip_prefix(dir).ok().map(Path::to_path_buf))
            .collect()
    }

    /// Get the number of files
    pub fn len(&self) -> usize {
        self.tree().map(|tree| tree.files.len()).unwrap_or(0)
    }

    /// Check if filesystem is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FileSystem for MemoryFS {
    fn exists(&self, path: &Path) -> bool {
        self.tree()
            .map(|tree| tree.files.contains_key(path) || tree.is_dir(path))
            .unwrap_or(false)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.tree().map(|tree| tree.is_dir(path)).unwrap_or(false)
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let tree = self.tree()?;
        if !tree.is_dir(path) {
            return Err(MemoryTree::not_found(path));
        }

        // name -> is_dir
        let mut children: BTreeMap<String, bool> = BTreeMap::new();
        let nested = tree
            .files
            .keys()
            .map(|f| (f, false))
            .chain(tree.dirs.iter().map(|d| (d, true)));
        for (entry, entry_is_dir) in nested {
            let Ok(relative) = entry.strip_prefix(path) else {
                continue;
            };
            let mut components = relative.components();
            let Some(first) = components.next() else {
                continue;
            };
            let is_dir = entry_is_dir || components.next().is_some();
            let name = first.as_os_str().to_string_lossy().into_owned();
            *children.entry(name).or_insert(false) |= is_dir;
        }

        Ok(children
            .into_iter()
            .map(|(name, is_dir)| DirEntry { name, is_dir })
            .collect())
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let tree = self.tree()?;
        tree.files
            .get(path)
            .map(|file| file.content.clone())
            .ok_or_else(|| MemoryTree::not_found(path))
    }

    fn write(&self, path: &Path, content: &[u8]) -> Result<()> {
        let mut tree = self.tree()?;
        if tree.is_dir(path) {
            return Err(Error::Filesystem {
                message: format!("is a directory: {}", path.display()),
            });
        }
        if let Some(parent) = path.parent() {
            tree.add_ancestors(parent);
        }
        tree.files
            .insert(path.to_path_buf(), File::new(content.to_vec()));
        Ok(())
    }

    fn copy_file(&self, from: &Path, to: &Path) -> Result<()> {
        let mut tree = self.tree()?;
        let file = tree
            .files
            .get(from)
            .cloned()
            .ok_or_else(|| MemoryTree::not_found(from))?;
        if let Some(parent) = to.parent() {
            tree.add_ancestors(parent);
        }
        tree.files.insert(to.to_path_buf(), file);
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut tree = self.tree()?;
        if tree.files.contains_key(path) {
            return Err(Error::Filesystem {
                message: format!("is a file: {}", path.display()),
            });
        }
        tree.add_ancestors(path);
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        let mut tree = self.tree()?;
        if !tree.is_dir(path) {
            return Err(MemoryTree::not_found(path));
        }
        tree.files.retain(|file, _| !file.starts_with(path));
        tree.dirs.retain(|dir| !dir.starts_with(path));
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let mut tree = self.tree()?;
        if tree.files.contains_key(to) || tree.is_dir(to) {
            return Err(Error::Filesystem {
                message: format!("rename target already exists: {}", to.display()),
            });
        }

        if let Some(file) = tree.files.remove(from) {
            if let Some(parent) = to.parent() {
                tree.add_ancestors(parent);
            }
            tree.files.insert(to.to_path_buf(), file);
            return Ok(());
        }

        if !tree.is_dir(from) {
            return Err(MemoryTree::not_found(from));
        }

        let moved_files: Vec<(PathBuf, File)> = tree
            .files
            .iter()
            .filter_map(|(path, file)| {
                path.strip_prefix(from)
                    .ok()
                    .map(|rel| (to.join(rel), file.clone()))
            })
            .collect();
        let moved_dirs: Vec<PathBuf> = tree
            .dirs
            .iter()
            .filter_map(|dir| dir.strip_prefix(from).ok().map(|rel| to.join(rel)))
            .collect();

        tree.files.retain(|path, _| !path.starts_with(from));
        tree.dirs.retain(|dir| !dir.starts_with(from));
        tree.add_ancestors(to);
        for dir in moved_dirs {
            tree.add_ancestors(&dir);
        }
        tree.files.extend(moved_files);
        Ok(())
    }
}
