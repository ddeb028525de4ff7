//! Content trees and the tree checksum
//!
//! A [`FileSet`] is the in-memory form of one artifact's content: relative
//! path → bytes, ordered by path. The tree checksum over a file set is the
//! content identity used for all drift detection; it is invariant to
//! filesystem metadata and iteration order, and sensitive to any byte
//! change including added or removed files.

use crate::checksum::PREFIX;
use crate::{Error, NormalizedPath, Result, io};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// An artifact's file contents, keyed by normalized relative path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    files: BTreeMap<String, Vec<u8>>,
}

impl FileSet {
    /// Create an empty file set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a file, replacing any previous content at the same path.
    ///
    /// Paths are normalized to forward slashes and stripped of leading
    /// separators so lookups are stable across platforms.
    pub fn insert(&mut self, path: impl AsRef<str>, content: impl Into<Vec<u8>>) {
        let key = normalize_rel_path(path.as_ref());
        self.files.insert(key, content.into());
    }

    /// Get a file's content by relative path.
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.files.get(&normalize_rel_path(path)).map(Vec::as_slice)
    }

    /// Remove a file, returning its content if present.
    pub fn remove(&mut self, path: &str) -> Option<Vec<u8>> {
        self.files.remove(&normalize_rel_path(path))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(&normalize_rel_path(path))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate files in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.files.iter().map(|(p, c)| (p.as_str(), c.as_slice()))
    }

    /// Relative paths in order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Load a file set from a directory tree.
    ///
    /// Walks the tree recursively and stores every regular file under its
    /// path relative to `root`. Symlinks are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` is not a readable directory or any file
    /// under it cannot be read.
    pub fn from_dir(root: &NormalizedPath) -> Result<Self> {
        let native = root.to_native();
        if !native.is_dir() {
            return Err(Error::NotADirectory { path: native });
        }

        let mut set = Self::new();
        collect_files(&native, &native, &mut set)?;
        Ok(set)
    }

    /// Write every file under `root`, atomically per file.
    ///
    /// Existing files not present in this set are left alone; use
    /// [`FileSet::write_clean`] for replace semantics.
    pub fn write_to(&self, root: &NormalizedPath) -> Result<()> {
        for (path, content) in &self.files {
            io::write_atomic(&root.join(path), content)?;
        }
        Ok(())
    }

    /// Replace the directory's contents with this set.
    pub fn write_clean(&self, root: &NormalizedPath) -> Result<()> {
        io::remove_dir_all_if_exists(root)?;
        let native = root.to_native();
        fs::create_dir_all(&native).map_err(|e| Error::io(&native, e))?;
        self.write_to(root)
    }

    /// Compute the tree checksum in canonical `sha256:<hex>` form.
    ///
    /// Each entry is hashed as `path || NUL || content`; the per-entry
    /// digests are folded, in path order, into a single digest. Two file
    /// sets are identical iff their tree checksums are equal.
    pub fn tree_checksum(&self) -> String {
        let mut outer = Sha256::new();
        for (path, content) in &self.files {
            let mut entry = Sha256::new();
            entry.update(path.as_bytes());
            entry.update([0u8]);
            entry.update(content);
            outer.update(entry.finalize());
        }
        format!("{}{:x}", PREFIX, outer.finalize())
    }
}

impl FromIterator<(String, Vec<u8>)> for FileSet {
    fn from_iter<T: IntoIterator<Item = (String, Vec<u8>)>>(iter: T) -> Self {
        let mut set = Self::new();
        for (path, content) in iter {
            set.insert(path, content);
        }
        set
    }
}

fn normalize_rel_path(path: &str) -> String {
    path.replace('\\', "/").trim_start_matches('/').to_string()
}

fn collect_files(root: &Path, dir: &Path, set: &mut FileSet) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| Error::io(&path, e))?;

        if file_type.is_symlink() {
            tracing::debug!(path = %path.display(), "skipping symlink");
            continue;
        }
        if file_type.is_dir() {
            collect_files(root, &path, set)?;
        } else {
            let rel = path
                .strip_prefix(root)
                .expect("walked path is under root")
                .to_string_lossy()
                .replace('\\', "/");
            let content = fs::read(&path).map_err(|e| Error::io(&path, e))?;
            set.insert(rel, content);
        }
    }
    Ok(())
}
