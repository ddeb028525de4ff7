//! On-disk layout of a collection store

use crate::{Error, Result};
use artifact_fs::{NormalizedPath, checksum};
use std::fs;

/// Path schema for a store root.
///
/// ```text
/// <root>/
///   store.lock           advisory lock for the single writer
///   collection.toml      collection entry index
///   deployments.toml     deployment record index
///   objects/<hex>/       one directory per content hash, immutable
///   snapshots/<id>.toml  one file per snapshot
///   leases/              per-(artifact, project) sync leases
/// ```
#[derive(Debug, Clone)]
pub struct StoreLayout {
    root: NormalizedPath,
}

impl StoreLayout {
    pub fn new(root: impl Into<NormalizedPath>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &NormalizedPath {
        &self.root
    }

    pub fn lock_file(&self) -> NormalizedPath {
        self.root.join("store.lock")
    }

    pub fn collection_index(&self) -> NormalizedPath {
        self.root.join("collection.toml")
    }

    pub fn deployments_index(&self) -> NormalizedPath {
        self.root.join("deployments.toml")
    }

    pub fn objects_dir(&self) -> NormalizedPath {
        self.root.join("objects")
    }

    /// Directory holding the content tree for one hash.
    ///
    /// # Errors
    ///
    /// Rejects hashes that are not in canonical `sha256:<hex>` form, so a
    /// corrupted index cannot escape the objects directory.
    pub fn object_dir(&self, hash: &str) -> Result<NormalizedPath> {
        let hex = hash
            .strip_prefix(checksum::PREFIX)
            .filter(|h| !h.is_empty() && h.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| Error::InvalidRecord {
                reason: format!("malformed content hash {hash:?}"),
            })?;
        Ok(self.objects_dir().join(hex))
    }

    pub fn snapshots_dir(&self) -> NormalizedPath {
        self.root.join("snapshots")
    }

    pub fn snapshot_file(&self, id: &crate::SnapshotId) -> NormalizedPath {
        self.snapshots_dir().join(&format!("{id}.toml"))
    }

    pub fn leases_dir(&self) -> NormalizedPath {
        self.root.join("leases")
    }

    /// Lease file for one `(artifact, project)` pair.
    ///
    /// The project path is folded into a short digest so the lease name
    /// stays a single safe path component.
    pub fn lease_file(&self, artifact: &crate::ArtifactId, project: &str) -> NormalizedPath {
        let project_digest = checksum::checksum_bytes(project.as_bytes());
        let short = &project_digest[checksum::PREFIX.len()..checksum::PREFIX.len() + 16];
        self.leases_dir()
            .join(&format!("{}-{}-{}.lock", artifact.kind, artifact.name, short))
    }

    /// Create the directory skeleton and lock file if missing.
    pub fn init(&self) -> Result<()> {
        for dir in [
            self.root.clone(),
            self.objects_dir(),
            self.snapshots_dir(),
            self.leases_dir(),
        ] {
            let native = dir.to_native();
            fs::create_dir_all(&native).map_err(|e| artifact_fs::Error::io(&native, e))?;
        }
        let lock = self.lock_file().to_native();
        if !lock.exists() {
            fs::write(&lock, b"").map_err(|e| artifact_fs::Error::io(&lock, e))?;
        }
        Ok(())
    }
}
