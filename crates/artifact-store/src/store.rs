//! The store: single-writer transactions over the three tables
//!
//! All mutation runs inside [`Store::with_txn`]: an exclusive advisory lock
//! is taken on the store lock file, both indexes are loaded, the closure
//! mutates them through [`Txn`], and commit rewrites the dirty indexes
//! atomically. If the closure or the commit fails, no index is rewritten
//! and the store is unchanged; object content written during the
//! transaction is hash-addressed and unreferenced, so it is invisible.
//!
//! The lock-file handle is opened once per [`Store`] and reused for every
//! transaction; operations never create their own handle.

use crate::layout::StoreLayout;
use crate::model::{
    ArtifactId, CollectionEntry, Deployment, SnapshotId, SnapshotRecord,
};
use crate::{Error, Result};
use artifact_fs::{FileSet, NormalizedPath, io, validate_identifier};
use chrono::Utc;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::sync::Mutex;

const INDEX_VERSION: &str = "1.0";

/// Declared scope of a transaction, recorded in trace output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnScope {
    /// One collection entry
    Entry,
    /// One deployment record
    Deployment,
    /// One bounded batch of entries
    Batch,
    /// Snapshot creation or restore
    Snapshot,
}

impl std::fmt::Display for TxnScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Entry => write!(f, "entry"),
            Self::Deployment => write!(f, "deployment"),
            Self::Batch => write!(f, "batch"),
            Self::Snapshot => write!(f, "snapshot"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CollectionIndex {
    version: String,
    #[serde(default)]
    entries: Vec<CollectionEntry>,
}

impl Default for CollectionIndex {
    fn default() -> Self {
        Self {
            version: INDEX_VERSION.to_string(),
            entries: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DeploymentIndex {
    version: String,
    #[serde(default)]
    deployments: Vec<Deployment>,
}

impl Default for DeploymentIndex {
    fn default() -> Self {
        Self {
            version: INDEX_VERSION.to_string(),
            deployments: Vec::new(),
        }
    }
}

/// Handle to an on-disk collection store.
///
/// Open once per process and share; the embedded lock handle is the
/// single-writer session.
pub struct Store {
    layout: StoreLayout,
    lock: Mutex<File>,
}

impl Store {
    /// Open a store, creating the directory skeleton if needed.
    pub fn open(root: impl Into<NormalizedPath>) -> Result<Self> {
        let layout = StoreLayout::new(root);
        layout.init()?;

        let lock_path = layout.lock_file().to_native();
        let lock = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&lock_path)
            .map_err(|e| artifact_fs::Error::io(&lock_path, e))?;

        Ok(Self {
            layout,
            lock: Mutex::new(lock),
        })
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// Run a mutating transaction under the exclusive writer lock.
    ///
    /// The closure's error aborts the transaction with no persisted
    /// change; commit failures surface as [`Error::Transaction`].
    pub fn with_txn<T>(
        &self,
        scope: TxnScope,
        f: impl FnOnce(&mut Txn<'_>) -> Result<T>,
    ) -> Result<T> {
        let guard = self.lock.lock().expect("store lock poisoned");
        guard.lock_exclusive().map_err(|e| Error::Transaction {
            message: format!("failed to acquire writer lock: {e}"),
        })?;
        tracing::debug!(%scope, "transaction begin");

        let result = self.run_txn(f);

        let _ = FileExt::unlock(&*guard);
        tracing::debug!(%scope, ok = result.is_ok(), "transaction end");
        result
    }

    fn run_txn<T>(&self, f: impl FnOnce(&mut Txn<'_>) -> Result<T>) -> Result<T> {
        let mut txn = Txn {
            layout: &self.layout,
            collection: self.load_collection()?,
            deployments: self.load_deployments()?,
            dirty_collection: false,
            dirty_deployments: false,
            pending_snapshots: Vec::new(),
        };

        let value = f(&mut txn)?;
        txn.commit()?;
        Ok(value)
    }

    /// Run a read under the shared lock.
    fn with_read<T>(&self, f: impl FnOnce(&Store) -> Result<T>) -> Result<T> {
        let guard = self.lock.lock().expect("store lock poisoned");
        guard.lock_shared().map_err(|e| Error::Transaction {
            message: format!("failed to acquire reader lock: {e}"),
        })?;
        let result = f(self);
        let _ = FileExt::unlock(&*guard);
        result
    }

    fn load_collection(&self) -> Result<CollectionIndex> {
        load_index(&self.layout.collection_index())
    }

    fn load_deployments(&self) -> Result<DeploymentIndex> {
        load_index(&self.layout.deployments_index())
    }

    /// All collection entries, ordered by artifact id.
    pub fn entries(&self) -> Result<Vec<CollectionEntry>> {
        self.with_read(|s| Ok(s.load_collection()?.entries))
    }

    /// One collection entry, if present.
    pub fn entry(&self, id: &ArtifactId) -> Result<Option<CollectionEntry>> {
        self.with_read(|s| {
            Ok(s.load_collection()?
                .entries
                .into_iter()
                .find(|e| &e.id == id))
        })
    }

    /// All deployment records.
    pub fn deployments(&self) -> Result<Vec<Deployment>> {
        self.with_read(|s| Ok(s.load_deployments()?.deployments))
    }

    /// Deployments of one artifact across all projects.
    pub fn deployments_of(&self, id: &ArtifactId) -> Result<Vec<Deployment>> {
        self.with_read(|s| {
            Ok(s.load_deployments()?
                .deployments
                .into_iter()
                .filter(|d| &d.id == id)
                .collect())
        })
    }

    /// Deployments inside one project.
    pub fn deployments_in(&self, project: &str) -> Result<Vec<Deployment>> {
        let project = NormalizedPath::new(project);
        self.with_read(|s| {
            Ok(s.load_deployments()?
                .deployments
                .into_iter()
                .filter(|d| d.project == project.as_str())
                .collect())
        })
    }

    /// One deployment record, if present.
    pub fn deployment(&self, id: &ArtifactId, project: &str) -> Result<Option<Deployment>> {
        let project = NormalizedPath::new(project);
        self.with_read(|s| {
            Ok(s.load_deployments()?
                .deployments
                .into_iter()
                .find(|d| &d.id == id && d.project == project.as_str()))
        })
    }

    /// Whether content for `hash` is stored.
    pub fn has_object(&self, hash: &str) -> bool {
        self.layout
            .object_dir(hash)
            .map(|dir| dir.is_dir())
            .unwrap_or(false)
    }

    /// Load the content tree for `hash`, verifying integrity.
    ///
    /// # Errors
    ///
    /// [`Error::ObjectMissing`] when the hash was never stored;
    /// [`Error::HashMismatch`] when stored content no longer matches the
    /// hash it is filed under.
    pub fn load_object(&self, hash: &str) -> Result<FileSet> {
        let dir = self.layout.object_dir(hash)?;
        if !dir.is_dir() {
            return Err(Error::ObjectMissing {
                hash: hash.to_string(),
            });
        }
        let files = FileSet::from_dir(&dir)?;
        let actual = files.tree_checksum();
        if actual != hash {
            return Err(Error::HashMismatch {
                context: format!("object {dir}"),
                expected: hash.to_string(),
                actual,
            });
        }
        Ok(files)
    }

    /// All snapshots, newest first.
    pub fn snapshots(&self) -> Result<Vec<SnapshotRecord>> {
        self.with_read(|s| {
            let dir = s.layout.snapshots_dir().to_native();
            let mut snapshots = Vec::new();
            for entry in std::fs::read_dir(&dir).map_err(|e| artifact_fs::Error::io(&dir, e))? {
                let entry = entry.map_err(|e| artifact_fs::Error::io(&dir, e))?;
                let path = NormalizedPath::new(entry.path());
                if path.as_str().ends_with(".toml") {
                    let record: SnapshotRecord = toml::from_str(&io::read_text(&path)?)?;
                    snapshots.push(record);
                }
            }
            snapshots.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(snapshots)
        })
    }

    /// One snapshot by id.
    pub fn snapshot(&self, id: &SnapshotId) -> Result<SnapshotRecord> {
        let path = self.layout.snapshot_file(id);
        if !path.is_file() {
            return Err(Error::SnapshotNotFound { id: id.to_string() });
        }
        Ok(toml::from_str(&io::read_text(&path)?)?)
    }
}

fn load_index<T: Default + serde::de::DeserializeOwned>(path: &NormalizedPath) -> Result<T> {
    if !path.is_file() {
        return Ok(T::default());
    }
    Ok(toml::from_str(&io::read_text(path)?)?)
}

/// Mutable view of the store inside one transaction.
pub struct Txn<'a> {
    layout: &'a StoreLayout,
    collection: CollectionIndex,
    deployments: DeploymentIndex,
    dirty_collection: bool,
    dirty_deployments: bool,
    pending_snapshots: Vec<SnapshotRecord>,
}

impl Txn<'_> {
    /// Entries as currently visible to this transaction.
    pub fn entries(&self) -> &[CollectionEntry] {
        &self.collection.entries
    }

    pub fn entry(&self, id: &ArtifactId) -> Option<&CollectionEntry> {
        self.collection.entries.iter().find(|e| &e.id == id)
    }

    /// Write `files` into the object directory for their tree checksum and
    /// return the hash. Idempotent: an existing object is left untouched.
    pub fn write_object(&mut self, files: &FileSet) -> Result<String> {
        let hash = files.tree_checksum();
        let dir = self.layout.object_dir(&hash)?;
        if !dir.is_dir() {
            files.write_clean(&dir)?;
        }
        Ok(hash)
    }

    /// Insert or replace an entry together with its content.
    ///
    /// Recomputes `content_hash` from `files` and bumps `updated_at`;
    /// whatever hash the caller put on `entry` is discarded.
    pub fn put_entry(&mut self, mut entry: CollectionEntry, files: &FileSet) -> Result<CollectionEntry> {
        validate_entry(&entry)?;
        entry.content_hash = self.write_object(files)?;
        entry.updated_at = Utc::now();

        match self.collection.entries.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => *existing = entry.clone(),
            None => {
                self.collection.entries.push(entry.clone());
                self.collection.entries.sort_by(|a, b| a.id.cmp(&b.id));
            }
        }
        self.dirty_collection = true;
        Ok(entry)
    }

    /// Insert a new entry, refusing to overwrite an existing one.
    pub fn insert_entry(&mut self, entry: CollectionEntry, files: &FileSet) -> Result<CollectionEntry> {
        if self.entry(&entry.id).is_some() {
            return Err(Error::DuplicateEntry { id: entry.id });
        }
        self.put_entry(entry, files)
    }

    /// Remove an entry, returning its last record.
    ///
    /// Content objects are kept: snapshots and deployment bases may still
    /// reference them.
    pub fn remove_entry(&mut self, id: &ArtifactId) -> Result<CollectionEntry> {
        let pos = self
            .collection
            .entries
            .iter()
            .position(|e| &e.id == id)
            .ok_or_else(|| Error::EntryNotFound { id: id.clone() })?;
        self.dirty_collection = true;
        Ok(self.collection.entries.remove(pos))
    }

    /// Replace the whole entry table, e.g. when restoring a snapshot.
    ///
    /// Every referenced content hash must already be stored.
    pub fn replace_entries(&mut self, entries: Vec<CollectionEntry>) -> Result<()> {
        for entry in &entries {
            let dir = self.layout.object_dir(&entry.content_hash)?;
            if !dir.is_dir() {
                return Err(Error::ObjectMissing {
                    hash: entry.content_hash.clone(),
                });
            }
        }
        self.collection.entries = entries;
        self.collection.entries.sort_by(|a, b| a.id.cmp(&b.id));
        self.dirty_collection = true;
        Ok(())
    }

    pub fn deployments(&self) -> &[Deployment] {
        &self.deployments.deployments
    }

    pub fn deployment(&self, id: &ArtifactId, project: &str) -> Option<&Deployment> {
        self.deployments
            .deployments
            .iter()
            .find(|d| &d.id == id && d.project == project)
    }

    /// Insert or replace a deployment record.
    pub fn put_deployment(&mut self, deployment: Deployment) {
        match self
            .deployments
            .deployments
            .iter_mut()
            .find(|d| d.id == deployment.id && d.project == deployment.project)
        {
            Some(existing) => *existing = deployment,
            None => {
                self.deployments.deployments.push(deployment);
                self.deployments
                    .deployments
                    .sort_by(|a, b| (&a.id, &a.project).cmp(&(&b.id, &b.project)));
            }
        }
        self.dirty_deployments = true;
    }

    /// Remove a deployment record, discarding its lineage.
    pub fn remove_deployment(&mut self, id: &ArtifactId, project: &str) -> Result<Deployment> {
        let pos = self
            .deployments
            .deployments
            .iter()
            .position(|d| &d.id == id && d.project == project)
            .ok_or_else(|| Error::DeploymentNotFound {
                id: id.clone(),
                project: project.to_string(),
            })?;
        self.dirty_deployments = true;
        Ok(self.deployments.deployments.remove(pos))
    }

    /// Compare-and-swap the observed hash on one deployment.
    ///
    /// Returns `false` without changing anything when another checker got
    /// there first (`current_hash` no longer equals `expected`). On
    /// success, stamps `last_checked_at` and, when `drifted_from_deploy`
    /// is set for the first time, `modification_detected_at`.
    pub fn cas_current_hash(
        &mut self,
        id: &ArtifactId,
        project: &str,
        expected: Option<&str>,
        observed: &str,
        drifted_from_deploy: bool,
    ) -> Result<bool> {
        let record = self
            .deployments
            .deployments
            .iter_mut()
            .find(|d| &d.id == id && d.project == project)
            .ok_or_else(|| Error::DeploymentNotFound {
                id: id.clone(),
                project: project.to_string(),
            })?;

        if record.current_hash.as_deref() != expected {
            tracing::debug!(%id, project, "current_hash CAS lost to a concurrent check");
            return Ok(false);
        }

        record.current_hash = Some(observed.to_string());
        record.last_checked_at = Some(Utc::now());
        if drifted_from_deploy && record.modification_detected_at.is_none() {
            record.modification_detected_at = Some(Utc::now());
        }
        self.dirty_deployments = true;
        Ok(true)
    }

    /// Queue a snapshot of the given entry table; written at commit.
    pub fn put_snapshot(&mut self, record: SnapshotRecord) -> SnapshotId {
        let id = record.id;
        self.pending_snapshots.push(record);
        id
    }

    fn commit(self) -> Result<()> {
        let commit_inner = || -> Result<()> {
            for snapshot in &self.pending_snapshots {
                let path = self.layout.snapshot_file(&snapshot.id);
                io::write_text(&path, &toml::to_string_pretty(snapshot)?)?;
            }
            if self.dirty_collection {
                io::write_text(
                    &self.layout.collection_index(),
                    &toml::to_string_pretty(&self.collection)?,
                )?;
            }
            if self.dirty_deployments {
                io::write_text(
                    &self.layout.deployments_index(),
                    &toml::to_string_pretty(&self.deployments)?,
                )?;
            }
            Ok(())
        };

        commit_inner().map_err(|e| Error::Transaction {
            message: format!("commit failed: {e}"),
        })
    }
}

fn validate_entry(entry: &CollectionEntry) -> Result<()> {
    validate_identifier(&entry.id.name)?;
    for key in entry.attributes.keys() {
        if key.trim().is_empty() {
            return Err(Error::InvalidRecord {
                reason: format!("empty attribute key on {}", entry.id),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ArtifactType, LineageEvent, LineageKind};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn sample_files(marker: &str) -> FileSet {
        let mut files = FileSet::new();
        files.insert("SKILL.md", format!("# sample\n{marker}\n").into_bytes());
        files.insert("scripts/run.sh", b"echo run\n".to_vec());
        files
    }

    fn sample_id(name: &str) -> ArtifactId {
        ArtifactId::new(name, ArtifactType::Skill)
    }

    #[test]
    fn put_entry_recomputes_hash() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("store")).unwrap();

        let mut entry = CollectionEntry::new(sample_id("pdf-tool"));
        entry.content_hash = "sha256:forged".to_string();
        let files = sample_files("v1");

        let written = store
            .with_txn(TxnScope::Entry, |txn| txn.put_entry(entry, &files))
            .unwrap();

        assert_eq!(written.content_hash, files.tree_checksum());
        let loaded = store.load_object(&written.content_hash).unwrap();
        assert_eq!(loaded, files);
    }

    #[test]
    fn insert_entry_rejects_duplicates() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("store")).unwrap();
        let files = sample_files("v1");

        store
            .with_txn(TxnScope::Entry, |txn| {
                txn.insert_entry(CollectionEntry::new(sample_id("pdf-tool")), &files)
            })
            .unwrap();

        let err = store
            .with_txn(TxnScope::Entry, |txn| {
                txn.insert_entry(CollectionEntry::new(sample_id("pdf-tool")), &files)
            })
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateEntry { .. }));
    }

    #[test]
    fn failed_txn_leaves_no_change() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("store")).unwrap();
        let files = sample_files("v1");

        let result: Result<()> = store.with_txn(TxnScope::Batch, |txn| {
            txn.put_entry(CollectionEntry::new(sample_id("pdf-tool")), &files)?;
            Err(Error::Transaction {
                message: "engineered failure".to_string(),
            })
        });
        assert!(result.is_err());
        assert!(store.entries().unwrap().is_empty());
    }

    #[test]
    fn load_object_detects_corruption() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("store")).unwrap();
        let files = sample_files("v1");

        let entry = store
            .with_txn(TxnScope::Entry, |txn| {
                txn.put_entry(CollectionEntry::new(sample_id("pdf-tool")), &files)
            })
            .unwrap();

        // Corrupt the stored object behind the store's back
        let object_dir = store.layout().object_dir(&entry.content_hash).unwrap();
        std::fs::write(object_dir.to_native().join("SKILL.md"), "tampered").unwrap();

        let err = store.load_object(&entry.content_hash).unwrap_err();
        assert!(matches!(err, Error::HashMismatch { .. }));
    }

    #[test]
    fn cas_current_hash_detects_lost_update() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("store")).unwrap();
        let id = sample_id("pdf-tool");

        store.with_txn(TxnScope::Deployment, |txn| {
            txn.put_deployment(Deployment::new(id.clone(), "/proj", "sha256:aa"));
            Ok(())
        })
        .unwrap();

        // First check wins
        let swapped = store
            .with_txn(TxnScope::Deployment, |txn| {
                txn.cas_current_hash(&id, "/proj", None, "sha256:bb", true)
            })
            .unwrap();
        assert!(swapped);

        // Second check raced on stale expectation and must not clobber
        let swapped = store
            .with_txn(TxnScope::Deployment, |txn| {
                txn.cas_current_hash(&id, "/proj", None, "sha256:cc", true)
            })
            .unwrap();
        assert!(!swapped);

        let record = store.deployment(&id, "/proj").unwrap().unwrap();
        assert_eq!(record.current_hash.as_deref(), Some("sha256:bb"));
        assert!(record.modification_detected_at.is_some());
    }

    #[test]
    fn snapshots_list_newest_first() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("store")).unwrap();

        for label in ["first", "second", "third"] {
            store
                .with_txn(TxnScope::Snapshot, |txn| {
                    let record = SnapshotRecord::new(label, txn.entries().to_vec());
                    Ok(txn.put_snapshot(record))
                })
                .unwrap();
            // Distinct creation timestamps
            std::thread::sleep(std::time::Duration::from_millis(5));
        }

        let listed = store.snapshots().unwrap();
        let messages: Vec<&str> = listed.iter().map(|s| s.message.as_str()).collect();
        assert_eq!(messages, vec!["third", "second", "first"]);
    }

    #[test]
    fn lineage_appends_survive_round_trip() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("store")).unwrap();
        let id = sample_id("pdf-tool");

        store
            .with_txn(TxnScope::Deployment, |txn| {
                let mut deployment = Deployment::new(id.clone(), "/proj", "sha256:aa");
                deployment.lineage.push(LineageEvent::new(
                    LineageKind::Pulled,
                    Some("sha256:aa".to_string()),
                    "sha256:bb",
                ));
                txn.put_deployment(deployment);
                Ok(())
            })
            .unwrap();

        let record = store.deployment(&id, "/proj").unwrap().unwrap();
        assert_eq!(record.lineage.len(), 2);
        assert_eq!(record.last_event().unwrap().event, LineageKind::Pulled);
    }
}
