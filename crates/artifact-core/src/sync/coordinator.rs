//! The sync coordinator
//!
//! Implements deploy, undeploy, pull, push, update, and removal. Mutating
//! operations on a pair hold its lease for their whole duration; storage
//! transactions stay tightly scoped and never span an upstream fetch.

use crate::drift::{DriftDetector, DriftStatus};
use crate::snapshot::auto_message;
use crate::sync::lease::SyncLease;
use crate::{Error, Result};
use artifact_content::{ConflictedFile, MergeStrategy, merge_file_sets};
use artifact_fs::{FileSet, NormalizedPath, io};
use artifact_source::{CancelFlag, SourceProvider, SourceRef, fetch_file_set};
use artifact_store::{
    ArtifactId, CollectionEntry, Deployment, LineageEvent, LineageKind, SnapshotId,
    SnapshotRecord, Store, TxnScope, UpstreamRef,
};
use serde::{Deserialize, Serialize};

/// Options for a pull
#[derive(Debug, Clone, Copy, Default)]
pub struct PullOptions {
    /// Overwrite local edits (`modified`/`conflict` deployments)
    pub force: bool,
}

/// Result of a push
#[derive(Debug, Clone)]
pub enum PushOutcome {
    /// Merge was clean and has been committed
    Committed {
        entry: CollectionEntry,
        deployment: Deployment,
    },
    /// Merge produced conflicts; nothing was persisted
    Conflicts(Vec<ConflictedFile>),
}

impl PushOutcome {
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

/// Result of updating one entry from upstream
#[derive(Debug, Clone)]
pub enum UpdateOutcome {
    Updated {
        entry: CollectionEntry,
        previous_hash: String,
        snapshot: SnapshotId,
    },
    /// Upstream content is identical to the collection state
    AlreadyCurrent { id: ArtifactId },
}

/// Aggregate result of an update sweep over the collection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAllReport {
    pub updated: Vec<ArtifactId>,
    pub unchanged: Vec<ArtifactId>,
    pub failed: Vec<(ArtifactId, String)>,
    /// Set when the sweep stopped at the cancellation flag; everything
    /// already listed was committed and stands
    pub cancelled: bool,
}

/// Orchestrates sync operations against one store.
pub struct SyncCoordinator<'a> {
    store: &'a Store,
}

impl<'a> SyncCoordinator<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub(crate) fn store(&self) -> &Store {
        self.store
    }

    /// Install a collection entry into a project.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyDeployed`] when the pair already has a record; use
    /// [`SyncCoordinator::pull`] to refresh an existing deployment.
    pub fn deploy(&self, id: &ArtifactId, project: &str) -> Result<Deployment> {
        let project = NormalizedPath::new(project);
        let _lease = SyncLease::acquire(self.store, id, project.as_str())?;

        if self.store.deployment(id, project.as_str())?.is_some() {
            return Err(Error::AlreadyDeployed {
                id: id.clone(),
                project: project.to_string(),
            });
        }

        let entry = self
            .store
            .entry(id)?
            .ok_or_else(|| Error::EntryNotFound { id: id.clone() })?;
        let files = self.store.load_object(&entry.content_hash)?;
        files.write_clean(&project.join(&id.deploy_path()))?;

        let record = Deployment::new(id.clone(), project.as_str(), entry.content_hash);
        self.store.with_txn(TxnScope::Deployment, |txn| {
            txn.put_deployment(record.clone());
            Ok(())
        })?;

        tracing::info!(%id, project = %project, "deployed");
        Ok(record)
    }

    /// Remove a deployment record and, optionally, the deployed files.
    ///
    /// The record's lineage ends with it; collection history is
    /// unaffected.
    pub fn undeploy(&self, id: &ArtifactId, project: &str, delete_files: bool) -> Result<Deployment> {
        let project = NormalizedPath::new(project);
        let _lease = SyncLease::acquire(self.store, id, project.as_str())?;

        let record = self.store.with_txn(TxnScope::Deployment, |txn| {
            Ok(txn.remove_deployment(id, project.as_str())?)
        })?;

        if delete_files {
            io::remove_dir_all_if_exists(&project.join(&id.deploy_path()))?;
        }

        tracing::info!(%id, project = %project, "undeployed");
        Ok(record)
    }

    /// Overwrite a project's deployed copy with the collection state.
    ///
    /// Refuses when the deployment is `modified` or in `conflict` unless
    /// forced; an unreadable or missing project tree is always
    /// pull-able (that is how a deleted copy is restored).
    pub fn pull(&self, id: &ArtifactId, project: &str, options: PullOptions) -> Result<Deployment> {
        let project = NormalizedPath::new(project);
        let _lease = SyncLease::acquire(self.store, id, project.as_str())?;

        match DriftDetector::new(self.store).check(id, project.as_str()) {
            Ok(check) => {
                let blocked = matches!(check.status, DriftStatus::Modified | DriftStatus::Conflict);
                if blocked && !options.force {
                    return Err(Error::PullBlocked {
                        id: id.clone(),
                        project: project.to_string(),
                        status: check.status,
                    });
                }
            }
            Err(e) if e.is_recoverable_read() => {
                tracing::debug!(%id, project = %project, "pulling into unreadable tree");
            }
            Err(e) => return Err(e),
        }

        let entry = self
            .store
            .entry(id)?
            .ok_or_else(|| Error::EntryNotFound { id: id.clone() })?;
        let files = self.store.load_object(&entry.content_hash)?;
        files.write_clean(&project.join(&id.deploy_path()))?;

        let mut record = self
            .store
            .deployment(id, project.as_str())?
            .ok_or_else(|| Error::DeploymentNotFound {
                id: id.clone(),
                project: project.to_string(),
            })?;
        let from = record.deployed_hash.clone();
        record.deployed_hash = entry.content_hash.clone();
        record.current_hash = None;
        record.last_checked_at = None;
        record.modification_detected_at = None;
        record.lineage.push(LineageEvent::new(
            LineageKind::Pulled,
            Some(from),
            entry.content_hash.clone(),
        ));
        self.store.with_txn(TxnScope::Deployment, |txn| {
            txn.put_deployment(record.clone());
            Ok(())
        })?;

        tracing::info!(%id, project = %project, "pulled");
        Ok(record)
    }

    /// Reconcile local edits back into the collection.
    ///
    /// Three-way merge of the project tree (`ours`) and the collection
    /// state (`theirs`) against the content at `deployed_hash` (`base`).
    /// A clean merge commits auto-snapshot, new entry state, and
    /// deployment lineage in one transaction, then writes the merged
    /// result back to the project. Conflicts are returned as data with no
    /// persisted change.
    pub fn push(
        &self,
        id: &ArtifactId,
        project: &str,
        strategy: MergeStrategy,
    ) -> Result<PushOutcome> {
        let project = NormalizedPath::new(project);
        let _lease = SyncLease::acquire(self.store, id, project.as_str())?;

        let check = DriftDetector::new(self.store).check(id, project.as_str())?;
        if !matches!(check.status, DriftStatus::Modified | DriftStatus::Conflict) {
            return Err(Error::PushNotNeeded {
                id: id.clone(),
                project: project.to_string(),
                status: check.status,
            });
        }

        let entry = self
            .store
            .entry(id)?
            .ok_or_else(|| Error::EntryNotFound { id: id.clone() })?;

        let base = self.store.load_object(&check.deployed_hash)?;
        let theirs = self.store.load_object(&entry.content_hash)?;
        let tree_path = project.join(&id.deploy_path());
        let ours = FileSet::from_dir(&tree_path).map_err(|e| Error::Read {
            path: tree_path.to_string(),
            reason: e.to_string(),
        })?;

        let outcome = merge_file_sets(&base, &ours, &theirs, strategy);
        if !outcome.is_clean() {
            tracing::info!(%id, project = %project, conflicts = outcome.conflicts.len(), "push blocked on conflicts");
            return Ok(PushOutcome::Conflicts(outcome.conflicts));
        }
        let merged = outcome.applied_set();

        let mut record = self
            .store
            .deployment(id, project.as_str())?
            .ok_or_else(|| Error::DeploymentNotFound {
                id: id.clone(),
                project: project.to_string(),
            })?;

        let (entry, record) = self.store.with_txn(TxnScope::Entry, |txn| {
            txn.put_snapshot(SnapshotRecord::new(
                auto_message(&format!("push of {id}")),
                txn.entries().to_vec(),
            ));

            let entry = txn.put_entry(entry.clone(), &merged)?;

            let from = record.deployed_hash.clone();
            record.deployed_hash = entry.content_hash.clone();
            record.current_hash = None;
            record.last_checked_at = None;
            record.modification_detected_at = None;
            record.lineage.push(
                LineageEvent::new(LineageKind::Pushed, Some(from), entry.content_hash.clone())
                    .with_strategy(strategy),
            );
            txn.put_deployment(record.clone());
            Ok((entry, record))
        })?;

        // Bring the project tree up to the merged state it now records.
        merged.write_clean(&tree_path)?;

        tracing::info!(%id, project = %project, hash = %entry.content_hash, "pushed");
        Ok(PushOutcome::Committed {
            entry,
            deployment: record,
        })
    }

    /// Refresh one entry from its upstream source.
    ///
    /// The fetch is fully materialized before the write transaction
    /// opens, so no storage lock is held across network I/O. Deployments
    /// keep their old `deployed_hash` and read as `outdated` until pulled
    /// or merged.
    pub fn update(
        &self,
        id: &ArtifactId,
        provider: &dyn SourceProvider,
        reference: Option<&str>,
    ) -> Result<UpdateOutcome> {
        let entry = self
            .store
            .entry(id)?
            .ok_or_else(|| Error::EntryNotFound { id: id.clone() })?;
        let upstream = entry
            .upstream
            .clone()
            .ok_or_else(|| Error::NoUpstream { id: id.clone() })?;

        let mut source = SourceRef::new(upstream.url.clone());
        if let Some(reference) = reference {
            source = source.with_reference(reference);
        }
        let (resolved, files) = fetch_file_set(provider, &source)?;

        if files.tree_checksum() == entry.content_hash {
            tracing::debug!(%id, "upstream unchanged");
            return Ok(UpdateOutcome::AlreadyCurrent { id: id.clone() });
        }

        let previous_hash = entry.content_hash.clone();
        let (entry, snapshot) = self.store.with_txn(TxnScope::Entry, |txn| {
            let snapshot = txn.put_snapshot(SnapshotRecord::new(
                auto_message(&format!("update of {id}")),
                txn.entries().to_vec(),
            ));

            let mut entry = entry.clone();
            entry.upstream = Some(UpstreamRef {
                url: upstream.url.clone(),
                sha: resolved.sha.clone(),
                version: resolved.version.clone(),
            });
            entry.resolved_version = resolved.semver();
            let entry = txn.put_entry(entry, &files)?;
            Ok((entry, snapshot))
        })?;

        tracing::info!(%id, from = %previous_hash, to = %entry.content_hash, "updated from upstream");
        Ok(UpdateOutcome::Updated {
            entry,
            previous_hash,
            snapshot,
        })
    }

    /// Update every entry that has an upstream source.
    ///
    /// Checks the cancellation flag between entries; committed updates
    /// stand and the report says how far the sweep got.
    pub fn update_all(
        &self,
        provider: &dyn SourceProvider,
        cancel: &CancelFlag,
    ) -> Result<UpdateAllReport> {
        let mut report = UpdateAllReport::default();

        for entry in self.store.entries()? {
            if entry.upstream.is_none() {
                continue;
            }
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            match self.update(&entry.id, provider, None) {
                Ok(UpdateOutcome::Updated { .. }) => report.updated.push(entry.id),
                Ok(UpdateOutcome::AlreadyCurrent { .. }) => report.unchanged.push(entry.id),
                Err(e) => report.failed.push((entry.id, e.to_string())),
            }
        }
        Ok(report)
    }

    /// Remove an entry from the collection, snapshotting first.
    pub fn remove(&self, id: &ArtifactId) -> Result<CollectionEntry> {
        Ok(self.store.with_txn(TxnScope::Entry, |txn| {
            txn.put_snapshot(SnapshotRecord::new(
                auto_message(&format!("removal of {id}")),
                txn.entries().to_vec(),
            ));
            Ok(txn.remove_entry(id)?)
        })?)
    }
}
