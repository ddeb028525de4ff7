//! Drift detection
//!
//! Classifies every deployment by comparing three hashes: the hash at last
//! sync (`deployed_hash`), the hash of the live project tree
//! (`current_hash`), and the parent collection entry's `content_hash`.
//! Classification is pure and total; persistence of the observed hash goes
//! through the store's compare-and-swap so concurrent checks never lose
//! updates.

use crate::{Error, Result};
use artifact_fs::{FileSet, NormalizedPath};
use artifact_store::{ArtifactId, Deployment, Store, TxnScope};
use serde::{Deserialize, Serialize};

/// How far the drift detector will retry a lost compare-and-swap before
/// giving up; each retry re-reads the record and re-observes the tree.
const CAS_ATTEMPTS: usize = 3;

/// Drift classification of one deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriftStatus {
    /// Project and collection agree
    Synced,
    /// Project was edited, collection did not move
    Modified,
    /// Collection moved, project did not
    Outdated,
    /// Both moved independently
    Conflict,
}

impl std::fmt::Display for DriftStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Synced => write!(f, "synced"),
            Self::Modified => write!(f, "modified"),
            Self::Outdated => write!(f, "outdated"),
            Self::Conflict => write!(f, "conflict"),
        }
    }
}

/// Result of one deployment check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftCheck {
    pub id: ArtifactId,
    pub project: String,
    pub status: DriftStatus,
    pub deployed_hash: String,
    pub current_hash: String,
    pub collection_hash: String,
}

/// A deployment whose tree could not be read during a batch check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnknownDeployment {
    pub id: ArtifactId,
    pub project: String,
    pub reason: String,
}

/// Report for all deployments of one project
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectCheckReport {
    pub checks: Vec<DriftCheck>,
    pub unknown: Vec<UnknownDeployment>,
}

impl ProjectCheckReport {
    /// True when every readable deployment is synced and none were
    /// unreadable.
    pub fn is_clean(&self) -> bool {
        self.unknown.is_empty()
            && self
                .checks
                .iter()
                .all(|c| c.status == DriftStatus::Synced)
    }

    pub fn count(&self, status: DriftStatus) -> usize {
        self.checks.iter().filter(|c| c.status == status).count()
    }
}

/// Classifies deployments against the live filesystem and the collection.
pub struct DriftDetector<'a> {
    store: &'a Store,
}

impl<'a> DriftDetector<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Pure classification over the three hashes.
    ///
    /// Total: every `(deployed, current, collection)` triple maps to
    /// exactly one status.
    pub fn classify(deployed: &str, current: &str, collection: &str) -> DriftStatus {
        match (deployed == current, deployed == collection) {
            (true, true) => DriftStatus::Synced,
            (true, false) => DriftStatus::Outdated,
            (false, true) => DriftStatus::Modified,
            (false, false) => DriftStatus::Conflict,
        }
    }

    /// Check one deployment against its live project tree.
    ///
    /// Recomputes the tree hash, classifies, and persists the observation
    /// (`current_hash`, `last_checked_at`, first `modification_detected_at`)
    /// in a single-deployment transaction.
    ///
    /// # Errors
    ///
    /// [`Error::Read`] when the deployed tree is missing or unreadable;
    /// the record is not modified in that case.
    pub fn check(&self, id: &ArtifactId, project: &str) -> Result<DriftCheck> {
        let project = NormalizedPath::new(project);

        for _ in 0..CAS_ATTEMPTS {
            let record = self
                .store
                .deployment(id, project.as_str())?
                .ok_or_else(|| Error::DeploymentNotFound {
                    id: id.clone(),
                    project: project.to_string(),
                })?;
            let entry = self
                .store
                .entry(id)?
                .ok_or_else(|| Error::EntryNotFound { id: id.clone() })?;

            let observed = observe_tree(&project, &record)?;
            let status = Self::classify(&record.deployed_hash, &observed, &entry.content_hash);
            let drifted = status != DriftStatus::Synced;

            let swapped = self.store.with_txn(TxnScope::Deployment, |txn| {
                Ok(txn.cas_current_hash(
                    id,
                    project.as_str(),
                    record.current_hash.as_deref(),
                    &observed,
                    drifted,
                )?)
            })?;

            if swapped {
                tracing::debug!(%id, project = %project, %status, "drift check");
                return Ok(DriftCheck {
                    id: id.clone(),
                    project: project.to_string(),
                    status,
                    deployed_hash: record.deployed_hash,
                    current_hash: observed,
                    collection_hash: entry.content_hash,
                });
            }
            // A concurrent check won the swap; re-read and re-observe.
        }

        Err(Error::Store(artifact_store::Error::Transaction {
            message: format!("drift check for {id} kept losing its compare-and-swap"),
        }))
    }

    /// Check every deployment recorded for a project.
    ///
    /// Unreadable trees become `unknown` items; one bad deployment never
    /// aborts the batch.
    pub fn check_project(&self, project: &str) -> Result<ProjectCheckReport> {
        let deployments = self.store.deployments_in(project)?;
        let mut report = ProjectCheckReport::default();

        for deployment in deployments {
            match self.check(&deployment.id, project) {
                Ok(check) => report.checks.push(check),
                Err(e) if e.is_recoverable_read() => {
                    report.unknown.push(UnknownDeployment {
                        id: deployment.id,
                        project: project.to_string(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }
}

/// Hash the live tree of one deployment.
///
/// Maps filesystem failures to [`Error::Read`] so batch callers can
/// distinguish "unreadable" from real faults.
pub(crate) fn observe_tree(project: &NormalizedPath, record: &Deployment) -> Result<String> {
    let tree_path = project.join(&record.id.deploy_path());
    let files = FileSet::from_dir(&tree_path).map_err(|e| Error::Read {
        path: tree_path.to_string(),
        reason: e.to_string(),
    })?;
    Ok(files.tree_checksum())
}
