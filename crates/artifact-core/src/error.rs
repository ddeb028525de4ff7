//! Error types for artifact-core

use crate::drift::DriftStatus;
use artifact_store::ArtifactId;

/// Result type for artifact-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in engine operations
///
/// Merge conflicts are deliberately absent: they are expected outcomes,
/// returned as data in [`crate::PushOutcome`] so callers can present them.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A deployment's project tree is missing or unreadable. Recoverable:
    /// batch callers mark the one deployment unknown and continue.
    #[error("Cannot read {path}: {reason}")]
    Read { path: String, reason: String },

    /// Another sync is in flight for this (artifact, project) pair
    #[error("Sync already in progress for {id} in {project}")]
    SyncInProgress { id: ArtifactId, project: String },

    /// Pull refused because local edits would be overwritten
    #[error("Pull of {id} into {project} blocked: deployment is {status} (use force to overwrite)")]
    PullBlocked {
        id: ArtifactId,
        project: String,
        status: DriftStatus,
    },

    /// Push requires local changes to reconcile
    #[error("Nothing to push for {id} in {project}: deployment is {status}")]
    PushNotNeeded {
        id: ArtifactId,
        project: String,
        status: DriftStatus,
    },

    /// Deploy refused: the pair already has a record
    #[error("{id} is already deployed in {project}; pull to refresh it")]
    AlreadyDeployed { id: ArtifactId, project: String },

    /// Entry has no upstream reference to update from
    #[error("{id} has no upstream source")]
    NoUpstream { id: ArtifactId },

    /// Collection entry not found
    #[error("No collection entry for {id}")]
    EntryNotFound { id: ArtifactId },

    /// Deployment record not found
    #[error("No deployment of {id} in {project}")]
    DeploymentNotFound { id: ArtifactId, project: String },

    /// Filesystem error from artifact-fs
    #[error(transparent)]
    Fs(#[from] artifact_fs::Error),

    /// Storage error from artifact-store
    #[error(transparent)]
    Store(#[from] artifact_store::Error),

    /// Upstream error from artifact-source
    #[error(transparent)]
    Source(#[from] artifact_source::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error should be absorbed as a per-item `unknown`
    /// result inside a batch instead of aborting it.
    pub fn is_recoverable_read(&self) -> bool {
        matches!(self, Self::Read { .. })
    }
}
