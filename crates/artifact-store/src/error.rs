//! Error types for artifact-store

use crate::model::ArtifactId;

/// Result type for artifact-store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in artifact-store operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Collection entry not found
    #[error("No collection entry for {id}")]
    EntryNotFound { id: ArtifactId },

    /// Deployment record not found
    #[error("No deployment of {id} in {project}")]
    DeploymentNotFound { id: ArtifactId, project: String },

    /// Snapshot not found
    #[error("No snapshot {id}")]
    SnapshotNotFound { id: String },

    /// Entry already exists where a fresh insert was required
    #[error("Collection entry {id} already exists")]
    DuplicateEntry { id: ArtifactId },

    /// Object content missing for a recorded hash
    #[error("No stored content for hash {hash}")]
    ObjectMissing { hash: String },

    /// Stored content no longer matches its recorded hash
    #[error("Content hash mismatch for {context}: expected {expected}, got {actual}")]
    HashMismatch {
        context: String,
        expected: String,
        actual: String,
    },

    /// A record failed boundary validation
    #[error("Invalid record: {reason}")]
    InvalidRecord { reason: String },

    /// The current transaction cannot commit; prior commits stand
    #[error("Transaction failed: {message}")]
    Transaction { message: String },

    /// Filesystem error from artifact-fs
    #[error(transparent)]
    Fs(#[from] artifact_fs::Error),

    /// TOML deserialization error
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization error
    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
