//! Error types for artifact-cli

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from artifact-core
    #[error(transparent)]
    Core(#[from] artifact_core::Error),

    /// Error from artifact-store
    #[error(transparent)]
    Store(#[from] artifact_store::Error),

    /// Error from artifact-source
    #[error(transparent)]
    Source(#[from] artifact_source::Error),

    /// Error from artifact-fs
    #[error(transparent)]
    Fs(#[from] artifact_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }
}
