//! Error types for artifact-source

/// Result type for artifact-source operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to an upstream source
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Upstream unreachable or fetch failed after retries
    #[error("Fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    /// Fetch exceeded its deadline or was cancelled
    #[error("Fetch aborted for {url}: {reason}")]
    Aborted { url: String, reason: String },

    /// Reference did not resolve to a commit
    #[error("Cannot resolve {reference:?} in {url}")]
    UnresolvedRef { url: String, reference: String },

    /// A listed file disappeared between resolve and fetch
    #[error("File {path} missing at {sha}")]
    FileMissing { sha: String, path: String },

    /// No resolved source is known for this SHA
    #[error("Unknown source SHA {sha}; resolve first")]
    UnknownSha { sha: String },

    /// Underlying git error
    #[error(transparent)]
    Git(#[from] git2::Error),

    /// Filesystem error from artifact-fs
    #[error(transparent)]
    Fs(#[from] artifact_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
