//! The provider trait and fetch helpers

use crate::{Error, Result};
use artifact_fs::FileSet;

/// A reference to artifact content in an upstream repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    /// Repository URL (or local path for directory sources)
    pub url: String,
    /// Tag, branch, or SHA; provider default when `None`
    pub reference: Option<String>,
    /// Subdirectory holding the artifact, relative to the repo root
    pub subdir: Option<String>,
}

impl SourceRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reference: None,
            subdir: None,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_subdir(mut self, subdir: impl Into<String>) -> Self {
        self.subdir = Some(subdir.into());
        self
    }
}

/// A resolved upstream state: concrete SHA, optional version, file list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub sha: String,
    /// Version string when the reference carried one (e.g. a semver tag)
    pub version: Option<String>,
    /// Relative paths of every file at this state
    pub files: Vec<String>,
}

impl ResolvedSource {
    /// Parse the version string as semver, tolerating a leading `v`.
    pub fn semver(&self) -> Option<semver::Version> {
        let raw = self.version.as_deref()?;
        semver::Version::parse(raw.trim_start_matches('v')).ok()
    }
}

/// An upstream source of artifact content.
///
/// Implementations are free to be slow and unreliable; callers decide
/// retry policy via [`crate::FetchLimits`] and must never hold storage
/// locks across calls.
pub trait SourceProvider {
    /// Resolve a reference to a concrete state.
    fn resolve(&self, source: &SourceRef) -> Result<ResolvedSource>;

    /// Fetch one file at a previously resolved state.
    fn fetch_file(&self, sha: &str, path: &str) -> Result<Vec<u8>>;
}

/// Resolve a source and fetch its complete file set.
///
/// The returned set is fully materialized in memory, so the caller can
/// open its storage transaction only after all upstream I/O is done.
///
/// # Errors
///
/// [`Error::FileMissing`] if a listed file cannot be fetched; the
/// upstream state is treated as inconsistent rather than imported
/// partially.
pub fn fetch_file_set(
    provider: &dyn SourceProvider,
    source: &SourceRef,
) -> Result<(ResolvedSource, FileSet)> {
    let resolved = provider.resolve(source)?;
    tracing::debug!(
        url = %source.url,
        sha = %resolved.sha,
        files = resolved.files.len(),
        "resolved upstream source"
    );

    let mut files = FileSet::new();
    for path in &resolved.files {
        let content = provider.fetch_file(&resolved.sha, path)?;
        files.insert(path.clone(), content);
    }
    Ok((resolved, files))
}
