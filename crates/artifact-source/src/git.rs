//! Git-backed source provider
//!
//! Clones upstream repositories into a per-provider cache directory and
//! serves resolve/fetch against the local object database. Transfers run
//! under the provider's [`FetchLimits`]: the progress callback aborts on
//! deadline or cancellation, and whole-clone failures retry with backoff.

use crate::provider::{ResolvedSource, SourceProvider, SourceRef};
use crate::retry::{FetchLimits, with_retry};
use crate::{Error, Result};
use artifact_fs::checksum;
use git2::build::RepoBuilder;
use git2::{FetchOptions, ObjectType, Oid, RemoteCallbacks, Repository, TreeWalkMode, TreeWalkResult};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Instant;
use tempfile::TempDir;

/// Source provider backed by git clones.
pub struct GitSource {
    /// Cache root; dropped (and deleted) with the provider
    cache: TempDir,
    limits: FetchLimits,
    /// Resolved SHA → (clone directory, subdir prefix), so `fetch_file`
    /// can find its repo and re-qualify artifact-relative paths
    clones: Mutex<HashMap<String, (PathBuf, String)>>,
}

impl GitSource {
    /// Create a provider with default limits.
    pub fn new() -> Result<Self> {
        Self::with_limits(FetchLimits::default())
    }

    pub fn with_limits(limits: FetchLimits) -> Result<Self> {
        Ok(Self {
            cache: TempDir::new()?,
            limits,
            clones: Mutex::new(HashMap::new()),
        })
    }

    fn clone_dir(&self, url: &str) -> PathBuf {
        // One directory per URL, stable across resolves
        let digest = checksum::checksum_bytes(url.as_bytes());
        let short = &digest[checksum::PREFIX.len()..checksum::PREFIX.len() + 16];
        self.cache.path().join(short)
    }

    fn open_or_clone(&self, url: &str) -> Result<Repository> {
        let dest = self.clone_dir(url);
        if dest.join(".git").exists() || dest.join("HEAD").exists() {
            return Ok(Repository::open(&dest)?);
        }

        with_retry(&self.limits, url, || {
            let mut callbacks = RemoteCallbacks::new();
            let deadline = self.limits.timeout.map(|t| Instant::now() + t);
            let cancel = self.limits.cancel.clone();
            callbacks.transfer_progress(move |_| {
                !(cancel.is_cancelled() || deadline.is_some_and(|d| Instant::now() > d))
            });

            let mut fetch_options = FetchOptions::new();
            fetch_options.remote_callbacks(callbacks);

            // A failed partial clone must not poison the cache slot
            let _ = std::fs::remove_dir_all(&dest);
            RepoBuilder::new()
                .bare(true)
                .fetch_options(fetch_options)
                .clone(url, &dest)
                .map_err(Error::from)
        })
    }

    fn repo_for_sha(&self, sha: &str) -> Result<(Repository, String)> {
        let clones = self.clones.lock().expect("clone map poisoned");
        let (dir, prefix) = clones.get(sha).ok_or_else(|| Error::UnknownSha {
            sha: sha.to_string(),
        })?;
        Ok((Repository::open(dir)?, prefix.clone()))
    }
}

impl SourceProvider for GitSource {
    fn resolve(&self, source: &SourceRef) -> Result<ResolvedSource> {
        let repo = self.open_or_clone(&source.url)?;

        let reference = source.reference.as_deref().unwrap_or("HEAD");
        let commit = repo
            .revparse_single(reference)
            .and_then(|obj| obj.peel_to_commit())
            .map_err(|_| Error::UnresolvedRef {
                url: source.url.clone(),
                reference: reference.to_string(),
            })?;
        let sha = commit.id().to_string();

        let tree = commit.tree()?;
        let prefix = source
            .subdir
            .as_deref()
            .map(|s| format!("{}/", s.trim_matches('/')))
            .unwrap_or_default();

        let mut files = Vec::new();
        tree.walk(TreeWalkMode::PreOrder, |root, entry| {
            if entry.kind() == Some(ObjectType::Blob) {
                if let Some(name) = entry.name() {
                    let full = format!("{root}{name}");
                    if let Some(rel) = full.strip_prefix(&prefix) {
                        files.push(rel.to_string());
                    }
                }
            }
            TreeWalkResult::Ok
        })?;
        files.sort();

        self.clones
            .lock()
            .expect("clone map poisoned")
            .insert(sha.clone(), (self.clone_dir(&source.url), prefix.clone()));

        // A semver-shaped reference doubles as the resolved version
        let version = source
            .reference
            .as_ref()
            .filter(|r| semver::Version::parse(r.trim_start_matches('v')).is_ok())
            .cloned();

        tracing::info!(url = %source.url, %sha, files = files.len(), "resolved git source");
        Ok(ResolvedSource {
            sha,
            version,
            files,
        })
    }

    fn fetch_file(&self, sha: &str, path: &str) -> Result<Vec<u8>> {
        let (repo, prefix) = self.repo_for_sha(sha)?;
        let commit = repo.find_commit(Oid::from_str(sha)?)?;
        let tree = commit.tree()?;
        let full_path = format!("{prefix}{path}");
        let entry = tree
            .get_path(std::path::Path::new(&full_path))
            .map_err(|_| Error::FileMissing {
                sha: sha.to_string(),
                path: path.to_string(),
            })?;
        let blob = repo.find_blob(entry.id()).map_err(|_| Error::FileMissing {
            sha: sha.to_string(),
            path: path.to_string(),
        })?;
        Ok(blob.content().to_vec())
    }
}
