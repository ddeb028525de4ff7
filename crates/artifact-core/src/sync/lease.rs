//! Per-pair sync leases
//!
//! One lease file per `(artifact, project)` pair under the store's
//! `leases/` directory. Acquisition is non-blocking: a held lease means a
//! sync is already in flight, and the caller gets
//! [`Error::SyncInProgress`] instead of queueing.

use crate::{Error, Result};
use artifact_store::{ArtifactId, Store};
use fs2::FileExt;
use std::fs::OpenOptions;

/// Exclusive lease over one `(artifact, project)` pair.
///
/// Released on drop.
#[derive(Debug)]
pub(crate) struct SyncLease {
    file: std::fs::File,
}

impl SyncLease {
    pub(crate) fn acquire(store: &Store, id: &ArtifactId, project: &str) -> Result<Self> {
        let path = store.layout().lease_file(id, project).to_native();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| artifact_fs::Error::io(&path, e))?;

        file.try_lock_exclusive().map_err(|_| {
            tracing::debug!(%id, project, "sync lease contended");
            Error::SyncInProgress {
                id: id.clone(),
                project: project.to_string(),
            }
        })?;

        Ok(Self { file })
    }
}

impl Drop for SyncLease {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
