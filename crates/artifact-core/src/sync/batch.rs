//! Bounded-batch import
//!
//! Bulk imports commit one bounded batch per transaction instead of one
//! global transaction: a failure in batch *k* leaves batches `1..k` on
//! disk, and per-entry failures inside a batch skip the entry without
//! aborting its siblings. The report names exactly what succeeded and
//! what failed. This trades all-or-nothing semantics for short writer
//! lock holds on the single-writer store.

use crate::sync::coordinator::SyncCoordinator;
use crate::{CancelFlag, Result};
use artifact_fs::FileSet;
use artifact_store::{ArtifactId, CollectionEntry, TrustLevel, TxnScope, UpstreamRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default entries per transaction
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// A finalized artifact ready for import, as produced by the catalog
/// scanner or a local-directory import.
#[derive(Debug, Clone)]
pub struct ImportCandidate {
    pub id: ArtifactId,
    pub files: FileSet,
    pub upstream: Option<UpstreamRef>,
    pub tags: Vec<String>,
    pub trust: TrustLevel,
    pub attributes: BTreeMap<String, String>,
}

impl ImportCandidate {
    pub fn new(id: ArtifactId, files: FileSet) -> Self {
        Self {
            id,
            files,
            upstream: None,
            tags: Vec::new(),
            trust: TrustLevel::default(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_upstream(mut self, upstream: UpstreamRef) -> Self {
        self.upstream = Some(upstream);
        self
    }

    pub fn with_trust(mut self, trust: TrustLevel) -> Self {
        self.trust = trust;
        self
    }

    fn into_entry(self) -> (CollectionEntry, FileSet) {
        let mut entry = CollectionEntry::new(self.id);
        entry.upstream = self.upstream;
        entry.tags = self.tags;
        entry.trust = self.trust;
        entry.attributes = self.attributes;
        (entry, self.files)
    }
}

/// Options for a bulk import
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub batch_size: usize,
    pub cancel: CancelFlag,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            cancel: CancelFlag::new(),
        }
    }
}

/// One entry that failed to import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportFailure {
    pub id: ArtifactId,
    pub error: String,
}

/// Aggregate import result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub imported: Vec<ArtifactId>,
    pub failed: Vec<ImportFailure>,
    pub committed_batches: usize,
    /// Set when the import stopped at the cancellation flag; committed
    /// batches stand
    pub cancelled: bool,
}

impl BatchReport {
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty() && !self.cancelled
    }
}

impl SyncCoordinator<'_> {
    /// Import candidates in bounded batches.
    ///
    /// Never fails as a whole: per-entry problems land in the report, a
    /// failed batch transaction fails only its own entries, and
    /// cancellation between batches leaves committed work intact.
    pub fn import(
        &self,
        candidates: Vec<ImportCandidate>,
        options: &ImportOptions,
    ) -> Result<BatchReport> {
        let batch_size = options.batch_size.max(1);
        let mut report = BatchReport::default();
        let mut pending = candidates.into_iter().peekable();

        while pending.peek().is_some() {
            if options.cancel.is_cancelled() {
                report.cancelled = true;
                tracing::info!(
                    imported = report.imported.len(),
                    "import cancelled between batches"
                );
                break;
            }

            let batch: Vec<ImportCandidate> = pending.by_ref().take(batch_size).collect();
            let batch_ids: Vec<ArtifactId> = batch.iter().map(|c| c.id.clone()).collect();

            let result = self.store().with_txn(TxnScope::Batch, |txn| {
                let mut imported = Vec::new();
                let mut failed = Vec::new();
                for candidate in batch {
                    let id = candidate.id.clone();
                    let (entry, files) = candidate.into_entry();
                    match txn.insert_entry(entry, &files) {
                        Ok(entry) => imported.push(entry.id),
                        Err(e) => failed.push(ImportFailure {
                            id,
                            error: e.to_string(),
                        }),
                    }
                }
                Ok((imported, failed))
            });

            match result {
                Ok((imported, failed)) => {
                    report.imported.extend(imported);
                    report.failed.extend(failed);
                    report.committed_batches += 1;
                }
                Err(e) => {
                    // The whole batch rolled back; earlier batches stand.
                    tracing::warn!(error = %e, "batch transaction failed");
                    let message = e.to_string();
                    report.failed.extend(batch_ids.into_iter().map(|id| ImportFailure {
                        id,
                        error: message.clone(),
                    }));
                }
            }
        }

        Ok(report)
    }
}
