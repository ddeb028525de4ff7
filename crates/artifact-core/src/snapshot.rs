//! Collection snapshots
//!
//! A snapshot freezes the whole collection entry table; content objects
//! are hash-addressed and immutable, so the frozen records stay
//! materializable forever. Restore never rewrites history: the current
//! state is auto-snapshotted first, then the entry table is replaced.

use crate::Result;
use artifact_store::{SnapshotId, SnapshotRecord, Store, TxnScope};
use serde::{Deserialize, Serialize};

/// Message used for the automatic safety snapshot taken before
/// destructive operations.
pub(crate) fn auto_message(operation: &str) -> String {
    format!("auto: before {operation}")
}

/// Result of restoring a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreReport {
    /// Snapshot of the state as it was just before the restore
    pub auto_snapshot: SnapshotId,
    /// The snapshot that was restored
    pub restored: SnapshotId,
    /// Number of entries now in the collection
    pub entries: usize,
}

/// Creates, lists, and restores collection snapshots.
pub struct SnapshotManager<'a> {
    store: &'a Store,
}

impl<'a> SnapshotManager<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Create a snapshot of the current collection.
    pub fn create(&self, message: &str) -> Result<SnapshotRecord> {
        let record = self.store.with_txn(TxnScope::Snapshot, |txn| {
            let record = SnapshotRecord::new(message, txn.entries().to_vec());
            txn.put_snapshot(record.clone());
            Ok(record)
        })?;
        tracing::info!(id = %record.id, entries = record.entries.len(), "snapshot created");
        Ok(record)
    }

    /// All snapshots, newest first.
    pub fn list(&self) -> Result<Vec<SnapshotRecord>> {
        Ok(self.store.snapshots()?)
    }

    /// Replace the collection with a snapshot's entries.
    ///
    /// The pre-restore state is snapshotted automatically inside the same
    /// transaction, so a restore is always reversible. Deployment records
    /// are untouched; their drift status is recomputed on the next check.
    pub fn restore(&self, id: &SnapshotId) -> Result<RestoreReport> {
        let target = self.store.snapshot(id)?;

        let report = self.store.with_txn(TxnScope::Snapshot, |txn| {
            let auto = SnapshotRecord::new(
                auto_message(&format!("restore of {id}")),
                txn.entries().to_vec(),
            );
            let auto_id = txn.put_snapshot(auto);

            txn.replace_entries(target.entries.clone())?;
            Ok(RestoreReport {
                auto_snapshot: auto_id,
                restored: target.id,
                entries: target.entries.len(),
            })
        })?;

        tracing::info!(restored = %report.restored, "snapshot restored");
        Ok(report)
    }
}
