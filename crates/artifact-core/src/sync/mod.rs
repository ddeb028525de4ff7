//! Sync coordination
//!
//! Orchestrates pull, push, update, deploy, and bulk import. Every
//! operation on one `(artifact, project)` pair runs under an exclusive
//! per-pair lease; operations on different pairs run in parallel. Bulk
//! work commits in bounded batches so partial progress always stands.

mod batch;
mod coordinator;
mod lease;

pub use batch::{BatchReport, ImportCandidate, ImportFailure, ImportOptions};
pub use coordinator::{
    PullOptions, PushOutcome, SyncCoordinator, UpdateAllReport, UpdateOutcome,
};
