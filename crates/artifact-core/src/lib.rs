//! Version and sync engine for Artifact Manager
//!
//! Coordinates the three-tier state of every artifact (upstream source,
//! collection entry, project deployments), implementing:
//!
//! - **Drift detection**: hash-based classification of every deployment as
//!   synced, modified, outdated, or in conflict
//! - **Sync coordination**: deploy, pull, push (with three-way merge),
//!   update, and bounded-batch import under per-pair leases
//! - **Snapshots**: immutable collection-wide checkpoints with restore
//! - **Version graph**: an on-demand read model of one entry and all of
//!   its deployments with aggregate drift stats
//!
//! # Architecture
//!
//! `artifact-core` sits above the leaf crates and below the CLI:
//!
//! ```text
//!                      CLI
//!                       |
//!                 artifact-core
//!                       |
//!      +---------+------+--------+----------+
//!      |         |               |          |
//! artifact-fs artifact-content artifact-store artifact-source
//! ```
//!
//! All persistence goes through the store's tightly-scoped transactions;
//! no operation holds a storage lock across an upstream fetch.

pub mod drift;
pub mod error;
pub mod graph;
pub mod snapshot;
pub mod sync;

pub use drift::{DriftCheck, DriftDetector, DriftStatus, ProjectCheckReport, UnknownDeployment};
pub use error::{Error, Result};
pub use graph::{
    GraphOptions, GraphStats, NodeStatus, VersionGraph, VersionGraphBuilder, VersionGraphNode,
};
pub use snapshot::{RestoreReport, SnapshotManager};
pub use sync::{
    BatchReport, ImportCandidate, ImportFailure, ImportOptions, PullOptions, PushOutcome,
    SyncCoordinator, UpdateAllReport, UpdateOutcome,
};

// The record and content types engine callers work with
pub use artifact_content::{ConflictedFile, MergeOutcome, MergeStrategy};
pub use artifact_source::{CancelFlag, DirSource, GitSource, SourceProvider, SourceRef};
pub use artifact_store::{
    ArtifactId, ArtifactType, CollectionEntry, Deployment, LineageEvent, LineageKind, SnapshotId,
    SnapshotRecord, Store, TrustLevel, UpstreamRef,
};
