//! Version graph read model
//!
//! A freshly-built, read-only projection: one collection entry as root,
//! one node per deployment, each annotated with a computed status and
//! rolled up into aggregate counts. Never persisted and never a source of
//! truth; rebuild it whenever it is needed.

use crate::drift::{DriftDetector, DriftStatus};
use crate::{Error, Result};
use artifact_fs::NormalizedPath;
use artifact_store::{ArtifactId, Store};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Status of one graph node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Synced,
    Modified,
    Outdated,
    Conflict,
    /// The deployed tree could not be read
    Unknown,
    /// The project path no longer exists
    Unreachable,
}

impl From<DriftStatus> for NodeStatus {
    fn from(status: DriftStatus) -> Self {
        match status {
            DriftStatus::Synced => Self::Synced,
            DriftStatus::Modified => Self::Modified,
            DriftStatus::Outdated => Self::Outdated,
            DriftStatus::Conflict => Self::Conflict,
        }
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Synced => write!(f, "synced"),
            Self::Modified => write!(f, "modified"),
            Self::Outdated => write!(f, "outdated"),
            Self::Conflict => write!(f, "conflict"),
            Self::Unknown => write!(f, "unknown"),
            Self::Unreachable => write!(f, "unreachable"),
        }
    }
}

/// One deployment in the graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionGraphNode {
    pub project: String,
    pub status: NodeStatus,
    pub deployed_hash: String,
    pub current_hash: Option<String>,
    pub last_checked_at: Option<DateTime<Utc>>,
}

/// Aggregate counts over a graph's nodes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub deployed: usize,
    pub synced: usize,
    pub modified: usize,
    pub outdated: usize,
    pub conflicts: usize,
    pub unknown: usize,
    pub unreachable: usize,
}

impl GraphStats {
    /// Deployments with a definite, readable status.
    pub fn healthy(&self) -> usize {
        self.synced + self.modified + self.outdated + self.conflicts
    }
}

/// The graph: entry root plus deployment nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionGraph {
    pub id: ArtifactId,
    pub content_hash: String,
    pub resolved_version: Option<semver::Version>,
    pub nodes: Vec<VersionGraphNode>,
    pub stats: GraphStats,
}

/// Options for graph building
#[derive(Debug, Clone)]
pub struct GraphOptions {
    /// Reuse a cached `current_hash` when the last check is at most this
    /// old; otherwise force a fresh check
    pub freshness: Duration,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            freshness: Duration::from_secs(30),
        }
    }
}

/// Builds version graphs on demand.
pub struct VersionGraphBuilder<'a> {
    store: &'a Store,
    options: GraphOptions,
}

impl<'a> VersionGraphBuilder<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self {
            store,
            options: GraphOptions::default(),
        }
    }

    pub fn with_options(mut self, options: GraphOptions) -> Self {
        self.options = options;
        self
    }

    /// Build the graph for one entry.
    ///
    /// Tolerates deployments whose project no longer exists: they appear
    /// as `unreachable` nodes, visible but excluded from healthy counts.
    pub fn build(&self, id: &ArtifactId) -> Result<VersionGraph> {
        let entry = self
            .store
            .entry(id)?
            .ok_or_else(|| Error::EntryNotFound { id: id.clone() })?;

        let detector = DriftDetector::new(self.store);
        let mut nodes = Vec::new();
        let mut stats = GraphStats::default();

        for record in self.store.deployments_of(id)? {
            let project = NormalizedPath::new(&record.project);
            stats.deployed += 1;

            let node = if !project.exists() {
                stats.unreachable += 1;
                VersionGraphNode {
                    project: record.project,
                    status: NodeStatus::Unreachable,
                    deployed_hash: record.deployed_hash,
                    current_hash: record.current_hash,
                    last_checked_at: record.last_checked_at,
                }
            } else if let Some(cached) = self.fresh_cached_status(&record, &entry.content_hash) {
                self.count(&mut stats, cached);
                VersionGraphNode {
                    project: record.project,
                    status: cached,
                    deployed_hash: record.deployed_hash,
                    current_hash: record.current_hash,
                    last_checked_at: record.last_checked_at,
                }
            } else {
                match detector.check(id, &record.project) {
                    Ok(check) => {
                        let status = NodeStatus::from(check.status);
                        self.count(&mut stats, status);
                        VersionGraphNode {
                            project: check.project,
                            status,
                            deployed_hash: check.deployed_hash,
                            current_hash: Some(check.current_hash),
                            last_checked_at: Some(Utc::now()),
                        }
                    }
                    Err(e) if e.is_recoverable_read() => {
                        stats.unknown += 1;
                        VersionGraphNode {
                            project: record.project,
                            status: NodeStatus::Unknown,
                            deployed_hash: record.deployed_hash,
                            current_hash: record.current_hash,
                            last_checked_at: record.last_checked_at,
                        }
                    }
                    Err(e) => return Err(e),
                }
            };
            nodes.push(node);
        }

        Ok(VersionGraph {
            id: entry.id,
            content_hash: entry.content_hash,
            resolved_version: entry.resolved_version,
            nodes,
            stats,
        })
    }

    /// Classify from cached fields when the last check is fresh enough.
    fn fresh_cached_status(
        &self,
        record: &artifact_store::Deployment,
        collection_hash: &str,
    ) -> Option<NodeStatus> {
        let checked_at = record.last_checked_at?;
        let current = record.current_hash.as_deref()?;

        let age = Utc::now().signed_duration_since(checked_at);
        let fresh = age
            .to_std()
            .map(|age| age <= self.options.freshness)
            .unwrap_or(false);
        if !fresh {
            return None;
        }
        Some(NodeStatus::from(DriftDetector::classify(
            &record.deployed_hash,
            current,
            collection_hash,
        )))
    }

    fn count(&self, stats: &mut GraphStats, status: NodeStatus) {
        match status {
            NodeStatus::Synced => stats.synced += 1,
            NodeStatus::Modified => stats.modified += 1,
            NodeStatus::Outdated => stats.outdated += 1,
            NodeStatus::Conflict => stats.conflicts += 1,
            NodeStatus::Unknown => stats.unknown += 1,
            NodeStatus::Unreachable => stats.unreachable += 1,
        }
    }
}
