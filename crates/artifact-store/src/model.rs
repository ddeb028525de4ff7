//! Persisted record types
//!
//! These are the rows of the three logical tables the store owns:
//! collection entries, deployment records, and snapshots. Content hashes on
//! these records are always recomputed from file sets at write time by the
//! store; caller-supplied hashes are never trusted.

use artifact_content::MergeStrategy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Kind of a managed artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    Skill,
    Command,
    Agent,
    Hook,
    McpServer,
}

impl ArtifactType {
    /// All artifact kinds, in display order.
    pub const ALL: [ArtifactType; 5] = [
        Self::Skill,
        Self::Command,
        Self::Agent,
        Self::Hook,
        Self::McpServer,
    ];

    /// Directory inside a project where this kind of artifact is deployed,
    /// relative to the project root.
    pub fn deploy_dir(&self) -> &'static str {
        match self {
            Self::Skill => ".claude/skills",
            Self::Command => ".claude/commands",
            Self::Agent => ".claude/agents",
            Self::Hook => ".claude/hooks",
            Self::McpServer => ".claude/mcp-servers",
        }
    }
}

impl std::fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Skill => write!(f, "skill"),
            Self::Command => write!(f, "command"),
            Self::Agent => write!(f, "agent"),
            Self::Hook => write!(f, "hook"),
            Self::McpServer => write!(f, "mcp_server"),
        }
    }
}

impl std::str::FromStr for ArtifactType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skill" => Ok(Self::Skill),
            "command" => Ok(Self::Command),
            "agent" => Ok(Self::Agent),
            "hook" => Ok(Self::Hook),
            "mcp_server" => Ok(Self::McpServer),
            other => Err(format!(
                "unknown artifact type {other:?} (expected skill, command, agent, hook, or mcp_server)"
            )),
        }
    }
}

/// Identity of an artifact: `(name, type)`, unique within a collection.
///
/// Rendered as `"<type>:<name>"`, e.g. `skill:pdf-tool`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArtifactId {
    pub name: String,
    pub kind: ArtifactType,
}

impl ArtifactId {
    pub fn new(name: impl Into<String>, kind: ArtifactType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Path of this artifact's deployed copy, relative to a project root.
    pub fn deploy_path(&self) -> String {
        format!("{}/{}", self.kind.deploy_dir(), self.name)
    }
}

impl std::fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

impl std::str::FromStr for ArtifactId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, name) = s
            .split_once(':')
            .ok_or_else(|| format!("expected <type>:<name>, got {s:?}"))?;
        Ok(Self {
            name: name.to_string(),
            kind: kind.parse()?,
        })
    }
}

/// Trust classification assigned at import time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustLevel {
    Trusted,
    #[default]
    Unverified,
    Flagged,
}

/// Where a collection entry came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamRef {
    /// Source repository URL
    pub url: String,
    /// Resolved commit SHA or tag
    pub sha: String,
    /// Human-readable version the SHA resolved from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Canonical artifact copy owned by the collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionEntry {
    pub id: ArtifactId,
    /// Tree checksum of the entry's content; set by the store at write time
    pub content_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream: Option<UpstreamRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_version: Option<semver::Version>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub trust: TrustLevel,
    /// Open-ended metadata, validated at the store boundary
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CollectionEntry {
    /// Create a new entry with empty content; the store fills
    /// `content_hash` and bumps `updated_at` on every write.
    pub fn new(id: ArtifactId) -> Self {
        let now = Utc::now();
        Self {
            id,
            content_hash: String::new(),
            upstream: None,
            resolved_version: None,
            tags: Vec::new(),
            trust: TrustLevel::default(),
            attributes: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// What happened to a deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineageKind {
    Deployed,
    Pulled,
    Pushed,
    Updated,
    Restored,
}

/// One append-only lineage record on a deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageEvent {
    pub event: LineageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_hash: Option<String>,
    pub to_hash: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<MergeStrategy>,
}

impl LineageEvent {
    pub fn new(event: LineageKind, from_hash: Option<String>, to_hash: impl Into<String>) -> Self {
        Self {
            event,
            from_hash,
            to_hash: to_hash.into(),
            timestamp: Utc::now(),
            strategy: None,
        }
    }

    pub fn with_strategy(mut self, strategy: MergeStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }
}

/// One installed instance of a collection entry in one project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: ArtifactId,
    /// Project root, normalized
    pub project: String,
    /// Content hash at install or last successful sync
    pub deployed_hash: String,
    /// Hash observed at the last drift check; set only by the drift
    /// detector through the store's compare-and-swap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modification_detected_at: Option<DateTime<Utc>>,
    /// Append-only history; status computation reads only the tail
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lineage: Vec<LineageEvent>,
}

impl Deployment {
    pub fn new(id: ArtifactId, project: impl Into<String>, deployed_hash: impl Into<String>) -> Self {
        let deployed_hash = deployed_hash.into();
        Self {
            id,
            project: project.into(),
            deployed_hash: deployed_hash.clone(),
            current_hash: None,
            last_checked_at: None,
            modification_detected_at: None,
            lineage: vec![LineageEvent::new(LineageKind::Deployed, None, deployed_hash)],
        }
    }

    /// The most recent lineage event.
    pub fn last_event(&self) -> Option<&LineageEvent> {
        self.lineage.last()
    }
}

/// Identifier of a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(pub Uuid);

impl SnapshotId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SnapshotId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Immutable copy of the whole collection table at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub id: SnapshotId,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub entries: Vec<CollectionEntry>,
}

impl SnapshotRecord {
    pub fn new(message: impl Into<String>, entries: Vec<CollectionEntry>) -> Self {
        Self {
            id: SnapshotId::random(),
            message: message.into(),
            created_at: Utc::now(),
            entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn artifact_id_display_round_trips() {
        let id = ArtifactId::new("pdf-tool", ArtifactType::Skill);
        assert_eq!(id.to_string(), "skill:pdf-tool");
        let parsed: ArtifactId = "skill:pdf-tool".parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn artifact_type_parse_rejects_unknown() {
        assert!("widget".parse::<ArtifactType>().is_err());
        assert_eq!("mcp_server".parse::<ArtifactType>().unwrap(), ArtifactType::McpServer);
    }

    #[test]
    fn deploy_path_uses_kind_directory() {
        let id = ArtifactId::new("pdf-tool", ArtifactType::Skill);
        assert_eq!(id.deploy_path(), ".claude/skills/pdf-tool");

        let id = ArtifactId::new("db", ArtifactType::McpServer);
        assert_eq!(id.deploy_path(), ".claude/mcp-servers/db");
    }

    #[test]
    fn new_deployment_starts_with_deploy_event() {
        let id = ArtifactId::new("pdf-tool", ArtifactType::Skill);
        let deployment = Deployment::new(id, "/tmp/proj", "sha256:abc");
        assert_eq!(deployment.lineage.len(), 1);
        let event = deployment.last_event().unwrap();
        assert_eq!(event.event, LineageKind::Deployed);
        assert_eq!(event.to_hash, "sha256:abc");
        assert!(deployment.current_hash.is_none());
    }

    #[test]
    fn entry_round_trips_through_toml() {
        let mut entry = CollectionEntry::new(ArtifactId::new("pdf-tool", ArtifactType::Skill));
        entry.content_hash = "sha256:abc".to_string();
        entry.tags = vec!["docs".to_string()];
        entry.upstream = Some(UpstreamRef {
            url: "https://example.com/repo.git".to_string(),
            sha: "deadbeef".to_string(),
            version: Some("1.2.0".to_string()),
        });
        entry
            .attributes
            .insert("confidence".to_string(), "0.93".to_string());

        let serialized = toml::to_string_pretty(&entry).unwrap();
        let parsed: CollectionEntry = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn deployment_round_trips_through_toml() {
        let id = ArtifactId::new("fmt", ArtifactType::Command);
        let mut deployment = Deployment::new(id, "/home/u/proj", "sha256:abc");
        deployment.current_hash = Some("sha256:def".to_string());
        deployment.last_checked_at = Some(Utc::now());

        let serialized = toml::to_string_pretty(&deployment).unwrap();
        let parsed: Deployment = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed, deployment);
    }
}
