//! CLI argument parsing using clap derive

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Artifact Manager - Maintain a collection of reusable artifacts and
/// deploy them into your projects
#[derive(Parser, Debug)]
#[command(name = "artifact")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Collection store location (defaults to the user data directory)
    #[arg(long, global = true, env = "ARTIFACT_COLLECTION")]
    pub collection: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Initialize the collection store
    Init,

    /// List collection entries
    List {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Import an artifact into the collection
    ///
    /// Examples:
    ///   artifact import skill:pdf-tool --path ./pdf-tool
    ///   artifact import skill:pdf-tool --git https://example.com/skills.git --subdir pdf-tool
    Import {
        /// Artifact id as <type>:<name>, e.g. skill:pdf-tool
        id: String,

        /// Import from a local directory
        #[arg(long, conflicts_with = "git")]
        path: Option<PathBuf>,

        /// Import from a git repository URL
        #[arg(long)]
        git: Option<String>,

        /// Reference (tag, branch, SHA) when importing from git
        #[arg(long, requires = "git")]
        reference: Option<String>,

        /// Subdirectory of the repository holding the artifact
        #[arg(long, requires = "git")]
        subdir: Option<String>,

        /// Tags to attach to the entry
        #[arg(short, long)]
        tag: Vec<String>,
    },

    /// Remove an entry from the collection (snapshots first)
    Remove {
        /// Artifact id as <type>:<name>
        id: String,
    },

    /// Deploy a collection entry into a project
    Deploy {
        /// Artifact id as <type>:<name>
        id: String,
        /// Project directory
        project: PathBuf,
    },

    /// Remove a deployment from a project
    Undeploy {
        /// Artifact id as <type>:<name>
        id: String,
        /// Project directory
        project: PathBuf,
        /// Keep the deployed files on disk
        #[arg(long)]
        keep_files: bool,
    },

    /// Show what pull would change: the project's copy against the
    /// collection state, file by file
    Diff {
        /// Artifact id as <type>:<name>
        id: String,
        /// Project directory
        project: PathBuf,
    },

    /// Check every deployment in a project for drift
    Check {
        /// Project directory
        project: PathBuf,
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Show the version graph of one artifact
    Graph {
        /// Artifact id as <type>:<name>
        id: String,
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Overwrite a project's copy with the collection state
    Pull {
        /// Artifact id as <type>:<name>
        id: String,
        /// Project directory
        project: PathBuf,
        /// Overwrite local edits
        #[arg(long)]
        force: bool,
    },

    /// Merge a project's local edits back into the collection
    Push {
        /// Artifact id as <type>:<name>
        id: String,
        /// Project directory
        project: PathBuf,
        /// Conflict strategy: merge, take_upstream, or keep_local
        #[arg(long, default_value = "merge")]
        strategy: String,
    },

    /// Refresh entries from their upstream sources
    Update {
        /// Artifact id as <type>:<name>; updates everything when omitted
        id: Option<String>,
        /// Reference (tag, branch, SHA) to resolve instead of the default
        #[arg(long)]
        reference: Option<String>,
    },

    /// Manage collection snapshots
    Snapshot {
        #[command(subcommand)]
        action: SnapshotAction,
    },
}

/// Snapshot subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SnapshotAction {
    /// Create a snapshot of the current collection
    Create {
        /// Snapshot message
        #[arg(short, long)]
        message: String,
    },
    /// List snapshots, newest first
    List,
    /// Restore a snapshot (the current state is snapshotted first)
    Restore {
        /// Snapshot id
        id: String,
    },
}
