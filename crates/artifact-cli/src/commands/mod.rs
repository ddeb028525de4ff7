//! Command implementations

mod collection;
mod graph;
mod snapshot;
mod sync;

pub use collection::{run_import, run_init, run_list, run_remove};
pub use graph::run_graph;
pub use snapshot::run_snapshot;
pub use sync::{run_check, run_deploy, run_diff, run_pull, run_push, run_undeploy, run_update};

use crate::error::{CliError, Result};
use artifact_store::{ArtifactId, Store};
use std::path::Path;

/// Open the collection store at the resolved root.
pub(crate) fn open_store(root: &Path) -> Result<Store> {
    Ok(Store::open(root.to_path_buf())?)
}

/// Parse a `<type>:<name>` id argument.
pub(crate) fn parse_id(raw: &str) -> Result<ArtifactId> {
    raw.parse().map_err(CliError::user)
}

/// Render a project path argument the way the store keys it: absolute
/// where possible, normalized always.
pub(crate) fn project_key(project: &Path) -> String {
    let normalized = artifact_fs::NormalizedPath::new(project);
    normalized
        .canonicalize()
        .unwrap_or(normalized)
        .to_string()
}
