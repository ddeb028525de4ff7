//! Snapshot commands

use super::open_store;
use crate::cli::SnapshotAction;
use crate::error::{CliError, Result};
use artifact_core::SnapshotManager;
use artifact_store::SnapshotId;
use colored::Colorize;
use std::path::Path;

/// Run a snapshot subcommand
pub fn run_snapshot(root: &Path, action: SnapshotAction) -> Result<()> {
    let store = open_store(root)?;
    let manager = SnapshotManager::new(&store);

    match action {
        SnapshotAction::Create { message } => {
            let record = manager.create(&message)?;
            println!(
                "{} Snapshot {} ({} entries)",
                "OK".green().bold(),
                record.id.to_string().cyan(),
                record.entries.len()
            );
        }
        SnapshotAction::List => {
            let snapshots = manager.list()?;
            if snapshots.is_empty() {
                println!("No snapshots yet.");
                return Ok(());
            }
            for snapshot in snapshots {
                println!(
                    "  {} {} {} ({} entries)",
                    snapshot.id.to_string().cyan(),
                    snapshot
                        .created_at
                        .format("%Y-%m-%d %H:%M:%S")
                        .to_string()
                        .dimmed(),
                    snapshot.message,
                    snapshot.entries.len()
                );
            }
        }
        SnapshotAction::Restore { id } => {
            let id: SnapshotId = id
                .parse()
                .map_err(|e| CliError::user(format!("invalid snapshot id: {e}")))?;
            let report = manager.restore(&id)?;
            println!(
                "{} Restored {} ({} entries); prior state saved as {}",
                "OK".green().bold(),
                report.restored.to_string().cyan(),
                report.entries,
                report.auto_snapshot.to_string().cyan()
            );
        }
    }
    Ok(())
}
