//! Sync commands: deploy, undeploy, check, pull, push, update

use super::{open_store, parse_id, project_key};
use crate::error::{CliError, Result};
use artifact_core::{
    CancelFlag, DirSource, DriftDetector, DriftStatus, GitSource, MergeStrategy, PullOptions,
    PushOutcome, SourceProvider, SyncCoordinator,
};
use colored::Colorize;
use std::path::Path;

/// Run the deploy command
pub fn run_deploy(root: &Path, id: &str, project: &Path) -> Result<()> {
    let id = parse_id(id)?;
    let store = open_store(root)?;

    let record = SyncCoordinator::new(&store).deploy(&id, &project_key(project))?;
    println!(
        "{} Deployed {} into {} ({})",
        "OK".green().bold(),
        id.to_string().cyan(),
        project.display(),
        record.deployed_hash.dimmed()
    );
    Ok(())
}

/// Run the undeploy command
pub fn run_undeploy(root: &Path, id: &str, project: &Path, keep_files: bool) -> Result<()> {
    let id = parse_id(id)?;
    let store = open_store(root)?;

    SyncCoordinator::new(&store).undeploy(&id, &project_key(project), !keep_files)?;
    println!(
        "{} Undeployed {} from {}",
        "OK".green().bold(),
        id.to_string().cyan(),
        project.display()
    );
    Ok(())
}

/// Run the check command
///
/// Checks every deployment recorded for the project; unreadable trees are
/// reported as unknown without failing the command.
pub fn run_check(root: &Path, project: &Path, json: bool) -> Result<()> {
    let store = open_store(root)?;
    let report = DriftDetector::new(&store).check_project(&project_key(project))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if report.checks.is_empty() && report.unknown.is_empty() {
        println!("No deployments recorded for {}.", project.display());
        return Ok(());
    }

    for check in &report.checks {
        let label = match check.status {
            DriftStatus::Synced => "synced".green(),
            DriftStatus::Modified => "modified".yellow(),
            DriftStatus::Outdated => "outdated".yellow(),
            DriftStatus::Conflict => "conflict".red(),
        };
        println!("  {} {}", label.bold(), check.id.to_string().cyan());
    }
    for unknown in &report.unknown {
        println!(
            "  {} {} ({})",
            "unknown".dimmed().bold(),
            unknown.id.to_string().cyan(),
            unknown.reason.dimmed()
        );
    }

    if report.is_clean() {
        println!();
        println!("{} Everything in sync.", "OK".green().bold());
    }
    Ok(())
}

/// Run the diff command
///
/// Shows the changes a pull would apply: the project's deployed copy on
/// the left, the collection state on the right.
pub fn run_diff(root: &Path, id: &str, project: &Path) -> Result<()> {
    use artifact_content::{DiffOptions, FileStatus, diff_file_sets};
    use artifact_fs::{FileSet, NormalizedPath};

    let id = parse_id(id)?;
    let store = open_store(root)?;

    let entry = store
        .entry(&id)?
        .ok_or_else(|| CliError::user(format!("no collection entry for {id}")))?;
    let collection = store.load_object(&entry.content_hash)?;
    let tree_path = NormalizedPath::new(&project_key(project)).join(&id.deploy_path());
    let local = if tree_path.is_dir() {
        FileSet::from_dir(&tree_path)?
    } else {
        FileSet::new()
    };

    let diffs = diff_file_sets(&local, &collection, &DiffOptions::default());
    let mut changes = 0;
    for diff in &diffs {
        if diff.status == FileStatus::Unchanged {
            continue;
        }
        changes += 1;
        let label = match diff.status {
            FileStatus::Added => "+".green(),
            FileStatus::Deleted => "-".red(),
            _ => "~".yellow(),
        };
        let note = if diff.binary {
            " (binary)"
        } else if diff.truncated {
            " (too large to diff)"
        } else {
            ""
        };
        println!("{} {}{}", label.bold(), diff.path.cyan(), note.dimmed());
        print!("{}", diff.to_unified());
    }

    if changes == 0 {
        println!("{} Project matches the collection.", "OK".green().bold());
    }
    Ok(())
}

/// Run the pull command
pub fn run_pull(root: &Path, id: &str, project: &Path, force: bool) -> Result<()> {
    let id = parse_id(id)?;
    let store = open_store(root)?;

    let record =
        SyncCoordinator::new(&store).pull(&id, &project_key(project), PullOptions { force })?;
    println!(
        "{} Pulled {} into {} ({})",
        "OK".green().bold(),
        id.to_string().cyan(),
        project.display(),
        record.deployed_hash.dimmed()
    );
    Ok(())
}

/// Run the push command
pub fn run_push(root: &Path, id: &str, project: &Path, strategy: &str) -> Result<()> {
    let id = parse_id(id)?;
    let strategy: MergeStrategy = strategy.parse().map_err(CliError::user)?;
    let store = open_store(root)?;

    let outcome = SyncCoordinator::new(&store).push(&id, &project_key(project), strategy)?;
    match outcome {
        PushOutcome::Committed { entry, .. } => {
            println!(
                "{} Pushed {} ({})",
                "OK".green().bold(),
                id.to_string().cyan(),
                entry.content_hash.dimmed()
            );
        }
        PushOutcome::Conflicts(conflicts) => {
            println!(
                "{} {} file(s) conflict; nothing was written:",
                "CONFLICT".red().bold(),
                conflicts.len()
            );
            for conflict in &conflicts {
                println!("   {} {} ({})", "!".red(), conflict.path.cyan(), conflict.reason);
            }
            println!();
            println!(
                "Resolve by pulling with {}, or push with {} / {}.",
                "--force".cyan(),
                "--strategy take_upstream".cyan(),
                "--strategy keep_local".cyan()
            );
        }
    }
    Ok(())
}

/// Run the update command
pub fn run_update(root: &Path, id: Option<&str>, reference: Option<&str>) -> Result<()> {
    let store = open_store(root)?;
    let coordinator = SyncCoordinator::new(&store);
    let provider = pick_provider(&store, id)?;

    match id {
        Some(id) => {
            let id = parse_id(id)?;
            match coordinator.update(&id, provider.as_ref(), reference)? {
                artifact_core::UpdateOutcome::Updated { entry, .. } => {
                    println!(
                        "{} Updated {} to {}",
                        "OK".green().bold(),
                        id.to_string().cyan(),
                        entry.content_hash.dimmed()
                    );
                }
                artifact_core::UpdateOutcome::AlreadyCurrent { .. } => {
                    println!("{} already current", id.to_string().cyan());
                }
            }
        }
        None => {
            let report = coordinator.update_all(provider.as_ref(), &CancelFlag::new())?;
            println!(
                "{} updated, {} unchanged, {} failed",
                report.updated.len().to_string().green(),
                report.unchanged.len(),
                report.failed.len().to_string().red()
            );
            for (id, error) in &report.failed {
                println!("   {} {}: {}", "!".red(), id.to_string().cyan(), error);
            }
        }
    }
    Ok(())
}

/// Choose a provider by inspecting the upstream URLs involved: local
/// paths get the directory provider, everything else goes through git.
fn pick_provider(
    store: &artifact_store::Store,
    id: Option<&str>,
) -> Result<Box<dyn SourceProvider>> {
    let urls: Vec<String> = match id {
        Some(raw) => store
            .entry(&parse_id(raw)?)?
            .and_then(|e| e.upstream.map(|u| u.url))
            .into_iter()
            .collect(),
        None => store
            .entries()?
            .into_iter()
            .filter_map(|e| e.upstream.map(|u| u.url))
            .collect(),
    };

    let all_local = !urls.is_empty() && urls.iter().all(|u| Path::new(u).exists());
    if all_local {
        Ok(Box::new(DirSource::new()))
    } else {
        Ok(Box::new(GitSource::new()?))
    }
}
