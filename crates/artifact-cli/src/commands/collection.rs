//! Collection management commands: init, list, import, remove

use super::{open_store, parse_id};
use crate::error::{CliError, Result};
use artifact_core::{
    DirSource, GitSource, ImportCandidate, ImportOptions, SourceRef, SyncCoordinator, UpstreamRef,
};
use artifact_source::fetch_file_set;
use colored::Colorize;
use std::path::Path;

/// Run the init command
pub fn run_init(root: &Path) -> Result<()> {
    open_store(root)?;
    println!(
        "{} Initialized collection at {}",
        "OK".green().bold(),
        root.display().to_string().cyan()
    );
    Ok(())
}

/// Run the list command
pub fn run_list(root: &Path, json: bool) -> Result<()> {
    let store = open_store(root)?;
    let entries = store.entries()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("Collection is empty. Add entries with {}.", "artifact import".cyan());
        return Ok(());
    }
    for entry in entries {
        let version = entry
            .resolved_version
            .as_ref()
            .map(|v| format!(" v{v}"))
            .unwrap_or_default();
        let tags = if entry.tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", entry.tags.join(", "))
        };
        println!(
            "  {}{}{} {}",
            entry.id.to_string().cyan(),
            version.green(),
            tags.dimmed(),
            entry.content_hash.dimmed()
        );
    }
    Ok(())
}

/// Run the import command
pub fn run_import(
    root: &Path,
    id: &str,
    path: Option<&Path>,
    git: Option<&str>,
    reference: Option<&str>,
    subdir: Option<&str>,
    tags: Vec<String>,
) -> Result<()> {
    let id = parse_id(id)?;
    let store = open_store(root)?;

    let candidate = match (path, git) {
        (Some(path), None) => {
            let provider = DirSource::new();
            let source = SourceRef::new(path.to_string_lossy().to_string());
            let (_, files) = fetch_file_set(&provider, &source)?;
            let mut candidate = ImportCandidate::new(id.clone(), files);
            candidate.tags = tags;
            candidate
        }
        (None, Some(url)) => {
            let provider = GitSource::new()?;
            let mut source = SourceRef::new(url);
            if let Some(reference) = reference {
                source = source.with_reference(reference);
            }
            if let Some(subdir) = subdir {
                source = source.with_subdir(subdir);
            }
            let (resolved, files) = fetch_file_set(&provider, &source)?;
            let mut candidate = ImportCandidate::new(id.clone(), files).with_upstream(UpstreamRef {
                url: url.to_string(),
                sha: resolved.sha,
                version: resolved.version,
            });
            candidate.tags = tags;
            candidate
        }
        _ => {
            return Err(CliError::user(
                "specify exactly one source: --path <dir> or --git <url>",
            ));
        }
    };

    let report = SyncCoordinator::new(&store).import(vec![candidate], &ImportOptions::default())?;
    if let Some(failure) = report.failed.first() {
        return Err(CliError::user(format!(
            "import of {} failed: {}",
            failure.id, failure.error
        )));
    }
    println!("{} Imported {}", "OK".green().bold(), id.to_string().cyan());
    Ok(())
}

/// Run the remove command
pub fn run_remove(root: &Path, id: &str) -> Result<()> {
    let id = parse_id(id)?;
    let store = open_store(root)?;

    let removed = SyncCoordinator::new(&store).remove(&id)?;
    println!(
        "{} Removed {} (snapshot taken first)",
        "OK".green().bold(),
        removed.id.to_string().cyan()
    );
    Ok(())
}
