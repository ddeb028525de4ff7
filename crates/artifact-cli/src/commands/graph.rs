//! Version graph command

use super::{open_store, parse_id};
use crate::error::Result;
use artifact_core::{NodeStatus, VersionGraphBuilder};
use colored::Colorize;
use std::path::Path;

/// Run the graph command
pub fn run_graph(root: &Path, id: &str, json: bool) -> Result<()> {
    let id = parse_id(id)?;
    let store = open_store(root)?;

    let graph = VersionGraphBuilder::new(&store).build(&id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&graph)?);
        return Ok(());
    }

    let version = graph
        .resolved_version
        .as_ref()
        .map(|v| format!(" v{v}"))
        .unwrap_or_default();
    println!(
        "{}{} {}",
        graph.id.to_string().cyan().bold(),
        version.green(),
        graph.content_hash.dimmed()
    );

    if graph.nodes.is_empty() {
        println!("  (not deployed anywhere)");
        return Ok(());
    }

    for node in &graph.nodes {
        let label = match node.status {
            NodeStatus::Synced => "synced".green(),
            NodeStatus::Modified => "modified".yellow(),
            NodeStatus::Outdated => "outdated".yellow(),
            NodeStatus::Conflict => "conflict".red(),
            NodeStatus::Unknown => "unknown".dimmed(),
            NodeStatus::Unreachable => "unreachable".dimmed(),
        };
        println!("  {} {}", label.bold(), node.project);
    }

    let stats = &graph.stats;
    println!();
    println!(
        "{} deployed: {} synced, {} modified, {} outdated, {} conflict, {} unreachable",
        stats.deployed, stats.synced, stats.modified, stats.outdated, stats.conflicts,
        stats.unreachable
    );
    Ok(())
}
