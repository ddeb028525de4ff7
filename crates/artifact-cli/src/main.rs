//! Artifact Manager CLI
//!
//! The command-line interface over the version and sync engine.

mod cli;
mod commands;
mod error;

use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use cli::{Cli, Commands};
use error::{CliError, Result};

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
        tracing::debug!("Verbose mode enabled");
    }

    let root = collection_root(cli.collection)?;

    match cli.command {
        Some(cmd) => execute_command(cmd, &root),
        None => {
            println!("{} Artifact Manager CLI", "artifact".green().bold());
            println!();
            println!("Collection: {}", root.display().to_string().cyan());
            println!("Run {} for available commands.", "artifact --help".cyan());
            Ok(())
        }
    }
}

/// Resolve the collection store location: flag/env first, then the
/// platform data directory.
fn collection_root(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path);
    }
    dirs::data_dir()
        .map(|d| d.join("artifact-manager").join("collection"))
        .ok_or_else(|| CliError::user("cannot determine a data directory; pass --collection"))
}

fn execute_command(cmd: Commands, root: &std::path::Path) -> Result<()> {
    match cmd {
        Commands::Init => commands::run_init(root),
        Commands::List { json } => commands::run_list(root, json),
        Commands::Import {
            id,
            path,
            git,
            reference,
            subdir,
            tag,
        } => commands::run_import(root, &id, path.as_deref(), git.as_deref(), reference.as_deref(), subdir.as_deref(), tag),
        Commands::Remove { id } => commands::run_remove(root, &id),
        Commands::Deploy { id, project } => commands::run_deploy(root, &id, &project),
        Commands::Undeploy {
            id,
            project,
            keep_files,
        } => commands::run_undeploy(root, &id, &project, keep_files),
        Commands::Diff { id, project } => commands::run_diff(root, &id, &project),
        Commands::Check { project, json } => commands::run_check(root, &project, json),
        Commands::Graph { id, json } => commands::run_graph(root, &id, json),
        Commands::Pull { id, project, force } => commands::run_pull(root, &id, &project, force),
        Commands::Push {
            id,
            project,
            strategy,
        } => commands::run_push(root, &id, &project, &strategy),
        Commands::Update { id, reference } => {
            commands::run_update(root, id.as_deref(), reference.as_deref())
        }
        Commands::Snapshot { action } => commands::run_snapshot(root, action),
    }
}
