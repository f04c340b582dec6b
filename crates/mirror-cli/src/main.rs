//! Resource Mirror CLI
//!
//! Loads a registry configuration and a tree snapshot into an in-memory
//! store, activates the mirror registry, and answers queries against it.

mod cli;
mod commands;
mod error;
mod logging;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use commands::Workspace;
use error::{CliError, Result};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    let tree = cli
        .tree
        .as_deref()
        .ok_or_else(|| CliError::user("no tree snapshot given; pass --tree <file>"))?;
    let workspace = Workspace::open(cli.config.as_deref(), tree).await?;

    let outcome = execute_command(&workspace, &cli.command);
    let closed = workspace.close().await;
    outcome?;
    closed
}

fn execute_command(workspace: &Workspace, cmd: &Commands) -> Result<()> {
    match cmd {
        Commands::Resolve { path } => commands::run_resolve(workspace, path),
        Commands::Ls { path, recursive } => commands::run_list(workspace, path, *recursive),
        Commands::Mappings { json } => commands::run_mappings(workspace, *json),
    }
}
