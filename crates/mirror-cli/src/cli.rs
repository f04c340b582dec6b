//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Resource Mirror - inspect how mirrored paths resolve
#[derive(Parser, Debug)]
#[command(name = "mirror")]
#[command(author, version, about = "Resource Mirror - inspect how mirrored paths resolve", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Registry configuration file (TOML, JSON or YAML)
    #[arg(short, long, env = "MIRROR_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Tree snapshot to load into the in-memory store
    #[arg(short, long, env = "MIRROR_TREE", global = true)]
    pub tree: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Resolve a path and show where its content comes from
    Resolve {
        /// Absolute resource path
        path: String,
    },

    /// List the children of a path
    Ls {
        /// Absolute resource path
        path: String,

        /// Descend into every child
        #[arg(short, long)]
        recursive: bool,
    },

    /// Show the active mirrors
    Mappings {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },
}
