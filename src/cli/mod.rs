//! Command-line interface for carve.
//!
//! This module handles argument parsing and user interface only.
//! NO pipeline logic is performed here.

use clap::Parser;
use std::path::PathBuf;

/// Carve: configuration-driven carving of a Go module into sub-modules.
#[derive(Parser, Debug)]
#[command(name = "carve")]
#[command(author, version, about, long_about = None)]
#[command(subcommand_required = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available carve commands.
#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Validate the split configuration against the source module.
    ///
    /// Partitions the module, checks every split's public API, resolves
    /// residual packages and rejects cyclic split dependencies. Nothing
    /// is written.
    Check {
        /// Path to the carve configuration file.
        #[arg(short, long, default_value = "carve.json")]
        config: PathBuf,

        /// Root of the source module. Defaults to the directory holding
        /// the configuration file.
        #[arg(short, long)]
        repo: Option<PathBuf>,
    },

    /// Carve the configured splits and write their content.
    Split {
        /// Path to the carve configuration file.
        #[arg(short, long, default_value = "carve.json")]
        config: PathBuf,

        /// Root of the source module. Defaults to the directory holding
        /// the configuration file.
        #[arg(short, long)]
        repo: Option<PathBuf>,

        /// Directory under which each split's content is written, one
        /// subdirectory per split.
        #[arg(short, long)]
        work_tree: PathBuf,

        /// Stage the split content without handing it off to any
        /// publication tooling.
        #[arg(long)]
        dry_run: bool,
    },
}

/// Parse the carve command line.
///
/// Returns the parsed [`Cli`]; on malformed arguments clap prints usage
/// and exits the process.
pub fn parse_args() -> Cli {
    Cli::parse()
}
