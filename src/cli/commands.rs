//! CLI command definitions using clap.
//!
//! - compose: run an `app.compose` request through the pipeline
//! - extract: list the files and dependencies in a saved generator transcript

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Scaffoldr - compose application specs into reviewed source files
#[derive(Parser, Debug)]
#[command(name = "scaffoldr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an intent request (JSON) through the compose pipeline
    Compose {
        /// Path to the request JSON
        request: PathBuf,

        /// Baseline tree copied into the target before writing
        #[arg(short, long)]
        baseline: Option<PathBuf>,

        /// Directory the scaffold is written to
        #[arg(short, long)]
        target: Option<PathBuf>,

        /// Return files without writing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Extract file and dependency blocks from a raw generator transcript
    Extract {
        /// Path to the transcript
        raw: PathBuf,

        /// Print the extraction as JSON
        #[arg(long)]
        json: bool,
    },
}
