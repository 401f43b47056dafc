//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - serve: run the HTTP server
//! - revise: run the revision loop once in the terminal
//! - eval: score a model against an eval suite

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Redraft - drafts a reply, critiques it, and revises it
#[derive(Parser, Debug)]
#[command(name = "redraft")]
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
    /// Serve the chat API over HTTP
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Draft and revise a reply to a single message
    Revise {
        /// The user's message
        message: String,

        /// Number of draft/critique rounds (overrides config)
        #[arg(short, long)]
        rounds: Option<u32>,
    },

    /// Run an eval suite and print the scores
    Eval {
        /// Path to the suite YAML file
        suite: PathBuf,
    },
}
