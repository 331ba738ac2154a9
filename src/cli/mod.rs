//! CLI module - command-line interface definitions and handlers
//!
//! Uses clap v4 with derive macros for argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use output::OutputFormat;

pub mod commands;
pub mod output;
pub mod progress;

/// Roadmap - keep local issues and GitHub issues in step
#[derive(Parser, Debug)]
#[command(name = "roadmap")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Roadmap data directory
    #[arg(long, global = true, env = "ROADMAP_ROOT", default_value = ".roadmap")]
    pub root: PathBuf,

    /// Config file path (default: <root>/config.toml and ~/.config/roadmap/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (human, json, plain)
    #[arg(long, short = 'O', global = true, value_enum)]
    pub output_format: Option<OutputFormat>,

    /// Shorthand for --output-format=json
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress logs and progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    #[must_use]
    pub fn output_format(&self) -> OutputFormat {
        OutputFormat::from_args(self.json, self.output_format)
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reconcile local issues with their GitHub counterparts
    Sync(commands::sync::SyncArgs),

    /// Show sync statistics or one issue's sync history
    Status(commands::status::StatusArgs),

    /// Link a local issue to a GitHub issue
    Link(commands::link::LinkArgs),
}
