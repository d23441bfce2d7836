//! Command-line interface for fmea.
//!
//! This module provides the CLI structure for the `fmea` binary and the
//! plain-text rendering used by its reporting commands.

mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{AddCommand, ConfigCommand, ReportCommand, ServeCommand, StatusCommand};

/// fmea - Failure Mode and Effects Analysis tracker
///
/// Records failure modes with severity, occurrence and detection ratings,
/// computes their Risk Priority Number and serves a dashboard over them.
#[derive(Debug, Parser)]
#[command(name = "fmea")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the web server
    Serve(ServeCommand),

    /// Record a failure mode from the command line
    Add(AddCommand),

    /// Print all entries with summary statistics
    Report(ReportCommand),

    /// Show database status
    Status(StatusCommand),

    /// View or check configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.verbose, self.quiet)
    }
}
