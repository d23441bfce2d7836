//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::validate::FormInput;

/// Serve command arguments.
#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Address to listen on (overrides `server.bind_addr`)
    #[arg(short, long, value_name = "ADDR")]
    pub bind: Option<String>,
}

/// Add command arguments.
///
/// Ratings are taken as text so they go through the same validation as the
/// web form.
#[derive(Debug, Args)]
pub struct AddCommand {
    /// Process step or function
    #[arg(long)]
    pub step: String,

    /// How the step can fail
    #[arg(long)]
    pub failure_mode: String,

    /// Root cause
    #[arg(long)]
    pub cause: String,

    /// Current control
    #[arg(long)]
    pub control: String,

    /// Severity rating (1-10)
    #[arg(short, long)]
    pub severity: String,

    /// Occurrence rating (1-10)
    #[arg(short, long)]
    pub occurrence: String,

    /// Detection rating (1-10)
    #[arg(short, long)]
    pub detection: String,
}

impl AddCommand {
    /// Convert the arguments into raw form input.
    #[must_use]
    pub fn into_input(self) -> FormInput {
        FormInput {
            step: self.step,
            failure_mode: self.failure_mode,
            cause: self.cause,
            control: self.control,
            severity: self.severity,
            occurrence: self.occurrence,
            detection: self.detection,
        }
    }
}

/// Report command arguments.
#[derive(Debug, Args)]
pub struct ReportCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,

    /// Number of top entries to list (defaults to `dashboard.top_n`)
    #[arg(short, long)]
    pub top: Option<usize>,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
