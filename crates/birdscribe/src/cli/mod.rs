//! Command-line interface for birdscribe.
//!
//! This module provides the CLI structure, output formatting and the
//! terminal alerter for the `birdscribe` binary.

mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AnnotateCommand, CaptureCommand, ConfigCommand, ListCommand, OutputFormat, ShowCommand,
    StatusCommand, UploadCommand,
};

use crate::logging::Verbosity;
use crate::session::{Alerter, SessionState, StateListener};

/// birdscribe - Upload bird photos and read about them
///
/// Stores a picked, dropped or screenshotted image in a bucket, records it,
/// and shows a species description and analysis next to the preview.
#[derive(Debug, Parser)]
#[command(name = "birdscribe")]
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
    /// Upload an image file
    Upload(UploadCommand),

    /// Screenshot a rendered surface and upload it
    Capture(CaptureCommand),

    /// List uploads, newest first
    List(ListCommand),

    /// Show one upload
    Show(ShowCommand),

    /// Seed the annotation tables if they are empty
    Seed,

    /// Print one annotation from the configured strategy
    Annotate(AnnotateCommand),

    /// Show backend status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.verbose, self.quiet)
    }
}

/// Prints alerts to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrAlerter;

impl Alerter for StderrAlerter {
    fn alert(&self, message: &str) {
        eprintln!("{message}");
    }
}

/// Prints status lines to stderr while a capture is in flight.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatusPrinter;

impl StateListener for StatusPrinter {
    fn state_changed(&self, state: &SessionState) {
        if let Some(status) = state.status_text() {
            eprintln!("{status}");
        }
    }
}
