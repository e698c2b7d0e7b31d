//! Command-line interface for retouch.
//!
//! This module provides the CLI structure for the `retouch` binary. Bind
//! `retouch correct` and `retouch translate` to global hotkeys with your
//! desktop's shortcut settings.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, HistoryCommand, KindArg, MaskCommand, StatusCommand, TranslateCommand,
    WordFlags, WordsCommand,
};

use crate::logging::Verbosity;

/// retouch - Fix or translate selected text in place
///
/// Reads the current selection in any application, sends it to a language
/// model with your protected words masked out, and writes the result back.
#[derive(Debug, Parser)]
#[command(name = "retouch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
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
    /// Correct grammar and spelling of the selected text in place
    Correct,

    /// Translate the selected text and leave the result on the clipboard
    Translate(TranslateCommand),

    /// Show how text would be masked before it is sent out
    Mask(MaskCommand),

    /// Manage protected words
    #[command(subcommand)]
    Words(WordsCommand),

    /// Inspect operation history
    #[command(subcommand)]
    History(HistoryCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Show platform, permission and transformer readiness
    Status(StatusCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}
