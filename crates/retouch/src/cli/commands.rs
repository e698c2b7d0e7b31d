//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::operation::OperationKind;
use crate::words::ProtectedWord;

/// Translate command arguments.
#[derive(Debug, Args)]
pub struct TranslateCommand {
    /// Target language (defaults to `transformer.target_language`)
    #[arg(short, long, value_name = "LANG")]
    pub to: Option<String>,
}

/// Mask command arguments.
#[derive(Debug, Args)]
pub struct MaskCommand {
    /// Text to mask with the stored protected words
    pub text: String,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Flags shared by `words add` and `words update`.
#[derive(Debug, Clone, Copy, Default, Args)]
pub struct WordFlags {
    /// Match only identical casing
    #[arg(long)]
    pub case_sensitive: bool,

    /// Also match inside larger words
    #[arg(long)]
    pub substring: bool,
}

impl WordFlags {
    /// Build an unsaved word with these flags.
    #[must_use]
    pub fn to_word(self, text: String) -> ProtectedWord {
        ProtectedWord::new(text)
            .case_sensitive(self.case_sensitive)
            .whole_word_only(!self.substring)
    }
}

/// Protected-word commands.
#[derive(Debug, Subcommand)]
pub enum WordsCommand {
    /// List protected words
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Add a protected word
    Add {
        /// The literal text to protect
        text: String,

        /// Matching flags
        #[command(flatten)]
        flags: WordFlags,
    },

    /// Replace the text and flags of a protected word
    Update {
        /// ID of the word to update
        id: i64,

        /// The new text
        text: String,

        /// Matching flags
        #[command(flatten)]
        flags: WordFlags,
    },

    /// Remove a protected word
    Remove {
        /// ID of the word to remove
        id: i64,
    },
}

/// History commands.
#[derive(Debug, Subcommand)]
pub enum HistoryCommand {
    /// List recent operations
    List {
        /// Maximum number of results
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Filter by operation kind
        #[arg(short, long, value_enum)]
        kind: Option<KindArg>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show history statistics
    Stats,

    /// Delete old operations
    Prune {
        /// Keep only the N most recent operations
        #[arg(long, value_name = "N")]
        keep: Option<usize>,

        /// Delete operations older than N days
        #[arg(long, value_name = "N")]
        older_than_days: Option<u32>,
    },
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

/// Operation kind argument for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    /// Grammar and spelling corrections
    Correction,
    /// Translations
    Translation,
}

impl From<KindArg> for OperationKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Correction => Self::Correction,
            KindArg::Translation => Self::Translation,
        }
    }
}
