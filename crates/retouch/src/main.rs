//! `retouch` - CLI for retouch
//!
//! This binary runs corrections and translations on the current selection and
//! manages the protected-word list, history and configuration.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;

use retouch::cli::{
    Cli, Command, ConfigCommand, HistoryCommand, MaskCommand, StatusCommand, WordsCommand,
};
use retouch::masking::{mask, validate_no_collisions};
use retouch::operation::{OperationKind, OperationOutcome, OperationRecord};
use retouch::orchestrator::{Collaborators, Orchestrator};
use retouch::storage::RetentionPolicy;
use retouch::timing::TokioClock;
use retouch::transform::{CommandTransformer, Transformer};
use retouch::{init_logging, platform, Config, Storage};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    // Execute the command
    match cli.command {
        Command::Correct => run_operation(config, OperationKind::Correction).await,
        Command::Translate(cmd) => {
            let mut config = config;
            if let Some(language) = cmd.to {
                config.transformer.target_language = language;
            }
            config.validate()?;
            run_operation(config, OperationKind::Translation).await
        }
        Command::Mask(cmd) => handle_mask(&config, &cmd).map(|()| ExitCode::SUCCESS),
        Command::Words(cmd) => handle_words(&config, cmd).map(|()| ExitCode::SUCCESS),
        Command::History(cmd) => handle_history(&config, cmd).map(|()| ExitCode::SUCCESS),
        Command::Config(cmd) => Ok(handle_config(&config, cmd)),
        Command::Status(cmd) => handle_status(&config, &cmd).map(|()| ExitCode::SUCCESS),
    }
}

fn open_storage(config: &Config) -> anyhow::Result<Storage> {
    let path = config.database_path();
    let storage = Storage::open(&path)
        .with_context(|| format!("failed to open history at {}", path.display()))?;
    Ok(storage.with_retention(RetentionPolicy::from_config(config)))
}

async fn run_operation(config: Config, kind: OperationKind) -> anyhow::Result<ExitCode> {
    let services = platform::native()?;
    let storage = Arc::new(open_storage(&config)?);

    let orchestrator = Orchestrator::new(
        &config,
        Collaborators {
            focus: services.focus,
            clipboard: services.clipboard,
            transformer: Arc::new(CommandTransformer::from_config(&config.transformer)),
            words: storage.clone(),
            history: storage,
            notifier: services.notifier,
            clock: Arc::new(TokioClock::new()),
        },
    );

    let outcome = orchestrator.run(kind).await;
    match &outcome {
        OperationOutcome::Completed { kind, method } => {
            println!("{} done ({method})", kind.label());
            Ok(ExitCode::SUCCESS)
        }
        OperationOutcome::Failed { kind, failure } => {
            eprintln!("{} failed: {failure}", kind.label());
            Ok(ExitCode::FAILURE)
        }
        OperationOutcome::Busy => {
            eprintln!("another operation is already running");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn handle_mask(config: &Config, cmd: &MaskCommand) -> anyhow::Result<()> {
    if !validate_no_collisions(&cmd.text) {
        eprintln!("warning: the text already contains placeholder-shaped tokens; unmasking may be lossy");
    }

    let storage = open_storage(config)?;
    let words = storage.list_words()?;
    let result = mask(&cmd.text, &words);

    if cmd.json {
        let mapping: Vec<_> = result
            .mapping
            .iter()
            .map(|span| serde_json::json!({ "token": span.token, "original": span.original }))
            .collect();
        let output = serde_json::json!({
            "masked_text": result.masked_text,
            "mapping": mapping,
            "rules_evaluated": result.rules_evaluated,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", result.masked_text);
    if !result.is_unchanged() {
        println!();
        for span in &result.mapping {
            println!("  {} = {}", span.token, span.original);
        }
    }
    Ok(())
}

fn handle_words(config: &Config, cmd: WordsCommand) -> anyhow::Result<()> {
    let storage = open_storage(config)?;

    match cmd {
        WordsCommand::List { json } => {
            let words = storage.list_words()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&words)?);
            } else if words.is_empty() {
                println!("No protected words.");
            } else {
                println!("{:>5}  {:<6}  {:<10}  TEXT", "ID", "CASE", "MATCH");
                for word in &words {
                    println!(
                        "{:>5}  {:<6}  {:<10}  {}",
                        word.id,
                        if word.case_sensitive { "exact" } else { "any" },
                        if word.whole_word_only { "whole" } else { "substring" },
                        word.text
                    );
                }
            }
        }
        WordsCommand::Add { text, flags } => {
            let word = storage.add_word(&flags.to_word(text))?;
            println!("Added protected word {} ({})", word.id, word.text);
        }
        WordsCommand::Update { id, text, flags } => {
            let mut word = flags.to_word(text);
            word.id = id;
            if !storage.update_word(&word)? {
                bail!("no protected word with ID {id}");
            }
            println!("Updated protected word {id}");
        }
        WordsCommand::Remove { id } => {
            if !storage.delete_word(id)? {
                bail!("no protected word with ID {id}");
            }
            println!("Removed protected word {id}");
        }
    }
    Ok(())
}

fn print_record(record: &OperationRecord) {
    let status = if record.success { "ok" } else { "failed" };
    let app = record.source_app.as_deref().unwrap_or("-");
    println!(
        "{:>5}  {}  {:<11}  {:<6}  {:>6}ms  {:>6} chars  {}",
        record.id.unwrap_or_default(),
        record.timestamp.format("%Y-%m-%d %H:%M:%S"),
        record.kind.as_str(),
        status,
        record.latency_ms,
        record.input_chars(),
        app
    );
    if let Some(error) = &record.error {
        println!("       {error}");
    }
}

fn handle_history(config: &Config, cmd: HistoryCommand) -> anyhow::Result<()> {
    let storage = open_storage(config)?;

    match cmd {
        HistoryCommand::List { limit, kind, json } => {
            let records = match kind {
                Some(kind) => storage.operations_by_kind(kind.into(), limit)?,
                None => storage.recent_operations(limit)?,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                println!("No operations recorded.");
            } else {
                for record in &records {
                    print_record(record);
                }
            }
        }
        HistoryCommand::Stats => {
            let stats = storage.stats()?;
            println!("History Statistics");
            println!("==================");
            println!("Operations:         {}", stats.total_operations);
            println!("  Successful:       {}", stats.successful_operations);
            println!("  Corrections:      {}", stats.corrections);
            println!("  Translations:     {}", stats.translations);
            println!("  Direct writes:    {}", stats.direct_replacements);
            if let Some(avg) = stats.average_latency_ms {
                println!("Average latency:    {avg:.0} ms");
            }
            println!("Protected words:    {}", stats.protected_words);
            if let Some(oldest) = stats.oldest_operation {
                println!("Oldest:             {}", oldest.to_rfc3339());
            }
            if let Some(newest) = stats.newest_operation {
                println!("Newest:             {}", newest.to_rfc3339());
            }
            println!("Database size:      {} bytes", stats.db_size_bytes);
        }
        HistoryCommand::Prune {
            keep,
            older_than_days,
        } => {
            let mut deleted = 0;
            match (keep, older_than_days) {
                (None, None) => deleted += storage.apply_retention()?,
                (keep, days) => {
                    if let Some(days) = days {
                        deleted += storage.prune_older_than(chrono::Duration::days(days.into()))?;
                    }
                    if let Some(keep) = keep {
                        deleted += storage.prune_keep_recent(keep)?;
                    }
                }
            }
            println!("Deleted {deleted} operations");
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> ExitCode {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                match serde_json::to_string_pretty(config) {
                    Ok(text) => println!("{text}"),
                    Err(e) => {
                        eprintln!("failed to serialize configuration: {e}");
                        return ExitCode::FAILURE;
                    }
                }
            } else {
                print_config(config);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => {
                    println!("Configuration error: {e}");
                    return ExitCode::FAILURE;
                }
            }
        }
    }
    ExitCode::SUCCESS
}

fn print_config(config: &Config) {
    println!("Current Configuration");
    println!("=====================");
    println!();
    println!("[Storage]");
    println!("  Database path:       {}", config.database_path().display());
    println!("  Max records:         {}", config.storage.max_records);
    println!("  Max age (days):      {}", config.storage.max_age_days);
    println!();
    println!("[Acquisition]");
    println!("  Poll interval (ms):  {}", config.acquisition.poll_interval_ms);
    println!("  Timeout (ms):        {}", config.acquisition.timeout_ms);
    println!("  Grace delay (ms):    {}", config.acquisition.grace_delay_ms);
    println!("  Restore clipboard:   {}", config.acquisition.restore_clipboard);
    println!(
        "  Clipboard-first:     {}",
        config.acquisition.clipboard_first_apps.join(", ")
    );
    println!();
    println!("[Replacement]");
    println!(
        "  Paste settle (ms):   {}",
        config.replacement.paste_settle_delay_ms
    );
    println!("  Restore delay (ms):  {}", config.replacement.restore_delay_ms);
    println!(
        "  No direct write:     {}",
        config.replacement.direct_write_blocklist.join(", ")
    );
    println!();
    println!("[Transformer]");
    println!(
        "  Command:             {}",
        config.transformer.command.as_deref().unwrap_or("(not set)")
    );
    println!("  Timeout (s):         {}", config.transformer.timeout_secs);
    println!("  Max length:          {}", config.transformer.max_text_length);
    println!("  Target language:     {}", config.transformer.target_language);
    println!("  Consent granted:     {}", config.transformer.consent_granted);
}

fn handle_status(config: &Config, cmd: &StatusCommand) -> anyhow::Result<()> {
    let platform = platform::status();
    let transformer_ready = CommandTransformer::from_config(&config.transformer).is_configured();
    let database_path = config.database_path();
    let stats = if database_path.exists() {
        Some(open_storage(config)?.stats()?)
    } else {
        None
    };

    if cmd.json {
        let status = serde_json::json!({
            "platform": platform.name,
            "permission_granted": platform.has_permission,
            "platform_message": platform.message,
            "transformer_configured": transformer_ready,
            "consent_granted": config.transformer.consent_granted,
            "database_path": database_path,
            "operations": stats.as_ref().map(|s| s.total_operations),
            "protected_words": stats.as_ref().map(|s| s.protected_words),
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("retouch status");
    println!("--------------");
    println!("Platform:      {platform}");
    println!(
        "Permission:    {}",
        if platform.has_permission { "granted" } else { "missing" }
    );
    println!(
        "Transformer:   {}",
        if transformer_ready { "configured" } else { "not configured" }
    );
    println!(
        "Consent:       {}",
        if config.transformer.consent_granted { "granted" } else { "not granted" }
    );
    println!("Database:      {}", database_path.display());
    match stats {
        Some(stats) => {
            println!("Operations:    {}", stats.total_operations);
            println!("Words:         {}", stats.protected_words);
        }
        None => println!("History:       (not created yet)"),
    }
    if let Some(instructions) = platform.instructions {
        println!();
        println!("{instructions}");
    }
    Ok(())
}
