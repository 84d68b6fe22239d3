//! romtidy - ROM collection reconciliation
//!
//! Main entry point for the command-line application.
//!
//! # Overview
//!
//! This binary wires the library together:
//! - Diagnostic logging (daily rotated file, optional console output)
//! - Configuration loading ([`ConfigManager`])
//! - The run journal ([`Journal`])
//! - Terminal prompts for decisions ([`TerminalDecisions`])
//! - The run itself ([`Reconciler`])
//!
//! # Exit status
//!
//! - `0` when the run completes
//! - `1` when configuration or a filesystem operation fails
//! - [`EXIT_LOG_FAILURE`] (74) when the journal cannot be written

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use romtidy::config::default_config;
use romtidy::ui::TerminalDecisions;
use romtidy::{APP_NAME, ConfigManager, EXIT_LOG_FAILURE, Journal, Reconciler, VERSION};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "romtidy")]
#[command(about = "Reconcile a ROM collection against per-system rules")]
#[command(version)]
struct Cli {
    /// Configuration file (JSON)
    #[arg(long, default_value = "romtidy.json", global = true)]
    config: Utf8PathBuf,

    /// Log every action without touching the filesystem
    #[arg(long, global = true)]
    dry_run: bool,

    /// Debug-level diagnostics
    #[arg(long, global = true)]
    debug: bool,

    /// Also print diagnostics to the console
    #[arg(long, global = true)]
    console: bool,

    /// Directory for diagnostic log files
    #[arg(long, default_value = "logs", global = true)]
    log_dir: Utf8PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Reconcile the configured collection root (default)
    Run,
    /// Print a documented sample configuration
    GenConfig {
        /// Write the sample here instead of printing it
        #[arg(long)]
        output: Option<Utf8PathBuf>,
    },
}

/// Main entry point for romtidy
///
/// # Errors
///
/// This function can fail if:
/// - Logging initialization fails (disk space, permissions)
/// - The configuration file is missing or invalid
/// - The collection root does not exist
/// - A move or rename fails during the run
fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    match &cli.command {
        Some(Command::GenConfig { output }) => gen_config(output.as_ref()),
        Some(Command::Run) | None => run(&cli),
    }
}

fn gen_config(output: Option<&Utf8PathBuf>) -> Result<ExitCode> {
    let config = default_config();
    match output {
        Some(path) => ConfigManager::new(path).save_config(&config)?,
        None => println!(
            "{}",
            serde_json::to_string_pretty(&config).context("Failed to serialize config to JSON")?
        ),
    }
    Ok(ExitCode::SUCCESS)
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let _guard = romtidy::logging::setup_logging(&cli.log_dir, "romtidy", cli.debug, cli.console)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let mut config = ConfigManager::new(&cli.config).load_config()?;
    if cli.dry_run {
        config.dry_run = true;
    }
    if config.dry_run {
        println!("Dry run: nothing will be changed on disk");
    }

    let mut journal = match Journal::open(&config.log_file) {
        Ok(journal) => journal,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("{}", e);
            return Ok(ExitCode::from(EXIT_LOG_FAILURE));
        }
    };
    let mut decisions = TerminalDecisions::stdio();

    match Reconciler::new(&config).run(&mut journal, &mut decisions) {
        Ok(report) => {
            if report.metrics.has_changes() {
                println!("{}", report.metrics.summary());
            } else {
                println!("Collection already tidy, nothing to change");
            }
            println!("Journal written to {}", config.log_file);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) if e.is_journal_failure() => {
            tracing::error!("Run aborted: {}", e);
            eprintln!("Run aborted: {}", e);
            Ok(ExitCode::from(EXIT_LOG_FAILURE))
        }
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            Err(e).context("Run failed")
        }
    }
}
