use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use marketplace_sync_lib::application::{SyncRunner, exit_code};
use marketplace_sync_lib::domain::{EntityKind, SyncOutcome, SyncReport};
use marketplace_sync_lib::infrastructure::{ConfigManager, DatabaseConnection, init_logging_with_config};

/// Marketplace statistics sync - pulls API records into the local store
#[derive(Parser, Debug)]
#[command(name = "marketplace-sync")]
#[command(version)]
#[command(about = "Sync marketplace incomes, orders, sales and stocks into SQLite", long_about = None)]
struct Cli {
    /// Configuration file (TOML or JSON); defaults to the user config directory
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,

    /// Print run reports as JSON on stdout
    #[arg(long = "json", global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sync one entity kind: incomes, orders, sales or stocks
    Sync { kind: EntityKind },
    /// Sync all entity kinds concurrently
    SyncAll,
    /// Create the record tables
    Migrate,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> Result<u8> {
    let config = ConfigManager::new(cli.config)
        .load()
        .context("Failed to load configuration")?;
    init_logging_with_config(&config.logging)?;

    let reports = match cli.command {
        Command::Migrate => {
            let db = DatabaseConnection::new(&config.database.url, config.database.max_connections)
                .await?;
            db.migrate().await?;
            return Ok(0);
        }
        Command::Sync { kind } => {
            let runner = SyncRunner::from_config(config).await?;
            vec![runner.run(kind, Local::now().date_naive()).await]
        }
        Command::SyncAll => {
            let runner = SyncRunner::from_config(config).await?;
            runner.run_all(Local::now().date_naive()).await
        }
    };

    print_reports(&reports, cli.json)?;
    Ok(exit_code(&reports))
}

fn print_reports(reports: &[SyncReport], json: bool) -> Result<()> {
    if json {
        let rendered = match reports {
            [single] => serde_json::to_string_pretty(single)?,
            many => serde_json::to_string_pretty(many)?,
        };
        println!("{rendered}");
        return Ok(());
    }

    for report in reports {
        let status = match &report.outcome {
            SyncOutcome::Completed { .. } => "completed".to_string(),
            SyncOutcome::Failed { error } => format!("failed ({})", error.message),
        };
        println!(
            "{:<8} {}: {} pages, {} records",
            report.entity.as_str(),
            status,
            report.progress.pages_processed,
            report.progress.records_written
        );
    }
    Ok(())
}
