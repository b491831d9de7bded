//! FlipLedger CLI - migrations and data management.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! fl-cli migrate
//!
//! # Load records from a YAML file
//! fl-cli seed crates/cli/seed/demo.yaml
//!
//! # Show or change settings
//! fl-cli settings list
//! fl-cli settings set currency EUR
//!
//! # Write a CSV export
//! fl-cli export inventory --out inventory.csv
//! ```
//!
//! Every command reads `DATABASE_URL` (a `.env` file is honoured).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

mod commands;

#[derive(Parser)]
#[command(name = "fl-cli")]
#[command(author, version, about = "FlipLedger CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Create records from a YAML file
    Seed {
        /// Path to the YAML file
        file: PathBuf,
    },
    /// Show or change settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Write a CSV export
    Export {
        /// What to export
        #[arg(value_enum)]
        kind: ExportKind,

        /// Output file; defaults to the download name in the current directory
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print stored settings and the values in force
    List,
    /// Validate and store one setting
    Set {
        /// Setting key, e.g. `currency`
        key: String,
        /// New value
        value: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportKind {
    Inventory,
    Sales,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file } => commands::seed::run(&file).await?,
        Commands::Settings { action } => match action {
            SettingsAction::List => commands::settings::list().await?,
            SettingsAction::Set { key, value } => commands::settings::set(&key, &value).await?,
        },
        Commands::Export { kind, out } => {
            let kind = match kind {
                ExportKind::Inventory => commands::export::Kind::Inventory,
                ExportKind::Sales => commands::export::Kind::Sales,
            };
            commands::export::run(kind, out.as_deref()).await?;
        }
    }
    Ok(())
}
