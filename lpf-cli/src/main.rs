//! LP Finanças CLI - bank-statement import in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{categories, import, ledger, logs};

/// LP Finanças - import bank statements into your ledger
#[derive(Parser)]
#[command(name = "lpf", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse, review and import bank-statement CSV files
    Import {
        #[command(subcommand)]
        command: import::ImportCommands,
    },

    /// List or add categories in the configured storage
    Categories {
        #[command(subcommand)]
        command: categories::CategoriesCommands,
    },

    /// Inspect the local ledger
    Ledger {
        #[command(subcommand)]
        command: ledger::LedgerCommands,
    },

    /// View and manage application logs
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Import { command } => import::run(command),
        Commands::Categories { command } => categories::run(command),
        Commands::Ledger { command } => ledger::run(command),
        Commands::Logs { command } => logs::run(command),
    }
}
