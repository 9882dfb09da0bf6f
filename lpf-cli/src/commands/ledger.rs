//! Ledger command - inspect records stored in the local ledger

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use clap::Subcommand;
use colored::Colorize;
use rust_decimal::Decimal;

use super::get_context;
use crate::output::{create_table, format_brl};

#[derive(Subcommand)]
pub enum LedgerCommands {
    /// List incomes and expenses
    List {
        /// Only this month (YYYY-MM)
        #[arg(long)]
        month: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Monthly income and expense totals
    Summary {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Parse `YYYY-MM` into (year, month)
fn parse_month(raw: &str) -> Result<(i32, u32)> {
    let first = NaiveDate::parse_from_str(&format!("{}-01", raw.trim()), "%Y-%m-%d")
        .with_context(|| format!("Invalid month '{}', expected YYYY-MM", raw))?;
    Ok((first.year(), first.month()))
}

pub fn run(command: LedgerCommands) -> Result<()> {
    let ctx = get_context()?;
    let ledger = ctx.ledger.as_ref().with_context(|| {
        format!(
            "The ledger command reads the local ledger, but storage is '{}'",
            ctx.config.storage.backend
        )
    })?;

    match command {
        LedgerCommands::List { month, json } => {
            let period = month.as_deref().map(parse_month).transpose()?;
            let entries = ledger.list_entries(period)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }

            if entries.is_empty() {
                println!("No records found.");
                return Ok(());
            }

            let mut table = create_table();
            table.set_header(vec!["Date", "Type", "Description", "Category", "Value", "Status"]);
            for entry in &entries {
                table.add_row(vec![
                    entry.date.to_string(),
                    entry.kind.to_string(),
                    entry.description.clone(),
                    entry.category_name.clone().unwrap_or_else(|| entry.category_id.clone()),
                    format_brl(entry.value),
                    entry.status.clone(),
                ]);
            }
            println!("{}", table);
        }
        LedgerCommands::Summary { json } => {
            let totals = ledger.month_totals()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&totals)?);
                return Ok(());
            }

            if totals.is_empty() {
                println!("No records found.");
                return Ok(());
            }

            println!("{}", "Monthly Summary".bold());
            let mut table = create_table();
            table.set_header(vec!["Month", "Incomes", "Expenses", "Balance"]);
            for month in &totals {
                let balance: Decimal = month.incomes - month.expenses;
                let balance_text = if balance.is_sign_negative() {
                    format_brl(balance).red().to_string()
                } else {
                    format_brl(balance).green().to_string()
                };
                table.add_row(vec![
                    format!("{:04}-{:02}", month.year, month.month),
                    format_brl(month.incomes),
                    format_brl(month.expenses),
                    balance_text,
                ]);
            }
            println!("{}", table);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_month() {
        assert_eq!(parse_month("2024-05").unwrap(), (2024, 5));
        assert_eq!(parse_month(" 2023-12 ").unwrap(), (2023, 12));
        assert!(parse_month("2024-13").is_err());
        assert!(parse_month("05/2024").is_err());
        assert!(parse_month("abcd-01").is_err());
        assert!(parse_month("2024-05-15").is_err());
    }
}
