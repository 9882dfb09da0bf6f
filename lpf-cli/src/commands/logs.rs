//! Logs command - inspect and prune the event log

use anyhow::Result;
use chrono::{TimeZone, Utc};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;

use super::get_lpf_dir;
use crate::output::create_table;
use lpf_core::services::logging::now_ms;
use lpf_core::services::{EntryPoint, LogEntry, LogFilter, LoggingService};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent events
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Show only failures
        #[arg(long)]
        errors: bool,
        /// Only this event name (e.g. import_finished)
        #[arg(long)]
        event: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete old events
    Clear {
        /// Delete events older than N days
        #[arg(long, default_value = "30")]
        older_than_days: u64,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Totals per event and imported row counts
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn open_log() -> Result<LoggingService> {
    let lpf_dir = get_lpf_dir()?;
    std::fs::create_dir_all(&lpf_dir)?;
    LoggingService::new(&lpf_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
}

fn format_timestamp(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

/// `12 ok / 1 failed` for import events, empty otherwise
fn rows_summary(entry: &LogEntry) -> String {
    match (entry.rows_imported, entry.rows_failed) {
        (Some(ok), Some(0)) => format!("{} ok", ok),
        (Some(ok), Some(failed)) => format!("{} ok / {} failed", ok, failed),
        (Some(ok), None) => format!("{} ok", ok),
        _ => String::new(),
    }
}

pub fn run(command: LogsCommands) -> Result<()> {
    let service = open_log()?;

    match command {
        LogsCommands::List {
            limit,
            errors,
            event,
            json,
        } => list(&service, LogFilter { limit, errors_only: errors, event }, json),
        LogsCommands::Clear {
            older_than_days,
            force,
            json,
        } => clear(&service, older_than_days, force, json),
        LogsCommands::Stats { json } => stats(&service, json),
    }
}

fn list(service: &LoggingService, filter: LogFilter, json: bool) -> Result<()> {
    let entries = service.query(&filter)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No log entries found.");
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["Time", "Event", "Command", "Storage", "Rows", "Error"]);
    for entry in &entries {
        let error = match &entry.error_message {
            Some(message) => message.red().to_string(),
            None => String::new(),
        };
        table.add_row(vec![
            format_timestamp(entry.timestamp),
            entry.event.clone(),
            entry.command.clone().unwrap_or_default(),
            entry.storage.clone().unwrap_or_default(),
            rows_summary(entry),
            error,
        ]);
    }
    println!("{}", table);

    if let Some(newest) = entries.first() {
        println!(
            "{}",
            format!("{} {} on {}", newest.entry_point, newest.app_version, newest.platform).dimmed()
        );
    }
    Ok(())
}

fn clear(service: &LoggingService, older_than_days: u64, force: bool, json: bool) -> Result<()> {
    if !force
        && !json
        && !Confirm::new()
            .with_prompt(format!("Delete log entries older than {} days?", older_than_days))
            .default(false)
            .interact()?
    {
        println!("Cancelled.");
        return Ok(());
    }

    let cutoff_ms = now_ms() - older_than_days as i64 * DAY_MS;
    let deleted = service.delete_before(cutoff_ms)?;

    if json {
        println!("{}", serde_json::json!({ "deleted": deleted }));
    } else {
        println!("Deleted {} log entries", deleted);
    }
    Ok(())
}

fn stats(service: &LoggingService, json: bool) -> Result<()> {
    let stats = service.stats()?;
    let db_path = service.db_path();
    let size_bytes = std::fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);

    if json {
        println!(
            "{}",
            serde_json::json!({
                "stats": stats,
                "database_path": db_path.to_string_lossy(),
                "database_size_bytes": size_bytes
            })
        );
        return Ok(());
    }

    println!("{}", "Log Statistics".bold());
    println!("  Entries: {} ({} failed)", stats.total_entries, stats.error_count);
    println!(
        "  Imported rows: {} ({} failed)",
        stats.rows_imported, stats.rows_failed
    );

    if !stats.events.is_empty() {
        let mut table = create_table();
        table.set_header(vec!["Event", "Count"]);
        for (event, count) in &stats.events {
            table.add_row(vec![event.clone(), count.to_string()]);
        }
        println!("{}", table);
    }

    println!("  Database: {} ({} bytes)", db_path.display(), size_bytes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(rows_imported: Option<u32>, rows_failed: Option<u32>) -> LogEntry {
        LogEntry {
            id: 1,
            timestamp: 0,
            entry_point: "cli".into(),
            app_version: "0.1.0".into(),
            platform: "linux".into(),
            event: "import_finished".into(),
            command: None,
            storage: None,
            rows_imported,
            rows_failed,
            error_message: None,
            error_details: None,
        }
    }

    #[test]
    fn test_rows_summary() {
        assert_eq!(rows_summary(&entry(Some(3), Some(0))), "3 ok");
        assert_eq!(rows_summary(&entry(Some(2), Some(1))), "2 ok / 1 failed");
        assert_eq!(rows_summary(&entry(None, None)), "");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00");
    }
}
