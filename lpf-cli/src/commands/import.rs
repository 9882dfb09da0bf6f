//! Import command - parse, map, review and import bank-statement CSV files

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::{Confirm, Input, MultiSelect, Select};
use indicatif::ProgressBar;

use super::{get_context_with, get_logger, log_event};
use crate::output::{create_table, format_brl, info, warning, ConsoleNotifier};
use lpf_core::domain::ColumnRole;
use lpf_core::services::{ImportService, LogEvent, LoggingService, ReviewSession, UploadedStatement};
use lpf_core::{ColumnMapping, ImportResult, LpfContext, ParsedCsv};

#[derive(Subcommand)]
pub enum ImportCommands {
    /// Parse a CSV statement and show the detected columns
    Parse {
        /// Path to the .csv file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Map, review and import a CSV statement
    Run {
        /// Path to the .csv file
        file: PathBuf,
        /// Use a saved column profile
        #[arg(long)]
        profile: Option<String>,
        /// Save the confirmed columns as a profile
        #[arg(long)]
        save_profile: Option<String>,
        /// Date column (header name or 1-based position)
        #[arg(long)]
        date_column: Option<String>,
        /// Description column (header name or 1-based position)
        #[arg(long)]
        description_column: Option<String>,
        /// Value column (header name or 1-based position)
        #[arg(long)]
        value_column: Option<String>,
        /// Transaction ids to leave out
        #[arg(long, value_delimiter = ',')]
        skip: Vec<usize>,
        /// Transaction ids whose type (income/expense) is flipped
        #[arg(long, value_delimiter = ',')]
        flip: Vec<usize>,
        /// Default category id for every row
        #[arg(long)]
        category: Option<String>,
        /// Run the import without storing anything
        #[arg(long)]
        dry_run: bool,
        /// Skip interactive prompts
        #[arg(long, short)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Submit an import request JSON file ("-" reads stdin)
    Submit {
        request: String,
        /// Run the import without storing anything
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List saved column profiles
    Profiles {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a saved column profile
    DeleteProfile { name: String },
}

/// Options for `import run`
struct RunOptions {
    profile: Option<String>,
    save_profile: Option<String>,
    columns: [(ColumnRole, Option<String>); 3],
    skip: Vec<usize>,
    flip: Vec<usize>,
    category: Option<String>,
    dry_run: bool,
    interactive: bool,
    json: bool,
}

pub fn run(command: ImportCommands) -> Result<()> {
    let logger = get_logger();

    let (name, result) = match command {
        ImportCommands::Parse { file, json } => ("import parse", parse(&file, json)),
        ImportCommands::Run {
            file,
            profile,
            save_profile,
            date_column,
            description_column,
            value_column,
            skip,
            flip,
            category,
            dry_run,
            yes,
            json,
        } => {
            let options = RunOptions {
                profile,
                save_profile,
                columns: [
                    (ColumnRole::Date, date_column),
                    (ColumnRole::Description, description_column),
                    (ColumnRole::Value, value_column),
                ],
                skip,
                flip,
                category,
                dry_run,
                interactive: !yes && !json && atty::is(atty::Stream::Stdin),
                json,
            };
            ("import run", run_import(&file, options, &logger))
        }
        ImportCommands::Submit { request, dry_run, json } => {
            ("import submit", submit(&request, dry_run, json, &logger))
        }
        ImportCommands::Profiles { json } => ("import profiles", list_profiles(json)),
        ImportCommands::DeleteProfile { name } => ("import delete-profile", delete_profile(&name)),
    };

    match &result {
        Ok(()) => log_event(&logger, LogEvent::new("command_completed").with_command(name)),
        Err(e) => log_event(
            &logger,
            LogEvent::new("command_failed")
                .with_command(name)
                .with_error(error_kind(e)),
        ),
    }
    result
}

/// Coarse failure label for the event log; messages can carry statement data
fn error_kind(e: &anyhow::Error) -> &'static str {
    match e.downcast_ref::<lpf_core::Error>() {
        Some(lpf_core::Error::Parse(_)) => "parse error",
        Some(lpf_core::Error::Mapping(_)) => "mapping error",
        Some(lpf_core::Error::Validation(_)) => "validation error",
        Some(lpf_core::Error::NotFound(_)) => "not found",
        Some(lpf_core::Error::Storage(_)) => "storage error",
        Some(_) => "core error",
        None => "command error",
    }
}

/// Read a statement file; only `.csv` is accepted
fn read_statement(path: &Path) -> Result<String> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if !is_csv {
        bail!("Only .csv files can be imported: {}", path.display());
    }

    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(decode_statement(bytes))
}

/// UTF-8, falling back to Latin-1 as exported by many Brazilian banks
fn decode_statement(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
    }
}

/// Resolve a column argument by header name, then by 1-based position
fn column_index(headers: &[String], arg: &str) -> Result<usize> {
    let arg = arg.trim();
    if let Some(index) = headers.iter().position(|h| h.trim().eq_ignore_ascii_case(arg)) {
        return Ok(index);
    }
    match arg.parse::<usize>() {
        Ok(n) if n >= 1 && n <= headers.len() => Ok(n - 1),
        _ => bail!("Column '{}' not found (headers: {})", arg, headers.join(", ")),
    }
}

fn header_label(headers: &[String], index: Option<usize>) -> String {
    match index {
        Some(i) => match headers.get(i).map(|h| h.trim()) {
            Some(h) if !h.is_empty() => h.to_string(),
            _ => format!("column {}", i + 1),
        },
        None => "-".to_string(),
    }
}

fn print_mapping(headers: &[String], mapping: &ColumnMapping) {
    println!("  Date: {}", header_label(headers, mapping.date));
    println!("  Description: {}", header_label(headers, mapping.description));
    println!("  Value: {}", header_label(headers, mapping.value));
}

fn print_preview(preview: &ParsedCsv) {
    let mut table = create_table();
    table.set_header(preview.headers.clone());
    for row in &preview.sample_data {
        table.add_row(row.clone());
    }
    println!("{}", table);
    if preview.total_rows > preview.sample_data.len() {
        println!("... and {} more rows", preview.total_rows - preview.sample_data.len());
    }
}

fn parse(file: &Path, json: bool) -> Result<()> {
    let ctx = get_context_with(Arc::new(ConsoleNotifier::new(json)))?;
    let text = read_statement(file)?;
    let upload = ctx.import_service.parse_csv(&text)?;
    let preview = upload.preview();

    if json {
        println!("{}", serde_json::to_string_pretty(preview)?);
        return Ok(());
    }

    print_preview(preview);
    println!();
    println!("{} {}", "Rows:".bold(), preview.total_rows);
    info("Detected columns:");
    print_mapping(&preview.headers, &preview.detected_columns);
    Ok(())
}

/// Explicit choices: profile first, then column arguments on top
fn explicit_mapping(
    ctx: &LpfContext,
    headers: &[String],
    options: &RunOptions,
) -> Result<ColumnMapping> {
    let mut mapping = match &options.profile {
        Some(name) => ctx
            .import_service
            .get_profile(name)?
            .with_context(|| format!("Profile not found: {}", name))?
            .to_mapping(headers),
        None => ColumnMapping::default(),
    };

    for (role, arg) in &options.columns {
        if let Some(arg) = arg {
            let index = Some(column_index(headers, arg)?);
            match role {
                ColumnRole::Date => mapping.date = index,
                ColumnRole::Description => mapping.description = index,
                ColumnRole::Value => mapping.value = index,
            }
        }
    }
    Ok(mapping)
}

/// Let the user confirm or pick each column
fn prompt_mapping(headers: &[String], mut mapping: ColumnMapping) -> Result<ColumnMapping> {
    info("Columns:");
    print_mapping(headers, &mapping);

    if mapping.is_complete()
        && Confirm::new()
            .with_prompt("Use these columns?")
            .default(true)
            .interact()?
    {
        return Ok(mapping);
    }

    let items: Vec<String> = (0..headers.len())
        .map(|i| header_label(headers, Some(i)))
        .collect();
    for role in [ColumnRole::Date, ColumnRole::Description, ColumnRole::Value] {
        let chosen = Select::new()
            .with_prompt(format!("{} column", role))
            .items(&items)
            .default(mapping.get(role).unwrap_or(0))
            .interact()?;
        match role {
            ColumnRole::Date => mapping.date = Some(chosen),
            ColumnRole::Description => mapping.description = Some(chosen),
            ColumnRole::Value => mapping.value = Some(chosen),
        }
    }
    Ok(mapping)
}

fn print_transactions(session: &ReviewSession) {
    let mut table = create_table();
    table.set_header(vec!["#", "", "Date", "Description", "Value", "Type"]);
    for tx in session.transactions() {
        let kind = match tx.kind {
            lpf_core::TransactionKind::Income => tx.kind.as_str().green().to_string(),
            lpf_core::TransactionKind::Expense => tx.kind.as_str().red().to_string(),
        };
        table.add_row(vec![
            tx.id.to_string(),
            if tx.selected { "x".to_string() } else { String::new() },
            tx.date.clone(),
            tx.description.clone(),
            format_brl(tx.value),
            kind,
        ]);
    }
    println!("{}", table);
}

/// Apply `--skip` and `--flip` ids
fn apply_review_flags(session: &mut ReviewSession, skip: &[usize], flip: &[usize]) -> Result<()> {
    for &id in skip {
        let selected = session
            .transactions()
            .iter()
            .find(|tx| tx.id == id)
            .map(|tx| tx.selected)
            .with_context(|| format!("No transaction with id {}", id))?;
        if selected {
            session.toggle(id)?;
        }
    }
    for &id in flip {
        let kind = session
            .transactions()
            .iter()
            .find(|tx| tx.id == id)
            .map(|tx| tx.kind)
            .with_context(|| format!("No transaction with id {}", id))?;
        session.set_kind(id, kind.flipped())?;
    }
    Ok(())
}

/// Interactive review: pick rows, then flip types
fn prompt_review(session: &mut ReviewSession) -> Result<()> {
    let items: Vec<String> = session
        .transactions()
        .iter()
        .map(|tx| {
            format!(
                "{}  {}  {}  ({})",
                tx.date,
                tx.description,
                format_brl(tx.value),
                tx.kind
            )
        })
        .collect();
    let defaults: Vec<bool> = session.transactions().iter().map(|tx| tx.selected).collect();

    let chosen = MultiSelect::new()
        .with_prompt("Transactions to import (space toggles)")
        .items(&items)
        .defaults(&defaults)
        .interact()?;

    let ids: Vec<(usize, bool)> = session
        .transactions()
        .iter()
        .enumerate()
        .map(|(pos, tx)| (tx.id, tx.selected != chosen.contains(&pos)))
        .collect();
    for (id, changed) in ids {
        if changed {
            session.toggle(id)?;
        }
    }

    let flips = Input::<String>::new()
        .with_prompt("Ids to flip between income and expense (blank for none)")
        .allow_empty(true)
        .interact_text()?;
    let flip = flips
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().with_context(|| format!("Invalid id: {}", s)))
        .collect::<Result<Vec<_>>>()?;
    apply_review_flags(session, &[], &flip)
}

fn with_spinner<T>(enabled: bool, message: String, f: impl FnOnce() -> T) -> T {
    if !enabled {
        return f();
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    let value = f();
    spinner.finish_and_clear();
    value
}

/// Ask for the final go-ahead, then persist `--save-profile`
///
/// Returns false when the user declined; nothing is saved in that case.
fn confirm_and_save_profile(
    ctx: &LpfContext,
    session: &ReviewSession,
    headers: &[String],
    options: &RunOptions,
    confirm: impl FnOnce(&str) -> Result<bool>,
) -> Result<bool> {
    if options.interactive {
        let (incomes, expenses) = session.selected_totals();
        let prompt = format!(
            "Import {} transactions (incomes {}, expenses {}) into {} storage?",
            session.selected_count(),
            format_brl(incomes),
            format_brl(expenses),
            ctx.import_service.storage_name()
        );
        if !confirm(&prompt)? {
            return Ok(false);
        }
    }

    if let Some(name) = &options.save_profile {
        ctx.import_service.save_profile(name, headers, &session.mapping())?;
        if !options.json {
            info(&format!("Profile '{}' saved", name.trim()));
        }
    }
    Ok(true)
}

fn run_import(file: &Path, options: RunOptions, logger: &Option<LoggingService>) -> Result<()> {
    let notifier = Arc::new(ConsoleNotifier::new(options.json));
    let ctx = get_context_with(notifier.clone())?;

    let text = read_statement(file)?;
    let upload: UploadedStatement = ctx.import_service.parse_csv(&text)?;
    let headers = upload.preview().headers.clone();

    let mut mapping = explicit_mapping(&ctx, &headers, &options)?.or(upload.detected_columns());
    if options.interactive {
        print_preview(upload.preview());
        mapping = prompt_mapping(&headers, mapping)?;
    }

    let mut session = upload.confirm_mapping(mapping)?;
    if session.dropped() > 0 && !options.json {
        warning(&format!(
            "{} rows skipped (zero value or empty description)",
            session.dropped()
        ));
    }

    apply_review_flags(&mut session, &options.skip, &options.flip)?;
    if options.interactive {
        print_transactions(&session);
        prompt_review(&mut session)?;
    }

    let confirmed = confirm_and_save_profile(&ctx, &session, &headers, &options, |prompt| {
        Ok(Confirm::new().with_prompt(prompt).default(true).interact()?)
    })?;
    if !confirmed {
        println!("Cancelled.");
        return Ok(());
    }

    let category = options
        .category
        .clone()
        .or_else(|| ctx.config.import.default_category_id.clone());
    let request = session.into_request(category)?;

    if options.dry_run {
        let (service, storage) = ctx.dry_run_service(notifier);
        let result = submit_with(&service, options.json, || service.import(&request));
        log_outcome(logger, "import run", &service, &result);
        report(&result, options.json, true)?;
        if !options.json {
            print_dry_run(&storage);
        }
        return finish(&result);
    }

    let service = &ctx.import_service;
    let result = submit_with(service, options.json, || service.import(&request));
    log_outcome(logger, "import run", service, &result);
    report(&result, options.json, false)?;
    finish(&result)
}

fn log_outcome(
    logger: &Option<LoggingService>,
    command: &str,
    service: &ImportService,
    result: &ImportResult,
) {
    log_event(
        logger,
        LogEvent::new("import_finished")
            .with_command(command)
            .with_storage(service.storage_name())
            .with_outcome(result),
    );
}

/// Run `f` under a spinner, then emit the notice once the spinner is gone
fn submit_with(
    service: &ImportService,
    json: bool,
    f: impl FnOnce() -> ImportResult,
) -> ImportResult {
    let result = with_spinner(
        !json && atty::is(atty::Stream::Stdout),
        format!("Importing into {} storage...", service.storage_name()),
        f,
    );
    service.notify(&result);
    result
}

fn submit(source: &str, dry_run: bool, json: bool, logger: &Option<LoggingService>) -> Result<()> {
    let notifier = Arc::new(ConsoleNotifier::new(json));
    let ctx = get_context_with(notifier.clone())?;

    let body = if source == "-" {
        let mut body = String::new();
        std::io::stdin()
            .read_to_string(&mut body)
            .context("Failed to read import request from stdin")?;
        body
    } else {
        std::fs::read_to_string(source).with_context(|| format!("Failed to read {}", source))?
    };

    let result = if dry_run {
        let (service, _) = ctx.dry_run_service(notifier);
        let result = submit_with(&service, json, || service.import_json(&body));
        log_outcome(logger, "import submit", &service, &result);
        result
    } else {
        let service = &ctx.import_service;
        let result = submit_with(service, json, || service.import_json(&body));
        log_outcome(logger, "import submit", service, &result);
        result
    };

    report(&result, json, dry_run)?;
    finish(&result)
}

fn report(result: &ImportResult, json: bool, dry_run: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    if dry_run {
        println!("{}", "DRY RUN - nothing was stored".yellow());
    }
    println!("  Imported: {}", result.total_imported);
    println!("    Incomes: {}", result.imported_incomes);
    println!("    Expenses: {}", result.imported_expenses);
    if !result.errors.is_empty() {
        println!("  {}", format!("Errors ({}):", result.errors.len()).red());
        for error in &result.errors {
            println!("    {}", error);
        }
    }
    Ok(())
}

fn print_dry_run(storage: &lpf_core::adapters::memory::InMemoryStorage) {
    let mut table = create_table();
    table.set_header(vec!["Type", "Date", "Description", "Value", "Category", "Status"]);
    for income in storage.incomes() {
        table.add_row(vec![
            "income".to_string(),
            income.date.to_string(),
            income.description,
            format_brl(income.value),
            income.category_id,
            income.status.as_str().to_string(),
        ]);
    }
    for expense in storage.expenses() {
        table.add_row(vec![
            "expense".to_string(),
            expense.date.to_string(),
            expense.description,
            format_brl(expense.value),
            expense.category_id,
            expense.status.as_str().to_string(),
        ]);
    }
    println!("{}", table);
}

fn finish(result: &ImportResult) -> Result<()> {
    if result.success {
        Ok(())
    } else {
        bail!("Import did not complete")
    }
}

fn list_profiles(json: bool) -> Result<()> {
    let ctx = get_context_with(Arc::new(ConsoleNotifier::new(json)))?;
    let profiles = ctx.import_service.list_profiles()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&profiles)?);
        return Ok(());
    }

    if profiles.is_empty() {
        println!("No saved profiles.");
        return Ok(());
    }

    println!("Saved import profiles:");
    for (name, profile) in &profiles {
        let columns = &profile.column_mappings;
        println!();
        println!("  {}", name.green());
        println!("    Date: {}", columns.date.as_deref().unwrap_or("-"));
        println!("    Description: {}", columns.description.as_deref().unwrap_or("-"));
        println!("    Value: {}", columns.value.as_deref().unwrap_or("-"));
    }
    Ok(())
}

fn delete_profile(name: &str) -> Result<()> {
    let ctx = get_context_with(Arc::new(ConsoleNotifier::new(false)))?;
    if ctx.import_service.delete_profile(name)? {
        println!("Profile '{}' deleted", name);
        Ok(())
    } else {
        bail!("Profile not found: {}", name)
    }
}
