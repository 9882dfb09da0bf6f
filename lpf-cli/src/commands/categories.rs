//! Categories command - list and add categories

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use super::{get_context, get_logger, log_event};
use crate::output::{create_table, success};
use lpf_core::services::LogEvent;
use lpf_core::CategoryType;

#[derive(Subcommand)]
pub enum CategoriesCommands {
    /// List categories from the configured storage
    List {
        /// Only categories of this type (income, expense, investment)
        #[arg(long = "type")]
        category_type: Option<CategoryType>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a category to the local ledger
    Add {
        name: String,
        /// income, expense or investment
        #[arg(long = "type")]
        category_type: CategoryType,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: CategoriesCommands) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();

    match command {
        CategoriesCommands::List { category_type, json } => {
            let mut categories = ctx.categories.list_categories()?;
            if let Some(wanted) = category_type {
                categories.retain(|c| c.category_type == wanted);
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&categories)?);
                return Ok(());
            }

            if categories.is_empty() {
                println!("No categories found.");
                return Ok(());
            }

            let mut table = create_table();
            table.set_header(vec!["ID", "Name", "Type", "Default"]);
            for category in &categories {
                table.add_row(vec![
                    category.id.clone(),
                    category.name.clone(),
                    category.category_type.to_string(),
                    if category.is_default { "yes".to_string() } else { String::new() },
                ]);
            }
            println!("{}", table);
            println!(
                "{}",
                format!("{} categories ({} storage)", categories.len(), ctx.storage.name()).dimmed()
            );
        }
        CategoriesCommands::Add { name, category_type, json } => {
            let ledger = ctx
                .ledger
                .as_ref()
                .context("Adding categories is only supported with the local storage backend")?;
            let category = ledger.add_category(&name, category_type)?;
            log_event(
                &logger,
                LogEvent::new("category_added")
                    .with_command("categories add")
                    .with_storage(ctx.storage.name()),
            );

            if json {
                println!("{}", serde_json::to_string_pretty(&category)?);
            } else {
                success(&format!("Category '{}' added ({})", category.name, category.id));
            }
        }
    }

    Ok(())
}
