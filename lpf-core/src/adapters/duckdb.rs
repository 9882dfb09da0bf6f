//! Local DuckDB ledger

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use duckdb::{params, Connection};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::result::{Error as CoreError, Result as CoreResult, StorageError};
use crate::domain::{Category, CategoryType, NewExpense, NewIncome, TransactionKind, DEFAULT_CATEGORIES};
use crate::migrations::MIGRATIONS;
use crate::ports::{CategoryProvider, StorageResult, TransactionStorage};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when the database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// A stored income or expense, as listed by `lpf ledger list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub category_id: String,
    pub category_name: Option<String>,
    pub description: String,
    pub value: Decimal,
    pub date: NaiveDate,
    pub status: String,
    pub payment_method: Option<String>,
}

/// Income and expense totals for one month
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MonthTotals {
    pub year: i32,
    pub month: u32,
    pub incomes: Decimal,
    pub expenses: Decimal,
}

/// Ledger of categories, incomes and expenses in `ledger.duckdb`
pub struct DuckDbLedger {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl DuckDbLedger {
    /// Open the ledger, retrying with backoff while another process holds
    /// the file lock
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: db_path.to_path_buf(),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[lpf] Ledger busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow!("Failed to open ledger after {} retries", MAX_RETRIES)))
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
            db_path: PathBuf::from(":memory:"),
        })
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading off: cached extensions may fail code signing
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.conn.lock().unwrap();
        MigrationService::new(&conn, MIGRATIONS).run_pending()
    }

    /// Apply pending migrations and seed default categories into an empty ledger
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;

        let conn = self.conn.lock().unwrap();
        let existing: i64 = conn.query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))?;
        if existing == 0 {
            for (name, category_type) in DEFAULT_CATEGORIES {
                conn.execute(
                    "INSERT INTO categories (id, name, type, is_default) VALUES (?, ?, ?, TRUE)",
                    params![Uuid::new_v4().to_string(), *name, category_type.as_str()],
                )?;
            }
        }
        Ok(())
    }

    // === Category operations ===

    pub fn get_categories(&self) -> Result<Vec<Category>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, name, type, is_default FROM categories ORDER BY type, is_default DESC, name",
        )?;
        let categories = stmt
            .query_map([], |row| {
                let type_str: String = row.get(2)?;
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, type_str, row.get::<_, bool>(3)?))
            })?
            .filter_map(|r| r.ok())
            .filter_map(|(id, name, type_str, is_default)| {
                let category_type = CategoryType::from_str(&type_str).ok()?;
                Some(Category {
                    id,
                    name,
                    category_type,
                    is_default,
                })
            })
            .collect();
        Ok(categories)
    }

    pub fn add_category(&self, name: &str, category_type: CategoryType) -> Result<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(anyhow!("Category name cannot be empty"));
        }

        let conn = self.conn.lock().unwrap();
        let taken: i64 = conn.query_row(
            "SELECT COUNT(*) FROM categories WHERE lower(name) = lower(?) AND type = ?",
            params![name, category_type.as_str()],
            |row| row.get(0),
        )?;
        if taken > 0 {
            return Err(anyhow!("A {} category named '{}' already exists", category_type, name));
        }

        let category = Category::new(Uuid::new_v4().to_string(), name, category_type);
        conn.execute(
            "INSERT INTO categories (id, name, type, is_default) VALUES (?, ?, ?, FALSE)",
            params![&category.id, &category.name, category_type.as_str()],
        )?;
        Ok(category)
    }

    fn category_exists(conn: &Connection, id: &str) -> Result<bool> {
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM categories WHERE id = ?", [id], |row| row.get(0))?;
        Ok(count > 0)
    }

    // === Record operations ===

    pub fn insert_income(&self, income: &NewIncome) -> Result<String> {
        let conn = self.conn.lock().unwrap();
        if !Self::category_exists(&conn, &income.category_id)? {
            return Err(anyhow!("category {} does not exist", income.category_id));
        }

        let id = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO incomes (id, category_id, description, value, date, status, month, year)
             VALUES (?, ?, ?, CAST(? AS DECIMAL(18, 4)), CAST(? AS DATE), ?, ?, ?)",
            params![
                &id,
                &income.category_id,
                &income.description,
                income.value.to_string(),
                income.date.to_string(),
                income.status.as_str(),
                income.month() as i32,
                income.year(),
            ],
        )?;
        Ok(id)
    }

    pub fn insert_expense(&self, expense: &NewExpense) -> Result<String> {
        let conn = self.conn.lock().unwrap();
        if !Self::category_exists(&conn, &expense.category_id)? {
            return Err(anyhow!("category {} does not exist", expense.category_id));
        }

        let id = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO expenses (id, category_id, description, value, date, status,
                                   payment_method, installments, current_installment, month, year)
             VALUES (?, ?, ?, CAST(? AS DECIMAL(18, 4)), CAST(? AS DATE), ?, ?, 1, 1, ?, ?)",
            params![
                &id,
                &expense.category_id,
                &expense.description,
                expense.value.to_string(),
                expense.date.to_string(),
                expense.status.as_str(),
                expense.payment_method.as_str(),
                expense.month() as i32,
                expense.year(),
            ],
        )?;
        Ok(id)
    }

    /// Stored records, newest first, optionally limited to one month
    pub fn list_entries(&self, period: Option<(i32, u32)>) -> Result<Vec<LedgerEntry>> {
        let conn = self.conn.lock().unwrap();
        let filter: Vec<i64> = period
            .map(|(y, m)| vec![y as i64, m as i64])
            .unwrap_or_default();
        let where_clause = if filter.is_empty() {
            ""
        } else {
            "WHERE r.year = ? AND r.month = ?"
        };

        let mut stmt = conn.prepare(&format!(
            "SELECT r.id, r.kind, r.category_id, c.name, r.description, r.value::VARCHAR,
                    r.date::VARCHAR, r.status, r.payment_method
             FROM (
                 SELECT id, 'income' AS kind, category_id, description, value, date, status,
                        NULL AS payment_method, month, year, created_at
                 FROM incomes
                 UNION ALL
                 SELECT id, 'expense' AS kind, category_id, description, value, date, status,
                        payment_method, month, year, created_at
                 FROM expenses
             ) r
             LEFT JOIN categories c ON c.id = r.category_id
             {}
             ORDER BY r.date DESC, r.created_at DESC",
            where_clause
        ))?;

        let entries = stmt
            .query_map(duckdb::params_from_iter(filter), |row| {
                let kind: String = row.get(1)?;
                let value: String = row.get(5)?;
                let date: String = row.get(6)?;
                Ok(LedgerEntry {
                    id: row.get(0)?,
                    kind: TransactionKind::from_str(&kind).unwrap_or(TransactionKind::Expense),
                    category_id: row.get(2)?,
                    category_name: row.get(3)?,
                    description: row.get(4)?,
                    value: Decimal::from_str_exact(&value).unwrap_or_default(),
                    date: NaiveDate::parse_from_str(&date, "%Y-%m-%d").unwrap_or_default(),
                    status: row.get(7)?,
                    payment_method: row.get(8)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(entries)
    }

    /// Income and expense totals grouped by month, newest first
    pub fn month_totals(&self) -> Result<Vec<MonthTotals>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT year, month,
                    SUM(CASE WHEN kind = 'income' THEN value ELSE 0 END)::VARCHAR,
                    SUM(CASE WHEN kind = 'expense' THEN value ELSE 0 END)::VARCHAR
             FROM (
                 SELECT 'income' AS kind, value, month, year FROM incomes
                 UNION ALL
                 SELECT 'expense' AS kind, value, month, year FROM expenses
             )
             GROUP BY year, month
             ORDER BY year DESC, month DESC",
        )?;

        let totals = stmt
            .query_map([], |row| {
                let incomes: String = row.get(2)?;
                let expenses: String = row.get(3)?;
                Ok(MonthTotals {
                    year: row.get(0)?,
                    month: row.get::<_, i32>(1)? as u32,
                    incomes: Decimal::from_str_exact(&incomes).unwrap_or_default(),
                    expenses: Decimal::from_str_exact(&expenses).unwrap_or_default(),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(totals)
    }
}

impl TransactionStorage for DuckDbLedger {
    fn name(&self) -> &str {
        "local"
    }

    fn create_income(&self, income: &NewIncome) -> StorageResult<String> {
        self.insert_income(income)
            .map_err(|e| StorageError::Rejected(e.to_string()))
    }

    fn create_expense(&self, expense: &NewExpense) -> StorageResult<String> {
        self.insert_expense(expense)
            .map_err(|e| StorageError::Rejected(e.to_string()))
    }
}

impl CategoryProvider for DuckDbLedger {
    fn list_categories(&self) -> CoreResult<Vec<Category>> {
        self.get_categories()
            .map_err(|e| CoreError::database(e.to_string()))
    }
}
