//! Import reconciler - persists reviewed transactions one row at a time

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::result::{ImportResult, StorageError};
use crate::domain::{
    Category, ExpenseStatus, ImportRequest, ImportTransaction, IncomeStatus, NewExpense, NewIncome,
    PaymentMethod, TransactionKind,
};
use crate::ports::{CategoryProvider, TransactionStorage};

/// Field values applied to every created record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDefaults {
    #[serde(default)]
    pub income_status: IncomeStatus,
    #[serde(default)]
    pub expense_status: ExpenseStatus,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

/// Why a row was not persisted
enum RowFailure {
    /// Only this row is affected
    Row(String),
    /// Later rows would fail the same way
    Systemic(String),
}

impl From<StorageError> for RowFailure {
    fn from(error: StorageError) -> Self {
        if error.is_systemic() {
            RowFailure::Systemic(error.to_string())
        } else {
            RowFailure::Row(error.to_string())
        }
    }
}

/// Parse a statement date for storage
///
/// Accepts day-first (`01/05/2024`, `01-05-2024`, `01.05.2024`, `01/05/24`)
/// and year-first (`2024-05-01`, `2024/05/01`) dates. Anything after the
/// first whitespace or a `T` is ignored.
pub fn parse_statement_date(raw: &str) -> Option<NaiveDate> {
    let token = raw.split_whitespace().next()?;
    let token = token.split('T').next()?;

    let segments: Vec<&str> = token.split(['/', '-', '.']).collect();
    if segments.len() != 3 {
        return None;
    }

    let formats: &[&str] = match (segments[0].len(), segments[2].len()) {
        (4, _) => &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"],
        (_, 4) => &["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"],
        (_, 2) => &["%d/%m/%y", "%d-%m-%y", "%d.%m.%y"],
        _ => return None,
    };

    formats
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(token, format).ok())
}

/// `row 2 (01/05/2024 "Mercado"): reason`, rows counted from 1
fn row_error(index: usize, tx: &ImportTransaction, reason: &str) -> String {
    format!(
        "row {} ({} \"{}\"): {}",
        index + 1,
        tx.date,
        tx.description,
        reason
    )
}

pub struct Reconciler {
    storage: Arc<dyn TransactionStorage>,
    categories: Arc<dyn CategoryProvider>,
    defaults: RecordDefaults,
}

impl Reconciler {
    pub fn new(
        storage: Arc<dyn TransactionStorage>,
        categories: Arc<dyn CategoryProvider>,
        defaults: RecordDefaults,
    ) -> Self {
        Self {
            storage,
            categories,
            defaults,
        }
    }

    pub fn storage_name(&self) -> &str {
        self.storage.name()
    }

    /// Persist every transaction of `request`, in order
    ///
    /// A row that fails is reported in `errors` and the next row is tried.
    /// `success` turns false only when the request cannot be processed: the
    /// category lookup fails, the default category does not exist, or the
    /// storage becomes unavailable (remaining rows are then skipped).
    pub fn import(&self, request: &ImportRequest) -> ImportResult {
        let mut result = ImportResult {
            success: true,
            ..ImportResult::default()
        };
        if request.transactions.is_empty() {
            return result;
        }

        let needs_lookup = request.default_category_id.is_some()
            || request.transactions.iter().any(|t| t.category_id.is_none());
        let categories = if needs_lookup {
            match self.categories.list_categories() {
                Ok(categories) => categories,
                Err(e) => return ImportResult::rejected(format!("category lookup failed: {}", e)),
            }
        } else {
            Vec::new()
        };

        let default_category = match &request.default_category_id {
            Some(id) => match categories.iter().find(|c| &c.id == id) {
                Some(category) => Some(category),
                None => {
                    return ImportResult::rejected(format!("default category {} does not exist", id))
                }
            },
            None => None,
        };

        let total = request.transactions.len();
        for (index, tx) in request.transactions.iter().enumerate() {
            match self.import_row(tx, default_category, &categories) {
                Ok(TransactionKind::Income) => {
                    result.total_imported += 1;
                    result.imported_incomes += 1;
                }
                Ok(TransactionKind::Expense) => {
                    result.total_imported += 1;
                    result.imported_expenses += 1;
                }
                Err(RowFailure::Row(reason)) => {
                    result.errors.push(row_error(index, tx, &reason));
                }
                Err(RowFailure::Systemic(reason)) => {
                    result.errors.push(row_error(index, tx, &reason));
                    let remaining = total - index - 1;
                    if remaining > 0 {
                        result
                            .errors
                            .push(format!("import stopped: {} rows not attempted", remaining));
                    }
                    result.success = false;
                    break;
                }
            }
        }

        result
    }

    /// Row category, then a matching default, then the first category of the row's kind
    fn resolve_category(
        tx: &ImportTransaction,
        default_category: Option<&Category>,
        categories: &[Category],
    ) -> Option<String> {
        if let Some(id) = &tx.category_id {
            return Some(id.clone());
        }
        if let Some(category) = default_category.filter(|c| c.category_type.accepts(tx.kind)) {
            return Some(category.id.clone());
        }
        categories
            .iter()
            .find(|c| c.category_type.accepts(tx.kind))
            .map(|c| c.id.clone())
    }

    fn import_row(
        &self,
        tx: &ImportTransaction,
        default_category: Option<&Category>,
        categories: &[Category],
    ) -> Result<TransactionKind, RowFailure> {
        let value = tx.magnitude();
        if value == Decimal::ZERO {
            return Err(RowFailure::Row("value must be greater than zero".to_string()));
        }

        let description = tx.description.trim();
        if description.is_empty() {
            return Err(RowFailure::Row("description is empty".to_string()));
        }

        let date = parse_statement_date(&tx.date)
            .ok_or_else(|| RowFailure::Row(format!("unrecognized date '{}'", tx.date)))?;

        let category_id = Self::resolve_category(tx, default_category, categories)
            .ok_or_else(|| RowFailure::Row(format!("no {} category available", tx.kind)))?;

        match tx.kind {
            TransactionKind::Income => {
                self.storage.create_income(&NewIncome {
                    category_id,
                    description: description.to_string(),
                    value,
                    date,
                    status: self.defaults.income_status,
                })?;
            }
            TransactionKind::Expense => {
                self.storage.create_expense(&NewExpense {
                    category_id,
                    description: description.to_string(),
                    value,
                    date,
                    status: self.defaults.expense_status,
                    payment_method: self.defaults.payment_method,
                })?;
            }
        }

        Ok(tx.kind)
    }
}
