//! Storage ports - where imported records end up
//!
//! Implementations talk to the LP Finanças backend, the local ledger, or
//! keep everything in memory for dry runs.

use crate::domain::result::{Result, StorageError};
use crate::domain::{Category, NewExpense, NewIncome};

/// Result of a single create call: the new record's identifier
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Transaction storage collaborator
///
/// Each call creates exactly one record. Callers treat
/// [`StorageError::Unavailable`] as a failure of the whole import and
/// [`StorageError::Rejected`] as a failure of that record only.
pub trait TransactionStorage: Send + Sync {
    /// Backend name (e.g., "api", "local", "memory")
    fn name(&self) -> &str;

    /// Create an income record
    fn create_income(&self, income: &NewIncome) -> StorageResult<String>;

    /// Create an expense record
    fn create_expense(&self, expense: &NewExpense) -> StorageResult<String>;
}

/// Read-only category lookup
pub trait CategoryProvider: Send + Sync {
    /// All categories visible to the current user
    fn list_categories(&self) -> Result<Vec<Category>>;
}
