//! Core domain entities
//!
//! Pure data structures for the import pipeline - no I/O.

mod category;
mod mapping;
mod record;
pub mod result;
mod table;
mod transaction;

pub use category::{Category, CategoryType, DEFAULT_CATEGORIES};
pub use mapping::{ColumnMapping, ColumnRole, ResolvedMapping};
pub use record::{ExpenseStatus, IncomeStatus, NewExpense, NewIncome, PaymentMethod};
pub use table::{ParsedCsv, RawTable};
pub use transaction::{ImportRequest, ImportTransaction, NormalizedTransaction, TransactionKind};
