//! Result and error types for the core library

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::mapping::ColumnRole;

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Could not process file: {0}")]
    Parse(#[from] ParseError),

    #[error("Invalid column mapping: {0}")]
    Mapping(#[from] MappingError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Raw upload could not be tabulated
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty or malformed input")]
    EmptyOrMalformedInput,
}

/// Column mapping rejected before any row is processed
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingError {
    #[error("{}", incomplete_message(.role, .index, .width))]
    IncompleteMapping {
        role: ColumnRole,
        /// The offending index, `None` when the role was never mapped
        index: Option<usize>,
        width: usize,
    },
}

fn incomplete_message(role: &ColumnRole, index: &Option<usize>, width: &usize) -> String {
    match index {
        None => format!("{} column is not mapped", role),
        Some(i) => format!(
            "{} column {} is out of range (file has {} columns)",
            role, i, width
        ),
    }
}

/// Failure reported by a transaction storage collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The collaborator cannot be reached at all; later rows would fail too
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// This single record was refused
    #[error("{0}")]
    Rejected(String),
}

impl StorageError {
    pub fn is_systemic(&self) -> bool {
        matches!(self, StorageError::Unavailable(_))
    }
}

/// Outcome of an import submission
///
/// `success` stays true when individual rows failed; it only turns false
/// when the request could not be processed as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub success: bool,
    pub total_imported: usize,
    pub imported_incomes: usize,
    pub imported_expenses: usize,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl ImportResult {
    /// A request that was rejected before any row was attempted
    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            errors: vec![error.into()],
            ..Self::default()
        }
    }

    pub fn is_partial(&self) -> bool {
        self.success && !self.errors.is_empty()
    }
}

impl fmt::Display for ImportResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} imported ({} incomes, {} expenses), {} errors",
            self.total_imported,
            self.imported_incomes,
            self.imported_expenses,
            self.errors.len()
        )
    }
}
