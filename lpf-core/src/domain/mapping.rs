//! Column mapping domain model

use std::fmt;

use serde::{Deserialize, Serialize};

use super::result::MappingError;

/// Role a CSV column plays in a bank statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnRole {
    Date,
    Description,
    Value,
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnRole::Date => "date",
            ColumnRole::Description => "description",
            ColumnRole::Value => "value",
        };
        f.write_str(name)
    }
}

/// Column indices for date, description and value
///
/// Used both for the auto-detected guess (`detected_columns`) and for the
/// user-confirmed mapping. Indices may repeat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub date: Option<usize>,
    pub description: Option<usize>,
    pub value: Option<usize>,
}

/// A mapping with every role resolved to an in-range column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedMapping {
    pub date: usize,
    pub description: usize,
    pub value: usize,
}

impl ColumnMapping {
    pub fn new(date: usize, description: usize, value: usize) -> Self {
        Self {
            date: Some(date),
            description: Some(description),
            value: Some(value),
        }
    }

    pub fn get(&self, role: ColumnRole) -> Option<usize> {
        match role {
            ColumnRole::Date => self.date,
            ColumnRole::Description => self.description,
            ColumnRole::Value => self.value,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.date.is_some() && self.description.is_some() && self.value.is_some()
    }

    /// Fill unset roles from `fallback`; roles already set are never replaced.
    pub fn or(self, fallback: ColumnMapping) -> ColumnMapping {
        ColumnMapping {
            date: self.date.or(fallback.date),
            description: self.description.or(fallback.description),
            value: self.value.or(fallback.value),
        }
    }

    /// Check every role is set and addresses one of `width` columns
    pub fn resolve(&self, width: usize) -> Result<ResolvedMapping, MappingError> {
        let check = |role: ColumnRole| -> Result<usize, MappingError> {
            match self.get(role) {
                Some(i) if i < width => Ok(i),
                index => Err(MappingError::IncompleteMapping { role, index, width }),
            }
        };

        Ok(ResolvedMapping {
            date: check(ColumnRole::Date)?,
            description: check(ColumnRole::Description)?,
            value: check(ColumnRole::Value)?,
        })
    }
}
