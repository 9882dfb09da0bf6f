//! Statement transaction domain model

use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;

/// Whether a statement row becomes an income or an expense record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    /// Zero classifies as income; zero-valued rows never leave the normalizer.
    pub fn from_value(value: Decimal) -> Self {
        if value >= Decimal::ZERO {
            TransactionKind::Income
        } else {
            TransactionKind::Expense
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            TransactionKind::Income => TransactionKind::Expense,
            TransactionKind::Expense => TransactionKind::Income,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" | "receita" | "entrada" => Ok(TransactionKind::Income),
            "expense" | "despesa" | "saida" | "saída" => Ok(TransactionKind::Expense),
            other => Err(format!("unknown transaction type: {}", other)),
        }
    }
}

/// A statement row that passed normalization, editable during review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedTransaction {
    /// Position in the filtered sequence, stable for the review session
    pub id: usize,
    /// Passed through verbatim from the statement
    pub date: String,
    pub description: String,
    #[serde(with = "amount")]
    pub value: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub selected: bool,
}

/// One row of an import submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportTransaction {
    pub date: String,
    pub description: String,
    /// Only the magnitude is persisted; the sign is carried by `kind`
    #[serde(with = "amount")]
    pub value: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
}

impl ImportTransaction {
    pub fn magnitude(&self) -> Decimal {
        self.value.abs()
    }
}

impl From<&NormalizedTransaction> for ImportTransaction {
    fn from(tx: &NormalizedTransaction) -> Self {
        Self {
            date: tx.date.clone(),
            description: tx.description.clone(),
            value: tx.value.abs(),
            kind: tx.kind,
            category_id: None,
        }
    }
}

/// Import submission endpoint request body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRequest {
    pub transactions: Vec<ImportTransaction>,
    #[serde(default)]
    pub default_category_id: Option<String>,
}

/// Amounts travel as JSON numbers; strings holding a number are accepted too.
mod amount {
    use super::*;

    pub fn serialize<S>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value.to_f64() {
            Some(f) => serializer.serialize_f64(f),
            None => serializer.serialize_str(&value.to_string()),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;
        let value: JsonValue = Deserialize::deserialize(deserializer)?;
        match value {
            JsonValue::Number(n) => Decimal::from_str(&n.to_string())
                .or_else(|_| Decimal::from_scientific(&n.to_string()))
                .map_err(|e| D::Error::custom(format!("invalid amount: {}", e))),
            JsonValue::String(s) => Decimal::from_str(s.trim())
                .map_err(|e| D::Error::custom(format!("invalid amount '{}': {}", s, e))),
            _ => Err(D::Error::custom("expected number or string for value")),
        }
    }
}
