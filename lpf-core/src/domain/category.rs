//! Category domain model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::transaction::TransactionKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryType {
    Income,
    Expense,
    Investment,
}

impl CategoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryType::Income => "income",
            CategoryType::Expense => "expense",
            CategoryType::Investment => "investment",
        }
    }

    /// Whether records of `kind` may be filed under this type
    pub fn accepts(&self, kind: TransactionKind) -> bool {
        matches!(
            (self, kind),
            (CategoryType::Income, TransactionKind::Income)
                | (CategoryType::Expense, TransactionKind::Expense)
        )
    }
}

impl From<TransactionKind> for CategoryType {
    fn from(kind: TransactionKind) -> Self {
        match kind {
            TransactionKind::Income => CategoryType::Income,
            TransactionKind::Expense => CategoryType::Expense,
        }
    }
}

impl fmt::Display for CategoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(CategoryType::Income),
            "expense" => Ok(CategoryType::Expense),
            "investment" => Ok(CategoryType::Investment),
            other => Err(format!("unknown category type: {}", other)),
        }
    }
}

/// A user category as exposed by the category collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub category_type: CategoryType,
    #[serde(default)]
    pub is_default: bool,
}

impl Category {
    pub fn new(id: impl Into<String>, name: impl Into<String>, category_type: CategoryType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category_type,
            is_default: false,
        }
    }
}

/// Categories every new ledger starts with
pub const DEFAULT_CATEGORIES: &[(&str, CategoryType)] = &[
    ("Salário", CategoryType::Income),
    ("Outras receitas", CategoryType::Income),
    ("Contas de casa", CategoryType::Expense),
    ("Transportes", CategoryType::Expense),
    ("Mercado", CategoryType::Expense),
    ("Lazer", CategoryType::Expense),
    ("Diversão", CategoryType::Expense),
    ("Pessoais", CategoryType::Expense),
    ("Pet", CategoryType::Expense),
    ("Carro", CategoryType::Expense),
    ("Investimentos", CategoryType::Investment),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_matching_kind_only() {
        assert!(CategoryType::Income.accepts(TransactionKind::Income));
        assert!(!CategoryType::Income.accepts(TransactionKind::Expense));
        assert!(!CategoryType::Investment.accepts(TransactionKind::Expense));
    }

    #[test]
    fn test_category_wire_format() {
        let json = r#"{"id": "abc", "name": "Mercado", "type": "expense", "user_id": "u1", "is_default": true}"#;
        let category: Category = serde_json::from_str(json).unwrap();
        assert_eq!(category.category_type, CategoryType::Expense);
        assert!(category.is_default);
    }
}
