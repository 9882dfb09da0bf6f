//! Income and expense records handed to storage

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncomeStatus {
    Pending,
    #[default]
    Received,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseStatus {
    Pending,
    #[default]
    Paid,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    #[default]
    Debit,
    Credit,
}

impl IncomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncomeStatus::Pending => "pending",
            IncomeStatus::Received => "received",
        }
    }
}

impl ExpenseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseStatus::Pending => "pending",
            ExpenseStatus::Paid => "paid",
        }
    }
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Debit => "debit",
            PaymentMethod::Credit => "credit",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "debit" => Ok(PaymentMethod::Debit),
            "credit" => Ok(PaymentMethod::Credit),
            other => Err(format!("unknown payment method: {}", other)),
        }
    }
}

/// Income to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIncome {
    pub category_id: String,
    pub description: String,
    /// Always positive
    pub value: Decimal,
    pub date: NaiveDate,
    pub status: IncomeStatus,
}

/// Expense to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExpense {
    pub category_id: String,
    pub description: String,
    /// Always positive
    pub value: Decimal,
    pub date: NaiveDate,
    pub status: ExpenseStatus,
    pub payment_method: PaymentMethod,
}

impl NewIncome {
    pub fn month(&self) -> u32 {
        self.date.month()
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }
}

impl NewExpense {
    pub fn month(&self) -> u32 {
        self.date.month()
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_statement_import() {
        assert_eq!(IncomeStatus::default(), IncomeStatus::Received);
        assert_eq!(ExpenseStatus::default(), ExpenseStatus::Paid);
        assert_eq!(PaymentMethod::default(), PaymentMethod::Debit);
    }

    #[test]
    fn test_month_and_year_follow_date() {
        let expense = NewExpense {
            category_id: "c1".to_string(),
            description: "Mercado".to_string(),
            value: Decimal::new(1000, 2),
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            status: ExpenseStatus::Paid,
            payment_method: PaymentMethod::Debit,
        };
        assert_eq!(expense.month(), 5);
        assert_eq!(expense.year(), 2024);
    }

    #[test]
    fn test_payment_method_round_trips_through_str() {
        for method in [PaymentMethod::Cash, PaymentMethod::Debit, PaymentMethod::Credit] {
            assert_eq!(method.as_str().parse::<PaymentMethod>(), Ok(method));
        }
    }
}
