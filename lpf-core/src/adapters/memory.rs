//! In-memory storage for dry runs

use std::sync::Mutex;

use crate::domain::result::{Result, StorageError};
use crate::domain::{Category, NewExpense, NewIncome};
use crate::ports::{CategoryProvider, StorageResult, TransactionStorage};

/// Keeps created records in memory; nothing is persisted
///
/// Categories are whatever the caller seeds. When `fail_on` is set, the
/// n-th create call (1-based) returns that error instead.
#[derive(Default)]
pub struct InMemoryStorage {
    incomes: Mutex<Vec<NewIncome>>,
    expenses: Mutex<Vec<NewExpense>>,
    categories: Vec<Category>,
    calls: Mutex<usize>,
    fail_on: Option<(usize, StorageError)>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_categories(categories: Vec<Category>) -> Self {
        Self {
            categories,
            ..Self::default()
        }
    }

    /// Fail the `call`-th create with `error`
    pub fn failing_on(mut self, call: usize, error: StorageError) -> Self {
        self.fail_on = Some((call, error));
        self
    }

    pub fn incomes(&self) -> Vec<NewIncome> {
        self.incomes.lock().unwrap().clone()
    }

    pub fn expenses(&self) -> Vec<NewExpense> {
        self.expenses.lock().unwrap().clone()
    }

    /// Number of create calls received, failed ones included
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    fn next_call(&self) -> StorageResult<usize> {
        let mut calls = self.calls.lock().unwrap();
        *calls += 1;
        match &self.fail_on {
            Some((n, error)) if *n == *calls => Err(error.clone()),
            _ => Ok(*calls),
        }
    }
}

impl TransactionStorage for InMemoryStorage {
    fn name(&self) -> &str {
        "memory"
    }

    fn create_income(&self, income: &NewIncome) -> StorageResult<String> {
        let call = self.next_call()?;
        self.incomes.lock().unwrap().push(income.clone());
        Ok(format!("income-{}", call))
    }

    fn create_expense(&self, expense: &NewExpense) -> StorageResult<String> {
        let call = self.next_call()?;
        self.expenses.lock().unwrap().push(expense.clone());
        Ok(format!("expense-{}", call))
    }
}

impl CategoryProvider for InMemoryStorage {
    fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self.categories.clone())
    }
}
