//! LP Finanças REST API client
//!
//! Creates incomes and expenses through the backend and reads the user's
//! categories. Bodies follow the backend's income/expense create schemas.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::{Client, Response};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use url::Url;

use crate::domain::result::{Error as DomainError, Result as DomainResult, StorageError};
use crate::domain::{Category, NewExpense, NewIncome};
use crate::ports::{CategoryProvider, StorageResult, TransactionStorage};

/// Request timeout for every call
const TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
struct IncomeBody<'a> {
    category_id: &'a str,
    description: &'a str,
    value: f64,
    date: String,
    status: &'static str,
    month: u32,
    year: i32,
}

#[derive(Debug, Serialize)]
struct ExpenseBody<'a> {
    category_id: &'a str,
    description: &'a str,
    value: f64,
    date: String,
    status: &'static str,
    payment_method: &'static str,
    installments: u32,
    current_installment: u32,
    month: u32,
    year: i32,
}

/// Created record as returned by the backend; only the id matters here
#[derive(Debug, Deserialize)]
struct CreatedRecord {
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    id: Option<String>,
}

/// Deserialize an id that can be a number or a string
fn deserialize_optional_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<JsonValue> = Option::deserialize(deserializer)?;
    match value {
        Some(JsonValue::Number(n)) => Ok(Some(n.to_string())),
        Some(JsonValue::String(s)) => Ok(Some(s)),
        Some(JsonValue::Null) | None => Ok(None),
        _ => Err(D::Error::custom("expected number or string for id")),
    }
}

fn as_float(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

/// LP Finanças API client
#[derive(Debug)]
pub struct LpfApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl LpfApiClient {
    /// Create a client for `base_url` (e.g. `http://localhost:8000`)
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .with_context(|| format!("Invalid API URL '{}'", base_url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            anyhow::bail!("API URL must use http or https, got '{}'", parsed.scheme());
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()).map(str::to_string),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorized(&self, builder: reqwest::blocking::RequestBuilder) -> reqwest::blocking::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Fetch the user's categories
    pub fn get_categories(&self) -> Result<Vec<Category>> {
        let url = format!("{}/api/categories", self.base_url);
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .map_err(|e| anyhow::anyhow!(map_request_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Category lookup failed: {}", error_detail(response));
        }

        response
            .json()
            .context("Failed to parse categories response")
    }

    fn post_record<T: Serialize>(&self, path: &str, body: &T) -> StorageResult<String> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .authorized(self.client.post(&url))
            .json(body)
            .send()
            .map_err(|e| StorageError::Unavailable(map_request_error(&e)))?;

        let status = response.status().as_u16();
        match status {
            // The record exists once the backend answers 2xx, even without a readable id
            200..=299 => Ok(response
                .json::<CreatedRecord>()
                .ok()
                .and_then(|created| created.id)
                .unwrap_or_default()),
            401 | 403 => Err(StorageError::Unavailable(format!(
                "authentication failed (HTTP {}); check the API token",
                status
            ))),
            502..=504 => Err(StorageError::Unavailable(error_detail(response))),
            _ => Err(StorageError::Rejected(error_detail(response))),
        }
    }
}

/// User-facing text for a transport failure
fn map_request_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("request timed out after {} seconds", TIMEOUT_SECS)
    } else if error.is_connect() {
        "unable to connect to the LP Finanças API".to_string()
    } else {
        format!("request failed: {}", error)
    }
}

/// Pull the backend's `detail` out of an error response
fn error_detail(response: Response) -> String {
    let status = response.status().as_u16();
    let body: Option<JsonValue> = response.json().ok();

    let detail = match body.as_ref().and_then(|b| b.get("detail")) {
        Some(JsonValue::String(s)) => Some(s.clone()),
        Some(JsonValue::Array(items)) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(JsonValue::as_str))
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        _ => None,
    };

    match detail {
        Some(detail) => format!("HTTP {}: {}", status, detail),
        None => format!("HTTP {}", status),
    }
}

impl TransactionStorage for LpfApiClient {
    fn name(&self) -> &str {
        "api"
    }

    fn create_income(&self, income: &NewIncome) -> StorageResult<String> {
        self.post_record(
            "/api/incomes",
            &IncomeBody {
                category_id: &income.category_id,
                description: &income.description,
                value: as_float(income.value),
                date: income.date.to_string(),
                status: income.status.as_str(),
                month: income.month(),
                year: income.year(),
            },
        )
    }

    fn create_expense(&self, expense: &NewExpense) -> StorageResult<String> {
        self.post_record(
            "/api/expenses",
            &ExpenseBody {
                category_id: &expense.category_id,
                description: &expense.description,
                value: as_float(expense.value),
                date: expense.date.to_string(),
                status: expense.status.as_str(),
                payment_method: expense.payment_method.as_str(),
                installments: 1,
                current_installment: 1,
                month: expense.month(),
                year: expense.year(),
            },
        )
    }
}

impl CategoryProvider for LpfApiClient {
    fn list_categories(&self) -> DomainResult<Vec<Category>> {
        self.get_categories()
            .map_err(|e| DomainError::Storage(StorageError::Unavailable(e.to_string())))
    }
}
