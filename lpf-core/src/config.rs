//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "storage": { "backend": "api", "apiUrl": "http://localhost:8000", "apiToken": "..." },
//!   "import": { "previewRows": 10, "expenseStatus": "paid", "profiles": { ... } }
//! }
//! ```
//! Unknown sections are preserved when saving.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::ColumnMapping;
use crate::services::parser::DEFAULT_PREVIEW_ROWS;
use crate::services::reconciler::RecordDefaults;

pub const SETTINGS_FILE: &str = "settings.json";

/// Environment variables overriding the settings file
pub const STORAGE_ENV: &str = "LPF_STORAGE";
pub const API_URL_ENV: &str = "LPF_API_URL";
pub const API_TOKEN_ENV: &str = "LPF_API_TOKEN";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// LP Finanças REST API
    Api,
    /// ledger.duckdb in the data directory
    #[default]
    Local,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Api => f.write_str("api"),
            StorageBackend::Local => f.write_str("local"),
        }
    }
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "api" => Ok(StorageBackend::Api),
            "local" => Ok(StorageBackend::Local),
            other => anyhow::bail!("Unknown storage backend '{}' (expected api or local)", other),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
}

fn default_preview_rows() -> usize {
    DEFAULT_PREVIEW_ROWS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSettings {
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
    #[serde(flatten)]
    pub defaults: RecordDefaults,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_category_id: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, ImportProfile>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            preview_rows: DEFAULT_PREVIEW_ROWS,
            defaults: RecordDefaults::default(),
            default_category_id: None,
            profiles: BTreeMap::new(),
        }
    }
}

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    storage: StorageSettings,
    #[serde(default)]
    import: ImportSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Effective configuration: settings file plus environment overrides
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub storage: StorageSettings,
    pub import: ImportSettings,
}

impl Config {
    /// Load config from the data directory, applying environment overrides
    pub fn load(data_dir: &Path) -> Result<Self> {
        let mut config = Self::load_file(data_dir)?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Load settings.json only; a missing file gives defaults
    pub fn load_file(data_dir: &Path) -> Result<Self> {
        let raw = read_settings(data_dir)?;
        Ok(Self {
            storage: raw.storage,
            import: raw.import,
        })
    }

    /// Apply `LPF_STORAGE`, `LPF_API_URL` and `LPF_API_TOKEN` as looked up by `lookup`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(backend) = lookup(STORAGE_ENV).filter(|v| !v.is_empty()) {
            self.storage.backend = backend
                .parse()
                .with_context(|| format!("Invalid {}", STORAGE_ENV))?;
        }
        if let Some(url) = lookup(API_URL_ENV).filter(|v| !v.is_empty()) {
            self.storage.api_url = Some(url);
        }
        if let Some(token) = lookup(API_TOKEN_ENV).filter(|v| !v.is_empty()) {
            self.storage.api_token = Some(token);
        }
        Ok(())
    }

    /// Write the managed sections back, keeping everything else in the file
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let mut settings = read_settings(data_dir)?;
        settings.storage = self.storage.clone();
        settings.import = self.import.clone();

        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create {}", data_dir.display()))?;
        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(data_dir.join(SETTINGS_FILE), content)
            .context("Failed to write settings.json")?;
        Ok(())
    }
}

fn read_settings(data_dir: &Path) -> Result<SettingsFile> {
    let settings_path = data_dir.join(SETTINGS_FILE);
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&settings_path)
        .with_context(|| format!("Failed to read {}", settings_path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid settings file {}", settings_path.display()))
}

/// Saved column choice for a bank's statement layout, by header name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportProfile {
    pub column_mappings: ProfileColumns,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileColumns {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

impl ImportProfile {
    /// Capture `mapping` as header names of `headers`
    pub fn from_mapping(headers: &[String], mapping: &ColumnMapping) -> Self {
        let name = |index: Option<usize>| index.and_then(|i| headers.get(i)).cloned();
        Self {
            column_mappings: ProfileColumns {
                date: name(mapping.date),
                description: name(mapping.description),
                value: name(mapping.value),
            },
        }
    }

    /// Resolve header names against `headers`; names not found stay unset
    pub fn to_mapping(&self, headers: &[String]) -> ColumnMapping {
        let find = |name: &Option<String>| {
            let name = name.as_deref()?.trim();
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        ColumnMapping {
            date: find(&self.column_mappings.date),
            description: find(&self.column_mappings.description),
            value: find(&self.column_mappings.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExpenseStatus, PaymentMethod};
    use tempfile::tempdir;

    fn headers() -> Vec<String> {
        vec!["Data".into(), "Histórico".into(), "Valor (R$)".into()]
    }

    #[test]
    fn test_defaults_without_file() {
        let dir = tempdir().unwrap();
        let config = Config::load_file(dir.path()).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Local);
        assert_eq!(config.import.preview_rows, 10);
        assert_eq!(config.import.defaults.expense_status, ExpenseStatus::Paid);
    }

    #[test]
    fn test_reads_camel_case_file() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{
                "storage": {"backend": "api", "apiUrl": "http://localhost:8000"},
                "import": {"previewRows": 5, "paymentMethod": "credit", "defaultCategoryId": "c1"}
            }"#,
        )
        .unwrap();

        let config = Config::load_file(dir.path()).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Api);
        assert_eq!(config.storage.api_url.as_deref(), Some("http://localhost:8000"));
        assert_eq!(config.import.preview_rows, 5);
        assert_eq!(config.import.defaults.payment_method, PaymentMethod::Credit);
        assert_eq!(config.import.default_category_id.as_deref(), Some("c1"));
    }

    #[test]
    fn test_save_preserves_unknown_sections() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"theme": {"dark": true}, "import": {"previewRows": 3}}"#,
        )
        .unwrap();

        let mut config = Config::load_file(dir.path()).unwrap();
        config.import.profiles.insert(
            "itau".into(),
            ImportProfile::from_mapping(&headers(), &ColumnMapping::new(0, 1, 2)),
        );
        config.save(dir.path()).unwrap();

        let content = std::fs::read_to_string(dir.path().join(SETTINGS_FILE)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(json["theme"]["dark"], true);
        assert_eq!(json["import"]["previewRows"], 3);
        assert_eq!(json["import"]["profiles"]["itau"]["columnMappings"]["value"], "Valor (R$)");

        let reloaded = Config::load_file(dir.path()).unwrap();
        assert_eq!(reloaded.import.profiles.len(), 1);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "{ not json").unwrap();
        assert!(Config::load_file(dir.path()).is_err());
    }

    #[test]
    fn test_environment_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(|name| match name {
                STORAGE_ENV => Some("API".into()),
                API_URL_ENV => Some("https://lpf.example.com".into()),
                API_TOKEN_ENV => Some(String::new()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Api);
        assert_eq!(config.storage.api_url.as_deref(), Some("https://lpf.example.com"));
        assert_eq!(config.storage.api_token, None);

        let mut bad = Config::default();
        assert!(bad
            .apply_overrides(|name| (name == STORAGE_ENV).then(|| "cloud".to_string()))
            .is_err());
    }

    #[test]
    fn test_profile_resolves_by_header_name() {
        let profile = ImportProfile::from_mapping(&headers(), &ColumnMapping::new(0, 1, 2));
        let reordered: Vec<String> = vec!["valor (r$)".into(), "DATA".into(), "Saldo".into()];
        let mapping = profile.to_mapping(&reordered);
        assert_eq!(mapping.date, Some(1));
        assert_eq!(mapping.value, Some(0));
        assert_eq!(mapping.description, None);
    }
}
