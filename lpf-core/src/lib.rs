//! LP Finanças core - bank-statement CSV import
//!
//! Hexagonal layout:
//!
//! - **domain**: tables, mappings, transactions, records, categories, errors
//! - **ports**: storage, category and notifier traits
//! - **services**: parser, normalizer, review session, reconciler, import façade
//! - **adapters**: REST API client, DuckDB ledger, in-memory storage

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::api::LpfApiClient;
use adapters::duckdb::DuckDbLedger;
use adapters::memory::InMemoryStorage;
use config::{Config, StorageBackend};
use ports::{CategoryProvider, Notifier, SilentNotifier, TransactionStorage};
use services::{ImportService, Reconciler};

pub use domain::result::{Error, ImportResult};
pub use domain::{
    Category, CategoryType, ColumnMapping, ImportRequest, ImportTransaction,
    NormalizedTransaction, ParsedCsv, TransactionKind,
};

pub const LEDGER_FILE: &str = "ledger.duckdb";

/// Main context for LP Finanças operations
///
/// Wires configuration, the selected storage backend and the import service.
pub struct LpfContext {
    pub config: Config,
    pub data_dir: PathBuf,
    /// Present when the local backend is selected
    pub ledger: Option<Arc<DuckDbLedger>>,
    pub storage: Arc<dyn TransactionStorage>,
    pub categories: Arc<dyn CategoryProvider>,
    pub import_service: ImportService,
}

impl LpfContext {
    /// Context whose import notices are discarded
    pub fn new(data_dir: &Path) -> Result<Self> {
        Self::with_notifier(data_dir, Arc::new(SilentNotifier))
    }

    pub fn with_notifier(data_dir: &Path, notifier: Arc<dyn Notifier>) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;
        let config = Config::load(data_dir)?;

        let (ledger, storage, categories): (
            Option<Arc<DuckDbLedger>>,
            Arc<dyn TransactionStorage>,
            Arc<dyn CategoryProvider>,
        ) = match config.storage.backend {
            StorageBackend::Local => {
                let ledger = Arc::new(DuckDbLedger::new(&data_dir.join(LEDGER_FILE))?);
                ledger.ensure_schema()?;
                let storage: Arc<dyn TransactionStorage> = ledger.clone();
                let categories: Arc<dyn CategoryProvider> = ledger.clone();
                (Some(ledger), storage, categories)
            }
            StorageBackend::Api => {
                let url = config.storage.api_url.as_deref().with_context(|| {
                    format!(
                        "storage.apiUrl is not set in settings.json (or {})",
                        crate::config::API_URL_ENV
                    )
                })?;
                let client = Arc::new(LpfApiClient::new(url, config.storage.api_token.as_deref())?);
                let storage: Arc<dyn TransactionStorage> = client.clone();
                let categories: Arc<dyn CategoryProvider> = client;
                (None, storage, categories)
            }
        };

        let import_service = ImportService::new(
            Reconciler::new(storage.clone(), categories.clone(), config.import.defaults),
            notifier,
            data_dir.to_path_buf(),
            config.import.preview_rows,
        );

        Ok(Self {
            config,
            data_dir: data_dir.to_path_buf(),
            ledger,
            storage,
            categories,
            import_service,
        })
    }

    /// Import service that records creates in memory instead of storing them
    ///
    /// Categories still come from the configured backend.
    pub fn dry_run_service(&self, notifier: Arc<dyn Notifier>) -> (ImportService, Arc<InMemoryStorage>) {
        let storage = Arc::new(InMemoryStorage::new());
        let service = ImportService::new(
            Reconciler::new(storage.clone(), self.categories.clone(), self.config.import.defaults),
            notifier,
            self.data_dir.clone(),
            self.config.import.preview_rows,
        );
        (service, storage)
    }
}
