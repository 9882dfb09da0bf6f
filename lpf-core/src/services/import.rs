//! Import service - statement upload, submission and saved profiles

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::config::{Config, ImportProfile};
use crate::domain::result::{ImportResult, Result as DomainResult};
use crate::domain::{ColumnMapping, ImportRequest};
use crate::ports::Notifier;
use crate::services::reconciler::Reconciler;
use crate::services::session::UploadedStatement;

pub struct ImportService {
    reconciler: Reconciler,
    notifier: Arc<dyn Notifier>,
    data_dir: PathBuf,
    preview_rows: usize,
}

impl ImportService {
    pub fn new(
        reconciler: Reconciler,
        notifier: Arc<dyn Notifier>,
        data_dir: PathBuf,
        preview_rows: usize,
    ) -> Self {
        Self {
            reconciler,
            notifier,
            data_dir,
            preview_rows,
        }
    }

    pub fn storage_name(&self) -> &str {
        self.reconciler.storage_name()
    }

    /// Upload entry point: tabulate raw CSV text and guess its columns
    pub fn parse_csv(&self, text: &str) -> DomainResult<UploadedStatement> {
        UploadedStatement::parse(text, self.preview_rows)
    }

    /// Import submission endpoint
    ///
    /// The notifier gets a success notice, a warning for partial imports,
    /// or an error when the request failed.
    pub fn submit(&self, request: &ImportRequest) -> ImportResult {
        let result = self.import(request);
        self.notify(&result);
        result
    }

    /// Submission from a JSON body; an undecodable body fails the request
    pub fn submit_json(&self, body: &str) -> ImportResult {
        let result = self.import_json(body);
        self.notify(&result);
        result
    }

    /// Run the reconciler without emitting a notice
    pub fn import(&self, request: &ImportRequest) -> ImportResult {
        self.reconciler.import(request)
    }

    pub fn import_json(&self, body: &str) -> ImportResult {
        match serde_json::from_str::<ImportRequest>(body) {
            Ok(request) => self.import(&request),
            Err(e) => ImportResult::rejected(format!("invalid import request: {}", e)),
        }
    }

    /// Report the outcome of an import to the notifier
    pub fn notify(&self, result: &ImportResult) {
        if !result.success {
            let reason = result.errors.first().map(String::as_str).unwrap_or("unknown error");
            self.notifier.error(&format!("Import failed: {}", reason));
        } else if result.is_partial() {
            self.notifier.warning(&format!(
                "{} transactions imported, {} failed",
                result.total_imported,
                result.errors.len()
            ));
        } else if result.total_imported == 0 {
            self.notifier.warning("No transactions to import");
        } else {
            self.notifier.success(&format!(
                "{} transactions imported ({} incomes, {} expenses)",
                result.total_imported, result.imported_incomes, result.imported_expenses
            ));
        }
    }

    // === Profiles ===

    pub fn list_profiles(&self) -> Result<BTreeMap<String, ImportProfile>> {
        Ok(Config::load_file(&self.data_dir)?.import.profiles)
    }

    pub fn get_profile(&self, name: &str) -> Result<Option<ImportProfile>> {
        Ok(Config::load_file(&self.data_dir)?.import.profiles.get(name).cloned())
    }

    /// Save `mapping` under `name`, by the header names of `headers`
    pub fn save_profile(&self, name: &str, headers: &[String], mapping: &ColumnMapping) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            anyhow::bail!("Profile name cannot be empty");
        }
        let mut config = Config::load_file(&self.data_dir)?;
        config
            .import
            .profiles
            .insert(name.to_string(), ImportProfile::from_mapping(headers, mapping));
        config.save(&self.data_dir)
    }

    /// Returns false when no profile had that name
    pub fn delete_profile(&self, name: &str) -> Result<bool> {
        let mut config = Config::load_file(&self.data_dir)?;
        let removed = config.import.profiles.remove(name).is_some();
        if removed {
            config.save(&self.data_dir)?;
        }
        Ok(removed)
    }
}
