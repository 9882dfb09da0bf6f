//! CLI command implementations

pub mod categories;
pub mod import;
pub mod ledger;
pub mod logs;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use lpf_core::ports::Notifier;
use lpf_core::services::{EntryPoint, LogEvent, LoggingService};
use lpf_core::LpfContext;

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let lpf_dir = get_lpf_dir().ok()?;
    std::fs::create_dir_all(&lpf_dir).ok()?;
    LoggingService::new(&lpf_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Get the data directory from `LPF_DIR` or `~/.lpfinancas`
pub fn get_lpf_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("LPF_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".lpfinancas"))
        .context("Could not find home directory (set LPF_DIR)")
}

/// Context whose import notices are discarded
pub fn get_context() -> Result<LpfContext> {
    let lpf_dir = get_lpf_dir()?;
    LpfContext::new(&lpf_dir).context("Failed to initialize LP Finanças context")
}

pub fn get_context_with(notifier: Arc<dyn Notifier>) -> Result<LpfContext> {
    let lpf_dir = get_lpf_dir()?;
    LpfContext::with_notifier(&lpf_dir, notifier)
        .context("Failed to initialize LP Finanças context")
}
