//! Service layer - the import pipeline
//!
//! parser → normalizer → session (review) → reconciler, fronted by
//! ImportService. Logging and migrations support the adapters and CLI.

pub mod import;
pub mod logging;
pub mod migration;
pub mod normalizer;
pub mod parser;
pub mod reconciler;
pub mod session;

pub use import::ImportService;
pub use logging::{EntryPoint, LogEntry, LogEvent, LogFilter, LogStats, LoggingService};
pub use migration::{MigrationList, MigrationResult, MigrationService};
pub use normalizer::{normalize_rows, normalize_value, NormalizeOutcome};
pub use reconciler::{parse_statement_date, RecordDefaults, Reconciler};
pub use session::{ReviewSession, UploadedStatement};
