//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for the collaborators the import pipeline
//! talks to. Services depend only on these traits.

mod notifier;
mod storage;

pub use notifier::{NoticeLevel, Notifier, RecordingNotifier, SilentNotifier};
pub use storage::{CategoryProvider, StorageResult, TransactionStorage};
