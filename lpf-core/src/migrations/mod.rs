//! Ledger migrations - embedded SQL files
//!
//! Compiled into the binary with include_str! and applied in name order.

/// All ledger migrations, as (filename, sql_content).
///
/// New migrations get the next NNN_ prefix and an entry here.
pub const MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_ledger_schema.sql", include_str!("001_ledger_schema.sql")),
];
