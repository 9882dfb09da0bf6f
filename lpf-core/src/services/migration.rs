//! Schema migrations for the ledger and the event log
//!
//! Each database has its own ordered list of embedded SQL files. The first
//! entry creates `sys_migrations`; every later file runs in its own
//! transaction together with the row recording it, so a failing file
//! leaves nothing behind and is retried on the next open.

use anyhow::{Context, Result};
use duckdb::Connection;

/// Embedded migrations as (file name, SQL), applied in list order
pub type MigrationList = &'static [(&'static str, &'static str)];

/// What a call to [`MigrationService::run_pending`] did
#[derive(Debug, Default)]
pub struct MigrationResult {
    /// File names applied by this call, in order
    pub applied: Vec<String>,
    pub already_applied: usize,
}

pub struct MigrationService<'a> {
    conn: &'a Connection,
    migrations: MigrationList,
}

impl<'a> MigrationService<'a> {
    pub fn new(conn: &'a Connection, migrations: MigrationList) -> Self {
        Self { conn, migrations }
    }

    pub fn run_pending(&self) -> Result<MigrationResult> {
        let mut result = MigrationResult::default();

        let Some(((bootstrap_name, bootstrap_sql), rest)) = self.migrations.split_first() else {
            return Ok(result);
        };

        if !self.has_migrations_table()? {
            self.apply(bootstrap_name, bootstrap_sql)?;
            result.applied.push(bootstrap_name.to_string());
        } else {
            result.already_applied += 1;
        }

        let applied = self.get_applied()?;
        for (name, sql) in rest {
            if applied.iter().any(|a| a == name) {
                result.already_applied += 1;
                continue;
            }
            self.apply(name, sql)?;
            result.applied.push(name.to_string());
        }

        Ok(result)
    }

    /// File names recorded in sys_migrations, sorted
    pub fn get_applied(&self) -> Result<Vec<String>> {
        if !self.has_migrations_table()? {
            return Ok(Vec::new());
        }
        let mut stmt = self
            .conn
            .prepare("SELECT migration_name FROM sys_migrations ORDER BY migration_name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(names)
    }

    /// File names not yet recorded, in application order
    pub fn get_pending(&self) -> Result<Vec<String>> {
        let applied = self.get_applied()?;
        Ok(self
            .migrations
            .iter()
            .map(|(name, _)| name.to_string())
            .filter(|name| !applied.contains(name))
            .collect())
    }

    fn has_migrations_table(&self) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'sys_migrations'",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn apply(&self, name: &str, sql: &str) -> Result<()> {
        self.conn.execute_batch("BEGIN TRANSACTION")?;
        let outcome = self.conn.execute_batch(sql).and_then(|_| {
            self.conn.execute(
                "INSERT INTO sys_migrations (migration_name) VALUES (?)",
                [name],
            )
        });

        match outcome {
            Ok(_) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(())
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e).with_context(|| format!("Migration {} failed", name))
            }
        }
    }
}
