//! Migration service - manages database schema migrations
//!
//! Migrations are SQL files embedded at compile time. Each migration is
//! tracked in the sys_migrations table to ensure idempotent execution.

use duckdb::Connection;

use crate::domain::result::Result;
use crate::migrations::MIGRATIONS;

const BOOTSTRAP: &str = "000_migrations.sql";

/// Result of running migrations
#[derive(Debug)]
pub struct MigrationResult {
    /// Names of newly applied migrations
    pub applied: Vec<String>,
    /// Count of migrations that were already applied
    pub already_applied: usize,
}

/// Service for managing database migrations
pub struct MigrationService<'a> {
    conn: &'a Connection,
    migrations: &'static [(&'static str, &'static str)],
}

impl<'a> MigrationService<'a> {
    /// Migration service for the main bankbook database
    pub fn new(conn: &'a Connection) -> Self {
        Self::with_migrations(conn, MIGRATIONS)
    }

    /// Migration service for another embedded migration set (e.g. logs.duckdb)
    pub fn with_migrations(
        conn: &'a Connection,
        migrations: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self { conn, migrations }
    }

    /// Run all pending migrations
    ///
    /// 1. Ensures the sys_migrations table exists (bootstrap)
    /// 2. Gets list of already applied migrations
    /// 3. Applies any pending migrations in order
    /// 4. Records each applied migration
    pub fn run_pending(&self) -> Result<MigrationResult> {
        let mut newly_applied = Vec::new();

        let bootstrap_ran = if !self.migrations_table_exists() {
            match self.migrations.iter().find(|(n, _)| *n == BOOTSTRAP) {
                Some((name, sql)) => {
                    self.conn.execute_batch(sql)?;
                    self.record_migration(name)?;
                    newly_applied.push(name.to_string());
                    true
                }
                None => false,
            }
        } else {
            false
        };

        let applied_set = self.get_applied()?;
        let already_applied = if bootstrap_ran {
            applied_set.len().saturating_sub(1)
        } else {
            applied_set.len()
        };

        for (name, sql) in self.migrations.iter() {
            if *name == BOOTSTRAP || applied_set.iter().any(|a| a == name) {
                continue;
            }
            tracing::debug!(migration = name, "applying migration");
            self.conn.execute_batch(sql)?;
            self.record_migration(name)?;
            newly_applied.push(name.to_string());
        }

        Ok(MigrationResult {
            applied: newly_applied,
            already_applied,
        })
    }

    fn migrations_table_exists(&self) -> bool {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables
                 WHERE table_name = 'sys_migrations'",
                [],
                |row| row.get::<_, i64>(0),
            )
            .map(|count| count > 0)
            .unwrap_or(false)
    }

    /// Get list of already applied migration names
    pub fn get_applied(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT migration_name FROM sys_migrations ORDER BY migration_name")?;
        let names = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut result = Vec::new();
        for name in names {
            result.push(name?);
        }
        Ok(result)
    }

    fn record_migration(&self, name: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sys_migrations (migration_name) VALUES (?)",
            [name],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_migrations::LOG_MIGRATIONS;

    #[test]
    fn test_migrations_run_on_fresh_db() {
        let conn = Connection::open_in_memory().unwrap();
        let service = MigrationService::new(&conn);

        let result = service.run_pending().unwrap();
        assert_eq!(result.applied.len(), MIGRATIONS.len());
        assert_eq!(result.already_applied, 0);

        // Running again should apply nothing
        let result2 = service.run_pending().unwrap();
        assert_eq!(result2.applied.len(), 0);
        assert_eq!(result2.already_applied, MIGRATIONS.len());
    }

    #[test]
    fn test_partially_migrated_db_applies_the_rest() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(MIGRATIONS[0].1).unwrap();
        conn.execute(
            "INSERT INTO sys_migrations (migration_name) VALUES (?)",
            [MIGRATIONS[0].0],
        )
        .unwrap();

        let service = MigrationService::new(&conn);
        let result = service.run_pending().unwrap();
        assert_eq!(result.applied.len(), MIGRATIONS.len() - 1);
        assert_eq!(result.already_applied, 1);
        assert_eq!(service.get_applied().unwrap().len(), MIGRATIONS.len());
    }

    #[test]
    fn test_log_migration_set() {
        let conn = Connection::open_in_memory().unwrap();
        let service = MigrationService::with_migrations(&conn, LOG_MIGRATIONS);
        let result = service.run_pending().unwrap();
        assert_eq!(result.applied.len(), LOG_MIGRATIONS.len());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM sys_logs", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
