use crate::config::Config;
use anyhow::Result;
use libsql::{Builder, Connection, Database as LibsqlDatabase};
use std::path::Path;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

const SYSTEM_MIGRATIONS: &[(&str, &str)] =
    &[("system/000_migrations_table.sql", include_str!("migrations/system/000_migrations_table.sql"))];

pub struct Database {
    // keeps the underlying handle (and replica sync task) alive
    _db: LibsqlDatabase,
    conn: Connection,
    tx_lock: Mutex<()>,
}

impl Database {
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Exclusive use of the shared connection, held for a whole transaction
    /// and for reads that must only see committed rows.
    ///
    /// A transaction left open by a cancelled holder is rolled back before
    /// the guard is handed out.
    pub async fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        let guard = self.tx_lock.lock().await;
        if !self.conn.is_autocommit() {
            tracing::warn!("[db] rolling back transaction abandoned by a cancelled request");
            self.conn
                .execute("ROLLBACK", ())
                .await
                .map_err(|e| anyhow::anyhow!("failed to roll back abandoned transaction: {e}"))?;
        }
        Ok(guard)
    }

    async fn is_migration_applied(conn: &Connection, name: &str) -> Result<bool> {
        let query = "SELECT 1 FROM _migrations WHERE name = ?";
        match conn.query(query, libsql::params![name]).await {
            Ok(mut rows) => Ok(rows.next().await?.is_some()),
            Err(e) => {
                if e.to_string().contains("no such table") {
                    Ok(false)
                } else {
                    Err(e.into())
                }
            }
        }
    }

    async fn record_migration(conn: &Connection, name: &str) -> Result<()> {
        let query = r#"
            INSERT INTO _migrations (name, applied_at)
            VALUES (?, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        "#;
        conn.execute(query, libsql::params![name]).await?;
        Ok(())
    }

    async fn run_migration(conn: &Connection, name: &str, sql: &str) -> Result<()> {
        if Self::is_migration_applied(conn, name).await? {
            tracing::debug!(migration = name, "migration already applied, skipping");
            return Ok(());
        }

        tracing::info!(migration = name, "applying migration");
        conn.execute_batch(sql)
            .await
            .map_err(|e| anyhow::anyhow!("failed to execute migration {name}: {e}"))?;

        Self::record_migration(conn, name).await?;
        Ok(())
    }

    async fn run_migrations(conn: &Connection) -> Result<()> {
        for (filename, sql) in SYSTEM_MIGRATIONS {
            Self::run_migration(conn, filename, sql).await?;
        }

        for (filename, sql) in crate::polls::migrations() {
            Self::run_migration(conn, filename, sql).await?;
        }

        Ok(())
    }

    /// Opens `database` under `data_dir`, as an embedded replica when Turso
    /// credentials are configured.
    pub async fn new(cfg: &Config, database: &str, data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(database);

        let db = match cfg.app.replica() {
            Some((url, token)) => {
                tracing::info!(path = ?path, "[db] running in synced database mode");
                let sync_interval = Duration::from_secs(cfg.app.sync_interval_seconds);
                let db = Builder::new_synced_database(&path, url.to_string(), token.to_string())
                    .sync_interval(sync_interval)
                    .build()
                    .await?;
                db.sync()
                    .await
                    .map_err(|e| anyhow::anyhow!("initial sync failed: {}", e))?;
                db
            }
            _ => {
                tracing::info!(path = ?path, "[db] running in local mode");
                Builder::new_local(&path).build().await?
            }
        };

        Self::setup(db).await
    }

    /// Private database that lives as long as the returned value.
    pub async fn in_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        Self::setup(db).await
    }

    async fn setup(db: LibsqlDatabase) -> Result<Self> {
        let conn = db.connect()?;
        conn.query("SELECT 1", ()).await?;
        conn.execute("PRAGMA foreign_keys = ON", ()).await?;

        Self::run_migrations(&conn).await?;

        Ok(Database {
            _db: db,
            conn,
            tx_lock: Mutex::new(()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn count(conn: &Connection, query: &str) -> i64 {
        let mut rows = conn.query(query, ()).await.unwrap();
        rows.next().await.unwrap().unwrap().get(0).unwrap()
    }

    #[tokio::test]
    async fn test_migrations_are_recorded_once() {
        let db = Database::in_memory().await.unwrap();
        let conn = db.connection();

        let applied = count(conn, "SELECT COUNT(*) FROM _migrations").await;
        assert_eq!(applied as usize, 1 + crate::polls::migrations().len());

        Database::run_migrations(conn).await.unwrap();
        assert_eq!(count(conn, "SELECT COUNT(*) FROM _migrations").await, applied);
    }

    #[tokio::test]
    async fn test_lock_rolls_back_abandoned_transaction() {
        let db = Database::in_memory().await.unwrap();
        {
            let _guard = db.lock().await.unwrap();
            let conn = db.connection();
            conn.execute("BEGIN TRANSACTION", ()).await.unwrap();
            conn.execute(
                "INSERT INTO polls (token, title, timezone) VALUES ('LEFTOVER', 'x', 'UTC')",
                (),
            )
            .await
            .unwrap();
        }

        let _guard = db.lock().await.unwrap();
        assert!(db.connection().is_autocommit());
        assert_eq!(count(db.connection(), "SELECT COUNT(*) FROM polls").await, 0);
    }

    #[tokio::test]
    async fn test_foreign_keys_enforced() {
        let db = Database::in_memory().await.unwrap();
        let result = db
            .connection()
            .execute(
                "INSERT INTO poll_options (poll_id, option_datetime) VALUES (?, ?)",
                libsql::params![999_i64, "2024-01-01T10:00"],
            )
            .await;
        assert!(result.is_err());
    }
}
