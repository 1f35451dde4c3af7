//! Schema migrations for the ledger database.
//!
//! Each schema version `NN` has two embedded scripts in this directory:
//! - `migration_NN_up.sql` moves the schema from version `NN-1` to `NN`
//! - `migration_NN_down.sql` moves it back from `NN` to `NN-1`
//!
//! The current version lives in the single-row `schema_version` table. `Db::load` never moves a
//! schema down; down scripts exist so tests can check that every up script reverses cleanly.

use anyhow::{bail, Context};
use sqlx::SqlitePool;
use tracing::debug;

use crate::Result;

/// The schema version this build of the crate reads and writes.
pub(crate) const CURRENT_VERSION: i32 = 2;

struct Migration {
    /// The version reached by running `up_sql`.
    version: i32,
    up_sql: &'static str,
    down_sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        up_sql: include_str!("migration_01_up.sql"),
        down_sql: include_str!("migration_01_down.sql"),
    },
    Migration {
        version: 2,
        up_sql: include_str!("migration_02_up.sql"),
        down_sql: include_str!("migration_02_down.sql"),
    },
];

/// Creates the `schema_version` table in an empty database and records version 0.
pub(crate) async fn bootstrap(pool: &SqlitePool) -> Result<()> {
    let mut tx = pool
        .begin()
        .await
        .context("Failed to begin schema bootstrap")?;
    sqlx::query("CREATE TABLE schema_version (version INTEGER NOT NULL)")
        .execute(&mut *tx)
        .await
        .context("Failed to create schema_version table")?;
    sqlx::query("INSERT INTO schema_version (version) VALUES (0)")
        .execute(&mut *tx)
        .await
        .context("Failed to record initial schema version")?;
    tx.commit()
        .await
        .context("Failed to commit schema bootstrap")?;
    Ok(())
}

/// Reads the schema version recorded in the database.
pub(crate) async fn current_version(pool: &SqlitePool) -> Result<i32> {
    let version: Option<i32> = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await
        .context("Failed to read the schema version")?;
    version.context("The schema_version table is empty")
}

/// Migrates the schema from `from` to `to`, one version at a time, in either direction.
///
/// Every step runs in its own transaction together with the `schema_version` update, so an
/// interrupted migration leaves the database at the last completed version. All required steps are
/// checked to exist before the first one runs.
pub(crate) async fn run(pool: &SqlitePool, from: i32, to: i32) -> Result<()> {
    if from == to {
        debug!("Schema is at version {to}, nothing to migrate");
        return Ok(());
    }

    check_available(from, to)?;

    if from < to {
        for version in (from + 1)..=to {
            debug!("Migrating schema up to version {version:02}");
            apply(pool, find(version)?.up_sql, version).await?;
        }
    } else {
        for version in ((to + 1)..=from).rev() {
            debug!("Migrating schema down from version {version:02}");
            apply(pool, find(version)?.down_sql, version - 1).await?;
        }
    }

    debug!("Schema migrated from version {from} to {to}");
    Ok(())
}

fn find(version: i32) -> Result<&'static Migration> {
    MIGRATIONS
        .iter()
        .find(|m| m.version == version)
        .with_context(|| format!("Migration {version} not found"))
}

async fn apply(pool: &SqlitePool, sql: &str, resulting_version: i32) -> Result<()> {
    let mut tx = pool
        .begin()
        .await
        .context("Failed to begin migration transaction")?;

    sqlx::raw_sql(sql)
        .execute(&mut *tx)
        .await
        .context("Failed to execute migration SQL")?;

    sqlx::query("UPDATE schema_version SET version = ?")
        .bind(resulting_version)
        .execute(&mut *tx)
        .await
        .context("Failed to update schema_version")?;

    tx.commit()
        .await
        .context("Failed to commit migration transaction")?;
    Ok(())
}

fn check_available(from: i32, to: i32) -> Result<()> {
    let (low, high) = if from < to { (from + 1, to) } else { (to + 1, from) };
    for version in low..=high {
        if !MIGRATIONS.iter().any(|m| m.version == version) {
            bail!("Migration {version} is required to go from schema version {from} to {to} but does not exist");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use tempfile::TempDir;

    async fn empty_db() -> (TempDir, SqlitePool) {
        let dir = TempDir::new().unwrap();
        let options = SqliteConnectOptions::new()
            .filename(dir.path().join("test.sqlite"))
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();
        bootstrap(&pool).await.unwrap();
        (dir, pool)
    }

    async fn table_exists(pool: &SqlitePool, name: &str) -> bool {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(name)
                .fetch_one(pool)
                .await
                .unwrap();
        count > 0
    }

    #[tokio::test]
    async fn test_bootstrap_starts_at_zero() {
        let (_dir, pool) = empty_db().await;
        assert_eq!(current_version(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_up_creates_tables() {
        let (_dir, pool) = empty_db().await;
        run(&pool, 0, CURRENT_VERSION).await.unwrap();
        assert_eq!(current_version(&pool).await.unwrap(), CURRENT_VERSION);
        for table in ["transactions", "categories", "accounts", "table_versions"] {
            assert!(table_exists(&pool, table).await, "missing table {table}");
        }
    }

    #[tokio::test]
    async fn test_down_drops_tables() {
        let (_dir, pool) = empty_db().await;
        run(&pool, 0, CURRENT_VERSION).await.unwrap();

        run(&pool, CURRENT_VERSION, 1).await.unwrap();
        assert_eq!(current_version(&pool).await.unwrap(), 1);
        assert!(!table_exists(&pool, "table_versions").await);
        assert!(table_exists(&pool, "transactions").await);

        run(&pool, 1, 0).await.unwrap();
        assert_eq!(current_version(&pool).await.unwrap(), 0);
        for table in ["transactions", "categories", "accounts"] {
            assert!(!table_exists(&pool, table).await, "table {table} survived");
        }
    }

    #[tokio::test]
    async fn test_triggers_count_row_changes() {
        let (_dir, pool) = empty_db().await;
        run(&pool, 0, CURRENT_VERSION).await.unwrap();
        let version = |name: &'static str| {
            let pool = pool.clone();
            async move {
                sqlx::query_scalar::<_, i64>("SELECT version FROM table_versions WHERE name = ?")
                    .bind(name)
                    .fetch_one(&pool)
                    .await
                    .unwrap()
            }
        };

        sqlx::query("INSERT INTO categories (id, name, color) VALUES ('c1', 'Food', 0)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("UPDATE categories SET name = 'Groceries' WHERE id = 'c1'")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("DELETE FROM categories WHERE id = 'c1'")
            .execute(&pool)
            .await
            .unwrap();

        assert_eq!(version("categories").await, 3);
        assert_eq!(version("transactions").await, 0);
        assert_eq!(version("accounts").await, 0);
    }

    #[tokio::test]
    async fn test_same_version_is_a_no_op() {
        let (_dir, pool) = empty_db().await;
        run(&pool, 0, 1).await.unwrap();
        run(&pool, 1, 1).await.unwrap();
        assert_eq!(current_version(&pool).await.unwrap(), 1);
    }

    #[test]
    fn test_check_available() {
        assert!(check_available(0, CURRENT_VERSION).is_ok());
        assert!(check_available(CURRENT_VERSION, 0).is_ok());
        assert!(check_available(0, CURRENT_VERSION + 1).is_err());
        assert!(check_available(CURRENT_VERSION + 2, 1).is_err());
    }
}
