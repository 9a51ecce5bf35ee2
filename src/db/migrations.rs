//! Simulation store setup: connection pool, per-connection pragmas, and the
//! versioned schema.

use sqlx::sqlite::{SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use tracing::{debug, info, warn};

/// Stamped into `PRAGMA user_version` once `schema.sql` has been applied.
pub const SCHEMA_VERSION: i64 = 1;

/// Open (creating if needed) the simulation store at `db_path` and bring its
/// schema up to [`SCHEMA_VERSION`].
pub async fn init_db(db_path: &str) -> Result<SqlitePool, sqlx::Error> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!(path = %parent.display(), error = %e, "could not create database directory");
            }
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .after_connect(|conn, _meta| Box::pin(async move { configure_connection(conn).await }))
        .connect(&format!("sqlite:{}?mode=rwc", db_path))
        .await?;

    let version = migrate(&pool).await?;
    info!(path = db_path, schema_version = version, "simulation store ready");
    Ok(pool)
}

/// Apply `schema.sql` when the stored version is behind, in one transaction.
/// Returns the schema version in effect afterwards.
async fn migrate(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    let current = schema_version(pool).await?;
    if current >= SCHEMA_VERSION {
        debug!(schema_version = current, "schema up to date");
        return Ok(current);
    }

    let mut tx = pool.begin().await?;
    for statement in include_str!("schema.sql")
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    // PRAGMA does not accept bound parameters.
    sqlx::query(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!(from = current, to = SCHEMA_VERSION, "schema migrated");
    Ok(SCHEMA_VERSION)
}

async fn schema_version(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    let row = sqlx::query("PRAGMA user_version").fetch_one(pool).await?;
    Ok(row.get(0))
}

/// Checkpoint rows cascade with their run, so foreign keys must be on for
/// every pooled connection.
async fn configure_connection(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&mut *conn)
        .await?;

    let row = sqlx::query("PRAGMA journal_mode = WAL")
        .fetch_one(&mut *conn)
        .await?;
    let journal_mode: String = row.get(0);
    debug!(journal_mode = %journal_mode, "sqlite journal mode");

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&mut *conn)
        .await?;
    Ok(())
}
