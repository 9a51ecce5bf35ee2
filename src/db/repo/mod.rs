//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for all database operations.
//! Methods are organized across submodules by domain:
//! - `runs.rs` - Simulation runs and their checkpoint series

mod runs;

use crate::domain::{Decimal, PoolConfig};
use crate::simulation::EquilibriumReport;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use std::str::FromStr;
use tracing::warn;

/// A persisted simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRun {
    pub run_id: String,
    pub config_fingerprint: String,
    pub config: PoolConfig,
    pub deposit_count: u64,
    pub verdict: String,
    pub report: EquilibriumReport,
    pub created_at: DateTime<Utc>,
}

/// Lightweight row for listing runs without decoding their reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunListing {
    pub run_id: String,
    pub deposit_count: u64,
    pub verdict: String,
    pub created_at: String,
}

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }
}

fn parse_decimal(run_id: &str, column: &str, raw: &str) -> Decimal {
    Decimal::from_str(raw).unwrap_or_else(|e| {
        warn!(
            run_id = %run_id,
            column,
            value = %raw,
            error = %e,
            "Failed to parse stored decimal, using default"
        );
        Decimal::default()
    })
}

/// Stored JSON documents that fail to encode or decode surface as decode errors.
fn json_error<E>(e: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Decode(Box::new(e))
}
