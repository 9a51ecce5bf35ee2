//! Simulation run and checkpoint operations for the repository.

use crate::domain::PoolConfig;
use crate::simulation::{Checkpoint, EquilibriumReport};
use chrono::{DateTime, Utc};
use sqlx::Row;

use super::{json_error, parse_decimal, Repository, RunListing, StoredRun};

impl Repository {
    // =========================================================================
    // Simulation runs
    // =========================================================================

    /// Store a finished run and its checkpoint series in one transaction.
    ///
    /// # Errors
    /// Returns an error if serialization or any insert fails; nothing is
    /// committed in that case.
    pub async fn insert_run(
        &self,
        run_id: &str,
        config: &PoolConfig,
        report: &EquilibriumReport,
        created_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        let config_json = serde_json::to_string(config).map_err(json_error)?;
        let report_json = serde_json::to_string(report).map_err(json_error)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO simulation_runs
            (run_id, config_fingerprint, config_json, deposit_count, verdict, report_json, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(run_id)
        .bind(config.fingerprint())
        .bind(config_json)
        .bind(report.deposit_count as i64)
        .bind(report.verdict.as_str())
        .bind(report_json)
        .bind(created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        for checkpoint in &report.checkpoints {
            sqlx::query(
                r#"
                INSERT INTO simulation_checkpoints
                (run_id, deposit_index, active_positions, completed_cycles, exit_rate,
                 net_flow_ratio, avg_wait_time, global_pool, stranded_positions)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(run_id)
            .bind(checkpoint.deposit_index as i64)
            .bind(checkpoint.active_positions as i64)
            .bind(checkpoint.completed_cycles as i64)
            .bind(checkpoint.exit_rate.to_canonical_string())
            .bind(checkpoint.net_flow_ratio.to_canonical_string())
            .bind(checkpoint.avg_wait_time.map(|w| w.to_canonical_string()))
            .bind(checkpoint.global_pool.to_canonical_string())
            .bind(checkpoint.stranded_positions as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Fetch a run by id.
    ///
    /// # Errors
    /// Returns an error if the query fails or the stored documents are corrupt.
    pub async fn get_run(&self, run_id: &str) -> Result<Option<StoredRun>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT run_id, config_fingerprint, config_json, deposit_count, verdict,
                   report_json, created_at
            FROM simulation_runs
            WHERE run_id = ?
            "#,
        )
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let config_json: String = row.get("config_json");
        let report_json: String = row.get("report_json");
        let created_at: String = row.get("created_at");

        let config: PoolConfig = serde_json::from_str(&config_json).map_err(json_error)?;
        let report: EquilibriumReport =
            serde_json::from_str(&report_json).map_err(json_error)?;
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map_err(json_error)?
            .with_timezone(&Utc);

        Ok(Some(StoredRun {
            run_id: row.get("run_id"),
            config_fingerprint: row.get("config_fingerprint"),
            config,
            deposit_count: row.get::<i64, _>("deposit_count") as u64,
            verdict: row.get("verdict"),
            report,
            created_at,
        }))
    }

    /// Earlier runs of the same configuration, newest first.
    pub async fn list_runs_by_fingerprint(
        &self,
        fingerprint: &str,
    ) -> Result<Vec<RunListing>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT run_id, deposit_count, verdict, created_at
            FROM simulation_runs
            WHERE config_fingerprint = ?
            ORDER BY created_at DESC, run_id ASC
            "#,
        )
        .bind(fingerprint)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| RunListing {
                run_id: row.get("run_id"),
                deposit_count: row.get::<i64, _>("deposit_count") as u64,
                verdict: row.get("verdict"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    // =========================================================================
    // Checkpoints
    // =========================================================================

    /// Checkpoint series for a run, in deposit order.
    pub async fn query_checkpoints(&self, run_id: &str) -> Result<Vec<Checkpoint>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT deposit_index, active_positions, completed_cycles, exit_rate,
                   net_flow_ratio, avg_wait_time, global_pool, stranded_positions
            FROM simulation_checkpoints
            WHERE run_id = ?
            ORDER BY deposit_index ASC
            "#,
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let exit_rate: String = row.get("exit_rate");
                let net_flow_ratio: String = row.get("net_flow_ratio");
                let avg_wait_time: Option<String> = row.get("avg_wait_time");
                let global_pool: String = row.get("global_pool");

                Checkpoint {
                    deposit_index: row.get::<i64, _>("deposit_index") as u64,
                    active_positions: row.get::<i64, _>("active_positions") as usize,
                    completed_cycles: row.get::<i64, _>("completed_cycles") as u64,
                    exit_rate: parse_decimal(run_id, "exit_rate", &exit_rate),
                    net_flow_ratio: parse_decimal(run_id, "net_flow_ratio", &net_flow_ratio),
                    avg_wait_time: avg_wait_time
                        .map(|w| parse_decimal(run_id, "avg_wait_time", &w)),
                    global_pool: parse_decimal(run_id, "global_pool", &global_pool),
                    stranded_positions: row.get::<i64, _>("stranded_positions") as usize,
                }
            })
            .collect())
    }
}
