use crate::db::{Repository, StoredRun};
use crate::domain::PoolConfig;
use crate::simulation::{run_simulation, SimulationError, SimulationOptions};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// Runs simulations off the async runtime and stores their reports.
#[derive(Clone)]
pub struct SimulationRunner {
    repo: Arc<Repository>,
    max_deposits: u64,
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("depositCount {requested} exceeds the limit of {max}")]
    TooManyDeposits { requested: u64, max: u64 },
    #[error(transparent)]
    Simulation(#[from] SimulationError),
    #[error("simulation task failed: {0}")]
    Task(String),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl SimulationRunner {
    pub fn new(repo: Arc<Repository>, max_deposits: u64) -> Self {
        Self { repo, max_deposits }
    }

    /// Run to completion on the blocking pool, then persist under a new run id.
    pub async fn run_and_store(
        &self,
        config: PoolConfig,
        options: SimulationOptions,
    ) -> Result<StoredRun, RunnerError> {
        if options.deposit_count > self.max_deposits {
            return Err(RunnerError::TooManyDeposits {
                requested: options.deposit_count,
                max: self.max_deposits,
            });
        }

        let sim_config = config.clone();
        let report = tokio::task::spawn_blocking(move || run_simulation(sim_config, &options))
            .await
            .map_err(|e| RunnerError::Task(e.to_string()))??;

        let run_id = Uuid::new_v4().to_string();
        let created_at = Utc::now();
        self.repo
            .insert_run(&run_id, &config, &report, created_at)
            .await?;

        info!(
            run_id = %run_id,
            deposits = report.deposit_count,
            verdict = report.verdict.as_str(),
            "simulation stored"
        );

        Ok(StoredRun {
            config_fingerprint: config.fingerprint(),
            deposit_count: report.deposit_count,
            verdict: report.verdict.as_str().to_string(),
            run_id,
            config,
            report,
            created_at,
        })
    }

    pub async fn get(&self, run_id: &str) -> Result<Option<StoredRun>, RunnerError> {
        Ok(self.repo.get_run(run_id).await?)
    }
}
