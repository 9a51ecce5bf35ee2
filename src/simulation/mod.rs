//! Deterministic simulation driver.
//!
//! Feeds a pool a sequence of entry deposits from synthetic owners and
//! reports whether the queue reaches equilibrium.

pub mod export;
pub mod report;

pub use export::{checkpoints_to_csv, ExportError};
pub use report::{
    Checkpoint, EquilibriumReport, EquilibriumThresholds, EquilibriumVerdict, FundsReport,
};

use crate::domain::{Address, ConfigurationError, PoolConfig};
use crate::engine::{EngineError, InvariantViolation, Pool};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("deposit {index} failed: {source}")]
    Deposit {
        index: u64,
        #[source]
        source: EngineError,
    },
    #[error("audit after deposit {index} failed: {source}")]
    Audit {
        index: u64,
        #[source]
        source: InvariantViolation,
    },
    #[error("{0} interval must be positive")]
    ZeroInterval(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationOptions {
    pub deposit_count: u64,
    /// Capture a checkpoint every N deposits. The final state is always captured.
    pub checkpoint_interval: Option<u64>,
    pub thresholds: EquilibriumThresholds,
    /// Run the full O(n) invariant audit every N deposits.
    pub verify_every: Option<u64>,
}

impl SimulationOptions {
    pub fn new(deposit_count: u64) -> Self {
        Self {
            deposit_count,
            checkpoint_interval: None,
            thresholds: EquilibriumThresholds::default(),
            verify_every: None,
        }
    }

    fn validate(&self) -> Result<(), SimulationError> {
        if self.checkpoint_interval == Some(0) {
            return Err(SimulationError::ZeroInterval("checkpoint"));
        }
        if self.verify_every == Some(0) {
            return Err(SimulationError::ZeroInterval("verify"));
        }
        Ok(())
    }
}

/// Run `options.deposit_count` sequential deposits against a fresh pool.
pub fn run_simulation(
    config: PoolConfig,
    options: &SimulationOptions,
) -> Result<EquilibriumReport, SimulationError> {
    options.validate()?;
    let mut pool = Pool::new(config)?;
    drive(&mut pool, options)
}

/// Same as [`run_simulation`] but hands back the final pool for inspection.
pub fn run_simulation_with_pool(
    config: PoolConfig,
    options: &SimulationOptions,
) -> Result<(EquilibriumReport, Pool), SimulationError> {
    options.validate()?;
    let mut pool = Pool::new(config)?;
    let report = drive(&mut pool, options)?;
    Ok((report, pool))
}

fn drive(
    pool: &mut Pool,
    options: &SimulationOptions,
) -> Result<EquilibriumReport, SimulationError> {
    info!(
        deposits = options.deposit_count,
        entry = %pool.config().entry_amount,
        exit = %pool.config().exit_amount,
        "starting simulation"
    );

    let mut peak_active = 0usize;
    let mut checkpoints = Vec::new();

    for index in 1..=options.deposit_count {
        pool.join(Address::synthetic(index))
            .map_err(|source| SimulationError::Deposit { index, source })?;
        peak_active = peak_active.max(pool.queue().len());

        if options.verify_every.is_some_and(|k| index % k == 0) {
            pool.verify_invariants()
                .map_err(|source| SimulationError::Audit { index, source })?;
            debug!(index, "invariant audit passed");
        }

        if options.checkpoint_interval.is_some_and(|k| index % k == 0) {
            let checkpoint = Checkpoint::capture(pool);
            debug!(
                index,
                active = checkpoint.active_positions,
                exit_rate = %checkpoint.exit_rate,
                "checkpoint"
            );
            checkpoints.push(checkpoint);
        }
    }

    let last_index = pool.totals().deposit_count();
    if checkpoints.last().map(|c| c.deposit_index) != Some(last_index) {
        checkpoints.push(Checkpoint::capture(pool));
    }

    let report = EquilibriumReport::from_pool(pool, peak_active, options.thresholds, checkpoints);
    info!(
        deposits = report.deposit_count,
        active = report.active_positions,
        peak_active = report.peak_active_positions,
        completed = report.completed_cycles,
        exit_rate = %report.exit_rate,
        verdict = report.verdict.as_str(),
        "simulation finished"
    );
    Ok(report)
}
