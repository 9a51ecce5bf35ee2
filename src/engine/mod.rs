//! Deterministic distribution and auto-exit engine.
//!
//! One deposit event runs, in order: split and turn payout
//! ([`distribution`]), Global Pool dispersal ([`dispersal`]), newcomer
//! enrolment, auto-exit ([`auto_exit`]), and a conservation check
//! ([`invariants`]). [`Pool`] owns all mutable state and makes each event
//! all-or-nothing.

use crate::domain::{Decimal, Seq};
use serde::Serialize;

pub mod auto_exit;
pub mod dispersal;
pub mod distribution;
pub mod invariants;
pub mod ledger;
pub mod pool;
pub mod queue;

pub use auto_exit::ExitRecord;
pub use dispersal::Dispersal;
pub use distribution::{DepositSplit, TurnPayout};
pub use invariants::InvariantViolation;
pub use ledger::PositionLedger;
pub use pool::{DepositOutcome, EngineError, Pool, PoolSummary};
pub use queue::ActiveQueue;

/// Scalar accumulators held by a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Funds {
    /// Dispersed across active positions on every deposit.
    pub global_pool: Decimal,
    pub operational: Decimal,
    pub keeper: Decimal,
    pub admin: Decimal,
    /// Excess retained from capped exits; also covers exit shortfalls.
    pub reserve: Decimal,
}

impl Funds {
    pub fn total(&self) -> Decimal {
        self.global_pool + self.operational + self.keeper + self.admin + self.reserve
    }
}

/// Monotonic counters for sustainability metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemTotals {
    pub total_deposited: Decimal,
    pub total_withdrawn: Decimal,
    pub completed_cycles: u64,
    /// Index of the last applied deposit event.
    pub last_seq: Seq,
    /// Sum of `exited_at - joined_at` over exited positions.
    pub wait_sum: u64,
}

impl SystemTotals {
    pub fn deposit_count(&self) -> u64 {
        self.last_seq.as_u64()
    }

    pub fn net_flow(&self) -> Decimal {
        self.total_deposited - self.total_withdrawn
    }
}
