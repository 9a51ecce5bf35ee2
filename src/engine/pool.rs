use crate::domain::{
    Address, ConfigurationError, Decimal, ExitRule, PoolConfig, PositionId, PositionView, Seq,
    Tier,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, trace};

use super::auto_exit::{self, ExitRecord};
use super::dispersal::{self, Dispersal};
use super::distribution::{self, DepositSplit, TurnPayout};
use super::invariants::{self, InvariantViolation};
use super::{ActiveQueue, Funds, PositionLedger, SystemTotals};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
    #[error("deposit must be exactly {expected}, got {got}")]
    UnexpectedAmount { expected: Decimal, got: Decimal },
    #[error("unknown position {0}")]
    UnknownPosition(PositionId),
}

/// Everything one deposit event did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositOutcome {
    pub seq: Seq,
    /// The depositor's new position.
    pub position: PositionId,
    pub split: DepositSplit,
    pub turn_payout: TurnPayout,
    pub dispersal: Option<Dispersal>,
    pub exits: Vec<ExitRecord>,
}

/// Point-in-time view of a pool's scalar state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolSummary {
    pub funds: Funds,
    pub totals: SystemTotals,
    pub positions_created: usize,
    pub active_positions: usize,
    pub queue_head: Option<PositionId>,
    pub active_balance: Decimal,
    pub stranded_positions: usize,
}

/// A single savings pool: ledger, queue, and funds.
///
/// Deposit events are applied one at a time and are all-or-nothing: if any
/// stage reports an [`InvariantViolation`], every change made by the event
/// is undone before the error is returned.
#[derive(Debug)]
pub struct Pool {
    config: PoolConfig,
    ledger: PositionLedger,
    queue: ActiveQueue,
    funds: Funds,
    totals: SystemTotals,
}

struct Savepoint {
    funds: Funds,
    totals: SystemTotals,
}

impl Pool {
    /// Create an empty pool. Fails fast on an invalid configuration.
    pub fn new(config: PoolConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Self {
            config,
            ledger: PositionLedger::new(),
            queue: ActiveQueue::new(),
            funds: Funds::default(),
            totals: SystemTotals::default(),
        })
    }

    pub fn for_tier(tier: Tier) -> Result<Self, ConfigurationError> {
        Self::new(tier.config())
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn funds(&self) -> &Funds {
        &self.funds
    }

    pub fn totals(&self) -> &SystemTotals {
        &self.totals
    }

    pub fn queue(&self) -> &ActiveQueue {
        &self.queue
    }

    pub fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    /// Deposit the configured entry amount on behalf of `owner`.
    pub fn join(&mut self, owner: Address) -> Result<DepositOutcome, EngineError> {
        let amount = self.config.entry_amount;
        self.apply_deposit(owner, amount)
    }

    /// Apply one deposit event: split, turn payout, dispersal, enrolment of
    /// the depositor's new position, auto-exit, conservation check.
    pub fn apply_deposit(
        &mut self,
        owner: Address,
        amount: Decimal,
    ) -> Result<DepositOutcome, EngineError> {
        if amount != self.config.entry_amount {
            return Err(EngineError::UnexpectedAmount {
                expected: self.config.entry_amount,
                got: amount,
            });
        }

        let seq = self.totals.last_seq.next();
        let savepoint = self.begin();
        match self.run_pipeline(seq, owner, amount) {
            Ok(outcome) => {
                self.ledger.commit();
                trace!(
                    seq = outcome.seq.as_u64(),
                    position = %outcome.position,
                    exits = outcome.exits.len(),
                    "deposit applied"
                );
                Ok(outcome)
            }
            Err(violation) => {
                error!(
                    seq = seq.as_u64(),
                    error = %violation,
                    "deposit rejected, rolling back"
                );
                self.rollback(savepoint);
                Err(violation.into())
            }
        }
    }

    fn run_pipeline(
        &mut self,
        seq: Seq,
        owner: Address,
        amount: Decimal,
    ) -> Result<DepositOutcome, InvariantViolation> {
        let split = DepositSplit::compute(&self.config, amount)?;
        let turn_payout =
            distribution::apply_split(&split, &mut self.ledger, &self.queue, &mut self.funds)?;

        let dispersal = dispersal::disperse_global_pool(
            &mut self.ledger,
            &self.queue,
            &mut self.funds,
            self.config.scale,
        )?;

        let position = self.ledger.open(owner, seq);
        self.queue.push_back(position)?;

        self.totals.total_deposited += amount;
        self.totals.last_seq = seq;

        let exits = auto_exit::evaluate_auto_exits(
            &self.config,
            &mut self.ledger,
            &mut self.queue,
            &mut self.funds,
            &mut self.totals,
            seq,
        )?;

        if self.queue.len() != self.ledger.active_count() {
            return Err(InvariantViolation::QueueLengthMismatch {
                queue: self.queue.len(),
                active: self.ledger.active_count(),
            });
        }
        invariants::check_conservation(&self.ledger, &self.funds, &self.totals)?;

        Ok(DepositOutcome {
            seq,
            position,
            split,
            turn_payout,
            dispersal,
            exits,
        })
    }

    fn begin(&mut self) -> Savepoint {
        self.ledger.begin();
        Savepoint {
            funds: self.funds,
            totals: self.totals,
        }
    }

    fn rollback(&mut self, savepoint: Savepoint) {
        for id in self.ledger.rollback() {
            let active = self.ledger.get(id).is_some_and(|p| p.is_active);
            self.queue.resync(id, active);
        }
        self.funds = savepoint.funds;
        self.totals = savepoint.totals;
    }

    pub fn position(&self, id: PositionId) -> Option<PositionView> {
        self.ledger.get(id).map(|p| p.view(self.ledger.accrued()))
    }

    pub fn balance_of(&self, id: PositionId) -> Result<Decimal, EngineError> {
        self.ledger
            .balance_of(id)
            .ok_or(EngineError::UnknownPosition(id))
    }

    /// Active positions in queue order.
    pub fn active_positions(&self) -> impl Iterator<Item = PositionView> + '_ {
        let accrued = self.ledger.accrued();
        self.queue
            .iter()
            .filter_map(move |id| self.ledger.get(id).map(|p| p.view(accrued)))
    }

    /// Active positions that overshot the exit window and can never exit
    /// under [`ExitRule::Window`].
    pub fn stranded_positions(&self) -> usize {
        match self.config.exit_rule {
            ExitRule::Window => self.ledger.count_above(self.config.max_balance_for_exit),
            ExitRule::Floor => 0,
        }
    }

    pub fn summary(&self) -> PoolSummary {
        PoolSummary {
            funds: self.funds,
            totals: self.totals,
            positions_created: self.ledger.len(),
            active_positions: self.queue.len(),
            queue_head: self.queue.head(),
            active_balance: self.ledger.total_active_balance(),
            stranded_positions: self.stranded_positions(),
        }
    }

    /// Full audit of every position; O(n) in positions ever created.
    pub fn verify_invariants(&self) -> Result<(), InvariantViolation> {
        invariants::audit(&self.ledger, &self.queue, &self.funds, &self.totals)
    }
}
