//! Auto-exit evaluation: pay out positions whose balance reached the exit
//! range and recycle what they held above the fixed payout.

use crate::domain::{Address, Decimal, ExcessPolicy, ExitRule, PoolConfig, PositionId, Seq};
use serde::Serialize;
use tracing::debug;

use super::{ActiveQueue, Funds, InvariantViolation, PositionLedger, SystemTotals};

/// One completed exit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitRecord {
    pub position: PositionId,
    pub owner: Address,
    /// Ledger balance at the moment of exit.
    pub balance: Decimal,
    /// Fixed amount paid out externally.
    pub payout: Decimal,
    /// `balance - payout`. Positive excess is recycled; negative is a
    /// shortfall covered from the reserve and operational fund.
    pub excess: Decimal,
    pub wait_time: u64,
}

/// Ids that qualify for exit under the configured rule, in queue order.
pub fn exit_candidates(config: &PoolConfig, ledger: &PositionLedger) -> Vec<PositionId> {
    let upper = match config.exit_rule {
        ExitRule::Window => Some(config.max_balance_for_exit),
        ExitRule::Floor => None,
    };
    ledger.ids_with_balance_between(config.min_balance_for_exit, upper)
}

/// Exit every qualifying position, in queue order, within the current event.
pub fn evaluate_auto_exits(
    config: &PoolConfig,
    ledger: &mut PositionLedger,
    queue: &mut ActiveQueue,
    funds: &mut Funds,
    totals: &mut SystemTotals,
    seq: Seq,
) -> Result<Vec<ExitRecord>, InvariantViolation> {
    let candidates = exit_candidates(config, ledger);
    let mut exits = Vec::with_capacity(candidates.len());

    for id in candidates {
        let balance = ledger.close(id, seq)?;
        if !queue.remove(id) {
            return Err(InvariantViolation::QueueOutOfSync { position: id });
        }

        let payout = config.exit_amount;
        let excess = balance - payout;
        if excess.is_positive() {
            match config.excess_policy {
                ExcessPolicy::Redistribute => funds.global_pool += excess,
                ExcessPolicy::Retain => funds.reserve += excess,
            }
        } else if excess.is_negative() {
            cover_shortfall(id, -excess, funds)?;
        }

        // Closed above, so the record is present.
        let (owner, wait_time) = ledger
            .get(id)
            .map(|p| (p.owner.clone(), p.wait_time().unwrap_or(0)))
            .ok_or(InvariantViolation::QueueOutOfSync { position: id })?;

        totals.total_withdrawn += payout;
        totals.completed_cycles += 1;
        totals.wait_sum += wait_time;

        debug!(
            position = %id,
            balance = %balance,
            excess = %excess,
            wait_time,
            "position auto-exited"
        );

        exits.push(ExitRecord {
            position: id,
            owner,
            balance,
            payout,
            excess,
            wait_time,
        });
    }

    Ok(exits)
}

/// Pay a shortfall from the reserve first, then the operational fund.
fn cover_shortfall(
    position: PositionId,
    shortfall: Decimal,
    funds: &mut Funds,
) -> Result<(), InvariantViolation> {
    let from_reserve = shortfall.min(funds.reserve);
    let remaining = shortfall - from_reserve;
    if remaining > funds.operational {
        return Err(InvariantViolation::Insolvent {
            position,
            shortfall: remaining - funds.operational,
        });
    }
    funds.reserve -= from_reserve;
    funds.operational -= remaining;
    Ok(())
}
