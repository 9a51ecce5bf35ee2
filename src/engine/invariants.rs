//! Ledger invariants and the full audit.

use crate::domain::{Decimal, PositionId};
use thiserror::Error;

use super::{ActiveQueue, Funds, PositionLedger, SystemTotals};

/// A state the engine must never reach. Any violation aborts the deposit
/// event that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("position {position} would hold a negative balance ({balance})")]
    NegativeBalance {
        position: PositionId,
        balance: Decimal,
    },
    #[error("position {position} is out of sync between the queue and the ledger")]
    QueueOutOfSync { position: PositionId },
    #[error("queue holds {queue} ids but the ledger has {active} active positions")]
    QueueLengthMismatch { queue: usize, active: usize },
    #[error("position {position} has already exited")]
    DoubleExit { position: PositionId },
    #[error("queue head {position} is not an active position")]
    InactiveQueueHead { position: PositionId },
    #[error("exit of position {position} is short {shortfall} after draining reserve and operational fund")]
    Insolvent {
        position: PositionId,
        shortfall: Decimal,
    },
    #[error("{operation} overflowed the decimal range")]
    ArithmeticOverflow { operation: &'static str },
    #[error("conservation broken: net flow is {expected} but the pool holds {actual}")]
    ConservationBroken { expected: Decimal, actual: Decimal },
}

/// O(1) conservation check: everything deposited and not withdrawn is
/// either in a position balance or in one of the funds.
pub fn check_conservation(
    ledger: &PositionLedger,
    funds: &Funds,
    totals: &SystemTotals,
) -> Result<(), InvariantViolation> {
    let expected = totals.net_flow();
    let actual = ledger.total_active_balance() + funds.total();
    if expected != actual {
        return Err(InvariantViolation::ConservationBroken { expected, actual });
    }
    Ok(())
}

/// Full O(n) audit over every position ever created.
///
/// Checks flag exclusivity, non-negative balances, queue membership against
/// `is_active`, the exit index, and conservation recomputed from scratch.
pub fn audit(
    ledger: &PositionLedger,
    queue: &ActiveQueue,
    funds: &Funds,
    totals: &SystemTotals,
) -> Result<(), InvariantViolation> {
    let accrued = ledger.accrued();
    let mut active = 0usize;
    let mut balances = Decimal::zero();

    for position in ledger.iter() {
        if position.is_active == position.has_exited {
            return Err(InvariantViolation::QueueOutOfSync {
                position: position.id,
            });
        }

        let balance = position.balance(accrued);
        if balance.is_negative() {
            return Err(InvariantViolation::NegativeBalance {
                position: position.id,
                balance,
            });
        }

        if position.is_active {
            active += 1;
            balances += balance;
            if !queue.contains(position.id) {
                return Err(InvariantViolation::QueueOutOfSync {
                    position: position.id,
                });
            }
        } else if !balance.is_zero() || position.exited_at.is_none() {
            return Err(InvariantViolation::QueueOutOfSync {
                position: position.id,
            });
        }
    }

    if queue.len() != active || ledger.active_count() != active || ledger.indexed() != active {
        return Err(InvariantViolation::QueueLengthMismatch {
            queue: queue.len(),
            active,
        });
    }

    let expected = totals.net_flow();
    let actual = balances + funds.total();
    if expected != actual {
        return Err(InvariantViolation::ConservationBroken { expected, actual });
    }

    Ok(())
}
