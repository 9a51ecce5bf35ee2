//! Global Pool dispersal.

use crate::domain::Decimal;
use serde::Serialize;

use super::{ActiveQueue, Funds, InvariantViolation, PositionLedger};

/// Result of one dispersal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dispersal {
    pub recipients: usize,
    pub per_position: Decimal,
    /// Sub-unit remainder left in the Global Pool for the next dispersal.
    pub remainder: Decimal,
}

/// Divide the Global Pool evenly across every active position.
///
/// The share is truncated at `scale`; whatever cannot be split into whole
/// units stays in the pool. Returns `None` when there is nothing to hand out
/// (empty pool, empty queue, or a pool smaller than one unit per position).
pub fn disperse_global_pool(
    ledger: &mut PositionLedger,
    queue: &ActiveQueue,
    funds: &mut Funds,
    scale: u32,
) -> Result<Option<Dispersal>, InvariantViolation> {
    if queue.len() != ledger.active_count() {
        return Err(InvariantViolation::QueueLengthMismatch {
            queue: queue.len(),
            active: ledger.active_count(),
        });
    }

    let recipients = queue.len();
    if recipients == 0 || !funds.global_pool.is_positive() {
        return Ok(None);
    }

    let per_position = funds.global_pool.split_evenly(recipients as u64, scale);
    if per_position.is_zero() {
        return Ok(None);
    }

    ledger.accrue_all(per_position);
    funds.global_pool -= per_position * Decimal::from(recipients as u64);

    Ok(Some(Dispersal {
        recipients,
        per_position,
        remainder: funds.global_pool,
    }))
}
