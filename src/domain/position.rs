//! Position record.

use crate::domain::{Address, Decimal, PositionId, Seq};
use serde::Serialize;

/// One participant's stake in a pool.
///
/// Balances are pull-based: `credited` is the balance as of the moment the
/// pool-wide accrual stood at `mark`, and every unit of accrual since then
/// belongs to this position too. Use [`Position::balance`] to read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub id: PositionId,
    pub owner: Address,
    pub joined_at: Seq,
    pub exited_at: Option<Seq>,
    pub is_active: bool,
    pub has_exited: bool,
    pub(crate) credited: Decimal,
    pub(crate) mark: Decimal,
}

impl Position {
    pub(crate) fn open(id: PositionId, owner: Address, joined_at: Seq, accrued: Decimal) -> Self {
        Self {
            id,
            owner,
            joined_at,
            exited_at: None,
            is_active: true,
            has_exited: false,
            credited: Decimal::zero(),
            mark: accrued,
        }
    }

    /// Balance given the pool-wide accrual. Exited positions hold nothing.
    pub fn balance(&self, accrued: Decimal) -> Decimal {
        if self.is_active {
            self.credited + (accrued - self.mark)
        } else {
            self.credited
        }
    }

    /// Ordering key for the exit index: balance minus accrual. Dispersal
    /// moves every balance by the same amount, so the key only changes on a
    /// direct credit.
    pub(crate) fn exit_key(&self) -> Decimal {
        self.credited - self.mark
    }

    /// Events spent in the queue, once exited.
    pub fn wait_time(&self) -> Option<u64> {
        self.exited_at.map(|exited| exited.since(self.joined_at))
    }

    pub fn view(&self, accrued: Decimal) -> PositionView {
        PositionView {
            id: self.id,
            owner: self.owner.clone(),
            balance: self.balance(accrued),
            is_active: self.is_active,
            has_exited: self.has_exited,
            joined_at: self.joined_at,
            exited_at: self.exited_at,
        }
    }
}

/// Read-only snapshot of a position with its balance resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionView {
    pub id: PositionId,
    pub owner: Address,
    pub balance: Decimal,
    pub is_active: bool,
    pub has_exited: bool,
    pub joined_at: Seq,
    pub exited_at: Option<Seq>,
}
