//! Deposit split and turn payout.

use crate::domain::{Decimal, PoolConfig, PositionId};
use serde::Serialize;

use super::{ActiveQueue, Funds, InvariantViolation, PositionLedger};

/// How one deposit divides across the four funds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositSplit {
    pub keeper: Decimal,
    pub admin: Decimal,
    pub turn: Decimal,
    pub global: Decimal,
    pub operational: Decimal,
}

impl DepositSplit {
    /// Split `amount` per the configured percentage table.
    ///
    /// Platform fees come off the top; turn and global are percentages of
    /// the remainder, truncated at the pool scale, and the operational share
    /// takes whatever is left so the parts always add back to `amount`.
    pub fn compute(config: &PoolConfig, amount: Decimal) -> Result<Self, InvariantViolation> {
        let share = |base: Decimal, percent: Decimal| {
            base.percent_of(percent, config.scale)
                .ok_or(InvariantViolation::ArithmeticOverflow {
                    operation: "deposit split",
                })
        };
        let keeper = share(amount, config.keeper_percent)?;
        let admin = share(amount, config.admin_percent)?;
        let user_amount = amount - keeper - admin;
        let turn = share(user_amount, config.turn_percent)?;
        let global = share(user_amount, config.global_percent)?;
        let operational = user_amount - turn - global;
        Ok(Self {
            keeper,
            admin,
            turn,
            global,
            operational,
        })
    }

    pub fn total(&self) -> Decimal {
        self.keeper + self.admin + self.turn + self.global + self.operational
    }

    /// The part of the deposit left after platform fees.
    pub fn user_amount(&self) -> Decimal {
        self.turn + self.global + self.operational
    }
}

/// Where the turn share of a deposit went.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TurnPayout {
    /// Credited to the position at the head of the queue.
    Paid { position: PositionId, amount: Decimal },
    /// The queue was empty, so the share joined the Global Pool.
    FoldedIntoPool { amount: Decimal },
}

/// Route the split: turn share to the queue head (or the Global Pool when
/// nobody is queued), the rest to their funds.
pub fn apply_split(
    split: &DepositSplit,
    ledger: &mut PositionLedger,
    queue: &ActiveQueue,
    funds: &mut Funds,
) -> Result<TurnPayout, InvariantViolation> {
    let payout = match queue.head() {
        Some(head) => {
            ledger.credit(head, split.turn)?;
            TurnPayout::Paid {
                position: head,
                amount: split.turn,
            }
        }
        None => {
            funds.global_pool += split.turn;
            TurnPayout::FoldedIntoPool { amount: split.turn }
        }
    };

    funds.global_pool += split.global;
    funds.operational += split.operational;
    funds.keeper += split.keeper;
    funds.admin += split.admin;
    Ok(payout)
}
