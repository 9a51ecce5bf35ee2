use crate::domain::{Address, Decimal, Position, PositionId, Seq};
use std::collections::{BTreeSet, HashSet};
use std::ops::Bound;

use super::InvariantViolation;

/// Every position ever created, indexed by id.
///
/// Dispersal is pull-based: instead of writing a share into every active
/// position, the ledger bumps a single `accrued` counter and each position
/// resolves its balance against it on read. Active positions are also kept
/// in an index ordered by `balance - accrued`, which dispersal never
/// reorders, so "which balances fall in [lo, hi]" is a range query.
#[derive(Debug, Default)]
pub struct PositionLedger {
    positions: Vec<Position>,
    accrued: Decimal,
    exit_index: BTreeSet<(Decimal, PositionId)>,
    // Sum of exit keys over active positions.
    key_sum: Decimal,
    active_count: usize,
    journal: Option<Journal>,
}

/// Undo information for the event in progress.
#[derive(Debug)]
struct Journal {
    len: usize,
    accrued: Decimal,
    key_sum: Decimal,
    active_count: usize,
    originals: Vec<Position>,
    seen: HashSet<PositionId>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.active_count
    }

    /// Cumulative per-position dispersal since the ledger was created.
    pub fn accrued(&self) -> Decimal {
        self.accrued
    }

    pub fn get(&self, id: PositionId) -> Option<&Position> {
        if id.as_u64() == 0 {
            return None;
        }
        self.positions.get(id.index())
    }

    pub fn balance_of(&self, id: PositionId) -> Option<Decimal> {
        self.get(id).map(|p| p.balance(self.accrued))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter()
    }

    /// Sum of all active balances, without scanning.
    pub fn total_active_balance(&self) -> Decimal {
        self.key_sum + Decimal::from(self.active_count as u64) * self.accrued
    }

    pub(crate) fn indexed(&self) -> usize {
        self.exit_index.len()
    }

    /// Create a new active position with a zero balance.
    pub fn open(&mut self, owner: Address, joined_at: Seq) -> PositionId {
        let id = PositionId::new(self.positions.len() as u64 + 1);
        let position = Position::open(id, owner, joined_at, self.accrued);
        self.exit_index.insert((position.exit_key(), id));
        self.key_sum += position.exit_key();
        self.active_count += 1;
        self.positions.push(position);
        id
    }

    /// Add `amount` directly to an active position. Returns the new balance.
    pub fn credit(&mut self, id: PositionId, amount: Decimal) -> Result<Decimal, InvariantViolation> {
        let accrued = self.accrued;
        let current = self
            .get(id)
            .ok_or(InvariantViolation::QueueOutOfSync { position: id })?;
        if !current.is_active {
            return Err(InvariantViolation::InactiveQueueHead { position: id });
        }
        let new_balance = current.balance(accrued) + amount;
        if new_balance.is_negative() {
            return Err(InvariantViolation::NegativeBalance {
                position: id,
                balance: new_balance,
            });
        }

        self.touch(id);
        let position = &mut self.positions[id.index()];
        let old_key = position.exit_key();
        position.credited = new_balance;
        position.mark = accrued;
        let new_key = position.exit_key();

        self.exit_index.remove(&(old_key, id));
        self.exit_index.insert((new_key, id));
        self.key_sum += new_key - old_key;
        Ok(new_balance)
    }

    /// Give every active position `per_position` more balance.
    pub fn accrue_all(&mut self, per_position: Decimal) {
        if self.active_count > 0 {
            self.accrued += per_position;
        }
    }

    /// Exit an active position: flip its flags, zero its balance, and
    /// return the balance it held.
    pub fn close(&mut self, id: PositionId, exited_at: Seq) -> Result<Decimal, InvariantViolation> {
        let accrued = self.accrued;
        let current = self
            .get(id)
            .ok_or(InvariantViolation::QueueOutOfSync { position: id })?;
        if current.has_exited {
            return Err(InvariantViolation::DoubleExit { position: id });
        }
        if !current.is_active {
            return Err(InvariantViolation::QueueOutOfSync { position: id });
        }
        let balance = current.balance(accrued);
        if balance.is_negative() {
            return Err(InvariantViolation::NegativeBalance {
                position: id,
                balance,
            });
        }

        self.touch(id);
        let position = &mut self.positions[id.index()];
        let key = position.exit_key();
        position.is_active = false;
        position.has_exited = true;
        position.exited_at = Some(exited_at);
        position.credited = Decimal::zero();
        position.mark = accrued;

        self.exit_index.remove(&(key, id));
        self.key_sum -= key;
        self.active_count -= 1;
        Ok(balance)
    }

    /// Active positions whose balance lies in `[lo, hi]` (`hi = None` means
    /// unbounded), in id order.
    pub fn ids_with_balance_between(&self, lo: Decimal, hi: Option<Decimal>) -> Vec<PositionId> {
        let start = Bound::Included((lo - self.accrued, PositionId::new(0)));
        let end = match hi {
            Some(hi) => Bound::Included((hi - self.accrued, PositionId::new(u64::MAX))),
            None => Bound::Unbounded,
        };
        if let (Bound::Included(s), Bound::Included(e)) = (&start, &end) {
            if s > e {
                return Vec::new();
            }
        }

        let mut ids: Vec<PositionId> = self
            .exit_index
            .range((start, end))
            .map(|(_, id)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Number of active positions holding strictly more than `threshold`.
    pub fn count_above(&self, threshold: Decimal) -> usize {
        let start = Bound::Excluded((threshold - self.accrued, PositionId::new(u64::MAX)));
        self.exit_index.range((start, Bound::Unbounded)).count()
    }

    // =========================================================================
    // Event journal
    // =========================================================================

    /// Start recording undo information for a deposit event.
    pub(crate) fn begin(&mut self) {
        self.journal = Some(Journal {
            len: self.positions.len(),
            accrued: self.accrued,
            key_sum: self.key_sum,
            active_count: self.active_count,
            originals: Vec::new(),
            seen: HashSet::new(),
        });
    }

    pub(crate) fn commit(&mut self) {
        self.journal = None;
    }

    /// Undo everything since `begin`. Returns the ids whose queue
    /// membership may have changed.
    pub(crate) fn rollback(&mut self) -> Vec<PositionId> {
        let Some(journal) = self.journal.take() else {
            return Vec::new();
        };
        let mut affected = Vec::new();

        for position in &self.positions[journal.len..] {
            if position.is_active {
                self.exit_index.remove(&(position.exit_key(), position.id));
            }
            affected.push(position.id);
        }
        self.positions.truncate(journal.len);

        for original in journal.originals.into_iter().rev() {
            let slot = &mut self.positions[original.id.index()];
            if slot.is_active {
                self.exit_index.remove(&(slot.exit_key(), slot.id));
            }
            if original.is_active {
                self.exit_index.insert((original.exit_key(), original.id));
            }
            affected.push(original.id);
            *slot = original;
        }

        self.accrued = journal.accrued;
        self.key_sum = journal.key_sum;
        self.active_count = journal.active_count;
        affected
    }

    fn touch(&mut self, id: PositionId) {
        if let Some(journal) = self.journal.as_mut() {
            if id.index() < journal.len && journal.seen.insert(id) {
                journal.originals.push(self.positions[id.index()].clone());
            }
        }
    }
}
