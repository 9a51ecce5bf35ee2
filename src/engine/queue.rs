use crate::domain::PositionId;
use std::collections::BTreeSet;

use super::InvariantViolation;

/// FIFO of active position ids.
///
/// Ids are handed out in increasing order and only ever appended at the
/// tail, so FIFO order is ascending id order. Storing the ids in an ordered
/// set keeps removal from the middle at O(log n) while the survivors keep
/// their relative order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveQueue {
    ids: BTreeSet<PositionId>,
}

impl ActiveQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The position currently in turn.
    pub fn head(&self) -> Option<PositionId> {
        self.ids.first().copied()
    }

    pub fn tail(&self) -> Option<PositionId> {
        self.ids.last().copied()
    }

    pub fn contains(&self, id: PositionId) -> bool {
        self.ids.contains(&id)
    }

    /// Append at the tail. The id must be newer than every queued id.
    pub fn push_back(&mut self, id: PositionId) -> Result<(), InvariantViolation> {
        if self.tail().is_some_and(|tail| tail >= id) {
            return Err(InvariantViolation::QueueOutOfSync { position: id });
        }
        self.ids.insert(id);
        Ok(())
    }

    /// Remove from anywhere in the queue. Returns false if absent.
    pub fn remove(&mut self, id: PositionId) -> bool {
        self.ids.remove(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = PositionId> + '_ {
        self.ids.iter().copied()
    }

    /// Force membership to match `active`; used when undoing an event.
    pub(crate) fn resync(&mut self, id: PositionId, active: bool) {
        if active {
            self.ids.insert(id);
        } else {
            self.ids.remove(&id);
        }
    }
}
