//! Domain primitives: PositionId, Seq, Address.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Sequential position identifier, assigned from 1 and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PositionId(pub u64);

impl PositionId {
    pub fn new(id: u64) -> Self {
        PositionId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Zero-based slot in the ledger.
    pub(crate) fn index(&self) -> usize {
        (self.0 - 1) as usize
    }
}

impl std::fmt::Display for PositionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deposit-event index. Event `n` is the n-th deposit applied to a pool.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Seq(pub u64);

impl Seq {
    pub fn new(seq: u64) -> Self {
        Seq(seq)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn next(&self) -> Seq {
        Seq(self.0 + 1)
    }

    /// Number of events between `earlier` and `self`.
    pub fn since(&self, earlier: Seq) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

/// Opaque owner identity (address-equivalent).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(pub String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("address must be a non-empty string without whitespace")]
pub struct AddressParseError;

impl Address {
    /// Deterministic placeholder owner used by the simulation driver.
    pub fn synthetic(n: u64) -> Self {
        Address(format!("0x{:040x}", n))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
            return Err(AddressParseError);
        }
        Ok(Address(trimmed.to_lowercase()))
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
