//! Pool configuration: entry/exit amounts, the exit window, and the
//! percentage table that routes each deposit into the four funds.

use crate::domain::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest supported fixed-point scale.
pub const MAX_SCALE: u32 = 18;

/// Default scale: 6 decimal places (micro-USDT).
pub const DEFAULT_SCALE: u32 = 6;

/// Significant digits a `Decimal` carries exactly.
const DECIMAL_DIGITS: u32 = 28;

/// Digits kept free above the largest amount for running totals and
/// deposit counts (about 10^10 deposits).
const TOTALS_HEADROOM_DIGITS: u32 = 10;

/// Which balances the auto-exit evaluator treats as exit-eligible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitRule {
    /// `minBalanceForExit <= balance <= maxBalanceForExit`. A balance that
    /// jumps past the upper bound is never exited.
    #[default]
    Window,
    /// `balance >= minBalanceForExit`; the payout stays capped at `exitAmount`.
    Floor,
}

/// Where the part of an exiting balance above `exitAmount` goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExcessPolicy {
    /// Cap and redistribute: excess returns to the Global Pool.
    #[default]
    Redistribute,
    /// Excess is parked in the Reserve and never dispersed.
    Retain,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolConfig {
    pub entry_amount: Decimal,
    pub exit_amount: Decimal,
    pub min_balance_for_exit: Decimal,
    pub max_balance_for_exit: Decimal,
    pub keeper_percent: Decimal,
    #[serde(default)]
    pub admin_percent: Decimal,
    pub turn_percent: Decimal,
    pub global_percent: Decimal,
    pub operational_percent: Decimal,
    #[serde(default)]
    pub exit_rule: ExitRule,
    #[serde(default)]
    pub excess_policy: ExcessPolicy,
    #[serde(default = "default_scale")]
    pub scale: u32,
}

fn default_scale() -> u32 {
    DEFAULT_SCALE
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("entryAmount must be positive, got {0}")]
    NonPositiveEntryAmount(Decimal),
    #[error("exitAmount must be positive, got {0}")]
    NonPositiveExitAmount(Decimal),
    #[error("{field} must be within [0, 100], got {value}")]
    PercentOutOfRange { field: &'static str, value: Decimal },
    #[error("keeperPercent + adminPercent must be below 100, got {0}")]
    FeesConsumeDeposit(Decimal),
    #[error("turnPercent + globalPercent + operationalPercent must equal 100, got {0}")]
    SplitDoesNotSumToHundred(Decimal),
    #[error("minBalanceForExit ({min}) exceeds maxBalanceForExit ({max})")]
    InvertedExitWindow { min: Decimal, max: Decimal },
    #[error("minBalanceForExit must not be negative, got {0}")]
    NegativeExitFloor(Decimal),
    #[error("scale must be at most {}, got {0}", MAX_SCALE)]
    ScaleTooLarge(u32),
    #[error("{field} ({value}) must be below {limit} at scale {scale}")]
    AmountTooLarge {
        field: &'static str,
        value: Decimal,
        limit: Decimal,
        scale: u32,
    },
    #[error("{field} ({value}) has more than {scale} decimal places")]
    NotRepresentable {
        field: &'static str,
        value: Decimal,
        scale: u32,
    },
}

impl PoolConfig {
    /// Check every configuration constraint. Pure: the same input always
    /// yields the same result.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.scale > MAX_SCALE {
            return Err(ConfigurationError::ScaleTooLarge(self.scale));
        }
        if !self.entry_amount.is_positive() {
            return Err(ConfigurationError::NonPositiveEntryAmount(self.entry_amount));
        }
        if !self.exit_amount.is_positive() {
            return Err(ConfigurationError::NonPositiveExitAmount(self.exit_amount));
        }

        for (field, value) in self.percent_fields() {
            if value.is_negative() || value > Decimal::hundred() {
                return Err(ConfigurationError::PercentOutOfRange { field, value });
            }
        }

        let fees = self.keeper_percent + self.admin_percent;
        if fees >= Decimal::hundred() {
            return Err(ConfigurationError::FeesConsumeDeposit(fees));
        }

        let split = self.turn_percent + self.global_percent + self.operational_percent;
        if split != Decimal::hundred() {
            return Err(ConfigurationError::SplitDoesNotSumToHundred(split));
        }

        if self.min_balance_for_exit.is_negative() {
            return Err(ConfigurationError::NegativeExitFloor(self.min_balance_for_exit));
        }
        if self.min_balance_for_exit > self.max_balance_for_exit {
            return Err(ConfigurationError::InvertedExitWindow {
                min: self.min_balance_for_exit,
                max: self.max_balance_for_exit,
            });
        }

        for (field, value) in self.amount_fields() {
            if !value.is_representable_at(self.scale) {
                return Err(ConfigurationError::NotRepresentable {
                    field,
                    value,
                    scale: self.scale,
                });
            }
        }

        let limit = Self::amount_limit(self.scale);
        for (field, value) in self.amount_fields() {
            if value >= limit {
                return Err(ConfigurationError::AmountTooLarge {
                    field,
                    value,
                    limit,
                    scale: self.scale,
                });
            }
        }

        Ok(())
    }

    /// Exclusive upper bound on any configured amount at `scale`:
    /// `10^(28 - scale - 10)`, which keeps every running total exact.
    pub fn amount_limit(scale: u32) -> Decimal {
        let exponent = DECIMAL_DIGITS.saturating_sub(scale + TOTALS_HEADROOM_DIGITS);
        Decimal::pow10(exponent).unwrap_or_else(Decimal::zero)
    }

    fn percent_fields(&self) -> [(&'static str, Decimal); 5] {
        [
            ("keeperPercent", self.keeper_percent),
            ("adminPercent", self.admin_percent),
            ("turnPercent", self.turn_percent),
            ("globalPercent", self.global_percent),
            ("operationalPercent", self.operational_percent),
        ]
    }

    fn amount_fields(&self) -> [(&'static str, Decimal); 4] {
        [
            ("entryAmount", self.entry_amount),
            ("exitAmount", self.exit_amount),
            ("minBalanceForExit", self.min_balance_for_exit),
            ("maxBalanceForExit", self.max_balance_for_exit),
        ]
    }

    /// Canonical JSON used for fingerprinting and storage.
    pub fn to_canonical_json(&self) -> String {
        serde_json::json!({
            "entryAmount": self.entry_amount.to_canonical_string(),
            "exitAmount": self.exit_amount.to_canonical_string(),
            "minBalanceForExit": self.min_balance_for_exit.to_canonical_string(),
            "maxBalanceForExit": self.max_balance_for_exit.to_canonical_string(),
            "keeperPercent": self.keeper_percent.to_canonical_string(),
            "adminPercent": self.admin_percent.to_canonical_string(),
            "turnPercent": self.turn_percent.to_canonical_string(),
            "globalPercent": self.global_percent.to_canonical_string(),
            "operationalPercent": self.operational_percent.to_canonical_string(),
            "exitRule": self.exit_rule,
            "excessPolicy": self.excess_policy,
            "scale": self.scale,
        })
        .to_string()
    }

    /// Hex SHA-256 of the canonical JSON.
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(self.to_canonical_json().as_bytes());
        hex::encode(hasher.finalize())
    }
}
