//! Named pool tiers.
//!
//! Every tier uses the same ratios as the standard (stress-test)
//! configuration, scaled by its entry amount: exit pays 1.2x entry and the
//! exit window is [1.2x, 4x] entry.

use crate::domain::pool_config::{ExcessPolicy, ExitRule, PoolConfig, DEFAULT_SCALE};
use crate::domain::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Micro,
    Standard,
    Plus,
    Premium,
    Elite,
    Ultra,
}

impl Tier {
    pub const ALL: [Tier; 6] = [
        Tier::Micro,
        Tier::Standard,
        Tier::Plus,
        Tier::Premium,
        Tier::Elite,
        Tier::Ultra,
    ];

    pub fn entry_amount(&self) -> Decimal {
        let whole = match self {
            Tier::Micro => 1,
            Tier::Standard => 10,
            Tier::Plus => 25,
            Tier::Premium => 50,
            Tier::Elite => 100,
            Tier::Ultra => 500,
        };
        Decimal::from_int(whole)
    }

    pub fn config(&self) -> PoolConfig {
        let entry = self.entry_amount();
        let exit = entry * ratio("1.2");
        PoolConfig {
            entry_amount: entry,
            exit_amount: exit,
            min_balance_for_exit: exit,
            max_balance_for_exit: entry * Decimal::from_int(4),
            keeper_percent: ratio("0.5"),
            admin_percent: Decimal::zero(),
            turn_percent: Decimal::from_int(35),
            global_percent: Decimal::from_int(55),
            operational_percent: Decimal::from_int(10),
            exit_rule: ExitRule::Window,
            excess_policy: ExcessPolicy::Redistribute,
            scale: DEFAULT_SCALE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Micro => "micro",
            Tier::Standard => "standard",
            Tier::Plus => "plus",
            Tier::Premium => "premium",
            Tier::Elite => "elite",
            Tier::Ultra => "ultra",
        }
    }
}

fn ratio(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap_or_default()
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tier::ALL
            .iter()
            .copied()
            .find(|tier| tier.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| format!("unknown tier {}", s))
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
