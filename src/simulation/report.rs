//! Equilibrium metrics and the stable/unstable verdict.

use crate::domain::Decimal;
use crate::engine::{Funds, Pool};
use serde::{Deserialize, Serialize};

/// Tunable thresholds for the equilibrium verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquilibriumThresholds {
    /// The active queue must never exceed this many positions.
    pub active_ceiling: usize,
    /// Minimum healthy exit rate, in percent of deposits.
    pub healthy_exit_rate: Decimal,
}

impl Default for EquilibriumThresholds {
    fn default() -> Self {
        Self {
            active_ceiling: 100,
            healthy_exit_rate: Decimal::from_int(55),
        }
    }
}

/// Metrics captured after a given deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub deposit_index: u64,
    pub active_positions: usize,
    pub completed_cycles: u64,
    pub exit_rate: Decimal,
    pub net_flow_ratio: Decimal,
    pub avg_wait_time: Option<Decimal>,
    pub global_pool: Decimal,
    pub stranded_positions: usize,
}

impl Checkpoint {
    pub fn capture(pool: &Pool) -> Self {
        let totals = pool.totals();
        Self {
            deposit_index: totals.deposit_count(),
            active_positions: pool.queue().len(),
            completed_cycles: totals.completed_cycles,
            exit_rate: exit_rate(totals.completed_cycles, totals.deposit_count()),
            net_flow_ratio: totals
                .net_flow()
                .ratio_percent(totals.total_deposited)
                .unwrap_or_default(),
            avg_wait_time: avg_wait_time(totals.wait_sum, totals.completed_cycles),
            global_pool: pool.funds().global_pool,
            stranded_positions: pool.stranded_positions(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum EquilibriumVerdict {
    Stable,
    Unstable { reasons: Vec<String> },
}

impl EquilibriumVerdict {
    pub fn is_stable(&self) -> bool {
        matches!(self, EquilibriumVerdict::Stable)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EquilibriumVerdict::Stable => "stable",
            EquilibriumVerdict::Unstable { .. } => "unstable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquilibriumReport {
    pub deposit_count: u64,
    pub active_positions: usize,
    pub peak_active_positions: usize,
    pub completed_cycles: u64,
    pub exit_rate: Decimal,
    pub net_flow: Decimal,
    pub net_flow_ratio: Decimal,
    pub avg_wait_time: Option<Decimal>,
    pub stranded_positions: usize,
    pub total_deposited: Decimal,
    pub total_withdrawn: Decimal,
    pub funds: FundsReport,
    pub thresholds: EquilibriumThresholds,
    pub checkpoints: Vec<Checkpoint>,
    pub verdict: EquilibriumVerdict,
}

/// Fund balances at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundsReport {
    pub global_pool: Decimal,
    pub operational: Decimal,
    pub keeper: Decimal,
    pub admin: Decimal,
    pub reserve: Decimal,
}

impl From<&Funds> for FundsReport {
    fn from(funds: &Funds) -> Self {
        Self {
            global_pool: funds.global_pool,
            operational: funds.operational,
            keeper: funds.keeper,
            admin: funds.admin,
            reserve: funds.reserve,
        }
    }
}

impl EquilibriumReport {
    /// Build the final report from a pool's post-run state.
    pub fn from_pool(
        pool: &Pool,
        peak_active_positions: usize,
        thresholds: EquilibriumThresholds,
        checkpoints: Vec<Checkpoint>,
    ) -> Self {
        let totals = pool.totals();
        let last = Checkpoint::capture(pool);
        let verdict = classify(peak_active_positions, last.exit_rate, &thresholds);

        Self {
            deposit_count: totals.deposit_count(),
            active_positions: last.active_positions,
            peak_active_positions,
            completed_cycles: totals.completed_cycles,
            exit_rate: last.exit_rate,
            net_flow: totals.net_flow(),
            net_flow_ratio: last.net_flow_ratio,
            avg_wait_time: last.avg_wait_time,
            stranded_positions: last.stranded_positions,
            total_deposited: totals.total_deposited,
            total_withdrawn: totals.total_withdrawn,
            funds: FundsReport::from(pool.funds()),
            thresholds,
            checkpoints,
            verdict,
        }
    }
}

/// `completed / deposits * 100`, 4 decimal places.
pub fn exit_rate(completed_cycles: u64, deposit_count: u64) -> Decimal {
    Decimal::from(completed_cycles)
        .ratio_percent(Decimal::from(deposit_count))
        .unwrap_or_default()
}

/// Mean events-in-queue over exited positions.
pub fn avg_wait_time(wait_sum: u64, completed_cycles: u64) -> Option<Decimal> {
    if completed_cycles == 0 {
        return None;
    }
    let mean = Decimal::from(wait_sum) / Decimal::from(completed_cycles);
    Some(Decimal::new(mean.inner().round_dp(4)))
}

pub fn classify(
    peak_active_positions: usize,
    exit_rate: Decimal,
    thresholds: &EquilibriumThresholds,
) -> EquilibriumVerdict {
    let mut reasons = Vec::new();
    if peak_active_positions > thresholds.active_ceiling {
        reasons.push(format!(
            "active positions peaked at {} (ceiling {})",
            peak_active_positions, thresholds.active_ceiling
        ));
    }
    if exit_rate < thresholds.healthy_exit_rate {
        reasons.push(format!(
            "exit rate {}% below healthy {}%",
            exit_rate, thresholds.healthy_exit_rate
        ));
    }

    if reasons.is_empty() {
        EquilibriumVerdict::Stable
    } else {
        EquilibriumVerdict::Unstable { reasons }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_exit_rate() {
        assert_eq!(exit_rate(3, 8), d("37.5"));
        assert_eq!(exit_rate(0, 0), Decimal::zero());
    }

    #[test]
    fn test_avg_wait_time() {
        assert_eq!(avg_wait_time(7, 3), Some(d("2.3333")));
        assert_eq!(avg_wait_time(0, 0), None);
    }

    #[test]
    fn test_classify_stable() {
        let verdict = classify(40, d("62.3"), &EquilibriumThresholds::default());
        assert!(verdict.is_stable());
        assert_eq!(verdict.as_str(), "stable");
    }

    #[test]
    fn test_classify_reports_every_reason() {
        let verdict = classify(500, d("40"), &EquilibriumThresholds::default());
        match verdict {
            EquilibriumVerdict::Unstable { reasons } => {
                assert_eq!(reasons.len(), 2);
                assert!(reasons[0].contains("peaked at 500"));
                assert!(reasons[1].contains("exit rate 40%"));
            }
            EquilibriumVerdict::Stable => panic!("Expected Unstable verdict"),
        }
    }

    #[test]
    fn test_verdict_serialization() {
        let json = serde_json::to_value(EquilibriumVerdict::Stable).unwrap();
        assert_eq!(json["status"], "stable");
        let json = serde_json::to_value(EquilibriumVerdict::Unstable {
            reasons: vec!["x".to_string()],
        })
        .unwrap();
        assert_eq!(json["status"], "unstable");
        assert_eq!(json["reasons"][0], "x");
    }
}
