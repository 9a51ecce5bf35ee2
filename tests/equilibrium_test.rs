//! Long-run behaviour of the reference stress configuration.
//!
//! Each deposit hands positions 8.955 (turn + global share of 10) while each
//! exit withdraws 12, so at most ~74.6% of positions can ever exit and the
//! queue necessarily grows with the number of deposits. The engine has to
//! reproduce that exactly: no leaked or duplicated value, every position
//! either waiting or exited, and a verdict that flags the growth.

use fourfunds::simulation::{run_simulation_with_pool, EquilibriumVerdict, SimulationOptions};
use fourfunds::{Decimal, Tier};

const DEPOSITS: u64 = 500_000;

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

#[test]
fn test_stress_config_half_million_deposits() {
    let mut options = SimulationOptions::new(DEPOSITS);
    options.checkpoint_interval = Some(50_000);
    let (report, pool) = run_simulation_with_pool(Tier::Standard.config(), &options).unwrap();

    assert_eq!(report.deposit_count, DEPOSITS);
    assert_eq!(
        report.active_positions as u64 + report.completed_cycles,
        DEPOSITS
    );

    // Exact conservation over the whole run.
    assert_eq!(
        pool.ledger().total_active_balance() + pool.funds().total(),
        report.total_deposited - report.total_withdrawn
    );
    assert_eq!(report.total_deposited, d("5000000"));
    assert_eq!(
        report.total_withdrawn,
        d("12") * Decimal::from(report.completed_cycles)
    );
    pool.verify_invariants().unwrap();

    // Healthy throughput, but the ceiling of 100 is unreachable.
    assert!(report.exit_rate > d("55"), "exit rate {}", report.exit_rate);
    assert!(report.exit_rate < d("74.7"), "exit rate {}", report.exit_rate);
    assert!(report.peak_active_positions > 100);
    assert!(report.net_flow_ratio > d("25"));
    match &report.verdict {
        EquilibriumVerdict::Unstable { reasons } => {
            assert_eq!(reasons.len(), 1);
            assert!(reasons[0].contains("ceiling 100"));
        }
        EquilibriumVerdict::Stable => panic!("Expected Unstable verdict"),
    }

    assert_eq!(report.checkpoints.len(), 10);
    assert!(report
        .checkpoints
        .windows(2)
        .all(|w| w[0].active_positions <= w[1].active_positions));
    assert_eq!(report.checkpoints[9].deposit_index, DEPOSITS);
}

#[test]
fn test_exit_rate_stabilises() {
    let mut options = SimulationOptions::new(40_000);
    options.checkpoint_interval = Some(10_000);
    let (report, _) = run_simulation_with_pool(Tier::Standard.config(), &options).unwrap();

    let rates: Vec<Decimal> = report.checkpoints.iter().map(|c| c.exit_rate).collect();
    for pair in rates.windows(2) {
        let drift = (pair[1] - pair[0]).abs();
        assert!(drift < d("2"), "exit rate drifted {} -> {}", pair[0], pair[1]);
    }
}
