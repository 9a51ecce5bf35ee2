use fourfunds::domain::{ConfigurationError, ExcessPolicy, ExitRule};
use fourfunds::engine::TurnPayout;
use fourfunds::{Address, Decimal, EngineError, InvariantViolation, Pool, PoolConfig, PositionId, Tier};

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

fn id(n: u64) -> PositionId {
    PositionId::new(n)
}

/// `(position, balance)` for every active position, in queue order.
fn queue_balances(pool: &Pool) -> Vec<(u64, Decimal)> {
    pool.active_positions()
        .map(|p| (p.id.as_u64(), p.balance))
        .collect()
}

fn conserved(pool: &Pool) -> bool {
    pool.ledger().total_active_balance() + pool.funds().total() == pool.totals().net_flow()
}

fn config(
    keeper: &str,
    turn: &str,
    global: &str,
    operational: &str,
    exit: &str,
    min: &str,
    max: &str,
) -> PoolConfig {
    PoolConfig {
        entry_amount: d("10"),
        exit_amount: d(exit),
        min_balance_for_exit: d(min),
        max_balance_for_exit: d(max),
        keeper_percent: d(keeper),
        admin_percent: Decimal::zero(),
        turn_percent: d(turn),
        global_percent: d(global),
        operational_percent: d(operational),
        exit_rule: ExitRule::Window,
        excess_policy: ExcessPolicy::Redistribute,
        scale: 6,
    }
}

#[test]
fn test_stress_config_first_eight_deposits() {
    let mut pool = Pool::for_tier(Tier::Standard).unwrap();
    let mut exited = Vec::new();

    for n in 1..=8 {
        let outcome = pool.join(Address::synthetic(n)).unwrap();
        assert_eq!(outcome.position, id(n));
        exited.extend(outcome.exits.iter().map(|e| (n, e.position.as_u64(), e.balance)));
        assert!(conserved(&pool), "conservation broken after deposit {}", n);
        pool.verify_invariants().unwrap();

        match n {
            1 => {
                assert_eq!(pool.funds().global_pool, d("8.955"));
                assert_eq!(pool.funds().operational, d("0.995"));
                assert_eq!(pool.funds().keeper, d("0.05"));
                assert_eq!(queue_balances(&pool), vec![(1, d("0"))]);
            }
            2 => {
                assert_eq!(pool.funds().global_pool, d("5.91"));
                assert_eq!(queue_balances(&pool), vec![(2, d("0"))]);
            }
            3 => {
                assert_eq!(pool.funds().global_pool, d("2.865"));
                assert_eq!(queue_balances(&pool), vec![(3, d("0"))]);
            }
            4 => {
                assert_eq!(pool.funds().global_pool, Decimal::zero());
                assert_eq!(queue_balances(&pool), vec![(3, d("11.82")), (4, d("0"))]);
            }
            5 => {
                assert_eq!(pool.funds().global_pool, d("6.03875"));
                assert_eq!(queue_balances(&pool), vec![(4, d("2.73625")), (5, d("0"))]);
            }
            6 => {
                assert_eq!(pool.funds().global_pool, Decimal::zero());
                assert_eq!(
                    queue_balances(&pool),
                    vec![(4, d("11.974375")), (5, d("5.755625")), (6, d("0"))]
                );
            }
            7 => {
                assert_eq!(pool.funds().global_pool, d("5.281043"));
                assert_eq!(pool.funds().operational, d("6.965"));
                assert_eq!(pool.funds().keeper, d("0.35"));
                assert_eq!(
                    queue_balances(&pool),
                    vec![(5, d("7.579791")), (6, d("1.824166")), (7, d("0"))]
                );
            }
            8 => {
                assert_eq!(pool.funds().global_pool, d("2.646806"));
                assert_eq!(
                    queue_balances(&pool),
                    vec![(6, d("5.40868")), (7, d("3.584514")), (8, d("0"))]
                );
            }
            _ => unreachable!(),
        }
    }

    assert_eq!(
        exited,
        vec![
            (2, 1, d("17.91")),
            (3, 2, d("14.865")),
            (5, 3, d("18.03875")),
            (7, 4, d("17.281041")),
            (8, 5, d("14.646805")),
        ]
    );
    assert_eq!(pool.totals().completed_cycles, 5);
    assert_eq!(pool.totals().total_withdrawn, d("60"));
}

#[test]
fn test_first_deposit_folds_turn_share_into_pool() {
    let mut pool = Pool::for_tier(Tier::Standard).unwrap();
    let outcome = pool.join(Address::synthetic(1)).unwrap();

    assert_eq!(
        outcome.turn_payout,
        TurnPayout::FoldedIntoPool { amount: d("3.4825") }
    );
    assert_eq!(pool.balance_of(id(1)).unwrap(), Decimal::zero());
    assert_eq!(pool.funds().global_pool, d("8.955"));
}

#[test]
fn test_cap_and_redistribute_through_engine() {
    let mut pool = Pool::new(config("0", "40", "45", "15", "15", "15", "40")).unwrap();
    pool.join(Address::synthetic(1)).unwrap();
    let outcome = pool.join(Address::synthetic(2)).unwrap();

    assert_eq!(outcome.exits.len(), 1);
    let exit = &outcome.exits[0];
    assert_eq!(exit.position, id(1));
    assert_eq!(exit.balance, d("17"));
    assert_eq!(exit.payout, d("15"));
    assert_eq!(exit.excess, d("2"));

    assert_eq!(pool.funds().global_pool, d("2"));
    assert_eq!(pool.totals().total_withdrawn, d("15"));
    assert_eq!(queue_balances(&pool), vec![(2, d("0"))]);
    assert!(conserved(&pool));
}

#[test]
fn test_insolvent_exit_rolls_back_whole_event() {
    let mut pool = Pool::new(config("0", "50", "50", "0", "50", "5", "100")).unwrap();
    pool.join(Address::synthetic(1)).unwrap();
    let before = pool.summary();

    let err = pool.join(Address::synthetic(2)).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Invariant(InvariantViolation::Insolvent { position, shortfall })
            if position == id(1) && shortfall == d("30")
    ));

    assert_eq!(pool.summary(), before);
    assert_eq!(pool.funds().global_pool, d("10"));
    assert_eq!(pool.balance_of(id(1)).unwrap(), Decimal::zero());
    assert!(pool.position(id(2)).is_none());
    assert_eq!(queue_balances(&pool), vec![(1, d("0"))]);
    pool.verify_invariants().unwrap();

    // The pool stays usable after a rejected event.
    let retry = pool.join(Address::synthetic(3)).unwrap_err();
    assert!(matches!(retry, EngineError::Invariant(_)));
    assert_eq!(pool.summary(), before);
}

#[test]
fn test_exited_position_keeps_its_record() {
    let mut pool = Pool::for_tier(Tier::Standard).unwrap();
    pool.join(Address::synthetic(1)).unwrap();
    pool.join(Address::synthetic(2)).unwrap();

    let first = pool.position(id(1)).unwrap();
    assert!(first.has_exited);
    assert!(!first.is_active);
    assert_eq!(first.balance, Decimal::zero());
    assert_eq!(first.exited_at.map(|s| s.as_u64()), Some(2));
    assert!(!pool.queue().contains(id(1)));
}

#[test]
fn test_every_tier_conserves_over_a_long_run() {
    for tier in Tier::ALL {
        let mut pool = Pool::for_tier(tier).unwrap();
        for n in 1..=2_000 {
            pool.join(Address::synthetic(n)).unwrap();
        }
        assert!(conserved(&pool), "{} tier broke conservation", tier);
        pool.verify_invariants().unwrap();
        assert_eq!(
            pool.queue().len() as u64 + pool.totals().completed_cycles,
            2_000
        );
    }
}

#[test]
fn test_floor_rule_never_strands() {
    let mut config = Tier::Standard.config();
    config.exit_rule = ExitRule::Floor;
    let mut pool = Pool::new(config).unwrap();
    for n in 1..=5_000 {
        pool.join(Address::synthetic(n)).unwrap();
    }
    assert_eq!(pool.stranded_positions(), 0);
    let threshold = pool.config().min_balance_for_exit;
    assert!(pool.active_positions().all(|p| p.balance < threshold));
    pool.verify_invariants().unwrap();
}

fn scaled_stress(entry: &str) -> PoolConfig {
    let entry = d(entry);
    let mut config = Tier::Standard.config();
    config.entry_amount = entry;
    config.exit_amount = entry * d("1.2");
    config.min_balance_for_exit = entry * d("1.2");
    config.max_balance_for_exit = entry * d("4");
    config
}

#[test]
fn test_amounts_beyond_decimal_precision_are_refused() {
    // Would overflow on the first split.
    let err = Pool::new(scaled_stress("2000000000000000000000000000")).unwrap_err();
    assert!(matches!(err, ConfigurationError::AmountTooLarge { field: "entryAmount", .. }));

    // Would round inside the running totals after a few hundred deposits.
    let err = Pool::new(scaled_stress("100000000000000000000")).unwrap_err();
    assert!(matches!(err, ConfigurationError::AmountTooLarge { .. }));
}

#[test]
fn test_largest_accepted_amounts_stay_exact() {
    let mut pool = Pool::new(scaled_stress("100000000000")).unwrap();
    for n in 1..=20_000 {
        pool.join(Address::synthetic(n)).unwrap();
    }
    assert!(conserved(&pool));
    pool.verify_invariants().unwrap();
    assert_eq!(
        pool.queue().len() as u64 + pool.totals().completed_cycles,
        20_000
    );
}
