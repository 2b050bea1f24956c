// Integration tests for one grid cycle against a scripted exchange

mod common;

use chrono::{Duration, Utc};
use common::{closed_sell, create_test_config, generate_candles, open_order, ScriptedMarket};
use recentering_grid_bot::core::RecenterReason;
use recentering_grid_bot::{Balances, GridAction, GridEngine, GridState, Side, Trend};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn funded() -> Balances {
    Balances {
        quote: dec!(1000),
        base: dec!(0.01),
    }
}

fn active(center: Decimal) -> GridState {
    GridState {
        center_price: Some(center),
        active: true,
        last_active_time: Utc::now(),
    }
}

#[tokio::test]
async fn test_first_cycle_places_both_rungs() {
    let engine = GridEngine::new(ScriptedMarket::new(dec!(50000), funded()), create_test_config());

    let report = engine.run_cycle(GridState::new(Utc::now())).await.expect("cycle runs");

    assert_eq!(report.action, GridAction::InitialPlacement { center: dec!(50000) });
    assert_eq!(report.placed, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(report.state.center_price, Some(dec!(50000)));
    assert!(report.state.active);

    let placed = engine.market().placed();
    assert_eq!(placed[0].side, Side::Buy);
    assert_eq!(placed[0].price, dec!(49500));
    assert_eq!(placed[0].amount, dec!(0.0011));
    assert_eq!(placed[1].side, Side::Sell);
    assert_eq!(placed[1].price, dec!(50500));
    assert_eq!(placed[1].amount, dec!(0.0011));
}

#[tokio::test]
async fn test_fresh_rungs_do_not_commit_whole_balance() {
    let rich = Balances {
        quote: dec!(100000),
        base: dec!(1),
    };
    let market = ScriptedMarket::new(dec!(50600), rich);
    {
        let mut script = market.script();
        script.open.push(open_order("old-buy", Side::Buy, dec!(49500), dec!(0.0011)));
        script.open.push(open_order("old-sell", Side::Sell, dec!(50500), dec!(0.0011)));
    }
    let engine = GridEngine::new(market, create_test_config());

    let first = engine.run_cycle(GridState::new(Utc::now())).await.expect("first cycle");
    assert!(first.state.active);

    // Recenter path sizes the same way as the first placement
    let second = engine.run_cycle(active(dec!(50000))).await.expect("second cycle");
    assert!(matches!(second.action, GridAction::Recenter { .. }));

    let placed = engine.market().placed();
    assert!(!placed.is_empty());
    assert!(placed.iter().all(|o| o.amount == dec!(0.0011)));
}

#[tokio::test]
async fn test_steady_state_places_nothing_new() {
    let engine = GridEngine::new(ScriptedMarket::new(dec!(50000), funded()), create_test_config());

    let first = engine.run_cycle(GridState::new(Utc::now())).await.expect("first cycle");
    let second = engine.run_cycle(first.state.clone()).await.expect("second cycle");

    assert_eq!(second.action, GridAction::Reconcile { center: dec!(50000) });
    assert_eq!(second.placed, 0);
    assert_eq!(second.canceled, 0);
    assert_eq!(engine.market().open_orders().len(), 2);
    assert_eq!(second.state, first.state);
}

#[tokio::test]
async fn test_initial_center_override() {
    let mut config = create_test_config();
    config.trading.initial_center = Some(dec!(48000));
    let engine = GridEngine::new(ScriptedMarket::new(dec!(50000), funded()), config);

    let report = engine.run_cycle(GridState::new(Utc::now())).await.expect("cycle runs");

    assert_eq!(report.state.center_price, Some(dec!(48000)));
    let prices: Vec<Decimal> = engine.market().placed().iter().map(|o| o.price).collect();
    assert_eq!(prices, vec![dec!(47500), dec!(48500)]);
}

#[tokio::test]
async fn test_missing_price_holds() {
    let market = ScriptedMarket::new(dec!(50000), funded());
    market.script().fail_price = true;
    let engine = GridEngine::new(market, create_test_config());

    let state = active(dec!(50000));
    let report = engine.run_cycle(state.clone()).await.expect("cycle runs");

    assert_eq!(report.action, GridAction::Hold);
    assert_eq!(report.state, state);
    assert!(engine.market().placed().is_empty());
}

#[tokio::test]
async fn test_drift_recenters_around_current_price() {
    let market = ScriptedMarket::new(dec!(50600), funded());
    {
        let mut script = market.script();
        script.open.push(open_order("old-buy", Side::Buy, dec!(49500), dec!(0.002)));
        script.open.push(open_order("old-sell", Side::Sell, dec!(50500), dec!(0.002)));
    }
    let engine = GridEngine::new(market, create_test_config());

    let report = engine.run_cycle(active(dec!(50000))).await.expect("cycle runs");

    assert_eq!(
        report.action,
        GridAction::Recenter {
            from: dec!(50000),
            to: dec!(50600),
            reason: RecenterReason::Drift
        }
    );
    assert_eq!(report.canceled, 2);
    assert_eq!(report.placed, 2);
    assert_eq!(report.state.center_price, Some(dec!(50600)));
    assert!(report.state.active);

    let open: Vec<(Side, Decimal)> = engine.market().open_orders().iter().map(|o| (o.side, o.price)).collect();
    assert_eq!(open, vec![(Side::Buy, dec!(50100)), (Side::Sell, dec!(51100))]);
}

#[tokio::test]
async fn test_uptrend_shift_recenters() {
    let mut config = create_test_config();
    config.policy.price_shift_threshold = Some(dec!(1000));
    let market = ScriptedMarket::new(dec!(50200), funded());
    market.script().candles = generate_candles(dec!(49000), dec!(20), 50);
    let engine = GridEngine::new(market, config);

    let report = engine.run_cycle(active(dec!(50000))).await.expect("cycle runs");

    assert_eq!(
        report.action,
        GridAction::Recenter {
            from: dec!(50000),
            to: dec!(50200),
            reason: RecenterReason::TrendShift(Trend::Uptrend)
        }
    );
}

#[tokio::test]
async fn test_idle_out_of_range_recenters() {
    let mut config = create_test_config();
    config.policy.price_shift_threshold = Some(dec!(1000));
    let engine = GridEngine::new(ScriptedMarket::new(dec!(50550), funded()), config);

    let now = Utc::now();
    let state = GridState {
        center_price: Some(dec!(50000)),
        active: true,
        last_active_time: now - Duration::seconds(400),
    };
    let report = engine.run_cycle_at(state, now).await.expect("cycle runs");

    assert!(matches!(
        report.action,
        GridAction::Recenter { reason: RecenterReason::IdleOutOfRange, .. }
    ));
    assert_eq!(report.state.last_active_time, now);
}

#[tokio::test]
async fn test_failed_placement_is_filled_in_next_cycle() {
    let market = ScriptedMarket::new(dec!(50000), funded());
    market.script().fail_next_places = 1;
    let engine = GridEngine::new(market, create_test_config());

    let first = engine.run_cycle(GridState::new(Utc::now())).await.expect("first cycle");
    assert_eq!(first.placed, 1);
    assert_eq!(first.failed, 1);
    assert!(first.state.active);

    let second = engine.run_cycle(first.state).await.expect("second cycle");
    assert_eq!(second.placed, 1);

    let open = engine.market().open_orders();
    assert_eq!(open.len(), 2);
    assert_eq!(open.iter().filter(|o| o.side == Side::Buy).count(), 1);
    assert_eq!(open.iter().filter(|o| o.side == Side::Sell).count(), 1);
}

#[tokio::test]
async fn test_unfunded_grid_places_around_live_price_once_funded() {
    let market = ScriptedMarket::new(
        dec!(50000),
        Balances {
            quote: dec!(10),
            base: Decimal::ZERO,
        },
    );
    let engine = GridEngine::new(market, create_test_config());

    let first = engine.run_cycle(GridState::new(Utc::now())).await.expect("first cycle");
    assert_eq!(first.placed, 0);
    assert_eq!(first.state.center_price, Some(dec!(50000)));
    assert!(!first.state.active);

    engine.market().set_price(dec!(52000));
    engine.market().script().balances.quote = dec!(1000);

    let second = engine.run_cycle(first.state).await.expect("second cycle");
    assert_eq!(second.action, GridAction::InitialPlacement { center: dec!(52000) });
    assert_eq!(second.placed, 1);
    assert!(second.state.active);
    assert_eq!(second.state.center_price, Some(dec!(52000)));
    assert_eq!(engine.market().placed()[0].price, dec!(51500));
}

#[tokio::test]
async fn test_inactive_grid_never_places_buy_above_market() {
    let market = ScriptedMarket::new(dec!(40000), funded());
    let engine = GridEngine::new(market, create_test_config());

    let stale = GridState {
        center_price: Some(dec!(50000)),
        active: false,
        last_active_time: Utc::now(),
    };
    let report = engine.run_cycle(stale).await.expect("cycle runs");

    assert_eq!(report.action, GridAction::InitialPlacement { center: dec!(40000) });
    let placed = engine.market().placed();
    let buy = placed.iter().find(|o| o.side == Side::Buy).expect("buy placed");
    assert_eq!(buy.price, dec!(39500));
    assert!(buy.price < dec!(40000));
}

#[tokio::test]
async fn test_stale_and_duplicate_orders_are_replaced() {
    let market = ScriptedMarket::new(dec!(50000), funded());
    {
        let mut script = market.script();
        script.open.push(open_order("stale-buy", Side::Buy, dec!(49400), dec!(0.002)));
        script.open.push(open_order("sell-a", Side::Sell, dec!(50500), dec!(0.002)));
        script.open.push(open_order("sell-b", Side::Sell, dec!(50500), dec!(0.002)));
    }
    let engine = GridEngine::new(market, create_test_config());

    let report = engine.run_cycle(active(dec!(50000))).await.expect("cycle runs");

    assert_eq!(report.action, GridAction::Reconcile { center: dec!(50000) });
    assert_eq!(report.canceled, 2);
    assert_eq!(report.placed, 1);
    assert_eq!(engine.market().canceled(), vec!["stale-buy".to_string(), "sell-b".to_string()]);

    let open = engine.market().open_orders();
    assert_eq!(open.len(), 2);
    assert!(open.iter().any(|o| o.side == Side::Buy && o.price == dec!(49500)));
}

#[tokio::test]
async fn test_reconcile_skipped_without_open_orders() {
    let market = ScriptedMarket::new(dec!(50000), funded());
    market.script().fail_open_orders_from = Some(0);
    let engine = GridEngine::new(market, create_test_config());

    let state = active(dec!(50000));
    let report = engine.run_cycle(state.clone()).await.expect("cycle runs");

    assert_eq!(report.action, GridAction::Reconcile { center: dec!(50000) });
    assert_eq!(report.placed, 0);
    assert_eq!(report.state, state);
    assert!(engine.market().placed().is_empty());
}

#[tokio::test]
async fn test_recenter_aborts_when_open_orders_unavailable() {
    let market = ScriptedMarket::new(dec!(51000), funded());
    market.script().fail_open_orders_from = Some(0);
    let engine = GridEngine::new(market, create_test_config());

    let result = engine.run_cycle(active(dec!(50000))).await;

    assert!(result.is_err());
    assert!(engine.market().placed().is_empty());
}

#[tokio::test]
async fn test_profit_reported_from_closed_sells() {
    let start = Utc::now() - Duration::minutes(5);
    let market = ScriptedMarket::new(dec!(50000), funded());
    {
        let mut script = market.script();
        script.closed.push(closed_sell(dec!(50500), dec!(0.01), Utc::now()));
        script.closed.push(closed_sell(dec!(51000), dec!(0.01), start - Duration::hours(1)));
    }
    let engine = GridEngine::with_start_time(market, create_test_config(), start);

    let report = engine.run_cycle(GridState::new(start)).await.expect("cycle runs");
    let ledger = report.profit.expect("closed orders available");

    assert_eq!(ledger.sell_count, 1);
    assert_eq!(ledger.total_profit, dec!(5.00));
}

#[tokio::test]
async fn test_profit_absent_when_closed_orders_fail() {
    let market = ScriptedMarket::new(dec!(50000), funded());
    market.script().fail_closed_orders = true;
    let engine = GridEngine::new(market, create_test_config());

    let report = engine.run_cycle(GridState::new(Utc::now())).await.expect("cycle runs");

    assert!(report.profit.is_none());
    assert_eq!(report.placed, 2);
}

#[tokio::test]
async fn test_cancel_all_counts_failures() {
    let market = ScriptedMarket::new(dec!(50000), funded());
    {
        let mut script = market.script();
        script.open.push(open_order("a", Side::Buy, dec!(49500), dec!(0.002)));
        script.open.push(open_order("b", Side::Sell, dec!(50500), dec!(0.002)));
        script.fail_cancels = true;
    }
    let engine = GridEngine::new(market, create_test_config());

    let summary = engine.cancel_all().await.expect("listing works");
    assert_eq!(summary.canceled, 0);
    assert_eq!(summary.failed, 2);

    engine.market().script().fail_cancels = false;
    let summary = engine.cancel_all().await.expect("listing works");
    assert_eq!(summary.canceled, 2);
    assert!(engine.market().open_orders().is_empty());
}
