//! Integration tests for the latency / execution-race layer

use predsim_exec::{
    BrokerConfig, ExecError, ExecutionSimulator, OrderBook, OrderOutcome, OutcomeSide, SharedBook,
    SimulatedBroker, Submission, TradeSide,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

const LATENCY: Duration = Duration::from_millis(250);

fn setup(cash: Decimal) -> (Arc<SimulatedBroker>, ExecutionSimulator) {
    let broker = Arc::new(SimulatedBroker::new(BrokerConfig {
        starting_cash: cash,
        latency_ms: LATENCY.as_millis() as u64,
        ..BrokerConfig::default()
    }));
    let executor = ExecutionSimulator::new(Arc::clone(&broker)).unwrap();
    (broker, executor)
}

fn book(asset_id: &str, bid: Decimal, ask: Decimal, size: Decimal) -> SharedBook {
    let book = OrderBook::shared(asset_id);
    book.write().apply_depth_delta(&[(bid, size)], &[(ask, size)]);
    book
}

#[tokio::test(start_paused = true)]
async fn test_delayed_buy_fills_and_consumes_liquidity() {
    let (broker, executor) = setup(dec!(1000));
    let book = book("0xabc", dec!(0.38), dec!(0.385), dec!(500));

    let order = executor
        .submit_buy_order("0xabc", dec!(0.40), dec!(40), &book)
        .into_pending()
        .unwrap();
    assert!(executor.in_flight().is_in_flight("0xabc"));

    let outcome = order.wait().await.unwrap();
    assert_eq!(outcome.filled_shares(), dec!(100));
    assert_eq!(broker.cash_balance(), dec!(960));
    assert_eq!(book.read().best_ask_size(), dec!(400));
    assert!(!executor.in_flight().is_in_flight("0xabc"));
}

#[tokio::test(start_paused = true)]
async fn test_book_moves_during_latency_window() {
    let (broker, executor) = setup(dec!(1000));
    let book = book("0xabc", dec!(0.38), dec!(0.40), dec!(500));

    let order = executor
        .submit_buy_order("0xabc", dec!(0.42), dec!(100), &book)
        .into_pending()
        .unwrap();

    // Sellers lift their offer before the order lands
    book.write()
        .apply_depth_delta(&[], &[(dec!(0.40), dec!(0)), (dec!(0.45), dec!(300))]);

    let outcome = order.wait().await.unwrap();
    match outcome {
        OrderOutcome::Rejected(ExecError::MissedExecutionRace { target, observed, .. }) => {
            assert_eq!(target, dec!(0.42));
            assert_eq!(observed, dec!(0.45));
        }
        other => panic!("expected missed race, got {:?}", other),
    }

    let trades = broker.trades();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].side, TradeSide::RejectBuy);
    assert_eq!(trades[0].price, dec!(0.45));
    assert_eq!(trades[0].shares, Decimal::ZERO);
    assert_eq!(broker.cash_balance(), dec!(1000));
    assert_eq!(book.read().best_ask_size(), dec!(300));
}

#[tokio::test(start_paused = true)]
async fn test_reread_happens_after_delay() {
    let (_broker, executor) = setup(dec!(1000));
    let book = book("0xabc", dec!(0.38), dec!(0.50), dec!(500));

    // Ask is above target at submission time but improves during the wait
    let order = executor
        .submit_buy_order("0xabc", dec!(0.42), dec!(40), &book)
        .into_pending()
        .unwrap();
    book.write().apply_depth_delta(&[], &[(dec!(0.385), dec!(100))]);

    let outcome = order.wait().await.unwrap();
    assert_eq!(outcome.filled_shares(), dec!(100));
}

#[tokio::test(start_paused = true)]
async fn test_sentinel_price_rejected() {
    let (broker, executor) = setup(dec!(1000));
    let book = book("0xabc", dec!(0.38), dec!(0.40), dec!(500));

    let order = executor
        .submit_buy_order("0xabc", dec!(0.42), dec!(100), &book)
        .into_pending()
        .unwrap();

    // Ask side empties; best ask falls back to 1.00
    book.write().apply_depth_delta(&[], &[(dec!(0.40), dec!(0))]);

    let outcome = order.wait().await.unwrap();
    assert!(matches!(
        outcome,
        OrderOutcome::Rejected(ExecError::StaleOrRejectedPrice { .. })
    ));

    let trades = broker.trades();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].side, TradeSide::RejectBuy);
    assert_eq!(trades[0].price, Decimal::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_in_flight_exclusivity() {
    let (broker, executor) = setup(dec!(1000));
    let book = book("0xabc", dec!(0.38), dec!(0.385), dec!(500));

    let first = executor.submit_buy_order("0xabc", dec!(0.40), dec!(40), &book);
    let second = executor.submit_buy_order("0xabc", dec!(0.40), dec!(40), &book);
    assert!(matches!(first, Submission::Pending(_)));
    assert!(second.is_dropped());

    first.into_pending().unwrap().wait().await.unwrap();
    assert_eq!(broker.trades_for("0xabc").len(), 1);
    assert_eq!(broker.position("0xabc", OutcomeSide::Yes).shares, dec!(100));

    // The marker is released once the first order completes
    let third = executor.submit_buy_order("0xabc", dec!(0.40), dec!(40), &book);
    assert!(matches!(third, Submission::Pending(_)));
}

#[tokio::test(start_paused = true)]
async fn test_different_assets_fly_independently() {
    let (broker, executor) = setup(dec!(1000));
    let book_a = book("0xaaa", dec!(0.38), dec!(0.385), dec!(500));
    let book_b = book("0xbbb", dec!(0.38), dec!(0.385), dec!(500));

    let a = executor.submit_buy_order("0xaaa", dec!(0.40), dec!(40), &book_a);
    let b = executor.submit_buy_order("0xbbb", dec!(0.40), dec!(40), &book_b);
    assert_eq!(executor.in_flight().len(), 2);

    let (a, b) = tokio::join!(
        a.into_pending().unwrap().wait(),
        b.into_pending().unwrap().wait()
    );
    assert!(a.unwrap().is_filled());
    assert!(b.unwrap().is_filled());
    assert_eq!(broker.cash_balance(), dec!(920));
    assert!(executor.in_flight().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_abort_releases_in_flight_marker() {
    let (broker, executor) = setup(dec!(1000));
    let book = book("0xabc", dec!(0.38), dec!(0.385), dec!(500));

    let order = executor
        .submit_buy_order("0xabc", dec!(0.40), dec!(40), &book)
        .into_pending()
        .unwrap();
    order.abort();

    let result = order.wait().await;
    assert!(matches!(result, Err(ExecError::TaskFailed(_))));
    assert!(!executor.in_flight().is_in_flight("0xabc"));
    assert!(broker.trades().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_delayed_sell_misses_when_bid_drops() {
    let (broker, executor) = setup(dec!(1000));
    broker.buy("0xabc", dec!(0.385), dec!(40), dec!(1000));
    let book = book("0xabc", dec!(0.55), dec!(0.57), dec!(500));

    let order = executor
        .submit_sell_all_order("0xabc", dec!(0.54), &book)
        .into_pending()
        .unwrap();
    book.write().apply_depth_delta(&[(dec!(0.55), dec!(0)), (dec!(0.50), dec!(200))], &[]);

    let outcome = order.wait().await.unwrap();
    assert!(matches!(
        outcome,
        OrderOutcome::Rejected(ExecError::MissedExecutionRace { .. })
    ));
    assert_eq!(broker.trades().last().unwrap().side, TradeSide::RejectSell);
    assert_eq!(broker.position("0xabc", OutcomeSide::Yes).shares, dec!(100));
}

#[tokio::test(start_paused = true)]
async fn test_delayed_no_orders() {
    let (broker, executor) = setup(dec!(1000));
    // NO ask = 1 - 0.615 = 0.385, NO bid = 1 - 0.62 = 0.38
    let book = book("0xabc", dec!(0.615), dec!(0.62), dec!(500));

    let bought = executor
        .submit_buy_no_order("0xabc", dec!(0.39), dec!(40), &book)
        .into_pending()
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert_eq!(bought.filled_shares(), dec!(100));
    assert_eq!(book.read().best_bid_size(), dec!(400));

    let sold = executor
        .submit_sell_all_no_order("0xabc", dec!(0.38), &book)
        .into_pending()
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert_eq!(sold.filled_shares(), dec!(100));
    assert_eq!(book.read().best_ask_size(), dec!(400));
    assert_eq!(broker.position("0xabc", OutcomeSide::No).shares, Decimal::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_delayed_buy_without_cash() {
    let (broker, executor) = setup(dec!(10));
    let book = book("0xabc", dec!(0.38), dec!(0.385), dec!(500));

    let outcome = executor
        .submit_buy_order("0xabc", dec!(0.40), dec!(40), &book)
        .into_pending()
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        OrderOutcome::Rejected(ExecError::InsufficientFunds { .. })
    ));
    assert!(broker.trades().is_empty());
    assert_eq!(book.read().best_ask_size(), dec!(500));
}

#[tokio::test(start_paused = true)]
async fn test_delayed_fill_rejects_when_book_stays_locked() {
    let (broker, executor) = setup(dec!(1000));
    let book = book("0xabc", dec!(0.38), dec!(0.385), dec!(500));

    let order = executor
        .submit_buy_order("0xabc", dec!(0.40), dec!(40), &book)
        .into_pending()
        .unwrap();

    // Reader keeps the book across the whole latency window
    let guard = book.read();
    tokio::time::sleep(LATENCY * 2).await;
    drop(guard);

    match order.wait().await.unwrap() {
        OrderOutcome::Rejected(ExecError::BookBusy(asset_id)) => assert_eq!(asset_id, "0xabc"),
        other => panic!("expected busy book rejection, got {:?}", other),
    }
    assert_eq!(broker.cash_balance(), dec!(1000));
    assert_eq!(broker.trade_count(), 0);
    assert!(!executor.in_flight().is_in_flight("0xabc"));
}
