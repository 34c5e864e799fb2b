//! The async front-end must be observationally identical to applying the
//! same event stream synchronously: same trade sequence, same final book,
//! same stats.

use std::sync::{Arc, Mutex};

use proptest::prelude::*;

use flint_async::AsyncMatchingEngine;
use flint_core::{Event, MatchingEngine, OrderId, Side, TimeInForce, Trade};

fn run_sync(events: &[Event]) -> (Vec<Trade>, MatchingEngine) {
    let trades = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&trades);
    let mut engine = MatchingEngine::new(move |t: &Trade| sink.lock().unwrap().push(*t));
    for event in events {
        engine.process(event);
    }
    let trades = trades.lock().unwrap().clone();
    (trades, engine)
}

fn run_async(events: &[Event]) -> (Vec<Trade>, MatchingEngine) {
    let trades = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&trades);
    let mut engine = AsyncMatchingEngine::new(move |t: &Trade| sink.lock().unwrap().push(*t));
    for event in events {
        engine.submit(event);
    }
    let engine = engine.into_engine().expect("worker joined cleanly");
    let trades = trades.lock().unwrap().clone();
    (trades, engine)
}

fn assert_equivalent(events: &[Event], symbols: &[&str]) {
    let (sync_trades, sync_engine) = run_sync(events);
    let (async_trades, async_engine) = run_async(events);

    // Trades carry &'static str names interned by two different indexes,
    // so compare them field-wise by value.
    assert_eq!(sync_trades.len(), async_trades.len());
    for (a, b) in sync_trades.iter().zip(&async_trades) {
        assert_eq!(a.symbol, b.symbol);
        assert_eq!(
            (a.price, a.qty, a.buy_id, a.sell_id),
            (b.price, b.qty, b.buy_id, b.sell_id)
        );
    }

    for symbol in symbols {
        assert_eq!(
            sync_engine.top_of_book(symbol),
            async_engine.top_of_book(symbol),
            "top of book diverged for {symbol}"
        );
        assert_eq!(sync_engine.book_stats(symbol), async_engine.book_stats(symbol));
        let sync_depth = sync_engine.find_book(symbol).map(|b| b.depth(usize::MAX));
        let async_depth = async_engine.find_book(symbol).map(|b| b.depth(usize::MAX));
        match (sync_depth, async_depth) {
            (None, None) => {}
            (Some(s), Some(a)) => {
                assert_eq!(s.bids, a.bids);
                assert_eq!(s.asks, a.asks);
            }
            (s, a) => panic!("book existence diverged for {symbol}: {s:?} vs {a:?}"),
        }
    }
}

#[test]
fn simple_cross_matches_sync_result() {
    let events = vec![
        Event::new_limit("FOO", Side::Sell, 100, 50, TimeInForce::Gfd),
        Event::new_limit("FOO", Side::Sell, 100, 60, TimeInForce::Gfd),
        Event::new_limit("FOO", Side::Buy, 100, 80, TimeInForce::Gfd),
    ];
    assert_equivalent(&events, &["FOO"]);
}

#[test]
fn mixed_stream_with_cancels_and_replaces() {
    let mut events = Vec::new();
    for i in 0..200i64 {
        match i % 7 {
            0 => events.push(Event::new_limit("A", Side::Sell, 100 + i % 5, 10, TimeInForce::Gfd)),
            1 => events.push(Event::new_limit("A", Side::Buy, 99 - i % 3, 10, TimeInForce::Gfd)),
            2 => events.push(Event::new_limit("B", Side::Buy, 100, 25, TimeInForce::Ioc)),
            3 => events.push(Event::new_market("A", Side::Buy, 15)),
            4 => events.push(Event::cancel("A", OrderId((i as u64 / 2).max(1)))),
            5 => events.push(Event::replace(
                "A",
                OrderId((i as u64 / 3).max(1)),
                Side::Sell,
                101,
                5,
                TimeInForce::Gfd,
            )),
            _ => events.push(Event::new_limit("B", Side::Sell, 100, 20, TimeInForce::Fok)),
        }
    }
    assert_equivalent(&events, &["A", "B"]);
}

fn event_strategy() -> impl Strategy<Value = Event> {
    let symbol = prop_oneof![Just("FOO"), Just("BAR")];
    let side = prop_oneof![Just(Side::Buy), Just(Side::Sell)];
    let tif = prop_oneof![
        Just(TimeInForce::Gfd),
        Just(TimeInForce::Gfd),
        Just(TimeInForce::Ioc),
        Just(TimeInForce::Fok),
    ];
    prop_oneof![
        4 => (symbol.clone(), side.clone(), 95i64..106, 1i64..60, tif)
            .prop_map(|(s, side, px, qty, tif)| Event::new_limit(s, side, px, qty, tif)),
        1 => (symbol.clone(), side.clone(), 1i64..60)
            .prop_map(|(s, side, qty)| Event::new_market(s, side, qty)),
        2 => (symbol.clone(), 1u64..120).prop_map(|(s, id)| Event::cancel(s, OrderId(id))),
        1 => (symbol, side, 1u64..120, 95i64..106, 1i64..60)
            .prop_map(|(s, side, id, px, qty)| {
                Event::replace(s, OrderId(id), side, px, qty, TimeInForce::Gfd)
            }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn async_equivalence(events in prop::collection::vec(event_strategy(), 1..100)) {
        assert_equivalent(&events, &["FOO", "BAR"]);
    }
}
