//! Integration tests for top-of-book replay.
//!
//! Covers:
//! - The reference scenario (tie, strict improvement, depletion, late fill)
//! - Best-price invariant under generated add/remove/modify/execute sequences
//! - Monotone `entered_top` and write-once `exit_time`
//! - Per-symbol averages and both open-order policies
//! - Replays driven through `EventSource` implementations
//!
//! Run with:
//! ```bash
//! cargo test --test replay_test
//! ```

use std::collections::HashMap;
use std::io::Cursor;

use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use tob_residency::{
    EventDispatcher, EventKind, FeedEvent, JsonLinesSource, OpenOrderPolicy, ReplayConfig,
    ResidencyError, Side, Timestamp, VecSource, NANOS_PER_SECOND,
};

const S: Timestamp = NANOS_PER_SECOND;

fn apply(dispatcher: &mut EventDispatcher, event: FeedEvent) {
    dispatcher
        .process_event(&event)
        .unwrap_or_else(|e| panic!("{event:?} failed: {e}"));
}

// ============================================================================
// Reference scenario
// ============================================================================

#[test]
fn test_reference_scenario_step_by_step() {
    let mut d = EventDispatcher::new();

    // 1. A at 100 reaches the top
    apply(&mut d, FeedEvent::time(1));
    apply(&mut d, FeedEvent::add(1, "X", Side::Buy, 10, 100));
    assert_eq!(d.book("X").unwrap().best_bid(), Some(100));
    let a = d.order(1).unwrap();
    assert!(a.entered_top);
    assert_eq!(a.entry_time, Some(S));

    // 2. B ties at 100
    apply(&mut d, FeedEvent::time(2));
    apply(&mut d, FeedEvent::add(2, "X", Side::Buy, 5, 100));
    assert_eq!(d.book("X").unwrap().best_bid(), Some(100));
    assert!(d.order(2).unwrap().entered_top);
    assert_eq!(d.order(1).unwrap().exit_time, None);

    // 3. C at 105 strictly improves
    apply(&mut d, FeedEvent::time(3));
    apply(&mut d, FeedEvent::add(3, "X", Side::Buy, 3, 105));
    let book = d.book("X").unwrap();
    assert_eq!(book.best_bid(), Some(105));
    assert!(d.order(3).unwrap().entered_top);
    assert_eq!(d.order(1).unwrap().exit_time, Some(3 * S));
    assert_eq!(d.order(2).unwrap().exit_time, Some(3 * S));
    assert!(book.level(Side::Buy, 100).unwrap().contains(1));
    assert!(book.level(Side::Buy, 100).unwrap().contains(2));

    // 4. C cancelled, best falls back to 100
    apply(&mut d, FeedEvent::time(4));
    apply(&mut d, FeedEvent::delete(3));
    let book = d.book("X").unwrap();
    assert!(book.level(Side::Buy, 105).is_none());
    assert_eq!(book.best_bid(), Some(100));

    // 5. A fully filled; its exit time stays at 3
    apply(&mut d, FeedEvent::time(5));
    apply(&mut d, FeedEvent::execute(1, 10));
    assert!(!d.book("X").unwrap().is_resident(Side::Buy, 1));
    assert_eq!(d.order(1).unwrap().exit_time, Some(3 * S));

    // 6. A: 2s, B: 1s, C: 1s (entered at 3, removed at 4)
    let report = d.report();
    let x = report.get("X").unwrap();
    assert_eq!(x.orders, 3);
    assert_eq!(x.total_duration_ns, 4 * S);
    assert_eq!(report.open_at_end, 0);
    let avg = report.average_secs("X").unwrap();
    assert!((avg - 4.0 / 3.0).abs() < 1e-12, "average was {avg}");
}

#[test]
fn test_reference_scenario_report_without_c() {
    // Same book, but C never leaves: only A and B qualify under Exclude
    let mut d = EventDispatcher::new();
    for event in [
        FeedEvent::time(1),
        FeedEvent::add(1, "X", Side::Buy, 10, 100),
        FeedEvent::time(2),
        FeedEvent::add(2, "X", Side::Buy, 5, 100),
        FeedEvent::time(3),
        FeedEvent::add(3, "X", Side::Buy, 3, 105),
        FeedEvent::time(5),
        FeedEvent::execute(1, 10),
    ] {
        apply(&mut d, event);
    }

    let report = d.report();
    assert_eq!(report.open_at_end, 1);
    assert_eq!(report.average_secs("X"), Some(1.5));
}

#[test]
fn test_tie_never_stamps_existing_orders() {
    let mut d = EventDispatcher::new();
    apply(&mut d, FeedEvent::add(1, "X", Side::Sell, 10, 200));
    for id in 2..10 {
        apply(&mut d, FeedEvent::time(id as u32));
        apply(&mut d, FeedEvent::add(id, "X", Side::Sell, 1, 200));
    }
    for id in 1..10 {
        let order = d.order(id).unwrap();
        assert!(order.entered_top);
        assert_eq!(order.exit_time, None);
    }
    assert_eq!(d.book("X").unwrap().stats().displaced, 0);
}

// ============================================================================
// Open orders at end of stream
// ============================================================================

fn open_order_events() -> Vec<FeedEvent> {
    vec![
        FeedEvent::time(10),
        FeedEvent::add(1, "X", Side::Sell, 10, 50),
        FeedEvent::time(12),
        FeedEvent::add(2, "X", Side::Sell, 10, 49),
        FeedEvent::time(20),
        FeedEvent::new(EventKind::EndOfSession),
    ]
}

#[test]
fn test_open_orders_excluded_by_default() {
    let mut d = EventDispatcher::new();
    d.run(VecSource::new(open_order_events())).unwrap();

    let report = d.report();
    assert_eq!(report.policy, OpenOrderPolicy::Exclude);
    assert_eq!(report.open_at_end, 1);
    let x = report.get("X").unwrap();
    assert_eq!(x.orders, 1);
    assert_eq!(x.total_duration_ns, 2 * S);
}

#[test]
fn test_open_orders_closed_at_stream_end() {
    let config = ReplayConfig::new().with_open_order_policy(OpenOrderPolicy::CloseAtStreamEnd);
    let mut d = EventDispatcher::with_config(config);
    d.run(VecSource::new(open_order_events())).unwrap();

    let report = d.report();
    assert_eq!(report.stream_end, Some(20 * S));
    assert_eq!(report.open_at_end, 1);
    let x = report.get("X").unwrap();
    // Order 1: 10 → 12, order 2: 12 → 20
    assert_eq!(x.orders, 2);
    assert_eq!(x.total_duration_ns, 10 * S);
    assert_eq!(report.average_secs("X"), Some(5.0));
}

#[test]
fn test_symbol_with_only_open_orders_is_omitted() {
    let mut d = EventDispatcher::new();
    apply(&mut d, FeedEvent::add(1, "Y", Side::Buy, 10, 50));
    let report = d.report();
    assert!(report.get("Y").is_none());
    assert!(report.is_empty());
}

// ============================================================================
// Sources
// ============================================================================

#[test]
fn test_run_counts_only_order_events() {
    let mut d = EventDispatcher::new();
    let stats = d.run(VecSource::new(open_order_events())).unwrap().clone();

    assert_eq!(stats.events_seen, 6);
    assert_eq!(stats.clock_updates, 3);
    assert_eq!(stats.ignored, 1);
    assert_eq!(stats.messages_processed, 2);
    assert_eq!(stats.orders_created, 2);
    assert_eq!(stats.books_created, 1);
}

#[test]
fn test_run_from_json_lines() {
    let input = r#"
{"type":"time","seconds":1}
{"type":"add_order","order_id":1,"side":"Buy","shares":10,"symbol":"X","price":100}
{"type":"time","seconds":2}
{"type":"add_order","order_id":2,"side":"Buy","shares":5,"symbol":"X","price":100}
{"type":"time","seconds":3}
{"type":"add_order","order_id":3,"side":"Buy","shares":3,"symbol":"X","price":105}
{"type":"trade","symbol":"X","shares":3,"price":105}
{"type":"time","seconds":4}
{"type":"delete_order","order_id":3}
{"type":"time","seconds":5}
{"type":"order_executed","order_id":1,"executed_shares":10}
"#;
    let mut d = EventDispatcher::new();
    d.run(JsonLinesSource::from_reader(Cursor::new(input))).unwrap();

    assert_eq!(d.stats().messages_processed, 5);
    assert_eq!(d.book("X").unwrap().best_bid(), Some(100));
    assert_eq!(d.order(1).unwrap().exit_time, Some(3 * S));
}

#[test]
fn test_run_stops_at_first_protocol_violation() {
    let events = vec![
        FeedEvent::add(1, "X", Side::Buy, 10, 100),
        FeedEvent::execute(77, 1),
        FeedEvent::add(2, "X", Side::Buy, 10, 100),
    ];
    let mut d = EventDispatcher::new();
    let err = d.run(VecSource::new(events)).unwrap_err();

    assert_eq!(err, ResidencyError::OrderNotFound(77));
    assert!(!d.registry().contains(2));
    assert_eq!(d.stats().events_seen, 2);
}

#[test]
fn test_run_stops_at_decode_error() {
    let input = "{\"type\":\"add_order\",\"order_id\":1,\"side\":\"Buy\",\"shares\":1,\"symbol\":\"X\",\"price\":1}\nnot json\n";
    let mut d = EventDispatcher::new();
    let err = d
        .run(JsonLinesSource::from_reader(Cursor::new(input)))
        .unwrap_err();

    assert!(matches!(err, ResidencyError::Decode { line: 2, .. }));
    assert!(!err.is_protocol_violation());
    assert_eq!(d.stats().messages_processed, 1);
}

// ============================================================================
// Generated interleavings
// ============================================================================

/// One step of a generated single-side session. `pick` selects a resting
/// order by position among the resting ids.
#[derive(Debug, Clone)]
enum Op {
    Add { price: i64, size: i64 },
    Delete { pick: usize },
    Execute { pick: usize },
    Reduce { pick: usize },
    Modify { pick: usize, price: i64 },
    ExecuteAtPriceSize { pick: usize },
}

fn arb_price() -> impl Strategy<Value = i64> {
    90i64..=110i64
}

fn arb_side() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Buy), Just(Side::Sell)]
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (arb_price(), 1i64..=5i64).prop_map(|(price, size)| Op::Add { price, size }),
        1 => any::<usize>().prop_map(|pick| Op::Delete { pick }),
        1 => any::<usize>().prop_map(|pick| Op::Execute { pick }),
        1 => any::<usize>().prop_map(|pick| Op::Reduce { pick }),
        1 => (any::<usize>(), arb_price()).prop_map(|(pick, price)| Op::Modify { pick, price }),
        1 => any::<usize>().prop_map(|pick| Op::ExecuteAtPriceSize { pick }),
    ]
}

/// Ops paired with the event's offset inside its second.
fn arb_session() -> impl Strategy<Value = Vec<(Op, u32)>> {
    prop::collection::vec((arb_op(), 0u32..1_000u32), 1..200)
}

#[derive(Clone, Copy)]
struct Resting {
    price: i64,
    size: i64,
}

fn expected_best(side: Side, resting: &HashMap<u64, Resting>) -> Option<i64> {
    let prices = resting.values().map(|r| r.price);
    match side {
        Side::Buy => prices.max(),
        Side::Sell => prices.min(),
    }
}

/// Turn `op` into a feed event and apply it to the `resting` model.
/// `None` when the op needs a resting order and there is none.
fn next_event(
    op: &Op,
    side: Side,
    resting: &mut HashMap<u64, Resting>,
    next_id: &mut u64,
) -> Option<FeedEvent> {
    if let Op::Add { price, size } = *op {
        let id = *next_id;
        *next_id += 1;
        resting.insert(id, Resting { price, size });
        return Some(FeedEvent::add(id, "R", side, size, price));
    }

    let mut ids: Vec<u64> = resting.keys().copied().collect();
    if ids.is_empty() {
        return None;
    }
    ids.sort_unstable();

    let event = match *op {
        Op::Add { .. } => return None,
        Op::Delete { pick } => {
            let id = ids[pick % ids.len()];
            resting.remove(&id);
            FeedEvent::delete(id)
        }
        Op::Execute { pick } => {
            let id = ids[pick % ids.len()];
            let r = resting[&id];
            resting.remove(&id);
            FeedEvent::execute(id, r.size)
        }
        Op::Reduce { pick } => {
            let id = ids[pick % ids.len()];
            let r = resting[&id];
            if r.size > 1 {
                resting.insert(id, Resting { size: r.size - 1, ..r });
            } else {
                resting.remove(&id);
            }
            FeedEvent::reduce(id, 1)
        }
        Op::Modify { pick, price } => {
            let id = ids[pick % ids.len()];
            let r = resting[&id];
            resting.insert(id, Resting { price, ..r });
            FeedEvent::modify(id, r.size, price)
        }
        Op::ExecuteAtPriceSize { pick } => {
            let id = ids[pick % ids.len()];
            let r = resting[&id];
            let remaining = r.size - 1;
            if remaining <= 0 {
                resting.remove(&id);
            } else {
                resting.insert(id, Resting { size: remaining, ..r });
            }
            FeedEvent::execute_at_price_size(id, 1, remaining, r.price)
        }
    };
    Some(event)
}

fn step_failed(event: &FeedEvent, e: ResidencyError) -> TestCaseError {
    TestCaseError::fail(format!("{event:?} failed: {e}"))
}

/// Replay `ops` on one side of symbol "R", checking the book after every
/// event.
fn replay_session(side: Side, ops: &[(Op, u32)]) -> Result<EventDispatcher, TestCaseError> {
    let mut d = EventDispatcher::new();
    let mut resting: HashMap<u64, Resting> = HashMap::new();
    let mut next_id = 1u64;
    let mut history: HashMap<u64, (bool, Option<Timestamp>)> = HashMap::new();

    for (step, (op, offset)) in ops.iter().enumerate() {
        let tick = FeedEvent::time(step as u32);
        d.process_event(&tick).map_err(|e| step_failed(&tick, e))?;

        let Some(event) = next_event(op, side, &mut resting, &mut next_id) else {
            continue;
        };
        let event = event.with_offset(*offset);
        d.process_event(&event).map_err(|e| step_failed(&event, e))?;

        let book = d.book("R").map_err(|e| step_failed(&event, e))?;
        prop_assert_eq!(
            book.best(side),
            expected_best(side, &resting),
            "best price diverged at step {}",
            step
        );
        prop_assert!(book.is_consistent(), "inconsistent book at step {}", step);
        prop_assert_eq!(book.order_count(), resting.len());

        for order in d.registry().iter() {
            if let Some(&(was_top, exit)) = history.get(&order.order_id) {
                prop_assert!(
                    order.entered_top || !was_top,
                    "entered_top reset for order {}",
                    order.order_id
                );
                if exit.is_some() {
                    prop_assert_eq!(
                        order.exit_time,
                        exit,
                        "exit_time changed for order {}",
                        order.order_id
                    );
                }
            }
            history.insert(order.order_id, (order.entered_top, order.exit_time));
        }
    }

    Ok(d)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_interleavings_keep_best_price(side in arb_side(), ops in arb_session()) {
        replay_session(side, &ops)?;
    }

    #[test]
    fn prop_average_matches_definition(side in arb_side(), ops in arb_session()) {
        let d = replay_session(side, &ops)?;

        let (mut total, mut count) = (0u64, 0u64);
        for order in d.registry().iter() {
            if order.entered_top {
                if let (Some(entry), Some(exit)) = (order.entry_time, order.exit_time) {
                    total += exit.saturating_sub(entry);
                    count += 1;
                }
            }
        }

        let report = d.report();
        match report.get("R") {
            Some(r) => {
                prop_assert_eq!(r.orders, count);
                prop_assert_eq!(r.total_duration_ns, total);
                prop_assert_eq!(r.average_ns(), Some(total as f64 / count as f64));
            }
            None => prop_assert_eq!(count, 0),
        }
    }
}

#[test]
fn test_symbols_do_not_interact() {
    let mut d = EventDispatcher::new();
    apply(&mut d, FeedEvent::add(1, "X", Side::Buy, 10, 100));
    apply(&mut d, FeedEvent::time(1));
    apply(&mut d, FeedEvent::add(2, "Y", Side::Buy, 10, 500));
    apply(&mut d, FeedEvent::add(3, "Y", Side::Sell, 10, 501));

    assert_eq!(d.order(1).unwrap().exit_time, None);
    assert_eq!(d.book("X").unwrap().best_bid(), Some(100));
    assert_eq!(d.book("Y").unwrap().best_bid(), Some(500));
    assert_eq!(d.book("Y").unwrap().best_ask(), Some(501));
    assert!(d.book("Z").is_err());
}
