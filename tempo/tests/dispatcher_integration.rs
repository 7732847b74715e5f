//! End-to-end dispatcher runs. Unit-level matching and balance behaviour is covered inside
//! `tempo-execution`; these tests exercise the dispatcher driving sources, scheduled callbacks
//! and a live exchange together.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use rust_decimal_macros::dec;

use tempo::dispatch::BacktestingDispatcher;
use tempo::event::{Event, EventKind};
use tempo_data::Bar;
use tempo_execution::{AccountBalances, BacktestingExchange, Fees, LendingPool, Liquidity};
use tempo_instrument::{Pair, PairRegistry};
use tempo_integration::{EventSource, Instant};

struct VecSource {
    buffer: VecDeque<Event>,
}

impl EventSource<Event> for VecSource {
    fn peek_when(&self) -> Option<Instant> {
        self.buffer.front().map(tempo_integration::Timestamped::when)
    }

    fn pop(&mut self) -> Option<Event> {
        self.buffer.pop_front()
    }

    fn is_terminated(&self) -> bool {
        self.buffer.is_empty()
    }
}

fn bar_at(pair: &Pair, seconds: i64, close: rust_decimal::Decimal) -> Event {
    Event::Bar(
        Bar::new(
            pair.clone(),
            chrono::Duration::hours(1),
            close,
            close,
            close,
            close,
            dec!(1),
            Instant::from_timestamp(seconds, 0).unwrap(),
        )
        .unwrap(),
    )
}

// Two sources at when=T: the first-registered source's bar should be delivered before the
// second-registered source's bar, and a callback scheduled for T should fire before either.
#[tokio::test]
async fn two_same_instant_sources_and_a_scheduled_callback_deliver_callback_first_then_registration_order() {
    let pair = Pair::new("btc", "usdt", 6, 2);
    let when = Instant::from_timestamp(1_000, 0).unwrap();

    let mut dispatcher = BacktestingDispatcher::new();

    let mut source_a = VecDeque::new();
    source_a.push_back(bar_at(&pair, 1_000, dec!(100)));
    dispatcher.register_source(Box::new(VecSource { buffer: source_a }));

    let mut source_b = VecDeque::new();
    source_b.push_back(bar_at(&pair, 1_000, dec!(200)));
    dispatcher.register_source(Box::new(VecSource { buffer: source_b }));

    let order = Arc::new(Mutex::new(Vec::new()));

    let order_cb = order.clone();
    dispatcher
        .schedule(when, Box::new(move || order_cb.lock().unwrap().push("tick".to_string())))
        .unwrap();

    let order_handler = order.clone();
    dispatcher.subscribe(
        EventKind::Bar,
        Box::new(move |event: &Event| {
            let order_handler = order_handler.clone();
            let Event::Bar(bar) = event else { unreachable!() };
            let label = format!("bar@{}", bar.close);
            Box::pin(async move {
                order_handler.lock().unwrap().push(label);
            }) as futures::future::BoxFuture<'static, ()>
        }),
    );

    dispatcher.run().await;

    assert_eq!(
        *order.lock().unwrap(),
        vec!["tick".to_string(), "bar@100".to_string(), "bar@200".to_string()],
    );
}

// A margin buy draws a loan for the quote shortfall. An hourly accrual callback, driven entirely
// by the dispatcher's virtual clock rather than wall time, compounds interest on the outstanding
// principal at each tick.
#[tokio::test]
async fn margin_loan_accrues_hourly_on_the_dispatchers_own_scheduled_callbacks() {
    let registry = PairRegistry::new().with_pair(Pair::new("btc", "usdt", 6, 2));
    let balances = AccountBalances::new().with_balance("usdt", dec!(0));
    let mut exchange = BacktestingExchange::new(registry, balances, Fees::default(), Liquidity::default())
        .with_margin(LendingPool::new(dec!(0.01)));

    let opened_at = Instant::from_timestamp(0, 0).unwrap();
    let loan_id = exchange.borrow("usdt", dec!(1000), opened_at).expect("margin installed");
    assert_eq!(exchange.get_balance("usdt").borrowed, dec!(1000));

    let exchange = Arc::new(Mutex::new(exchange));
    let mut dispatcher = BacktestingDispatcher::new();

    for hour in 1..=3i64 {
        let at = Instant::from_timestamp(hour * 3_600, 0).unwrap();
        let exchange = exchange.clone();
        dispatcher
            .schedule(at, Box::new(move || exchange.lock().unwrap().accrue_interest(at)))
            .unwrap();
    }

    // A single trailing source gives the run loop something to drain once every accrual
    // callback has fired, so it terminates rather than idling forever.
    let pair = Pair::new("btc", "usdt", 6, 2);
    let mut tail = VecDeque::new();
    tail.push_back(bar_at(&pair, 10_800, dec!(100)));
    dispatcher.register_source(Box::new(VecSource { buffer: tail }));

    dispatcher.run().await;

    let exchange = exchange.lock().unwrap();
    let accrued_after_three_hours = dec!(1000) * dec!(0.01) * dec!(3);
    assert_eq!(exchange.get_balance("usdt").borrowed, dec!(1000) + accrued_after_three_hours);

    let loan = exchange
        .close_all_loans()
        .into_iter()
        .find(|loan| loan.id == loan_id)
        .expect("loan still open");
    assert_eq!(loan.accrued_interest, accrued_after_three_hours);
}
