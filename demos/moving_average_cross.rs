//! Worked example strategy: a moving-average cross, wired through the dispatcher against a CSV
//! bar source and a backtesting exchange assembled from a `SystemConfig`.
//!
//! Run with `cargo run -p tempo --example moving_average_cross -- path/to/bars.csv`.

use std::collections::VecDeque;
use std::env;
use std::sync::Arc;

use futures::future::BoxFuture;
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use tempo::config::{PairConfig, SystemConfig};
use tempo::dispatch::BacktestingDispatcher;
use tempo::event::{EventKind, IntoEventSource};
use tempo::logging::init_logging;
use tempo::strategy::{Strategy, StrategyHandler};
use tempo::summary::TradingSummary;
use tempo_data::{Bar, CsvBarSource};
use tempo_execution::{BacktestingExchange, Exchange};
use tempo_integration::{Side, Timestamped};

/// Buys when the short moving average crosses above the long one, sells on the reverse cross.
/// Holds at most one unit of the traded pair at a time.
struct MovingAverageCross {
    pair: &'static str,
    short_window: usize,
    long_window: usize,
    closes: VecDeque<Decimal>,
    holding: bool,
}

impl MovingAverageCross {
    fn new(pair: &'static str, short_window: usize, long_window: usize) -> Self {
        Self {
            pair,
            short_window,
            long_window,
            closes: VecDeque::with_capacity(long_window + 1),
            holding: false,
        }
    }

    fn average(window: &[Decimal]) -> Decimal {
        let sum: Decimal = window.iter().copied().sum();
        sum / Decimal::from(window.len() as u64)
    }
}

impl Strategy for MovingAverageCross {
    fn on_bar<'a>(&'a mut self, bar: &'a Bar, exchange: &'a mut BacktestingExchange) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.closes.push_back(bar.close);
            while self.closes.len() > self.long_window {
                self.closes.pop_front();
            }
            if self.closes.len() < self.long_window {
                return;
            }

            let all: Vec<Decimal> = self.closes.iter().copied().collect();
            let short_avg = Self::average(&all[all.len() - self.short_window..]);
            let long_avg = Self::average(&all);

            if short_avg > long_avg && !self.holding {
                if exchange
                    .create_market_order(self.pair, Side::Buy, Decimal::ONE, bar.when())
                    .is_ok()
                {
                    self.holding = true;
                }
            } else if short_avg < long_avg && self.holding {
                if exchange
                    .create_market_order(self.pair, Side::Sell, Decimal::ONE, bar.when())
                    .is_ok()
                {
                    self.holding = false;
                }
            }
        })
    }
}

#[tokio::main]
async fn main() {
    init_logging();

    let csv_path = env::args().nth(1).expect("usage: moving_average_cross <bars.csv>");

    let config = SystemConfig {
        pairs: vec![PairConfig {
            base: "btc".into(),
            quote: "usdt".into(),
            base_precision: 6,
            quote_precision: 2,
        }],
        starting_balances: vec![("usdt".into(), Decimal::from(10_000))],
        fees: Default::default(),
        liquidity: Default::default(),
        lending: None,
        strict_handlers: false,
    };

    let (registry, exchange) = config.build();
    let pair = registry.get("btc_usdt").unwrap().clone();
    let exchange = Arc::new(Mutex::new(exchange));
    let summary = Arc::new(Mutex::new(TradingSummary::new()));

    let source = CsvBarSource::open(csv_path, pair, chrono::Duration::hours(1)).expect("load bars");

    let mut dispatcher = BacktestingDispatcher::new();
    dispatcher.register_source(Box::new(IntoEventSource::new(source)));
    dispatcher.subscribe(
        EventKind::Bar,
        Box::new(StrategyHandler::new(
            MovingAverageCross::new("btc_usdt", 5, 20),
            exchange.clone(),
            summary.clone(),
        )),
    );

    dispatcher.run().await;

    let final_balance = exchange.lock().await.get_balance("usdt");
    let realized_pnl = summary.lock().await.realized_pnl("btc_usdt");
    tracing::info!(
        available = %final_balance.available,
        realized_pnl = %realized_pnl,
        "backtest finished"
    );
}
