use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::Mutex;

use tempo_data::Bar;
use tempo_execution::BacktestingExchange;

use crate::dispatch::Handler;
use crate::event::Event;
use crate::summary::TradingSummary;

/// The subscriber contract a backtest strategy implements.
///
/// Mirrors [`crate::dispatch::Handler`]'s shape (a boxed future rather than an `async fn`, to
/// stay object-safe) but is scoped to bar events and given direct access to the exchange façade,
/// since every strategy's reason for existing is to place and manage orders in response to
/// market data.
pub trait Strategy: Send {
    fn on_bar<'a>(&'a mut self, bar: &'a Bar, exchange: &'a mut BacktestingExchange) -> BoxFuture<'a, ()>;
}

/// Adapts a [`Strategy`] into a dispatcher [`Handler`], sharing one exchange across every
/// subscriber registered against the same backtest.
///
/// Each bar is first run through the exchange's own matching (`process_bar`), settling fills
/// against orders the strategy placed on earlier bars, before the strategy sees the bar and
/// reacts to it. Every resulting trade is recorded into the shared `TradingSummary`.
pub struct StrategyHandler<S> {
    strategy: S,
    exchange: Arc<Mutex<BacktestingExchange>>,
    summary: Arc<Mutex<TradingSummary>>,
}

impl<S: Strategy> StrategyHandler<S> {
    pub fn new(
        strategy: S,
        exchange: Arc<Mutex<BacktestingExchange>>,
        summary: Arc<Mutex<TradingSummary>>,
    ) -> Self {
        Self { strategy, exchange, summary }
    }
}

impl<S: Strategy> Handler for StrategyHandler<S> {
    fn handle<'a>(&'a mut self, event: &'a Event) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            if let Event::Bar(bar) = event {
                let mut exchange = self.exchange.lock().await;
                let trades = exchange.process_bar(bar);
                if !trades.is_empty() {
                    let mut summary = self.summary.lock().await;
                    for trade in &trades {
                        summary.record_trade(trade);
                    }
                }
                self.strategy.on_bar(bar, &mut exchange).await;
            }
        })
    }
}
