use futures::future::BoxFuture;
use rust_decimal::Decimal;
use tempo_data::Bar;
use tempo_instrument::PairRegistry;
use tempo_integration::{Instant, Side};

use crate::{
    balance::{AccountBalances, Balance},
    error::ExecutionError,
    fees::Fees,
    lending::LendingPool,
    liquidity::Liquidity,
    manager::OrderManager,
    order::{Order, OrderId},
    trade::Trade,
};

/// A bar-event subscriber registered through [`Exchange::subscribe_to_bar_events`].
///
/// Boxed-future rather than `async fn` so the handler can be stored in a heterogeneous
/// collection, matching [`crate::manager::OrderManager`]'s handling of suspension-capable
/// callbacks elsewhere in the façade.
pub type BarHandler = Box<dyn FnMut(&Bar) -> BoxFuture<'_, ()> + Send>;

/// The uniform order/trading surface a strategy is written against.
///
/// The backtesting implementation ([`BacktestingExchange`]) routes every call to an in-process
/// [`OrderManager`]; a live implementation would route the same calls to a REST/WebSocket
/// client instead. Both are expected to surface the same [`ExecutionError`] variants for the
/// same misuse, so a strategy built against one runs unchanged against the other.
pub trait Exchange {
    /// Register `handler` to run on every bar delivered for `pair` at `period`. Matching (filling
    /// orders resting against the bar) always happens before subscribers for that bar run.
    fn subscribe_to_bar_events(&mut self, pair: &str, period: chrono::Duration, handler: BarHandler);

    fn create_market_order(
        &mut self,
        pair: &str,
        side: Side,
        amount: Decimal,
        now: Instant,
    ) -> Result<OrderId, ExecutionError>;

    fn create_limit_order(
        &mut self,
        pair: &str,
        side: Side,
        amount: Decimal,
        limit_price: Decimal,
        now: Instant,
    ) -> Result<OrderId, ExecutionError>;

    fn create_stop_limit_order(
        &mut self,
        pair: &str,
        side: Side,
        amount: Decimal,
        stop_price: Decimal,
        limit_price: Decimal,
        now: Instant,
    ) -> Result<OrderId, ExecutionError>;

    fn cancel_order(&mut self, id: OrderId) -> Result<(), ExecutionError>;

    fn get_balance(&self, symbol: &str) -> Balance;

    fn get_open_orders(&self, pair: &str) -> Vec<&Order>;
}

/// Owns the `OrderManager`, `AccountBalances`, `Fees`, `Liquidity` and optional `LendingPool`
/// for one backtest run, and exposes them through the [`Exchange`] façade.
pub struct BacktestingExchange {
    registry: PairRegistry,
    manager: OrderManager,
    balances: AccountBalances,
    fees: Fees,
    liquidity: Liquidity,
    lending: Option<LendingPool>,
    bar_handlers: indexmap::IndexMap<String, Vec<BarHandler>>,
}

impl BacktestingExchange {
    pub fn new(registry: PairRegistry, balances: AccountBalances, fees: Fees, liquidity: Liquidity) -> Self {
        Self {
            registry,
            manager: OrderManager::new(),
            balances,
            fees,
            liquidity,
            lending: None,
            bar_handlers: indexmap::IndexMap::new(),
        }
    }

    pub fn with_margin(mut self, lending: LendingPool) -> Self {
        self.lending = Some(lending);
        self
    }

    /// Run one bar of matching, returning every [`Trade`] it produced. Does not invoke any
    /// handler registered through [`Exchange::subscribe_to_bar_events`] - use
    /// [`Self::process_bar_and_notify`] for that.
    pub fn process_bar(&mut self, bar: &Bar) -> Vec<Trade> {
        self.manager
            .process_bar(&mut self.balances, &self.fees, &self.liquidity, bar)
    }

    /// Run one bar of matching, then invoke every handler subscribed to `bar.pair` in
    /// registration order. Matching always completes first, so a handler sees balances already
    /// updated for this bar's fills.
    pub async fn process_bar_and_notify(&mut self, bar: &Bar) -> Vec<Trade> {
        let trades = self.process_bar(bar);

        let pair_key = bar.pair.to_string();
        if let Some(handlers) = self.bar_handlers.get_mut(&pair_key) {
            for handler in handlers.iter_mut() {
                handler(bar).await;
            }
        }

        trades
    }

    /// Accrue interest on every open loan up to `until`. A no-op when margin is not installed.
    pub fn accrue_interest(&mut self, until: Instant) {
        if let Some(lending) = self.lending.as_mut() {
            lending.accrue(&mut self.balances, until);
        }
    }

    pub fn borrow(&mut self, symbol: &str, amount: Decimal, now: Instant) -> Option<crate::lending::LoanId> {
        self.lending
            .as_mut()
            .map(|pool| pool.borrow(&mut self.balances, symbol, amount, now))
    }

    pub fn repay(
        &mut self,
        loan_id: crate::lending::LoanId,
        amount: Decimal,
        now: Instant,
    ) -> Result<(), ExecutionError> {
        self.lending
            .as_mut()
            .expect("repay called without a LendingPool installed")
            .repay(&mut self.balances, loan_id, amount, now)
    }

    /// Surface every loan still open, for end-of-run reporting. Called once at dispatcher
    /// shutdown.
    pub fn close_all_loans(&self) -> Vec<&crate::lending::Loan> {
        self.lending
            .iter()
            .flat_map(|pool| pool.open_loans())
            .collect()
    }

    pub fn get_order_info(&self, id: OrderId) -> Result<&Order, ExecutionError> {
        self.manager.get_order_info(id)
    }
}

impl Exchange for BacktestingExchange {
    // `period` carries no weight here: a backtest is fed pre-built bars of whatever period the
    // source was opened at, so there is nothing to aggregate against. Kept on the signature for
    // parity with the live collaborator's `subscribe_bars(pair, period)`.
    fn subscribe_to_bar_events(&mut self, pair: &str, _period: chrono::Duration, handler: BarHandler) {
        self.bar_handlers.entry(pair.to_string()).or_default().push(handler);
    }

    fn create_market_order(
        &mut self,
        pair: &str,
        side: Side,
        amount: Decimal,
        now: Instant,
    ) -> Result<OrderId, ExecutionError> {
        self.manager
            .create_market_order(&self.registry, &mut self.balances, pair, side, amount, now)
    }

    fn create_limit_order(
        &mut self,
        pair: &str,
        side: Side,
        amount: Decimal,
        limit_price: Decimal,
        now: Instant,
    ) -> Result<OrderId, ExecutionError> {
        self.manager.create_limit_order(
            &self.registry,
            &mut self.balances,
            pair,
            side,
            amount,
            limit_price,
            now,
        )
    }

    fn create_stop_limit_order(
        &mut self,
        pair: &str,
        side: Side,
        amount: Decimal,
        stop_price: Decimal,
        limit_price: Decimal,
        now: Instant,
    ) -> Result<OrderId, ExecutionError> {
        self.manager.create_stop_limit_order(
            &self.registry,
            &mut self.balances,
            pair,
            side,
            amount,
            stop_price,
            limit_price,
            now,
        )
    }

    fn cancel_order(&mut self, id: OrderId) -> Result<(), ExecutionError> {
        self.manager.cancel_order(&mut self.balances, id)
    }

    fn get_balance(&self, symbol: &str) -> Balance {
        self.balances.balance(symbol)
    }

    fn get_open_orders(&self, pair: &str) -> Vec<&Order> {
        self.manager.open_orders_for_pair(pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempo_instrument::Pair;

    fn exchange() -> BacktestingExchange {
        BacktestingExchange::new(
            PairRegistry::new().with_pair(Pair::new("btc", "usdt", 6, 2)),
            AccountBalances::new().with_balance("usdt", dec!(1000)),
            Fees::default(),
            Liquidity::default(),
        )
    }

    #[test]
    fn facade_round_trips_a_limit_order_through_create_and_cancel() {
        let mut exchange = exchange();
        let now = Instant::from_timestamp(0, 0).unwrap();

        let id = exchange
            .create_limit_order("btc_usdt", Side::Buy, dec!(1), dec!(90), now)
            .unwrap();

        assert_eq!(exchange.get_open_orders("btc_usdt").len(), 1);

        exchange.cancel_order(id).unwrap();
        assert_eq!(exchange.get_open_orders("btc_usdt").len(), 0);
        assert_eq!(exchange.get_balance("usdt").available, dec!(1000));
    }

    #[tokio::test]
    async fn subscribed_bar_handler_runs_after_matching_and_only_for_its_own_pair() {
        use std::sync::{Arc, Mutex};

        let mut exchange = BacktestingExchange::new(
            PairRegistry::new()
                .with_pair(Pair::new("btc", "usdt", 6, 2))
                .with_pair(Pair::new("eth", "usdt", 6, 2)),
            AccountBalances::new().with_balance("usdt", dec!(1000)),
            Fees::default(),
            Liquidity::default(),
        );
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_handler = seen.clone();
        exchange.subscribe_to_bar_events(
            "btc_usdt",
            chrono::Duration::hours(1),
            Box::new(move |bar: &tempo_data::Bar| {
                let seen_handler = seen_handler.clone();
                let close = bar.close;
                Box::pin(async move {
                    seen_handler.lock().unwrap().push(close);
                })
            }),
        );

        let btc_bar = tempo_data::Bar::new(
            Pair::new("btc", "usdt", 6, 2),
            chrono::Duration::hours(1),
            dec!(100),
            dec!(100),
            dec!(100),
            dec!(100),
            dec!(1),
            Instant::from_timestamp(0, 0).unwrap(),
        )
        .unwrap();
        let eth_bar = tempo_data::Bar::new(
            Pair::new("eth", "usdt", 6, 2),
            chrono::Duration::hours(1),
            dec!(200),
            dec!(200),
            dec!(200),
            dec!(200),
            dec!(1),
            Instant::from_timestamp(0, 0).unwrap(),
        )
        .unwrap();

        exchange.process_bar_and_notify(&eth_bar).await;
        exchange.process_bar_and_notify(&btc_bar).await;

        assert_eq!(*seen.lock().unwrap(), vec![dec!(100)]);
    }
}
