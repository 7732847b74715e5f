use futures::future::BoxFuture;
use rust_decimal::Decimal;

use tempo_data::{Bar, OrderBookUpdate};
use tempo_execution::{ExecutionError, OrderId};
use tempo_instrument::Pair;
use tempo_integration::{EventSource, Producer};

/// What a live exchange collaborator must expose, matching the backtesting façade's call shape
/// so a [`crate::strategy::Strategy`] runs unchanged against either.
///
/// No concrete implementation ships here - a real client (REST order entry, a WebSocket market
/// data feed) is an out-of-scope collaborator specified only by this interface.
///
/// `subscribe_bars`/`subscribe_order_book` return a pull-style [`EventSource`] rather than taking
/// a push-style handler like [`tempo_execution::Exchange::subscribe_to_bar_events`] - this trait
/// is the producer-side collaborator the dispatcher registers as a source, not the strategy-facing
/// façade itself; a dispatcher wraps the returned source and fans events out to subscribers from
/// there.
pub trait LiveExchange: Producer {
    type BarSource: EventSource<Bar>;
    type OrderBookSource: EventSource<OrderBookUpdate>;

    fn subscribe_bars(&mut self, pair: &Pair, period: chrono::Duration) -> Self::BarSource;

    fn subscribe_order_book(&mut self, pair: &Pair) -> Self::OrderBookSource;

    fn submit_order(&mut self, spec: OrderSpec) -> BoxFuture<'_, Result<OrderId, ExecutionError>>;

    fn cancel_order(&mut self, id: OrderId) -> BoxFuture<'_, Result<(), ExecutionError>>;

    /// `symbol -> (available, hold)`, mirroring the backtesting façade's [`tempo_execution::Balance`]
    /// without exposing `borrowed` - margin accounting is a backtesting-only concept here.
    fn balances(&self) -> BoxFuture<'_, Result<Vec<(String, Decimal, Decimal)>, ExecutionError>>;
}

/// The order parameters a live submission carries; the backtesting façade takes the same fields
/// as direct arguments; a live client marshals this into its own wire format.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSpec {
    pub pair: String,
    pub side: tempo_integration::Side,
    pub amount: Decimal,
    pub limit_price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
}
