//! Bar market data and the historical CSV source that feeds it into a dispatcher.

/// OHLCV bar type and its construction invariants.
pub mod bar;

/// Eager CSV-backed [`EventSource`](tempo_integration::EventSource) of [`bar::Bar`] events.
pub mod csv_source;

/// Live order book snapshot type, out-of-scope detail aside.
pub mod order_book;

pub use bar::{Bar, InvalidBarError};
pub use csv_source::{CsvBarSource, CsvBarSourceError};
pub use order_book::{InvalidOrderBookError, OrderBookUpdate};
