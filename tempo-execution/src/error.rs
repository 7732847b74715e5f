use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use thiserror::Error;

use crate::order::OrderId;

/// Boundary error kinds a strategy or façade caller may observe.
///
/// Mirrors the teacher's flat, `#[from]`-free execution error style: each variant is
/// self-contained and carries just enough context to explain itself without a backtrace.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Error)]
pub enum ExecutionError {
    #[error("insufficient balance for symbol '{symbol}': required {required}, available {available}")]
    InsufficientBalance {
        symbol: SmolStr,
        required: Decimal,
        available: Decimal,
    },

    #[error("invalid order: {0}")]
    InvalidOrder(#[from] InvalidOrderError),

    #[error("order not found: {0:?}")]
    OrderNotFound(OrderId),

    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("connectivity error: {0}")]
    ConnectivityError(String),
}

/// Why an order submission was rejected before it ever reached the book.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Error)]
pub enum InvalidOrderError {
    #[error("amount {0} must be positive")]
    NonPositiveAmount(Decimal),

    #[error("amount {amount} has more precision than the pair allows ({allowed} decimal places)")]
    BadAmountPrecision { amount: Decimal, allowed: u32 },

    #[error("price {price} has more precision than the pair allows ({allowed} decimal places)")]
    BadPricePrecision { price: Decimal, allowed: u32 },

    #[error("unknown pair '{0}'")]
    UnknownPair(String),

    #[error("stop price {stop} is on the wrong side of the market price {market}")]
    StopOnWrongSideOfMarket { stop: Decimal, market: Decimal },

    #[error("limit orders require a limit price")]
    MissingLimitPrice,

    #[error("stop-limit orders require both a stop price and a limit price")]
    MissingStopOrLimitPrice,
}
