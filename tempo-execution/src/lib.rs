//! Backtesting order matching, account balances, fees, liquidity and margin lending.

/// Per-symbol available/hold/borrowed balances, mutated only transactionally.
pub mod balance;

/// Boundary error taxonomy: user input, business-rule, and collaborator errors.
pub mod error;

/// The uniform order/trading façade a strategy is written against.
pub mod exchange;

/// Maker/taker fee rates and fee calculation.
pub mod fees;

/// Optional margin lending: loans, interest accrual, repayment.
pub mod lending;

/// Bounds per-bar fillable volume and derives the representative fill price.
pub mod liquidity;

/// The matching engine: order state machine and per-bar matching algorithm.
pub mod manager;

/// Client order type, kind, and status.
pub mod order;

/// Immutable fill record emitted by a matching step.
pub mod trade;

pub use balance::{AccountBalances, Balance};
pub use error::{ExecutionError, InvalidOrderError};
pub use exchange::{BacktestingExchange, BarHandler, Exchange};
pub use fees::Fees;
pub use lending::{Loan, LoanId, LendingPool};
pub use liquidity::Liquidity;
pub use manager::OrderManager;
pub use order::{Order, OrderId, OrderKind, OrderStatus};
pub use trade::Trade;
