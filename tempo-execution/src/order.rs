use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tempo_instrument::Pair;
use tempo_integration::{Instant, Sequence, Side};

/// Unique, strictly increasing identifier minted by an `OrderManager` for every order it
/// accepts. Deliberately a plain counter rather than a UUID - a backtest rerun on identical
/// input must mint identical ids, and a random UUID would break that.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
pub struct OrderId(pub u64);

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The three order kinds the matcher understands, together with the price fields each requires.
#[derive(Copy, Clone, PartialEq, Debug, Deserialize, Serialize)]
pub enum OrderKind {
    Market,
    Limit { limit_price: Decimal },
    StopLimit {
        stop_price: Decimal,
        limit_price: Decimal,
    },
}

impl OrderKind {
    pub fn limit_price(&self) -> Option<Decimal> {
        match self {
            OrderKind::Market => None,
            OrderKind::Limit { limit_price } => Some(*limit_price),
            OrderKind::StopLimit { limit_price, .. } => Some(*limit_price),
        }
    }

    pub fn stop_price(&self) -> Option<Decimal> {
        match self {
            OrderKind::StopLimit { stop_price, .. } => Some(*stop_price),
            _ => None,
        }
    }
}

/// `NEW -> (PENDING_TRIGGER ->)? OPEN -> (PARTIALLY_FILLED)* -> FILLED | CANCELED | REJECTED`.
///
/// `Filled`, `Canceled` and `Rejected` are absorbing: [`Order::transition`] panics if asked to
/// leave one of them, since that would indicate a matching engine bug rather than a recoverable
/// condition.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub enum OrderStatus {
    New,
    PendingTrigger,
    Open,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Canceled | OrderStatus::Rejected
        )
    }
}

/// A client order tracked end-to-end by an `OrderManager`.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub pair: Pair,
    pub side: Side,
    pub kind: OrderKind,
    pub amount: Decimal,
    pub status: OrderStatus,
    pub filled_amount: Decimal,
    pub avg_fill_price: Option<Decimal>,
    pub fees_accrued: Decimal,
    /// Creation order, used as the FIFO tie-break between orders resting at the same price.
    pub created_seq: Sequence,
    pub created_at: Instant,
    /// `true` once this order has survived at least one bar without being fully filled - the
    /// maker/taker distinction a fill is charged at.
    pub resting: bool,
}

impl Order {
    pub fn remaining(&self) -> Decimal {
        self.amount - self.filled_amount
    }

    pub fn is_open_for_matching(&self) -> bool {
        matches!(self.status, OrderStatus::Open | OrderStatus::PartiallyFilled)
    }

    /// Record a fill of `quantity` at `price`, updating the running average fill price and
    /// transitioning to `Filled` once fully satisfied.
    pub fn apply_fill(&mut self, quantity: Decimal, price: Decimal, fee: Decimal) {
        assert!(!self.status.is_terminal(), "cannot fill a terminal order");

        let prior_filled = self.filled_amount;
        let prior_notional = self
            .avg_fill_price
            .map(|avg| avg * prior_filled)
            .unwrap_or(Decimal::ZERO);

        self.filled_amount += quantity;
        self.fees_accrued += fee;
        self.avg_fill_price = Some((prior_notional + price * quantity) / self.filled_amount);

        self.status = if self.remaining().is_zero() {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
    }

    pub fn transition(&mut self, to: OrderStatus) {
        assert!(
            !self.status.is_terminal(),
            "order {} is already terminal ({:?}), cannot transition to {:?}",
            self.id,
            self.status,
            to
        );
        self.status = to;
    }
}
