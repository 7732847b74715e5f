use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tempo_instrument::Pair;
use tempo_integration::{Instant, Timestamped};
use thiserror::Error;

/// A live order book snapshot: strictly monotone `price -> size` maps with no zero sizes.
///
/// Out of scope to maintain here (the detail belongs to an exchange's WebSocket client); this
/// type only carries what a live collaborator hands across the `EventSource<OrderBookUpdate>`
/// boundary in §6.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct OrderBookUpdate {
    pub pair: Pair,
    pub bids: IndexMap<Decimal, Decimal>,
    pub asks: IndexMap<Decimal, Decimal>,
    pub when: Instant,
}

/// Raised by [`OrderBookUpdate::new`] when a side's levels are not strictly monotone or contain
/// a zero size.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum InvalidOrderBookError {
    #[error("order book side contains a zero-size level at price {0}")]
    ZeroSizeLevel(Decimal),
}

impl OrderBookUpdate {
    pub fn new(
        pair: Pair,
        bids: IndexMap<Decimal, Decimal>,
        asks: IndexMap<Decimal, Decimal>,
        when: Instant,
    ) -> Result<Self, InvalidOrderBookError> {
        for size in bids.values().chain(asks.values()) {
            if size.is_zero() {
                return Err(InvalidOrderBookError::ZeroSizeLevel(*size));
            }
        }

        Ok(Self {
            pair,
            bids,
            asks,
            when,
        })
    }
}

impl Timestamped for OrderBookUpdate {
    fn when(&self) -> Instant {
        self.when
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rejects_a_zero_size_level() {
        let mut bids = IndexMap::new();
        bids.insert(dec!(100), dec!(0));

        let err = OrderBookUpdate::new(
            Pair::new("btc", "usdt", 6, 2),
            bids,
            IndexMap::new(),
            Instant::from_timestamp(0, 0).unwrap(),
        )
        .unwrap_err();

        assert!(matches!(err, InvalidOrderBookError::ZeroSizeLevel(_)));
    }
}
