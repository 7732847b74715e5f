use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tempo_instrument::Pair;
use tempo_integration::{Instant, Side};

use crate::order::OrderId;

/// A single fill produced by one matching step. Immutable once emitted.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct Trade {
    pub order_id: OrderId,
    pub pair: Pair,
    pub side: Side,
    pub quantity: Decimal,
    pub price: Decimal,
    /// Symbol the fee was charged in, and the fee amount.
    pub fee_symbol: smol_str::SmolStr,
    pub fee_amount: Decimal,
    pub when: Instant,
}
