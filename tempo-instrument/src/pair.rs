use crate::{precision::Precision, symbol::Symbol};
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// A tradeable base/quote combination, together with the fixed-point precision each side is
/// quoted to.
///
/// eg/ base `btc`, quote `usdt`, `base_precision` 6, `quote_precision` 2
#[derive(Clone, Eq, PartialEq, Hash, Debug, Display, Deserialize, Serialize)]
#[display("{base}_{quote}")]
pub struct Pair {
    pub base: Symbol,
    pub quote: Symbol,
    pub base_precision: Precision,
    pub quote_precision: Precision,
}

impl Pair {
    pub fn new<B, Q>(base: B, quote: Q, base_precision: u32, quote_precision: u32) -> Self
    where
        B: Into<Symbol>,
        Q: Into<Symbol>,
    {
        Self {
            base: base.into(),
            quote: quote.into(),
            base_precision: Precision::new(base_precision),
            quote_precision: Precision::new(quote_precision),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_display_is_base_underscore_quote() {
        let pair = Pair::new("BTC", "USDT", 6, 2);
        assert_eq!(pair.to_string(), "btc_usdt");
    }
}
