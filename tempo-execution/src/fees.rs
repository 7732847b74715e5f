use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tempo_instrument::Pair;
use tempo_integration::Side;

/// Maker/taker fee rates, expressed as a fraction of trade notional (e.g. `0.001` = 10bps).
#[derive(Copy, Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct Fees {
    pub maker: Decimal,
    pub taker: Decimal,
}

impl Fees {
    pub fn new(maker: Decimal, taker: Decimal) -> Self {
        Self { maker, taker }
    }

    /// The fee charged on a fill of `quantity` at `price`, denominated in whichever symbol the
    /// fill credits to the client - base for a buy, quote for a sell - and rounded up in the
    /// pair's precision for that symbol, favouring the exchange.
    pub fn charge(&self, pair: &Pair, side: Side, maker: bool, quantity: Decimal, price: Decimal) -> Decimal {
        let rate = if maker { self.maker } else { self.taker };

        match side {
            Side::Buy => pair.base_precision.round_up(rate * quantity),
            Side::Sell => pair.quote_precision.round_up(rate * quantity * price),
        }
    }
}

impl Default for Fees {
    fn default() -> Self {
        Self {
            maker: Decimal::ZERO,
            taker: Decimal::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pair() -> Pair {
        Pair::new("btc", "usdt", 6, 2)
    }

    #[test]
    fn buy_fee_is_denominated_in_base_and_rounds_up() {
        let fees = Fees::new(dec!(0.001), dec!(0.002));
        let fee = fees.charge(&pair(), Side::Buy, false, dec!(1), dec!(100));
        assert_eq!(fee, dec!(0.002));
    }

    #[test]
    fn sell_fee_is_denominated_in_quote_and_rounds_up() {
        let fees = Fees::new(dec!(0.001), dec!(0.002));
        let fee = fees.charge(&pair(), Side::Sell, true, dec!(1), dec!(100.005));
        // notional = 100.005, maker fee = 0.100005 -> rounds up to 0.11 at 2dp
        assert_eq!(fee, dec!(0.11));
    }
}
