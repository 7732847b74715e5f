use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tempo_data::Bar;
use tempo_integration::Side;

/// Bounds how much of a bar's volume the matcher may fill against, and derives the
/// representative price a market order fills at.
///
/// The default model caps fillable volume at a quarter of the bar's reported volume and applies
/// no slippage, so a market order consumes the bar's `open` price until the cap is exhausted.
#[derive(Copy, Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct Liquidity {
    /// Fraction of `Bar::volume` that may be filled against within that bar.
    pub fraction_of_bar_volume: Decimal,
    /// Price movement per unit of bar volume already consumed this bar, applied in the
    /// direction that disfavours the taker (up for buys, down for sells).
    pub slippage_per_unit: Decimal,
}

impl Default for Liquidity {
    fn default() -> Self {
        Self {
            fraction_of_bar_volume: Decimal::new(25, 2),
            slippage_per_unit: Decimal::ZERO,
        }
    }
}

impl Liquidity {
    pub fn new(fraction_of_bar_volume: Decimal, slippage_per_unit: Decimal) -> Self {
        Self {
            fraction_of_bar_volume,
            slippage_per_unit,
        }
    }

    /// Total volume fillable against `bar` across every order matched within it.
    pub fn cap(&self, bar: &Bar) -> Decimal {
        self.fraction_of_bar_volume * bar.volume
    }

    /// The price a market order fills at, given how much of the bar's liquidity has already
    /// been consumed by earlier fills within the same bar.
    pub fn representative_price(&self, bar: &Bar, side: Side, already_consumed: Decimal) -> Decimal {
        let direction = match side {
            Side::Buy => Decimal::ONE,
            Side::Sell => -Decimal::ONE,
        };
        bar.open + self.slippage_per_unit * already_consumed * direction
    }
}
