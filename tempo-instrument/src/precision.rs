use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of fractional digits a pair's base or quote asset is quoted to.
///
/// Carried on [`crate::Pair`] rather than as a free-standing `u32` so that every rounding call
/// site names which side of the pair it rounds against.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Deserialize, Serialize,
)]
pub struct Precision(pub u32);

impl Precision {
    pub const fn new(digits: u32) -> Self {
        Self(digits)
    }

    /// Truncate `amount` toward zero to this many fractional digits.
    ///
    /// Used for order quantities and balances, where rounding up would manufacture size that was
    /// never actually available.
    pub fn truncate(self, amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(self.0, RoundingStrategy::ToZero)
    }

    /// Round `amount` half up to this many fractional digits.
    ///
    /// Used for prices, which are agreed quantities rather than held balances.
    pub fn round_half_up(self, amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(self.0, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Round `amount` up (ceiling) to this many fractional digits.
    ///
    /// Used for fees, which must always favour the exchange over the client.
    pub fn round_up(self, amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(self.0, RoundingStrategy::AwayFromZero)
    }
}
