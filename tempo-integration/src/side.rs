use derive_more::Display;
use serde::{Deserialize, Serialize};

/// The side of an `Order` placement or `Trade` fill.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Deserialize, Serialize,
)]
pub enum Side {
    #[display("buy")]
    Buy,
    #[display("sell")]
    Sell,
}
