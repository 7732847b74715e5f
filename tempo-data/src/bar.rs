use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tempo_instrument::Pair;
use tempo_integration::{Instant, Timestamped};
use thiserror::Error;

/// An OHLCV aggregate over a fixed period, timestamped at the close of that period.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct Bar {
    pub pair: Pair,
    pub period: chrono::Duration,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub when: Instant,
}

/// Raised by [`Bar::new`] when the OHLCV values violate the bar's own invariants.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum InvalidBarError {
    #[error("bar high {high} is below open/close ({open}/{close})")]
    HighBelowBody {
        high: Decimal,
        open: Decimal,
        close: Decimal,
    },
    #[error("bar low {low} is above open/close ({open}/{close})")]
    LowAboveBody {
        low: Decimal,
        open: Decimal,
        close: Decimal,
    },
    #[error("bar volume {0} is negative")]
    NegativeVolume(Decimal),
    #[error("bar period must be positive, got {0}")]
    NonPositivePeriod(chrono::Duration),
}

impl Bar {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pair: Pair,
        period: chrono::Duration,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
        when: Instant,
    ) -> Result<Self, InvalidBarError> {
        if high < open || high < close {
            return Err(InvalidBarError::HighBelowBody { high, open, close });
        }
        if low > open || low > close {
            return Err(InvalidBarError::LowAboveBody { low, open, close });
        }
        if volume < Decimal::ZERO {
            return Err(InvalidBarError::NegativeVolume(volume));
        }
        if period <= chrono::Duration::zero() {
            return Err(InvalidBarError::NonPositivePeriod(period));
        }

        Ok(Self {
            pair,
            period,
            open,
            high,
            low,
            close,
            volume,
            when,
        })
    }
}

impl Timestamped for Bar {
    fn when(&self) -> Instant {
        self.when
    }
}
