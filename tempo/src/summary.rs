use indexmap::IndexMap;
use rust_decimal::Decimal;
use smol_str::SmolStr;

use tempo_execution::Trade;
use tempo_integration::{Instant, Side};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Position {
    net_quantity: Decimal,
    avg_entry_price: Decimal,
}

/// Minimal equity curve and per-pair realised P&L, derived from the [`Trade`]s a backtest
/// produces and the equity samples the caller chooses to record.
///
/// Realised P&L uses a weighted-average-cost model: a trade on the same side as the current net
/// position blends into the average entry price, a trade on the opposite side realises P&L
/// against that average down to (and, on a flip, past) a flat position.
#[derive(Debug, Clone, Default)]
pub struct TradingSummary {
    equity_curve: Vec<(Instant, Decimal)>,
    positions: IndexMap<SmolStr, Position>,
    realized_pnl: IndexMap<SmolStr, Decimal>,
}

impl TradingSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_equity(&mut self, when: Instant, equity: Decimal) {
        self.equity_curve.push((when, equity));
    }

    pub fn equity_curve(&self) -> &[(Instant, Decimal)] {
        &self.equity_curve
    }

    pub fn realized_pnl(&self, pair_key: &str) -> Decimal {
        self.realized_pnl.get(pair_key).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn record_trade(&mut self, trade: &Trade) {
        let key: SmolStr = trade.pair.to_string().into();
        let position = self.positions.entry(key.clone()).or_default();
        let signed_quantity = match trade.side {
            Side::Buy => trade.quantity,
            Side::Sell => -trade.quantity,
        };

        let same_direction =
            position.net_quantity.is_zero() || sign(position.net_quantity) == sign(signed_quantity);

        if same_direction {
            let total = position.net_quantity + signed_quantity;
            if !total.is_zero() {
                position.avg_entry_price = (position.avg_entry_price * position.net_quantity.abs()
                    + trade.price * signed_quantity.abs())
                    / total.abs();
            }
            position.net_quantity = total;
        } else {
            let closing = signed_quantity.abs().min(position.net_quantity.abs());
            let direction = Decimal::from(sign(position.net_quantity));
            let pnl = direction * closing * (trade.price - position.avg_entry_price);

            *self.realized_pnl.entry(key).or_default() += pnl;

            let remainder = signed_quantity.abs() - closing;
            position.net_quantity -= direction * closing;
            if remainder > Decimal::ZERO {
                position.net_quantity = Decimal::from(-sign(signed_quantity)) * remainder;
                position.avg_entry_price = trade.price;
            }
        }
    }
}

fn sign(value: Decimal) -> i32 {
    if value.is_zero() {
        0
    } else if value.is_sign_positive() {
        1
    } else {
        -1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempo_execution::OrderId;
    use tempo_instrument::Pair;

    fn trade(side: Side, quantity: Decimal, price: Decimal) -> Trade {
        Trade {
            order_id: OrderId(1),
            pair: Pair::new("btc", "usdt", 6, 2),
            side,
            quantity,
            price,
            fee_symbol: "usdt".into(),
            fee_amount: Decimal::ZERO,
            when: Instant::from_timestamp(0, 0).unwrap(),
        }
    }

    #[test]
    fn a_round_trip_buy_then_sell_realises_the_price_difference() {
        let mut summary = TradingSummary::new();
        summary.record_trade(&trade(Side::Buy, dec!(1), dec!(100)));
        summary.record_trade(&trade(Side::Sell, dec!(1), dec!(110)));

        assert_eq!(summary.realized_pnl("btc_usdt"), dec!(10));
    }

    #[test]
    fn partial_close_realises_pnl_on_only_the_closed_quantity() {
        let mut summary = TradingSummary::new();
        summary.record_trade(&trade(Side::Buy, dec!(2), dec!(100)));
        summary.record_trade(&trade(Side::Sell, dec!(1), dec!(120)));

        assert_eq!(summary.realized_pnl("btc_usdt"), dec!(20));
    }

    #[test]
    fn equity_curve_records_samples_in_insertion_order() {
        let mut summary = TradingSummary::new();
        summary.record_equity(Instant::from_timestamp(0, 0).unwrap(), dec!(1000));
        summary.record_equity(Instant::from_timestamp(10, 0).unwrap(), dec!(1050));

        assert_eq!(summary.equity_curve().len(), 2);
        assert_eq!(summary.equity_curve()[1].1, dec!(1050));
    }
}
