use rust_decimal::Decimal;
use tempo_data::Bar;
use tempo_instrument::PairRegistry;
use tempo_integration::{Instant, Sequence, SequenceGenerator, Side};

use crate::{
    balance::AccountBalances,
    error::{ExecutionError, InvalidOrderError},
    fees::Fees,
    liquidity::Liquidity,
    order::{Order, OrderId, OrderKind, OrderStatus},
    trade::Trade,
};

/// Owns every order and acts as the matching engine. Does not own balances, fees or the
/// liquidity model itself - those are supplied by the caller (the backtesting exchange façade)
/// so that `OrderManager` stays a pure order book plus matching algorithm.
#[derive(Debug, Default)]
pub struct OrderManager {
    orders: indexmap::IndexMap<OrderId, Order>,
    next_order_id: u64,
    seq: SequenceGenerator,
    /// Last bar close seen per pair, the market price a new stop order is validated against.
    /// Empty until the first bar for a pair has been processed.
    last_prices: indexmap::IndexMap<String, Decimal>,
}

impl OrderManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_order_info(&self, id: OrderId) -> Result<&Order, ExecutionError> {
        self.orders.get(&id).ok_or(ExecutionError::OrderNotFound(id))
    }

    pub fn open_orders_for_pair(&self, pair_key: &str) -> Vec<&Order> {
        self.orders
            .values()
            .filter(|o| o.pair.to_string() == pair_key && o.is_open_for_matching())
            .collect()
    }

    pub fn create_market_order(
        &mut self,
        registry: &PairRegistry,
        balances: &mut AccountBalances,
        pair_key: &str,
        side: Side,
        amount: Decimal,
        now: Instant,
    ) -> Result<OrderId, ExecutionError> {
        self.create_order(
            registry,
            balances,
            pair_key,
            side,
            OrderKind::Market,
            amount,
            now,
        )
    }

    pub fn create_limit_order(
        &mut self,
        registry: &PairRegistry,
        balances: &mut AccountBalances,
        pair_key: &str,
        side: Side,
        amount: Decimal,
        limit_price: Decimal,
        now: Instant,
    ) -> Result<OrderId, ExecutionError> {
        self.create_order(
            registry,
            balances,
            pair_key,
            side,
            OrderKind::Limit { limit_price },
            amount,
            now,
        )
    }

    pub fn create_stop_limit_order(
        &mut self,
        registry: &PairRegistry,
        balances: &mut AccountBalances,
        pair_key: &str,
        side: Side,
        amount: Decimal,
        stop_price: Decimal,
        limit_price: Decimal,
        now: Instant,
    ) -> Result<OrderId, ExecutionError> {
        self.create_order(
            registry,
            balances,
            pair_key,
            side,
            OrderKind::StopLimit {
                stop_price,
                limit_price,
            },
            amount,
            now,
        )
    }

    fn create_order(
        &mut self,
        registry: &PairRegistry,
        balances: &mut AccountBalances,
        pair_key: &str,
        side: Side,
        kind: OrderKind,
        amount: Decimal,
        now: Instant,
    ) -> Result<OrderId, ExecutionError> {
        let pair = registry
            .get(pair_key)
            .map_err(|_| InvalidOrderError::UnknownPair(pair_key.to_owned()))?
            .clone();

        if amount <= Decimal::ZERO {
            return Err(InvalidOrderError::NonPositiveAmount(amount).into());
        }
        if pair.base_precision.truncate(amount) != amount {
            return Err(InvalidOrderError::BadAmountPrecision {
                amount,
                allowed: pair.base_precision.0,
            }
            .into());
        }
        for price in [kind.limit_price(), kind.stop_price()].into_iter().flatten() {
            if pair.quote_precision.round_half_up(price) != price {
                return Err(InvalidOrderError::BadPricePrecision {
                    price,
                    allowed: pair.quote_precision.0,
                }
                .into());
            }
        }
        if matches!(kind, OrderKind::Limit { .. }) && kind.limit_price().is_none() {
            return Err(InvalidOrderError::MissingLimitPrice.into());
        }
        if matches!(kind, OrderKind::StopLimit { .. })
            && (kind.limit_price().is_none() || kind.stop_price().is_none())
        {
            return Err(InvalidOrderError::MissingStopOrLimitPrice.into());
        }
        if let Some(stop_price) = kind.stop_price() {
            if let Some(&market) = self.last_prices.get(pair_key) {
                let wrong_side = match side {
                    Side::Buy => stop_price < market,
                    Side::Sell => stop_price > market,
                };
                if wrong_side {
                    return Err(InvalidOrderError::StopOnWrongSideOfMarket {
                        stop: stop_price,
                        market,
                    }
                    .into());
                }
            }
        }

        let id = OrderId(self.next_order_id);
        self.next_order_id += 1;
        let created_seq = self.seq.next();

        let initial_status = match kind {
            OrderKind::StopLimit { .. } => OrderStatus::PendingTrigger,
            _ => OrderStatus::New,
        };

        let mut order = Order {
            id,
            pair: pair.clone(),
            side,
            kind,
            amount,
            status: initial_status,
            filled_amount: Decimal::ZERO,
            avg_fill_price: None,
            fees_accrued: Decimal::ZERO,
            created_seq,
            created_at: now,
            resting: false,
        };

        if let Err(err) = self.reserve_on_open(&mut order, balances) {
            order.status = OrderStatus::Rejected;
            self.orders.insert(id, order);
            return Err(err);
        }

        order.status = match order.status {
            OrderStatus::PendingTrigger => OrderStatus::PendingTrigger,
            _ => OrderStatus::Open,
        };

        self.orders.insert(id, order);
        Ok(id)
    }

    /// Reserve funds against a new order. Sells always reserve the base amount immediately; buy
    /// limit/stop-limit orders reserve `amount * limit_price` of quote. Buy market orders reserve
    /// nothing here - no representative price exists until a bar arrives, so affordability is
    /// instead enforced at fill time.
    fn reserve_on_open(
        &self,
        order: &Order,
        balances: &mut AccountBalances,
    ) -> Result<(), ExecutionError> {
        match (order.side, order.kind.limit_price()) {
            (Side::Sell, _) => balances.hold(order.pair.base.as_ref(), order.amount),
            (Side::Buy, Some(limit_price)) => {
                balances.hold(order.pair.quote.as_ref(), order.amount * limit_price)
            }
            (Side::Buy, None) => Ok(()),
        }
    }

    pub fn cancel_order(
        &mut self,
        balances: &mut AccountBalances,
        id: OrderId,
    ) -> Result<(), ExecutionError> {
        let order = self
            .orders
            .get_mut(&id)
            .ok_or(ExecutionError::OrderNotFound(id))?;

        if order.status.is_terminal() {
            return Err(ExecutionError::OrderNotFound(id));
        }

        match (order.side, order.kind.limit_price()) {
            (Side::Sell, _) => balances.release(order.pair.base.as_ref(), order.remaining())?,
            (Side::Buy, Some(limit_price)) => {
                balances.release(order.pair.quote.as_ref(), order.remaining() * limit_price)?
            }
            (Side::Buy, None) => {}
        }

        order.transition(OrderStatus::Canceled);
        Ok(())
    }

    /// Run one bar of matching for `bar.pair`, mutating `balances` atomically per fill and
    /// returning every [`Trade`] generated, in the order they occurred.
    pub fn process_bar(
        &mut self,
        balances: &mut AccountBalances,
        fees: &Fees,
        liquidity: &Liquidity,
        bar: &Bar,
    ) -> Vec<Trade> {
        let pair_key = bar.pair.to_string();
        self.trigger_stops(&pair_key, bar);

        let mut candidate_ids: Vec<OrderId> = self
            .orders
            .values()
            .filter(|o| o.pair.to_string() == pair_key && o.is_open_for_matching())
            .map(|o| o.id)
            .collect();
        candidate_ids.sort_by_key(|id| {
            let o = &self.orders[id];
            priority_key(o)
        });

        let was_resting: std::collections::HashMap<OrderId, bool> = candidate_ids
            .iter()
            .map(|id| (*id, self.orders[id].resting))
            .collect();

        let mut trades = Vec::new();
        let mut remaining_liquidity = liquidity.cap(bar);
        let cap = remaining_liquidity;

        for id in candidate_ids.iter().copied() {
            if remaining_liquidity <= Decimal::ZERO {
                break;
            }

            let order = self.orders.get_mut(&id).expect("candidate id must exist");
            let consumed_so_far = cap - remaining_liquidity;

            let Some((fill_price, fillable)) =
                fillable_quantity(order, bar, liquidity, consumed_so_far)
            else {
                continue;
            };

            let quantity = order
                .pair
                .base_precision
                .truncate(fillable.min(order.remaining()).min(remaining_liquidity));
            if quantity <= Decimal::ZERO {
                continue;
            }
            let fill_price = order.pair.quote_precision.round_half_up(fill_price);

            if order.side == Side::Buy && order.kind.limit_price().is_none() {
                let required = quantity * fill_price;
                let available = balances.balance(order.pair.quote.as_ref()).available;
                if available < required {
                    order.transition(OrderStatus::Rejected);
                    continue;
                }
                if balances.hold(order.pair.quote.as_ref(), required).is_err() {
                    order.transition(OrderStatus::Rejected);
                    continue;
                }
            }

            // A buy limit/stop-limit order reserved `quantity * limit_price` of quote at
            // submission. A favorable fill (fill_price < limit_price) must release the unused
            // slice of that reservation back to available, or it is stuck in hold forever.
            if let (Side::Buy, Some(limit_price)) = (order.side, order.kind.limit_price()) {
                let reserved = quantity * limit_price;
                let actual_cost = quantity * fill_price;
                if reserved > actual_cost
                    && balances
                        .release(order.pair.quote.as_ref(), reserved - actual_cost)
                        .is_err()
                {
                    order.transition(OrderStatus::Rejected);
                    continue;
                }
            }

            let maker = !matches!(order.kind, OrderKind::Market)
                && was_resting.get(&id).copied().unwrap_or(false);
            let fee = fees.charge(&order.pair, order.side, maker, quantity, fill_price);

            let transfer_result = match order.side {
                Side::Buy => balances.transfer(
                    order.pair.quote.as_ref(),
                    quantity * fill_price,
                    order.pair.base.as_ref(),
                    quantity - fee,
                ),
                Side::Sell => balances.transfer(
                    order.pair.base.as_ref(),
                    quantity,
                    order.pair.quote.as_ref(),
                    quantity * fill_price - fee,
                ),
            };

            if transfer_result.is_err() {
                continue;
            }

            let fee_symbol = match order.side {
                Side::Buy => order.pair.base.to_string(),
                Side::Sell => order.pair.quote.to_string(),
            };

            order.apply_fill(quantity, fill_price, fee);
            remaining_liquidity -= quantity;

            trades.push(Trade {
                order_id: id,
                pair: order.pair.clone(),
                side: order.side,
                quantity,
                price: fill_price,
                fee_symbol: fee_symbol.into(),
                fee_amount: fee,
                when: bar.when,
            });
        }

        for order in self.orders.values_mut() {
            if order.pair.to_string() == pair_key && order.is_open_for_matching() {
                order.resting = true;
            }
        }

        self.last_prices.insert(pair_key, bar.close);

        trades
    }

    fn trigger_stops(&mut self, pair_key: &str, bar: &Bar) {
        for order in self.orders.values_mut() {
            if order.pair.to_string() != pair_key || order.status != OrderStatus::PendingTrigger {
                continue;
            }
            let Some(stop) = order.kind.stop_price() else {
                continue;
            };
            let triggered = match order.side {
                Side::Buy => bar.high >= stop,
                Side::Sell => bar.low <= stop,
            };
            if triggered {
                order.transition(OrderStatus::Open);
            }
        }
    }
}

/// `(triggered-this-bar-first, market-before-limit, best-price-first, creation-order)`.
fn priority_key(order: &Order) -> (std::cmp::Reverse<bool>, u8, std::cmp::Reverse<Decimal>, Sequence) {
    let triggered_this_bar = !order.resting;
    let kind_rank = match order.kind {
        OrderKind::Market => 0,
        _ => 1,
    };
    let price_rank = match (order.side, order.kind.limit_price()) {
        (Side::Buy, Some(price)) => price,
        (Side::Sell, Some(price)) => -price,
        (_, None) => Decimal::MAX,
    };
    (
        std::cmp::Reverse(triggered_this_bar),
        kind_rank,
        std::cmp::Reverse(price_rank),
        order.created_seq,
    )
}

/// Whether `order` can fill against `bar` right now, and at what price - before liquidity
/// and remaining-amount capping.
fn fillable_quantity(
    order: &Order,
    bar: &Bar,
    liquidity: &Liquidity,
    consumed_so_far: Decimal,
) -> Option<(Decimal, Decimal)> {
    let representative = liquidity.representative_price(bar, order.side, consumed_so_far);

    match (order.side, order.kind) {
        (_, OrderKind::Market) => Some((representative, order.remaining())),
        (Side::Buy, OrderKind::Limit { limit_price } | OrderKind::StopLimit { limit_price, .. }) => {
            (bar.low <= limit_price).then(|| (limit_price.min(representative), order.remaining()))
        }
        (Side::Sell, OrderKind::Limit { limit_price } | OrderKind::StopLimit { limit_price, .. }) => {
            (bar.high >= limit_price).then(|| (limit_price.max(representative), order.remaining()))
        }
    }
}
