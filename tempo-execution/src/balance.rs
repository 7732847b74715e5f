use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::ExecutionError;

/// Per-symbol `(available, hold, borrowed)`. `available + hold - borrowed` is that symbol's
/// equity.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Deserialize, Serialize)]
pub struct Balance {
    pub available: Decimal,
    pub hold: Decimal,
    pub borrowed: Decimal,
}

impl Balance {
    pub fn equity(&self) -> Decimal {
        self.available + self.hold - self.borrowed
    }
}

/// Every symbol's [`Balance`], mutated only through transactional operations that either commit
/// every line or none of them.
///
/// Mirrors the teacher's `ClientBalances` shape, generalized from a single quote/base pairing to
/// an arbitrary symbol map so margin borrowing can touch balances that never back an open order.
#[derive(Clone, PartialEq, Debug, Default, Deserialize, Serialize)]
pub struct AccountBalances {
    balances: IndexMap<SmolStr, Balance>,
}

impl AccountBalances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance<S: Into<SmolStr>>(mut self, symbol: S, available: Decimal) -> Self {
        self.balances.insert(
            symbol.into(),
            Balance {
                available,
                ..Default::default()
            },
        );
        self
    }

    pub fn balance(&self, symbol: &str) -> Balance {
        self.balances.get(symbol).copied().unwrap_or_default()
    }

    fn entry(&mut self, symbol: &str) -> &mut Balance {
        self.balances.entry(SmolStr::new(symbol)).or_default()
    }

    /// Reserve `amount` of `symbol` against a live order: moves from `available` to `hold`.
    pub fn hold(&mut self, symbol: &str, amount: Decimal) -> Result<(), ExecutionError> {
        let balance = self.entry(symbol);
        if balance.available < amount {
            return Err(ExecutionError::InsufficientBalance {
                symbol: symbol.into(),
                required: amount,
                available: balance.available,
            });
        }
        balance.available -= amount;
        balance.hold += amount;
        Ok(())
    }

    /// Release a prior [`Self::hold`] back to `available` - used on cancel or on the
    /// held-but-unconsumed remainder of a fill.
    pub fn release(&mut self, symbol: &str, amount: Decimal) -> Result<(), ExecutionError> {
        let balance = self.entry(symbol);
        if balance.hold < amount {
            return Err(ExecutionError::InsufficientBalance {
                symbol: symbol.into(),
                required: amount,
                available: balance.hold,
            });
        }
        balance.hold -= amount;
        balance.available += amount;
        Ok(())
    }

    /// Atomically consume `from_amount` of `from_symbol`'s hold and credit `to_amount` of
    /// `to_symbol`'s available - the balance movement a single fill causes. Fails without
    /// mutating either balance if the hold cannot cover `from_amount`.
    pub fn transfer(
        &mut self,
        from_symbol: &str,
        from_amount: Decimal,
        to_symbol: &str,
        to_amount: Decimal,
    ) -> Result<(), ExecutionError> {
        {
            let from = self.balances.get(from_symbol).copied().unwrap_or_default();
            if from.hold < from_amount {
                return Err(ExecutionError::InsufficientBalance {
                    symbol: from_symbol.into(),
                    required: from_amount,
                    available: from.hold,
                });
            }
        }

        self.entry(from_symbol).hold -= from_amount;
        self.entry(to_symbol).available += to_amount;
        Ok(())
    }

    /// Credit `amount` of `symbol` directly to `available` - used by a `LendingPool` borrow.
    pub fn credit(&mut self, symbol: &str, amount: Decimal) {
        self.entry(symbol).available += amount;
    }

    /// Debit `amount` of `symbol` directly from `available`, failing rather than going negative.
    pub fn debit(&mut self, symbol: &str, amount: Decimal) -> Result<(), ExecutionError> {
        let balance = self.entry(symbol);
        if balance.available < amount {
            return Err(ExecutionError::InsufficientBalance {
                symbol: symbol.into(),
                required: amount,
                available: balance.available,
            });
        }
        balance.available -= amount;
        Ok(())
    }

    pub fn adjust_borrowed(&mut self, symbol: &str, delta: Decimal) {
        self.entry(symbol).borrowed += delta;
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, &Balance)> {
        self.balances.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn hold_then_release_restores_balance_exactly() {
        let mut balances = AccountBalances::new().with_balance("usdt", dec!(1000));

        balances.hold("usdt", dec!(100)).unwrap();
        assert_eq!(balances.balance("usdt").available, dec!(900));
        assert_eq!(balances.balance("usdt").hold, dec!(100));

        balances.release("usdt", dec!(100)).unwrap();
        assert_eq!(balances.balance("usdt").available, dec!(1000));
        assert_eq!(balances.balance("usdt").hold, dec!(0));
    }

    #[test]
    fn hold_rejects_overdraft_without_mutating_balance() {
        let mut balances = AccountBalances::new().with_balance("usdt", dec!(50));
        let err = balances.hold("usdt", dec!(100)).unwrap_err();

        assert!(matches!(err, ExecutionError::InsufficientBalance { .. }));
        assert_eq!(balances.balance("usdt").available, dec!(50));
    }

    #[test]
    fn transfer_moves_hold_to_counterparty_available() {
        let mut balances = AccountBalances::new().with_balance("usdt", dec!(1000));
        balances.hold("usdt", dec!(100)).unwrap();

        balances.transfer("usdt", dec!(100), "btc", dec!(1)).unwrap();

        assert_eq!(balances.balance("usdt").hold, dec!(0));
        assert_eq!(balances.balance("btc").available, dec!(1));
    }

    #[test]
    fn transfer_fails_without_mutating_either_side_on_insufficient_hold() {
        let mut balances = AccountBalances::new().with_balance("usdt", dec!(1000));

        let err = balances
            .transfer("usdt", dec!(100), "btc", dec!(1))
            .unwrap_err();

        assert!(matches!(err, ExecutionError::InsufficientBalance { .. }));
        assert_eq!(balances.balance("btc").available, dec!(0));
    }

    #[test]
    fn equity_accounts_for_hold_and_borrowed() {
        let mut balances = AccountBalances::new().with_balance("usdt", dec!(1000));
        balances.hold("usdt", dec!(100)).unwrap();
        balances.adjust_borrowed("usdt", dec!(50));

        assert_eq!(balances.balance("usdt").equity(), dec!(950));
    }
}
