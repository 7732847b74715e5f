use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tempo_execution::{AccountBalances, BacktestingExchange, Fees, LendingPool, Liquidity};
use tempo_instrument::{Pair, PairRegistry};

/// One entry of the pair precision table.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PairConfig {
    pub base: String,
    pub quote: String,
    pub base_precision: u32,
    pub quote_precision: u32,
}

/// Optional margin lending parameters. Absent means the assembled exchange has no lending pool.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct LendingConfig {
    pub hourly_rate: Decimal,
}

/// Everything needed to assemble a runnable [`BacktestingExchange`] from a declarative,
/// `serde`-deserializable description - the pair table, starting balances, fee schedule,
/// liquidity model parameters, and optional margin configuration.
///
/// Kept separate from the runtime types it builds, following the teacher's convention of a
/// config layer that never itself holds live state.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SystemConfig {
    pub pairs: Vec<PairConfig>,
    pub starting_balances: Vec<(String, Decimal)>,
    #[serde(default)]
    pub fees: Fees,
    #[serde(default)]
    pub liquidity: Liquidity,
    #[serde(default)]
    pub lending: Option<LendingConfig>,
    /// §7 "Handler errors": when `true`, a panicking handler aborts the dispatcher run instead
    /// of being logged and skipped.
    #[serde(default)]
    pub strict_handlers: bool,
}

impl SystemConfig {
    /// Assemble the pair registry and backtesting exchange this configuration describes.
    pub fn build(&self) -> (PairRegistry, BacktestingExchange) {
        let mut registry = PairRegistry::new();
        for pair in &self.pairs {
            registry = registry.with_pair(Pair::new(
                pair.base.clone(),
                pair.quote.clone(),
                pair.base_precision,
                pair.quote_precision,
            ));
        }

        let mut balances = AccountBalances::new();
        for (symbol, available) in &self.starting_balances {
            balances = balances.with_balance(symbol.clone(), *available);
        }

        let mut exchange =
            BacktestingExchange::new(registry.clone(), balances, self.fees, self.liquidity);

        if let Some(lending) = self.lending {
            exchange = exchange.with_margin(LendingPool::new(lending.hourly_rate));
        }

        (registry, exchange)
    }
}
