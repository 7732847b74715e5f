use crate::pair::Pair;
use indexmap::IndexMap;
use thiserror::Error;

/// Raised when an order references a [`Pair`] the registry does not know about.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("unknown pair '{0}'")]
pub struct UnknownPairError(pub String);

/// Lookup table of every [`Pair`] a backtest or live session is configured to trade.
///
/// Constructed once at startup and treated as immutable afterwards - an `OrderManager` borrows
/// it to validate incoming orders and to fetch the precision it must round against.
#[derive(Debug, Clone, Default)]
pub struct PairRegistry {
    pairs: IndexMap<String, Pair>,
}

impl PairRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pair(mut self, pair: Pair) -> Self {
        self.pairs.insert(pair.to_string(), pair);
        self
    }

    /// Look up a [`Pair`] by its `base_quote` display key.
    pub fn get(&self, key: &str) -> Result<&Pair, UnknownPairError> {
        self.pairs
            .get(key)
            .ok_or_else(|| UnknownPairError(key.to_owned()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pair> {
        self.pairs.values()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_round_trips_a_registered_pair() {
        let registry = PairRegistry::new().with_pair(Pair::new("btc", "usdt", 6, 2));

        assert_eq!(registry.get("btc_usdt").unwrap().base.to_string(), "btc");
        assert!(registry.get("eth_usdt").is_err());
    }
}
