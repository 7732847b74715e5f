use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A deterministic tie-breaker: assigned once, in order, to every event a source yields and
/// every order a client creates. Used instead of floating-point or wall-clock comparisons
/// whenever two items share an `Instant`.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Deserialize, Serialize,
)]
pub struct Sequence(pub u64);

impl Sequence {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }
}

/// Thread-safe monotonic counter that mints [`Sequence`] values.
///
/// A single `EventMultiplexer` owns one of these for source-registration order; a single
/// `OrderManager` owns one for order creation order. Kept as a plain atomic (rather than behind
/// a `Mutex`) since the dispatcher is single-threaded and contention is never expected -
/// `Send + Sync` is retained so a `SequenceGenerator` can still be shared with a background
/// `Producer`.
#[derive(Debug, Default)]
pub struct SequenceGenerator {
    next: AtomicU64,
}

impl SequenceGenerator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(0),
        }
    }

    /// Mint the next [`Sequence`], guaranteed greater than every previously minted value.
    pub fn next(&self) -> Sequence {
        Sequence(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_generator_yields_strictly_increasing_values() {
        let gen = SequenceGenerator::new();
        let a = gen.next();
        let b = gen.next();
        let c = gen.next();

        assert!(a < b);
        assert!(b < c);
    }
}
