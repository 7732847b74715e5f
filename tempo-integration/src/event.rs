use crate::time::Instant;
use thiserror::Error;

/// Anything with an immutable, timezone-aware instant attached.
///
/// Implemented by every concrete event type (`Bar`, order-book updates, fills) and by the
/// dispatcher's own tagged `Event` wrapper, so the multiplexer and scheduler can compare
/// heterogeneous streams without knowing their payloads.
pub trait Timestamped {
    fn when(&self) -> Instant;
}

/// A lazy, ordered producer of `E`, the unit the `EventMultiplexer` merges across sources.
///
/// Two consecutive `pop()` calls on the same source must yield non-decreasing `when`; the
/// multiplexer relies on `peek_when` alone to decide which source goes next, so implementations
/// must keep it cheap and side-effect free.
pub trait EventSource<E: Timestamped> {
    /// Earliest `when` of the next event this source can deliver right now, or `None` if it is
    /// transiently empty or has terminated.
    fn peek_when(&self) -> Option<Instant>;

    /// Remove and return the event previously reported by `peek_when`.
    fn pop(&mut self) -> Option<E>;

    /// `true` once this source will never produce another event.
    fn is_terminated(&self) -> bool;
}

/// A background task that feeds a source. `start`/`stop` must both be idempotent: calling either
/// twice in a row is a no-op on the second call, and `stop` must run on every exit path once
/// `start` has succeeded.
pub trait Producer {
    fn start(&mut self) -> Result<(), ProducerError>;
    fn stop(&mut self) -> Result<(), ProducerError>;
}

/// Raised by a [`Producer`] that cannot start or cleanly release its scoped resources.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ProducerError {
    #[error("producer already started")]
    AlreadyStarted,
    #[error("producer connectivity error: {0}")]
    Connectivity(String),
}

/// Raised when a callback is scheduled for an instant already in the past of a backtesting
/// dispatcher's virtual clock.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("cannot schedule callback at {requested}, virtual clock is already at {now}")]
pub struct PastScheduleError {
    pub requested: Instant,
    pub now: Instant,
}
