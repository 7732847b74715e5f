//! Low-level primitives shared by every crate in the Tempo ecosystem.
//!
//! Carries nothing domain-specific (no `Order`, no `Bar`) - only the vocabulary every other
//! crate builds on: [`Side`], [`Sequence`], and the UTC time contract.

/// The `EventSource` / `Producer` contract shared by every concrete event stream, plus the
/// scheduling error they have in common.
pub mod event;

/// Monotonically increasing sequence numbers, used to break ties deterministically wherever
/// floating-point or wall-clock time cannot: multiplexer source registration order, order
/// creation order, scheduler callback order.
pub mod sequence;

/// Buy/sell side shared by order placement and trade fills.
pub mod side;

/// The UTC instant contract: every timestamp that crosses a public boundary must be
/// offset-aware, timezone-aware, never naive.
pub mod time;

pub use event::{EventSource, PastScheduleError, Producer, ProducerError, Timestamped};
pub use sequence::{Sequence, SequenceGenerator};
pub use side::Side;
pub use time::{Instant, NaiveInstantError};
