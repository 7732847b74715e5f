use serde::{Deserialize, Serialize};
use tempo_data::{Bar, OrderBookUpdate};
use tempo_integration::{EventSource, Instant, Timestamped};

/// The explicit tagged variant every source yields into the dispatcher.
///
/// Subscribers register against an [`EventKind`] rather than matching on `Event` itself, so
/// delivery is two table lookups - one keyed by kind, one keyed by source id - rather than a
/// dynamic type check.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub enum Event {
    Bar(Bar),
    OrderBookUpdate(OrderBookUpdate),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Bar(_) => EventKind::Bar,
            Event::OrderBookUpdate(_) => EventKind::OrderBookUpdate,
        }
    }
}

impl Timestamped for Event {
    fn when(&self) -> Instant {
        match self {
            Event::Bar(bar) => bar.when(),
            Event::OrderBookUpdate(update) => update.when(),
        }
    }
}

impl From<Bar> for Event {
    fn from(bar: Bar) -> Self {
        Self::Bar(bar)
    }
}

impl From<OrderBookUpdate> for Event {
    fn from(update: OrderBookUpdate) -> Self {
        Self::OrderBookUpdate(update)
    }
}

/// The tag an [`Event`] carries, used as the subscription table key.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
pub enum EventKind {
    Bar,
    OrderBookUpdate,
}

/// Lifts a concrete `EventSource<E>` (e.g. [`tempo_data::CsvBarSource`]) into an
/// `EventSource<Event>` the dispatcher can register, without every concrete source needing to
/// know about the tagged [`Event`] wrapper itself.
pub struct IntoEventSource<S> {
    inner: S,
}

impl<S> IntoEventSource<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S, E> EventSource<Event> for IntoEventSource<S>
where
    S: EventSource<E>,
    E: Timestamped + Into<Event>,
{
    fn peek_when(&self) -> Option<Instant> {
        self.inner.peek_when()
    }

    fn pop(&mut self) -> Option<Event> {
        self.inner.pop().map(Into::into)
    }

    fn is_terminated(&self) -> bool {
        self.inner.is_terminated()
    }
}
