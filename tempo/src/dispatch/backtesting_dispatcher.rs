use std::collections::HashMap;

use futures::FutureExt;
use tempo_integration::{EventSource, Instant, PastScheduleError, Sequence};

use crate::event::{Event, EventKind};

use super::handler::Handler;
use super::multiplexer::{EventMultiplexer, Peek};
use super::scheduler::{Callback, SchedulerQueue};

/// Runs a backtest to completion over whatever sources and scheduled callbacks are registered.
///
/// The virtual clock has no relation to wall-clock time: it jumps directly from one due instant
/// to the next, so a multi-year backtest takes as long as the handlers themselves take to run.
/// Ties between a scheduled callback and a source event due at the same instant are broken in
/// the callback's favour, so a callback scheduled for exactly `T` always observes state as of
/// `T` before the event at `T` is delivered.
pub struct BacktestingDispatcher {
    multiplexer: EventMultiplexer,
    scheduler: SchedulerQueue,
    handlers: HashMap<EventKind, Vec<Box<dyn Handler>>>,
    source_handlers: HashMap<Sequence, Vec<Box<dyn Handler>>>,
    virtual_now: Option<Instant>,
    /// When `true`, a handler panic aborts the run instead of being logged and skipped.
    strict: bool,
}

impl BacktestingDispatcher {
    pub fn new() -> Self {
        Self {
            multiplexer: EventMultiplexer::new(),
            scheduler: SchedulerQueue::new(),
            handlers: HashMap::new(),
            source_handlers: HashMap::new(),
            virtual_now: None,
            strict: false,
        }
    }

    pub fn with_strict_handlers(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// The dispatcher's current virtual time. `None` before the run loop has processed its
    /// first event or callback.
    pub fn now(&self) -> Option<Instant> {
        self.virtual_now
    }

    pub fn register_source(&mut self, source: Box<dyn EventSource<Event> + Send>) -> Sequence {
        self.multiplexer.register(source)
    }

    pub fn subscribe(&mut self, kind: EventKind, handler: Box<dyn Handler>) {
        self.handlers.entry(kind).or_default().push(handler);
    }

    /// Subscribe to every event yielded by one specific source, identified by the [`Sequence`]
    /// [`Self::register_source`] returned, regardless of its concrete event type.
    pub fn subscribe_source(&mut self, source_id: Sequence, handler: Box<dyn Handler>) {
        self.source_handlers.entry(source_id).or_default().push(handler);
    }

    /// Schedule `callback` to fire once virtual time reaches `when`.
    ///
    /// Rejects `when` strictly before the current virtual clock - a handler invoked while
    /// processing the event at `T` may only schedule for `T` or later.
    pub fn schedule(&mut self, when: Instant, callback: Callback) -> Result<(), PastScheduleError> {
        self.scheduler.schedule(when, self.virtual_now, callback)
    }

    /// Drive the run loop to completion. Returns once every source has terminated (or gone idle,
    /// which a backtest treats identically - there is no live producer to wait on) and every
    /// scheduled callback has fired.
    pub async fn run(&mut self) {
        loop {
            let mux_peek = self.multiplexer.peek();
            let sched_when = self.scheduler.peek_when();

            let next_when = match (&mux_peek, sched_when) {
                (Peek::Ready { when }, Some(sched_w)) => Some((*when).min(sched_w)),
                (Peek::Ready { when }, None) => Some(*when),
                (Peek::Idle, Some(sched_w)) | (Peek::Exhausted, Some(sched_w)) => Some(sched_w),
                (Peek::Idle, None) | (Peek::Exhausted, None) => None,
            };

            let Some(next_when) = next_when else {
                break;
            };

            self.virtual_now = Some(next_when);

            for callback in self.scheduler.pop_due(next_when) {
                callback();
            }

            if let Peek::Ready { when } = mux_peek {
                if when == next_when {
                    let (source_id, event) = self.multiplexer.pop();
                    self.dispatch(source_id, &event).await;
                }
            }
        }
    }

    /// Deliver `event` to every handler registered for its [`EventKind`], then to every handler
    /// registered for the source it came from.
    async fn dispatch(&mut self, source_id: Sequence, event: &Event) {
        if let Some(handlers) = self.handlers.get_mut(&event.kind()) {
            Self::run_handlers(handlers, event, self.strict).await;
        }
        if let Some(handlers) = self.source_handlers.get_mut(&source_id) {
            Self::run_handlers(handlers, event, self.strict).await;
        }
    }

    async fn run_handlers(handlers: &mut [Box<dyn Handler>], event: &Event, strict: bool) {
        for handler in handlers.iter_mut() {
            let outcome = std::panic::AssertUnwindSafe(handler.handle(event))
                .catch_unwind()
                .await;

            if let Err(panic) = outcome {
                if strict {
                    std::panic::resume_unwind(panic);
                }
                tracing::error!("handler panicked while processing {:?}; continuing", event.kind());
            }
        }
    }
}

impl Default for BacktestingDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use tempo_data::Bar;
    use tempo_instrument::Pair;
    use rust_decimal_macros::dec;

    struct VecSource {
        buffer: VecDeque<Event>,
    }

    impl EventSource<Event> for VecSource {
        fn peek_when(&self) -> Option<Instant> {
            self.buffer.front().map(tempo_integration::Timestamped::when)
        }
        fn pop(&mut self) -> Option<Event> {
            self.buffer.pop_front()
        }
        fn is_terminated(&self) -> bool {
            self.buffer.is_empty()
        }
    }

    fn bar_at(seconds: i64) -> Event {
        Event::Bar(
            Bar::new(
                Pair::new("btc", "usdt", 6, 2),
                chrono::Duration::hours(1),
                dec!(100),
                dec!(110),
                dec!(90),
                dec!(105),
                dec!(10),
                Instant::from_timestamp(seconds, 0).unwrap(),
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn scheduled_callback_due_at_the_same_instant_fires_before_the_event() {
        let mut dispatcher = BacktestingDispatcher::new();
        let mut buffer = VecDeque::new();
        buffer.push_back(bar_at(100));
        dispatcher.register_source(Box::new(VecSource { buffer }));

        let order = Arc::new(Mutex::new(Vec::new()));
        let order_cb = order.clone();
        dispatcher
            .schedule(
                Instant::from_timestamp(100, 0).unwrap(),
                Box::new(move || order_cb.lock().unwrap().push("callback")),
            )
            .unwrap();

        let order_handler = order.clone();
        dispatcher.subscribe(
            EventKind::Bar,
            Box::new(move |_event: &Event| {
                let order_handler = order_handler.clone();
                Box::pin(async move {
                    order_handler.lock().unwrap().push("event");
                }) as futures::future::BoxFuture<'static, ()>
            }),
        );

        dispatcher.run().await;

        assert_eq!(*order.lock().unwrap(), vec!["callback", "event"]);
        assert_eq!(dispatcher.now(), Some(Instant::from_timestamp(100, 0).unwrap()));
    }

    #[tokio::test]
    async fn run_terminates_once_sources_and_callbacks_are_drained() {
        let mut dispatcher = BacktestingDispatcher::new();
        let mut buffer = VecDeque::new();
        buffer.push_back(bar_at(10));
        buffer.push_back(bar_at(20));
        dispatcher.register_source(Box::new(VecSource { buffer }));

        let seen = Arc::new(Mutex::new(0));
        let seen_handler = seen.clone();
        dispatcher.subscribe(
            EventKind::Bar,
            Box::new(move |_event: &Event| {
                let seen_handler = seen_handler.clone();
                Box::pin(async move {
                    *seen_handler.lock().unwrap() += 1;
                }) as futures::future::BoxFuture<'static, ()>
            }),
        );

        dispatcher.run().await;

        assert_eq!(*seen.lock().unwrap(), 2);
        assert_eq!(dispatcher.now(), Some(Instant::from_timestamp(20, 0).unwrap()));
    }

    #[tokio::test]
    async fn virtual_clock_never_decreases_across_mixed_sources_and_callbacks() {
        let mut dispatcher = BacktestingDispatcher::new();
        let mut buffer = VecDeque::new();
        buffer.push_back(bar_at(50));
        dispatcher.register_source(Box::new(VecSource { buffer }));

        let seen_times = Arc::new(Mutex::new(Vec::new()));
        let seen_times_cb = seen_times.clone();
        dispatcher
            .schedule(
                Instant::from_timestamp(10, 0).unwrap(),
                Box::new(move || seen_times_cb.lock().unwrap().push(10)),
            )
            .unwrap();

        dispatcher.run().await;

        assert_eq!(*seen_times.lock().unwrap(), vec![10]);
        assert_eq!(dispatcher.now(), Some(Instant::from_timestamp(50, 0).unwrap()));
    }

    #[tokio::test]
    async fn subscribe_source_only_receives_events_from_its_own_source() {
        let mut dispatcher = BacktestingDispatcher::new();

        let mut buffer_a = VecDeque::new();
        buffer_a.push_back(bar_at(10));
        let id_a = dispatcher.register_source(Box::new(VecSource { buffer: buffer_a }));

        let mut buffer_b = VecDeque::new();
        buffer_b.push_back(bar_at(10));
        dispatcher.register_source(Box::new(VecSource { buffer: buffer_b }));

        let seen = Arc::new(Mutex::new(0));
        let seen_handler = seen.clone();
        dispatcher.subscribe_source(
            id_a,
            Box::new(move |_event: &Event| {
                let seen_handler = seen_handler.clone();
                Box::pin(async move {
                    *seen_handler.lock().unwrap() += 1;
                }) as futures::future::BoxFuture<'static, ()>
            }),
        );

        dispatcher.run().await;

        assert_eq!(*seen.lock().unwrap(), 1);
    }
}
