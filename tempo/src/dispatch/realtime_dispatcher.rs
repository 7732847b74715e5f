use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use tempo_integration::{EventSource, Instant, PastScheduleError, Producer, ProducerError, Sequence};

use crate::event::{Event, EventKind};

use super::handler::Handler;
use super::multiplexer::{EventMultiplexer, Peek};
use super::scheduler::{Callback, SchedulerQueue};

/// Live-mode counterpart to [`super::BacktestingDispatcher`].
///
/// The virtual clock is wall-clock time: when nothing is due, the run loop sleeps rather than
/// jumping ahead, polling at `poll_interval` so a source that becomes ready between scheduled
/// callbacks is still picked up promptly. Registered producers run as their own background
/// tasks; `stop` signals them and returns once they have all wound down, without draining events
/// still sitting in their buffers.
pub struct RealtimeDispatcher {
    multiplexer: EventMultiplexer,
    scheduler: SchedulerQueue,
    handlers: HashMap<EventKind, Vec<Box<dyn Handler>>>,
    source_handlers: HashMap<Sequence, Vec<Box<dyn Handler>>>,
    producers: Vec<Box<dyn Producer + Send>>,
    poll_interval: Duration,
    strict: bool,
    stopped: Arc<AtomicBool>,
}

impl RealtimeDispatcher {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            multiplexer: EventMultiplexer::new(),
            scheduler: SchedulerQueue::new(),
            handlers: HashMap::new(),
            source_handlers: HashMap::new(),
            producers: Vec::new(),
            poll_interval,
            strict: false,
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_strict_handlers(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn register_source(
        &mut self,
        source: Box<dyn EventSource<Event> + Send>,
        producer: Option<Box<dyn Producer + Send>>,
    ) -> Result<Sequence, ProducerError> {
        if let Some(mut producer) = producer {
            producer.start()?;
            self.producers.push(producer);
        }
        Ok(self.multiplexer.register(source))
    }

    pub fn subscribe(&mut self, kind: EventKind, handler: Box<dyn Handler>) {
        self.handlers.entry(kind).or_default().push(handler);
    }

    /// Subscribe to every event yielded by one specific source, identified by the [`Sequence`]
    /// [`Self::register_source`] returned, regardless of its concrete event type.
    pub fn subscribe_source(&mut self, source_id: Sequence, handler: Box<dyn Handler>) {
        self.source_handlers.entry(source_id).or_default().push(handler);
    }

    pub fn schedule(&mut self, when: Instant, callback: Callback) -> Result<(), PastScheduleError> {
        self.scheduler.schedule(when, Some(Utc::now()), callback)
    }

    /// Signal the run loop to stop after its current iteration. Idempotent.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stopped.clone()
    }

    /// Drive the run loop until [`Self::stop_handle`]'s flag is set. Stopping every producer and
    /// dropping any still-pending scheduled callbacks; events already buffered in a source are
    /// abandoned rather than drained.
    pub async fn run(&mut self) {
        loop {
            if self.stopped.load(Ordering::Relaxed) {
                break;
            }

            let now = Utc::now();
            let mux_peek = self.multiplexer.peek();
            let sched_when = self.scheduler.peek_when();

            let due_now = match (&mux_peek, sched_when) {
                (Peek::Ready { when }, Some(sched_w)) => *when <= now || sched_w <= now,
                (Peek::Ready { when }, None) => *when <= now,
                (Peek::Idle, Some(sched_w)) | (Peek::Exhausted, Some(sched_w)) => sched_w <= now,
                (Peek::Idle, None) => false,
                (Peek::Exhausted, None) => {
                    if self.producers.is_empty() {
                        break;
                    }
                    false
                }
            };

            if !due_now {
                tokio::time::sleep(self.poll_interval).await;
                continue;
            }

            for callback in self.scheduler.pop_due(now) {
                callback();
            }

            if let Peek::Ready { when } = mux_peek {
                if when <= now {
                    let (source_id, event) = self.multiplexer.pop();
                    self.dispatch(source_id, &event).await;
                }
            }
        }

        self.stop_all_producers();
    }

    fn stop_all_producers(&mut self) {
        for producer in self.producers.iter_mut() {
            if let Err(error) = producer.stop() {
                tracing::warn!(?error, "producer failed to stop cleanly");
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

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopSource;

    impl EventSource<Event> for NoopSource {
        fn peek_when(&self) -> Option<Instant> {
            None
        }
        fn pop(&mut self) -> Option<Event> {
            None
        }
        fn is_terminated(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn run_exits_immediately_with_no_sources_or_producers() {
        let mut dispatcher = RealtimeDispatcher::new(Duration::from_millis(1));
        dispatcher.register_source(Box::new(NoopSource), None).unwrap();
        dispatcher.run().await;
    }

    #[tokio::test]
    async fn stop_flag_halts_the_loop_even_with_a_never_ready_source() {
        struct AlwaysIdle;
        impl EventSource<Event> for AlwaysIdle {
            fn peek_when(&self) -> Option<Instant> {
                None
            }
            fn pop(&mut self) -> Option<Event> {
                None
            }
            fn is_terminated(&self) -> bool {
                false
            }
        }

        let mut dispatcher = RealtimeDispatcher::new(Duration::from_millis(1));
        dispatcher.register_source(Box::new(AlwaysIdle), None).unwrap();
        let stop = dispatcher.stop_handle();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            stop.store(true, Ordering::Relaxed);
        });

        dispatcher.run().await;
    }

    #[tokio::test]
    async fn subscribe_source_only_receives_events_from_its_own_source() {
        use std::sync::Mutex;
        use tempo_data::Bar;
        use tempo_instrument::Pair;
        use rust_decimal_macros::dec;

        struct OneShot {
            event: Option<Event>,
        }

        impl EventSource<Event> for OneShot {
            fn peek_when(&self) -> Option<Instant> {
                self.event.as_ref().map(tempo_integration::Timestamped::when)
            }
            fn pop(&mut self) -> Option<Event> {
                self.event.take()
            }
            fn is_terminated(&self) -> bool {
                self.event.is_none()
            }
        }

        let bar = || {
            Event::Bar(
                Bar::new(
                    Pair::new("btc", "usdt", 6, 2),
                    chrono::Duration::hours(1),
                    dec!(100),
                    dec!(110),
                    dec!(90),
                    dec!(105),
                    dec!(10),
                    Instant::from_timestamp(0, 0).unwrap(),
                )
                .unwrap(),
            )
        };

        let mut dispatcher = RealtimeDispatcher::new(Duration::from_millis(1));
        let id_a = dispatcher
            .register_source(Box::new(OneShot { event: Some(bar()) }), None)
            .unwrap();
        dispatcher
            .register_source(Box::new(OneShot { event: Some(bar()) }), None)
            .unwrap();

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
