use crate::event::Event;
use tempo_integration::{EventSource, Instant, Sequence, SequenceGenerator};

/// What the multiplexer can report when asked for its earliest pending event.
#[derive(Debug)]
pub enum Peek {
    /// A source has an event ready at `when`.
    Ready { when: Instant },
    /// Every source is either terminated or transiently empty, but at least one non-terminated
    /// source exists - it may produce again once its `Producer` delivers more data.
    Idle,
    /// Every registered source has terminated; this multiplexer will never yield again.
    Exhausted,
}

struct RegisteredSource {
    id: Sequence,
    source: Box<dyn EventSource<Event> + Send>,
}

/// Merges a dynamic set of [`EventSource`]s into one ordered stream of [`Event`]s.
///
/// Selection always picks the source with the earliest `peek_when`; ties are broken by
/// `id`, the registration sequence assigned when the source was added - stable, FIFO across
/// sources, matching the `(when, insertion-sequence)` total order every event is delivered under.
#[derive(Default)]
pub struct EventMultiplexer {
    sources: Vec<RegisteredSource>,
    registration_seq: SequenceGenerator,
}

impl EventMultiplexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new source. May be called at any point before the dispatcher's idle check for
    /// the current iteration; the returned [`Sequence`] is this source's tie-break id.
    pub fn register(&mut self, source: Box<dyn EventSource<Event> + Send>) -> Sequence {
        let id = self.registration_seq.next();
        self.sources.push(RegisteredSource { id, source });
        id
    }

    /// The earliest `when` across every non-terminated source, or the aggregate idle/exhausted
    /// state if none has an event ready right now.
    pub fn peek(&self) -> Peek {
        let mut earliest: Option<(Instant, Sequence)> = None;
        let mut any_non_terminated = false;

        for registered in &self.sources {
            if registered.source.is_terminated() {
                continue;
            }
            any_non_terminated = true;

            let Some(when) = registered.source.peek_when() else {
                continue;
            };

            earliest = match earliest {
                Some((earliest_when, earliest_id)) if (earliest_when, earliest_id) <= (when, registered.id) => {
                    Some((earliest_when, earliest_id))
                }
                _ => Some((when, registered.id)),
            };
        }

        match (earliest, any_non_terminated) {
            (Some((when, _)), _) => Peek::Ready { when },
            (None, true) => Peek::Idle,
            (None, false) => Peek::Exhausted,
        }
    }

    /// Pop the event reported by [`Self::peek`]. Panics if called when [`Self::peek`] would not
    /// report [`Peek::Ready`] - callers must always peek immediately before popping, per the
    /// dispatcher's single run-loop contract.
    pub fn pop(&mut self) -> (Sequence, Event) {
        let winner_id = self
            .sources
            .iter()
            .filter(|r| !r.source.is_terminated())
            .filter_map(|r| r.source.peek_when().map(|when| (when, r.id)))
            .min()
            .map(|(_, id)| id)
            .expect("pop called without a Peek::Ready source available");

        let registered = self
            .sources
            .iter_mut()
            .find(|r| r.id == winner_id)
            .expect("winner id must be a registered source");

        let event = registered
            .source
            .pop()
            .expect("winner source must yield an event matching its peek_when");

        (winner_id, event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use tempo_data::Bar;
    use tempo_instrument::Pair;
    use rust_decimal_macros::dec;

    struct FakeSource {
        buffer: VecDeque<Event>,
    }

    impl EventSource<Event> for FakeSource {
        fn peek_when(&self) -> Option<Instant> {
            self.buffer.front().map(|e| tempo_integration::Timestamped::when(e))
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

    #[test]
    fn earlier_registered_source_wins_ties() {
        let mut mux = EventMultiplexer::new();
        let mut a = VecDeque::new();
        a.push_back(bar_at(100));
        let mut b = VecDeque::new();
        b.push_back(bar_at(100));

        let id_a = mux.register(Box::new(FakeSource { buffer: a }));
        let id_b = mux.register(Box::new(FakeSource { buffer: b }));
        assert!(id_a < id_b);

        let (winner, _) = mux.pop();
        assert_eq!(winner, id_a);
    }

    #[test]
    fn earliest_when_wins_regardless_of_registration_order() {
        let mut mux = EventMultiplexer::new();
        let mut a = VecDeque::new();
        a.push_back(bar_at(200));
        let mut b = VecDeque::new();
        b.push_back(bar_at(100));

        mux.register(Box::new(FakeSource { buffer: a }));
        let id_b = mux.register(Box::new(FakeSource { buffer: b }));

        let (winner, event) = mux.pop();
        assert_eq!(winner, id_b);
        assert_eq!(
            tempo_integration::Timestamped::when(&event),
            Instant::from_timestamp(100, 0).unwrap()
        );
    }

    #[test]
    fn reports_exhausted_once_every_source_has_terminated() {
        let mux = EventMultiplexer::new();
        assert!(matches!(mux.peek(), Peek::Exhausted));
    }
}
