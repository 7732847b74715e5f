use std::cmp::Reverse;
use std::collections::BinaryHeap;

use tempo_integration::{Instant, PastScheduleError, Sequence, SequenceGenerator};

/// An owned, one-shot callback a [`SchedulerQueue`] fires once virtual time reaches its due
/// instant. Boxed so the queue can hold callbacks of differing captured state uniformly.
pub type Callback = Box<dyn FnOnce() + Send>;

struct Scheduled {
    when: Instant,
    seq: Sequence,
    callback: Callback,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.when == other.when && self.seq == other.seq
    }
}
impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.when, self.seq).cmp(&(other.when, other.seq))
    }
}

/// A priority queue of due-time callbacks, ordered by `(when, registration-sequence)` so that
/// callbacks scheduled for the same instant fire in the order they were scheduled.
///
/// Held as a min-heap via `Reverse` over a max-heap [`BinaryHeap`].
#[derive(Default)]
pub struct SchedulerQueue {
    heap: BinaryHeap<Reverse<Scheduled>>,
    seq: SequenceGenerator,
}

impl SchedulerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `callback` to fire once virtual time reaches `when`. `now` is the dispatcher's
    /// current virtual clock; scheduling strictly in the past is rejected so a misbehaving
    /// handler cannot silently create an event the run loop has already passed.
    pub fn schedule(
        &mut self,
        when: Instant,
        now: Option<Instant>,
        callback: Callback,
    ) -> Result<(), PastScheduleError> {
        if let Some(now) = now {
            if when < now {
                return Err(PastScheduleError { requested: when, now });
            }
        }

        let seq = self.seq.next();
        self.heap.push(Reverse(Scheduled { when, seq, callback }));
        Ok(())
    }

    /// The due instant of the next callback to fire, if any remain.
    pub fn peek_when(&self) -> Option<Instant> {
        self.heap.peek().map(|Reverse(s)| s.when)
    }

    /// Pop and run every callback due at or before `now`, in `(when, seq)` order.
    pub fn pop_due(&mut self, now: Instant) -> Vec<Callback> {
        let mut due = Vec::new();
        while let Some(Reverse(next)) = self.heap.peek() {
            if next.when > now {
                break;
            }
            let Reverse(scheduled) = self.heap.pop().expect("peeked element must be present");
            due.push(scheduled.callback);
        }
        due
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
