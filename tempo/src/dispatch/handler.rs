use futures::future::BoxFuture;

use crate::event::Event;

/// A subscriber invoked once per matching event.
///
/// `handle` returns a boxed future rather than being declared `async fn` so the trait stays
/// object-safe - the dispatcher holds a heterogeneous `Vec<Box<dyn Handler>>` per event kind.
/// Implementations may suspend freely; the dispatcher awaits each handler to completion before
/// moving on to the next, so a handler never races the run loop's own clock advancement.
pub trait Handler: Send {
    fn handle<'a>(&'a mut self, event: &'a Event) -> BoxFuture<'a, ()>;
}

impl<F> Handler for F
where
    F: for<'a> FnMut(&'a Event) -> BoxFuture<'a, ()> + Send,
{
    fn handle<'a>(&'a mut self, event: &'a Event) -> BoxFuture<'a, ()> {
        self(event)
    }
}
