//! Plain synchronous signal.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

/// Handle returned by [`Signal::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// A consumer of dispatched values. Adapters such as
/// [`Filter`](crate::Filter) and [`TimeWindow`](crate::TimeWindow) implement
/// this so they can be connected behind a source signal.
pub trait Sink<T> {
    fn accept(&mut self, value: &T);
}

type Handler<T> = Box<dyn FnMut(&T)>;

/// A typed broadcast channel.
///
/// Dispatch is synchronous and handlers run in subscription order. Nothing is
/// buffered: a dispatch with no subscribers is simply dropped.
pub struct Signal<T> {
    handlers: Vec<(SubscriptionId, Handler<T>)>,
    next_id: u64,
}

impl<T> Signal<T> {
    /// Create a signal with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            next_id: 0,
        }
    }

    /// Append a handler; it runs after every handler subscribed before it.
    pub fn subscribe(&mut self, handler: impl FnMut(&T) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Forward every dispatch to a shared sink.
    pub fn connect<S>(&mut self, sink: Rc<RefCell<S>>) -> SubscriptionId
    where
        S: Sink<T> + 'static,
    {
        self.subscribe(move |value| sink.borrow_mut().accept(value))
    }

    /// Remove a handler. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(sub, _)| *sub != id);
        self.handlers.len() != before
    }

    /// Invoke every handler with `value`, in subscription order.
    pub fn dispatch(&mut self, value: &T) {
        trace!(subscribers = self.handlers.len(), "signal dispatch");
        for (_, handler) in &mut self.handlers {
            handler(value);
        }
    }

    /// Number of subscribed handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("subscribers", &self.handlers.len())
            .finish()
    }
}

impl<T> Sink<T> for Signal<T> {
    fn accept(&mut self, value: &T) {
        self.dispatch(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_in_subscription_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut signal = Signal::new();

        let first = Rc::clone(&log);
        signal.subscribe(move |v: &i32| first.borrow_mut().push(("first", *v)));
        let second = Rc::clone(&log);
        signal.subscribe(move |v: &i32| second.borrow_mut().push(("second", *v)));

        signal.dispatch(&7);
        assert_eq!(*log.borrow(), vec![("first", 7), ("second", 7)]);
    }

    #[test]
    fn test_unsubscribe() {
        let hits = Rc::new(RefCell::new(0));
        let mut signal = Signal::new();
        let counter = Rc::clone(&hits);
        let id = signal.subscribe(move |_: &()| *counter.borrow_mut() += 1);

        signal.dispatch(&());
        assert!(signal.unsubscribe(id));
        assert!(!signal.unsubscribe(id));
        signal.dispatch(&());

        assert_eq!(*hits.borrow(), 1);
        assert!(signal.is_empty());
    }

    #[test]
    fn test_dispatch_without_subscribers_is_noop() {
        let mut signal: Signal<String> = Signal::new();
        signal.dispatch(&"nobody listens".to_string());
        assert_eq!(signal.len(), 0);
    }
}
