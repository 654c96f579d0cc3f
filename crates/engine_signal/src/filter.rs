//! Predicate filter adapter.

use crate::signal::{Signal, Sink};

/// Forwards a value to its derived signal only when the predicate accepts it.
///
/// Stateless apart from the predicate itself.
pub struct Filter<T> {
    predicate: Box<dyn FnMut(&T) -> bool>,
    output: Signal<T>,
}

impl<T> Filter<T> {
    #[must_use]
    pub fn new(predicate: impl FnMut(&T) -> bool + 'static) -> Self {
        Self {
            predicate: Box::new(predicate),
            output: Signal::new(),
        }
    }

    /// Test `value` and forward it if accepted. Returns whether it passed.
    pub fn dispatch(&mut self, value: &T) -> bool {
        let pass = (self.predicate)(value);
        if pass {
            self.output.dispatch(value);
        }
        pass
    }

    /// The derived signal receiving accepted values.
    pub fn output(&mut self) -> &mut Signal<T> {
        &mut self.output
    }
}

impl<T> Sink<T> for Filter<T> {
    fn accept(&mut self, value: &T) {
        self.dispatch(value);
    }
}

impl<T> std::fmt::Debug for Filter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Filter").field("output", &self.output).finish()
    }
}
