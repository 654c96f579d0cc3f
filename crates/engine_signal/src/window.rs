//! Time-window batching adapter.
//!
//! Time is explicit simulation time (a [`Duration`] since some origin, usually
//! the world's elapsed time), so batching is deterministic and frame-local.

use std::time::Duration;

use tracing::trace;

use crate::signal::{Signal, Sink};

/// Buffers dispatched values into windows of fixed length and flushes each
/// window as one batch.
///
/// The window timer is armed by the first value after a flush; idle periods
/// produce no flushes. A window is due once `now >= armed_at + delay`.
///
/// The window has no clock of its own. Values that arrive through [`Sink`]
/// (for example via [`Signal::connect`]) are stamped with the latest time
/// seen by [`TimeWindow::dispatch_at`] or [`TimeWindow::poll`], so a window
/// fed only that way must be polled to advance time and flush.
pub struct TimeWindow<T, U = T> {
    delay: Duration,
    transform: Box<dyn FnMut(&T) -> U>,
    bucket: Vec<U>,
    deadline: Option<Duration>,
    /// Latest time observed through `dispatch_at`/`poll`.
    now: Duration,
    output: Signal<Vec<U>>,
}

impl<T: Clone + 'static> TimeWindow<T, T> {
    /// Window that batches values unchanged.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self::with_transform(delay, T::clone)
    }
}

impl<T, U> TimeWindow<T, U> {
    /// Window that stores `transform(value)` for every dispatched value.
    #[must_use]
    pub fn with_transform(delay: Duration, transform: impl FnMut(&T) -> U + 'static) -> Self {
        Self {
            delay,
            transform: Box::new(transform),
            bucket: Vec::new(),
            deadline: None,
            now: Duration::ZERO,
            output: Signal::new(),
        }
    }

    /// Buffer `value` observed at time `now`.
    ///
    /// If the current window already expired by `now`, it is flushed first and
    /// `value` opens a new one.
    pub fn dispatch_at(&mut self, value: &T, now: Duration) {
        self.poll(now);
        let item = (self.transform)(value);
        self.bucket.push(item);
        if self.deadline.is_none() {
            self.deadline = Some(now + self.delay);
        }
    }

    /// Flush the current window if its deadline has passed. Returns `true` if
    /// a batch was emitted.
    pub fn poll(&mut self, now: Duration) -> bool {
        self.now = self.now.max(now);
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.flush();
                true
            }
            _ => false,
        }
    }

    /// Emit the current bucket (if non-empty) and disarm the timer.
    pub fn flush(&mut self) {
        self.deadline = None;
        if self.bucket.is_empty() {
            return;
        }
        let batch = std::mem::take(&mut self.bucket);
        trace!(items = batch.len(), "time window flush");
        self.output.dispatch(&batch);
    }

    /// Number of values waiting in the current window.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.bucket.len()
    }

    /// When the current window is due, if one is open.
    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// The derived signal receiving one `Vec` per flushed window.
    pub fn output(&mut self) -> &mut Signal<Vec<U>> {
        &mut self.output
    }
}

impl<T, U> Sink<T> for TimeWindow<T, U> {
    /// Buffers at the latest time this window has observed.
    fn accept(&mut self, value: &T) {
        let now = self.now;
        self.dispatch_at(value, now);
    }
}

impl<T, U> std::fmt::Debug for TimeWindow<T, U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeWindow")
            .field("delay", &self.delay)
            .field("pending", &self.bucket.len())
            .field("deadline", &self.deadline)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn collecting<T: Clone + 'static, U: Clone + 'static>(
        window: &mut TimeWindow<T, U>,
    ) -> Rc<RefCell<Vec<Vec<U>>>> {
        let batches = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&batches);
        window
            .output()
            .subscribe(move |batch: &Vec<U>| sink.borrow_mut().push(batch.clone()));
        batches
    }

    #[test]
    fn test_items_split_across_two_windows() {
        let delta = Duration::from_millis(100);
        let t0 = Duration::from_secs(5);
        let mut window = TimeWindow::new(delta);
        let batches = collecting(&mut window);

        window.dispatch_at(&'a', t0);
        window.dispatch_at(&'b', t0 + delta / 2);
        window.dispatch_at(&'c', t0 + delta * 3 / 2);
        window.poll(t0 + delta * 5 / 2);

        assert_eq!(*batches.borrow(), vec![vec!['a', 'b'], vec!['c']]);
    }

    #[test]
    fn test_idle_period_produces_no_flush() {
        let mut window: TimeWindow<u32> = TimeWindow::new(Duration::from_millis(10));
        let batches = collecting(&mut window);

        assert!(!window.poll(Duration::from_secs(1)));
        assert!(!window.poll(Duration::from_secs(2)));
        assert!(window.deadline().is_none());
        assert!(batches.borrow().is_empty());
    }

    #[test]
    fn test_timer_armed_by_first_item_after_flush() {
        let delta = Duration::from_millis(10);
        let mut window = TimeWindow::new(delta);
        let _batches = collecting(&mut window);

        window.dispatch_at(&1u8, Duration::from_millis(0));
        window.poll(Duration::from_millis(10));
        assert_eq!(window.pending(), 0);

        window.dispatch_at(&2u8, Duration::from_millis(50));
        assert_eq!(window.deadline(), Some(Duration::from_millis(60)));
    }

    #[test]
    fn test_transform_applied_per_item() {
        let mut window =
            TimeWindow::with_transform(Duration::from_millis(1), |s: &&'static str| s.len());
        let batches = collecting(&mut window);

        window.dispatch_at(&"one", Duration::ZERO);
        window.dispatch_at(&"three", Duration::ZERO);
        window.flush();

        assert_eq!(*batches.borrow(), vec![vec![3, 5]]);
        assert_eq!(window.pending(), 0);
    }

    #[test]
    fn test_connected_window_flushes_when_polled() {
        let delta = Duration::from_millis(100);
        let window = Rc::new(RefCell::new(TimeWindow::<u32>::new(delta)));
        let batches = collecting(&mut window.borrow_mut());
        let mut source = Signal::new();
        source.connect(Rc::clone(&window));

        source.dispatch(&1u32);
        assert_eq!(window.borrow().deadline(), Some(delta));
        assert!(!window.borrow_mut().poll(delta / 2));

        source.dispatch(&2u32);
        assert_eq!(window.borrow().deadline(), Some(delta));
        assert!(window.borrow_mut().poll(delta));
        assert_eq!(*batches.borrow(), vec![vec![1, 2]]);

        // Stamped at the last polled time, not at zero.
        source.dispatch(&3u32);
        assert_eq!(window.borrow().deadline(), Some(delta * 2));
    }
}
