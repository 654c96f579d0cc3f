//! Collision aggregation.
//!
//! Collision events pass through a depth [`Filter`] into a [`TimeWindow`];
//! every flushed window is logged as one line and counted.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use engine_component::Entity;
use engine_signal::{Filter, TimeWindow};
use tracing::info;

/// Name of the entity event raised for each overlapping pair.
pub const COLLISION_EVENT: &str = "collision";

/// Payload of a collision event. `a` always has the lower storage position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collision {
    pub a: Entity,
    pub b: Entity,
    /// Smallest per-axis penetration.
    pub depth: f32,
}

/// Running totals over flushed windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollisionStats {
    pub batches: u64,
    pub pairs: u64,
}

/// Filter then window pipeline for collisions.
pub struct CollisionFeed {
    filter: Filter<Collision>,
    window: Rc<RefCell<TimeWindow<Collision, (Entity, Entity)>>>,
    stats: Rc<RefCell<CollisionStats>>,
}

impl CollisionFeed {
    /// Forward collisions at least `min_depth` deep, batched per `window`.
    #[must_use]
    pub fn new(window: Duration, min_depth: f32) -> Self {
        let stats = Rc::new(RefCell::new(CollisionStats::default()));
        let window = Rc::new(RefCell::new(TimeWindow::with_transform(
            window,
            |c: &Collision| (c.a, c.b),
        )));

        let totals = Rc::clone(&stats);
        window
            .borrow_mut()
            .output()
            .subscribe(move |batch: &Vec<(Entity, Entity)>| {
                let mut totals = totals.borrow_mut();
                totals.batches += 1;
                totals.pairs += batch.len() as u64;
                info!(
                    pairs = batch.len(),
                    batches = totals.batches,
                    "collision window flushed"
                );
            });

        let mut filter = Filter::new(move |c: &Collision| c.depth >= min_depth);
        filter.output().connect(Rc::clone(&window));

        Self {
            filter,
            window,
            stats,
        }
    }

    /// Advance the window clock, flushing an expired window.
    pub fn poll(&mut self, now: Duration) {
        self.window.borrow_mut().poll(now);
    }

    /// Offer one collision observed at `now`. Returns whether it passed the
    /// depth filter.
    pub fn observe(&mut self, collision: &Collision, now: Duration) -> bool {
        self.poll(now);
        self.filter.dispatch(collision)
    }

    /// Flush whatever the open window holds.
    pub fn finish(&mut self) {
        self.window.borrow_mut().flush();
    }

    /// Pairs buffered in the open window.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.window.borrow().pending()
    }

    #[must_use]
    pub fn stats(&self) -> CollisionStats {
        *self.stats.borrow()
    }
}

impl std::fmt::Debug for CollisionFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollisionFeed")
            .field("pending", &self.pending())
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(a: u32, b: u32, depth: f32) -> Collision {
        Collision {
            a: Entity::from_parts(a, 0),
            b: Entity::from_parts(b, 0),
            depth,
        }
    }

    #[test]
    fn test_shallow_hits_filtered_out() {
        let mut feed = CollisionFeed::new(Duration::from_millis(100), 0.1);
        assert!(!feed.observe(&hit(1, 2, 0.05), Duration::ZERO));
        assert!(feed.observe(&hit(1, 3, 0.5), Duration::ZERO));
        assert_eq!(feed.pending(), 1);
    }

    #[test]
    fn test_windows_flush_on_poll_and_finish() {
        let mut feed = CollisionFeed::new(Duration::from_millis(100), 0.0);
        feed.observe(&hit(1, 2, 0.2), Duration::ZERO);
        feed.observe(&hit(3, 4, 0.2), Duration::from_millis(50));
        feed.poll(Duration::from_millis(99));
        assert_eq!(feed.stats().batches, 0);

        feed.poll(Duration::from_millis(100));
        assert_eq!(
            feed.stats(),
            CollisionStats {
                batches: 1,
                pairs: 2
            }
        );

        // Idle: no flush without a new item.
        feed.poll(Duration::from_secs(10));
        assert_eq!(feed.stats().batches, 1);

        feed.observe(&hit(5, 6, 0.2), Duration::from_secs(11));
        feed.finish();
        assert_eq!(
            feed.stats(),
            CollisionStats {
                batches: 2,
                pairs: 3
            }
        );
    }
}
