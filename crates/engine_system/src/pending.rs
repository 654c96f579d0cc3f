//! Pending component requests.
//!
//! A request is an `(entity, component type, continuation)` triple recorded
//! when a caller asks for a component that is not there yet. The world drains
//! the matching requests inside `add`, so resolution stays synchronous and
//! frame-local.

use std::collections::HashMap;

use engine_component::{ComponentTypeId, Entity};

use crate::world::World;

/// Deferred continuation awaiting a component's addition.
pub type Continuation = Box<dyn FnOnce(&mut World, Entity)>;

/// Outcome of [`World::get_async`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The component was present; the continuation already ran.
    Immediate,
    /// The continuation was queued until the component is added.
    Deferred,
    /// The entity is not live; the continuation was dropped.
    Abandoned,
}

/// Multimap of waiting continuations keyed by entity, then component type.
#[derive(Default)]
pub struct PendingRequests {
    waiting: HashMap<Entity, HashMap<ComponentTypeId, Vec<Continuation>>>,
    count: usize,
}

impl std::fmt::Debug for PendingRequests {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRequests")
            .field("entities", &self.waiting.len())
            .field("count", &self.count)
            .finish()
    }
}

impl PendingRequests {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a continuation behind any already waiting on the same pair.
    pub fn push(&mut self, entity: Entity, component: ComponentTypeId, continuation: Continuation) {
        self.waiting
            .entry(entity)
            .or_default()
            .entry(component)
            .or_default()
            .push(continuation);
        self.count += 1;
    }

    /// Take every continuation waiting on `(entity, component)`, oldest first.
    pub fn take(&mut self, entity: Entity, component: ComponentTypeId) -> Vec<Continuation> {
        let Some(by_type) = self.waiting.get_mut(&entity) else {
            return Vec::new();
        };
        let taken = by_type.remove(&component).unwrap_or_default();
        if by_type.is_empty() {
            self.waiting.remove(&entity);
        }
        self.count -= taken.len();
        taken
    }

    /// Put continuations back at the front of their queue, preserving order.
    pub fn restore(
        &mut self,
        entity: Entity,
        component: ComponentTypeId,
        mut continuations: Vec<Continuation>,
    ) {
        if continuations.is_empty() {
            return;
        }
        self.count += continuations.len();
        let queue = self
            .waiting
            .entry(entity)
            .or_default()
            .entry(component)
            .or_default();
        continuations.append(queue);
        *queue = continuations;
    }

    /// Drop every request for `entity`. Returns how many were abandoned.
    pub fn abandon(&mut self, entity: Entity) -> usize {
        let dropped = self
            .waiting
            .remove(&entity)
            .map(|by_type| by_type.values().map(Vec::len).sum())
            .unwrap_or(0);
        self.count -= dropped;
        dropped
    }

    /// Number of waiting continuations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.waiting.clear();
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn e(index: u32) -> Entity {
        Entity::from_parts(index, 0)
    }

    fn noop() -> Continuation {
        Box::new(|_, _| {})
    }

    #[test]
    fn test_take_is_keyed_by_pair() {
        let mut pending = PendingRequests::new();
        let a = ComponentTypeId(1);
        let b = ComponentTypeId(2);
        pending.push(e(1), a, noop());
        pending.push(e(1), b, noop());
        pending.push(e(2), a, noop());

        assert_eq!(pending.take(e(1), a).len(), 1);
        assert_eq!(pending.len(), 2);
        assert!(pending.take(e(1), a).is_empty());
    }

    #[test]
    fn test_abandon_drops_all_for_entity() {
        let mut pending = PendingRequests::new();
        pending.push(e(1), ComponentTypeId(1), noop());
        pending.push(e(1), ComponentTypeId(2), noop());
        pending.push(e(2), ComponentTypeId(1), noop());

        assert_eq!(pending.abandon(e(1)), 2);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending.abandon(e(1)), 0);
    }

    #[test]
    fn test_restore_keeps_order_ahead_of_newer_requests() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut pending = PendingRequests::new();
        let ty = ComponentTypeId(7);
        for label in ["first", "second"] {
            let order = Rc::clone(&order);
            pending.push(e(1), ty, Box::new(move |_, _| order.borrow_mut().push(label)));
        }

        let taken = pending.take(e(1), ty);
        let late = Rc::clone(&order);
        pending.push(e(1), ty, Box::new(move |_, _| late.borrow_mut().push("third")));
        pending.restore(e(1), ty, taken);
        assert_eq!(pending.len(), 3);

        let mut world = World::new();
        for k in pending.take(e(1), ty) {
            k(&mut world, e(1));
        }
        assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
    }
}
