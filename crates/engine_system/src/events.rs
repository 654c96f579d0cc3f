//! Entity-scoped events.
//!
//! Handlers subscribe to an `(entity, name)` pair. Sending an event is
//! fire-and-forget: delivery is synchronous, in subscription order, and an
//! event nobody listens to is dropped without error.

use std::any::Any;
use std::collections::HashMap;

use engine_component::Entity;

use crate::world::World;

/// Handler invoked with the world, the target entity, and the payload.
pub type EventHandler = Box<dyn FnMut(&mut World, Entity, &dyn Any)>;

/// Handle returned by [`World::subscribe_event`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventSubscription {
    pub entity: Entity,
    pub name: String,
    pub(crate) id: u64,
}

struct Subscriber {
    id: u64,
    /// `None` while the handler is running.
    handler: Option<EventHandler>,
}

/// Subscriber table for entity events.
#[derive(Default)]
pub struct EntityEvents {
    channels: HashMap<Entity, HashMap<String, Vec<Subscriber>>>,
    next_id: u64,
}

impl std::fmt::Debug for EntityEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityEvents")
            .field("entities", &self.channels.len())
            .finish()
    }
}

impl EntityEvents {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &mut self,
        entity: Entity,
        name: &str,
        handler: EventHandler,
    ) -> EventSubscription {
        let id = self.next_id;
        self.next_id += 1;
        self.channels
            .entry(entity)
            .or_default()
            .entry(name.to_string())
            .or_default()
            .push(Subscriber {
                id,
                handler: Some(handler),
            });
        EventSubscription {
            entity,
            name: name.to_string(),
            id,
        }
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, subscription: &EventSubscription) -> bool {
        let Some(by_name) = self.channels.get_mut(&subscription.entity) else {
            return false;
        };
        let Some(subscribers) = by_name.get_mut(&subscription.name) else {
            return false;
        };
        let before = subscribers.len();
        subscribers.retain(|s| s.id != subscription.id);
        let removed = subscribers.len() != before;
        if subscribers.is_empty() {
            by_name.remove(&subscription.name);
        }
        if by_name.is_empty() {
            self.channels.remove(&subscription.entity);
        }
        removed
    }

    /// Ids of the current subscribers for `(entity, name)`, in order.
    pub(crate) fn subscriber_ids(&self, entity: Entity, name: &str) -> Vec<u64> {
        self.channels
            .get(&entity)
            .and_then(|by_name| by_name.get(name))
            .map(|subs| subs.iter().map(|s| s.id).collect())
            .unwrap_or_default()
    }

    /// Take a handler out for the duration of its call.
    pub(crate) fn take_handler(
        &mut self,
        entity: Entity,
        name: &str,
        id: u64,
    ) -> Option<EventHandler> {
        self.find(entity, name, id)?.handler.take()
    }

    /// Return a handler after its call. Dropped if it unsubscribed meanwhile.
    pub(crate) fn return_handler(
        &mut self,
        entity: Entity,
        name: &str,
        id: u64,
        handler: EventHandler,
    ) {
        if let Some(subscriber) = self.find(entity, name, id) {
            subscriber.handler = Some(handler);
        }
    }

    fn find(&mut self, entity: Entity, name: &str, id: u64) -> Option<&mut Subscriber> {
        self.channels
            .get_mut(&entity)?
            .get_mut(name)?
            .iter_mut()
            .find(|s| s.id == id)
    }

    /// Drop every subscription scoped to `entity`.
    pub fn drop_entity(&mut self, entity: Entity) -> usize {
        self.channels
            .remove(&entity)
            .map(|by_name| by_name.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    /// Number of subscriptions for `(entity, name)`.
    #[must_use]
    pub fn subscriber_count(&self, entity: Entity, name: &str) -> usize {
        self.channels
            .get(&entity)
            .and_then(|by_name| by_name.get(name))
            .map_or(0, Vec::len)
    }

    pub fn clear(&mut self) {
        self.channels.clear();
    }
}
