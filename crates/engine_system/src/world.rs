//! The [`World`]: entities, component storage, systems, pending requests, and
//! entity events behind one mutable handle.
//!
//! Systems are boxed inside the world's registry. To call one, the world
//! takes it out of its slot, hands it `&mut World`, and puts it back. Hooks
//! addressed to a system that is currently out of its slot are queued and
//! delivered in order as soon as it returns, before control goes back to the
//! caller that triggered them.
//!
//! Destroying an entity removes its components one at a time. If a removal's
//! hook has to wait for a busy owner, destruction pauses there and resumes
//! right after that hook runs, so every remove hook sees a live entity that
//! still carries its remaining components. The entity refuses new components
//! while it is being destroyed.

use std::any::{Any, TypeId};
use std::collections::HashSet;
use std::time::Duration;

use engine_component::{
    Component, ComponentStore, ComponentTypeId, EcsError, EcsResult, Entity, EntityRegistry,
    Query, matching_entities,
};
use tracing::{debug, trace, warn};

use crate::context::Tick;
use crate::events::{EntityEvents, EventSubscription};
use crate::pending::{PendingRequests, Resolution};
use crate::registry::{Hook, SystemRegistry};
use crate::system::{AnySystem, System, SystemId};

/// The ECS runtime state.
#[derive(Debug, Default)]
pub struct World {
    entities: EntityRegistry,
    store: ComponentStore,
    systems: SystemRegistry,
    pending: PendingRequests,
    events: EntityEvents,
    /// Entities whose destruction is in progress.
    dying: HashSet<Entity>,
    tick_id: u64,
    elapsed: Duration,
}

impl World {
    /// Create an empty world with no systems.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -- Systems --

    /// Register `system` as the owner of `S::Component`.
    ///
    /// # Errors
    ///
    /// - [`EcsError::DuplicateOwner`] if another system owns the same type.
    /// - [`EcsError::DependencyCycle`] if the declared dependencies close a
    ///   cycle with already registered systems.
    /// - [`EcsError::ComponentTypeConflict`] if the owned type's tag is bound
    ///   to another Rust type.
    pub fn add_system<S: System>(&mut self, system: S) -> EcsResult<SystemId> {
        self.store.register::<S::Component>()?;
        self.systems.register(TypeId::of::<S>(), Box::new(system))
    }

    /// The system owning component type `component`.
    #[must_use]
    pub fn owner_of(&self, component: ComponentTypeId) -> Option<SystemId> {
        self.systems.owner_of(component)
    }

    /// Name of the system owning `component`.
    #[must_use]
    pub fn owner_name(&self, component: ComponentTypeId) -> Option<&str> {
        self.owner_of(component)
            .and_then(|id| self.systems.name(id))
    }

    /// Borrow a registered system by concrete type. `None` while that system
    /// is itself executing.
    #[must_use]
    pub fn system<S: System>(&self) -> Option<&S> {
        let id = self.systems.by_type(TypeId::of::<S>())?;
        self.systems
            .slot(id)
            .system
            .as_ref()?
            .as_any()
            .downcast_ref::<S>()
    }

    /// Mutably borrow a registered system by concrete type.
    #[must_use]
    pub fn system_mut<S: System>(&mut self) -> Option<&mut S> {
        let id = self.systems.by_type(TypeId::of::<S>())?;
        self.systems
            .slot_mut(id)
            .system
            .as_mut()?
            .as_any_mut()
            .downcast_mut::<S>()
    }

    /// Borrow the system owning `component`, expected to be an `S`.
    #[must_use]
    pub fn owner_system<S: System>(&self, component: ComponentTypeId) -> Option<&S> {
        let id = self.owner_of(component)?;
        self.systems
            .slot(id)
            .system
            .as_ref()?
            .as_any()
            .downcast_ref::<S>()
    }

    /// System names in update order.
    #[must_use]
    pub fn update_order(&self) -> Vec<&str> {
        self.systems.order_names()
    }

    /// The system registry.
    #[must_use]
    pub fn systems(&self) -> &SystemRegistry {
        &self.systems
    }

    // -- Entity lifecycle --

    /// Allocate a new entity with no components.
    pub fn create(&mut self) -> Entity {
        self.entities.create()
    }

    /// Destroy an entity: remove every component (each owner's `remove` hook
    /// fires once, most recently added first), then abandon its pending
    /// requests and event subscriptions and release the identifier.
    ///
    /// If an owner is busy (the caller is that system's own hook or update),
    /// the entity stays live until its deferred `remove` hook has run, which
    /// happens before control returns from that system.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownEntity`] if `entity` is not live.
    pub fn destroy(&mut self, entity: Entity) -> EcsResult<()> {
        if !self.entities.exists(entity) {
            return Err(EcsError::UnknownEntity(entity));
        }
        if !self.dying.insert(entity) {
            // Already being destroyed further up the stack.
            return Ok(());
        }
        self.resume_destroy(entity)
    }

    /// Returns `true` while `entity` is being destroyed.
    #[must_use]
    pub fn is_dying(&self, entity: Entity) -> bool {
        self.dying.contains(&entity)
    }

    /// Continue removing components from a dying entity. Stops early when a
    /// remove hook is deferred; the deferred delivery calls back in here.
    fn resume_destroy(&mut self, entity: Entity) -> EcsResult<()> {
        loop {
            if !self.entities.exists(entity) {
                self.dying.remove(&entity);
                return Ok(());
            }
            let next = self
                .entities
                .component_types(entity)
                .and_then(<[ComponentTypeId]>::last)
                .copied();
            let Some(component) = next else {
                break;
            };
            if self.detach_component(entity, component)? {
                trace!(entity = %entity, "destroy paused for busy owner");
                return Ok(());
            }
        }

        self.dying.remove(&entity);
        let abandoned = self.pending.abandon(entity);
        let unsubscribed = self.events.drop_entity(entity);
        self.entities.release(entity)?;
        debug!(
            entity = %entity,
            abandoned,
            unsubscribed,
            "entity destroyed"
        );
        Ok(())
    }

    /// O(1) liveness check.
    #[must_use]
    pub fn exists(&self, entity: Entity) -> bool {
        self.entities.exists(entity)
    }

    /// Number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// The entity registry.
    #[must_use]
    pub fn entities(&self) -> &EntityRegistry {
        &self.entities
    }

    // -- Components --

    /// Attach `value` to `entity`.
    ///
    /// Before this returns, the owning system's `add` hook has run and every
    /// request waiting on `(entity, T)` has been resolved.
    ///
    /// # Errors
    ///
    /// - [`EcsError::UnknownEntity`] if `entity` is not live or is being
    ///   destroyed.
    /// - [`EcsError::DuplicateComponent`] if `entity` already has a `T`.
    pub fn add<T: Component>(&mut self, entity: Entity, value: T) -> EcsResult<()> {
        if !self.entities.exists(entity) || self.dying.contains(&entity) {
            return Err(EcsError::UnknownEntity(entity));
        }
        let component = T::component_type_id();
        self.store.insert(entity, value)?;
        self.entities.attach(entity, component)?;
        debug!(entity = %entity, component = T::type_name(), "component added");

        let deferred = match self.systems.owner_of(component) {
            Some(owner) => self.deliver(owner, Hook::Added(entity)),
            None => false,
        };
        // A deferred hook resolves the waiting requests itself once it runs.
        if !deferred {
            self.resolve_pending(entity, component);
        }
        Ok(())
    }

    /// O(1) lookup. Absence is a normal outcome.
    #[must_use]
    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.store.get::<T>(entity)
    }

    /// O(1) mutable lookup.
    #[must_use]
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.store.get_mut::<T>(entity)
    }

    /// Returns `true` if `entity` currently has a `T`.
    #[must_use]
    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.store.contains(entity, T::component_type_id())
    }

    /// Detach the `T` from `entity`. The owning system's `remove` hook
    /// receives the value before it is dropped.
    ///
    /// # Errors
    ///
    /// - [`EcsError::UnknownEntity`] if `entity` is not live.
    /// - [`EcsError::ComponentNotFound`] if `entity` has no `T`.
    pub fn remove<T: Component>(&mut self, entity: Entity) -> EcsResult<()> {
        if !self.entities.exists(entity) {
            return Err(EcsError::UnknownEntity(entity));
        }
        if !self.has::<T>(entity) {
            return Err(EcsError::ComponentNotFound {
                entity,
                component: T::type_name(),
            });
        }
        self.remove_by_type(entity, T::component_type_id())
    }

    /// Detach a component knowing only its type tag.
    ///
    /// # Errors
    ///
    /// Same as [`World::remove`].
    pub fn remove_by_type(&mut self, entity: Entity, component: ComponentTypeId) -> EcsResult<()> {
        if !self.entities.exists(entity) {
            return Err(EcsError::UnknownEntity(entity));
        }
        self.detach_component(entity, component).map(|_| ())
    }

    /// Take a component out of the store and hand it to its owner. Returns
    /// `true` if the owner was busy and the hook was deferred.
    fn detach_component(&mut self, entity: Entity, component: ComponentTypeId) -> EcsResult<bool> {
        let name = self.store.type_name(component).unwrap_or("<unregistered>");
        let value = self
            .store
            .remove_erased(entity, component)
            .ok_or(EcsError::ComponentNotFound {
                entity,
                component: name,
            })?;
        self.entities.detach(entity, component)?;
        debug!(entity = %entity, component = name, "component removed");

        match self.systems.owner_of(component) {
            Some(owner) => Ok(self.deliver(owner, Hook::Removed(entity, value))),
            None => {
                drop(value);
                Ok(false)
            }
        }
    }

    /// Run `continuation` once `entity` has a `T`: immediately if it already
    /// does, otherwise the moment a `T` is added. Never runs if the entity is
    /// destroyed first.
    pub fn get_async<T: Component>(
        &mut self,
        entity: Entity,
        continuation: impl FnOnce(&mut World, Entity) + 'static,
    ) -> Resolution {
        if !self.entities.exists(entity) || self.dying.contains(&entity) {
            return Resolution::Abandoned;
        }
        if self.has::<T>(entity) {
            continuation(self, entity);
            return Resolution::Immediate;
        }
        trace!(entity = %entity, component = T::type_name(), "component request deferred");
        self.pending
            .push(entity, T::component_type_id(), Box::new(continuation));
        Resolution::Deferred
    }

    /// Number of continuations waiting on components.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// The component store.
    #[must_use]
    pub fn store(&self) -> &ComponentStore {
        &self.store
    }

    // -- Traversal --

    /// Snapshot of the entities carrying every type in `types`, in the
    /// storage order of the first type.
    #[must_use]
    pub fn traverse_entities(&self, types: &[ComponentTypeId]) -> Vec<Entity> {
        matching_entities(&self.store, types)
    }

    /// Visit the entities matching `types` with full world access.
    ///
    /// The match set is snapshotted first, so the visitor may add and remove
    /// components or destroy entities. An entity that stops matching (or
    /// dies) before its turn is skipped; entities that start matching during
    /// the traversal are not visited.
    pub fn traverse_entities_with(
        &mut self,
        types: &[ComponentTypeId],
        mut visitor: impl FnMut(&mut World, Entity),
    ) {
        for entity in self.traverse_entities(types) {
            if self.entities.has_all(entity, types) {
                visitor(self, entity);
            }
        }
    }

    /// Visit every entity matching `Q` with its borrowed components.
    pub fn traverse<Q: Query>(&self, visitor: impl FnMut(Entity, Q::Item<'_>)) {
        engine_component::query::for_each::<Q>(&self.store, visitor);
    }

    // -- Events --

    /// Subscribe `handler` to events named `name` sent to `entity`.
    pub fn subscribe_event(
        &mut self,
        entity: Entity,
        name: &str,
        handler: impl FnMut(&mut World, Entity, &dyn Any) + 'static,
    ) -> EventSubscription {
        self.events.subscribe(entity, name, Box::new(handler))
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe_event(&mut self, subscription: &EventSubscription) -> bool {
        self.events.unsubscribe(subscription)
    }

    /// Deliver `payload` to every handler subscribed to `(entity, name)`, in
    /// subscription order. Returns how many handlers ran; zero is fine.
    pub fn send_event(&mut self, entity: Entity, name: &str, payload: &dyn Any) -> usize {
        let mut delivered = 0;
        for id in self.events.subscriber_ids(entity, name) {
            let Some(mut handler) = self.events.take_handler(entity, name, id) else {
                continue;
            };
            handler(self, entity, payload);
            self.events.return_handler(entity, name, id, handler);
            delivered += 1;
        }
        trace!(entity = %entity, event = name, delivered, "event sent");
        delivered
    }

    // -- Frame --

    /// Run one tick: every system's `update` once, in dependency order.
    ///
    /// Released entity identifiers become reusable once the tick ends.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a system's update; later systems do
    /// not run that tick.
    pub fn tick(&mut self, dt: Duration) -> EcsResult<Tick> {
        self.tick_id += 1;
        self.elapsed += dt;
        let tick = Tick {
            tick_id: self.tick_id,
            dt,
            elapsed: self.elapsed,
        };

        let order = self.systems.order().to_vec();
        let mut result = Ok(tick);
        for id in order {
            let outcome = self.with_system(id, |system, world| system.on_update(world, &tick));
            if let Some(Err(err)) = outcome {
                warn!(
                    tick_id = tick.tick_id,
                    system = self.systems.name(id).unwrap_or_default(),
                    error = %err,
                    "system update failed"
                );
                result = Err(err);
                break;
            }
        }

        self.entities.end_frame();
        result
    }

    /// Number of ticks run so far.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.tick_id
    }

    /// Total simulation time.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Tear the world down: destroy every live entity (remove hooks fire),
    /// then drop pending requests, subscriptions, and systems.
    pub fn shutdown(&mut self) {
        let live: Vec<Entity> = self.entities.iter().collect();
        for entity in live {
            if self.entities.exists(entity)
                && let Err(err) = self.destroy(entity)
            {
                warn!(entity = %entity, error = %err, "destroy during shutdown failed");
            }
        }
        self.pending.clear();
        self.events.clear();
        self.dying.clear();
        self.systems.clear();
        debug!("world shut down");
    }

    // -- Internals --

    /// Run `f` with the system taken out of its slot, then flush any hooks
    /// that were queued for it meanwhile. Returns `None` if the system is
    /// already executing further up the stack.
    fn with_system<R>(
        &mut self,
        id: SystemId,
        f: impl FnOnce(&mut dyn AnySystem, &mut World) -> R,
    ) -> Option<R> {
        let mut system = self.systems.slot_mut(id).system.take()?;
        let result = f(&mut *system, self);
        while let Some(hook) = self.systems.slot_mut(id).deferred.pop_front() {
            self.run_deferred(&mut *system, hook);
        }
        self.systems.slot_mut(id).system = Some(system);
        Some(result)
    }

    /// Deliver `hook` to `owner` now, or queue it if the owner is executing.
    /// Returns `true` if it was queued.
    fn deliver(&mut self, owner: SystemId, hook: Hook) -> bool {
        let slot = self.systems.slot_mut(owner);
        if slot.system.is_none() {
            trace!(system = %slot.name, "system busy, hook deferred");
            slot.deferred.push_back(hook);
            return true;
        }
        self.with_system(owner, |system, world| world.run_hook(system, hook));
        false
    }

    /// Run a queued hook, then whatever its caller skipped while it waited:
    /// pending requests for an add, the rest of a destroy for a remove.
    fn run_deferred(&mut self, system: &mut dyn AnySystem, hook: Hook) {
        match hook {
            Hook::Added(entity) => {
                let component = system.component_type();
                self.run_hook(system, Hook::Added(entity));
                self.resolve_pending(entity, component);
            }
            Hook::Removed(entity, value) => {
                self.run_hook(system, Hook::Removed(entity, value));
                if self.dying.contains(&entity)
                    && let Err(err) = self.resume_destroy(entity)
                {
                    warn!(entity = %entity, error = %err, "deferred destroy failed");
                }
            }
        }
    }

    fn run_hook(&mut self, system: &mut dyn AnySystem, hook: Hook) {
        match hook {
            Hook::Added(entity) => {
                if self.store.contains(entity, system.component_type()) {
                    system.on_add(self, entity);
                } else {
                    warn!(
                        system = system.name(),
                        entity = %entity,
                        "component gone before deferred add hook, skipped"
                    );
                }
            }
            Hook::Removed(entity, value) => system.on_remove(self, entity, value),
        }
    }

    fn resolve_pending(&mut self, entity: Entity, component: ComponentTypeId) {
        let mut waiting = self.pending.take(entity, component).into_iter();
        while let Some(continuation) = waiting.next() {
            if !self.entities.exists(entity) || self.dying.contains(&entity) {
                // Destroyed by an earlier continuation.
                break;
            }
            if !self.store.contains(entity, component) {
                // Removed again before resolution: keep waiting for the next add.
                let rest = std::iter::once(continuation).chain(waiting).collect();
                self.pending.restore(entity, component, rest);
                return;
            }
            debug!(entity = %entity, "pending component request resolved");
            continuation(self, entity);
        }
    }
}
