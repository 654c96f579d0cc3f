//! Entity type, allocation, and liveness tracking.
//!
//! An [`Entity`] is a lightweight `u64` handle with no inherent data. The low
//! 32 bits hold a slot index and the high 32 bits a generation counter, so a
//! recycled slot never compares equal to a handle from a previous life.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::component::ComponentTypeId;
use crate::error::{EcsError, EcsResult};

/// A unique entity identifier.
///
/// Entities are pure identifiers and carry no data of their own. Components
/// are attached to entities to give them meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity(pub u64);

impl Entity {
    /// The null / invalid entity sentinel. Slot index 0 is never allocated.
    pub const INVALID: Entity = Entity(0);

    /// Create an entity from a raw `u64` identifier.
    #[must_use]
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Build a handle from its slot index and generation.
    #[must_use]
    pub const fn from_parts(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | index as u64)
    }

    /// Returns the raw `u64` identifier.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }

    /// Slot index part of the handle.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Generation part of the handle.
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Returns `true` if this is a valid (non-zero slot) entity.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.index() != 0
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({}v{})", self.index(), self.generation())
    }
}

/// Allocates entity handles and recycles destroyed slots.
///
/// Released slots are parked until [`EntityAllocator::end_frame`] so that a
/// handle destroyed during a frame cannot be handed out again within that
/// same frame.
#[derive(Debug)]
pub struct EntityAllocator {
    /// Current generation of every slot ever allocated. Index 0 is reserved.
    generations: Vec<u32>,
    /// Slots available for reuse.
    free: Vec<u32>,
    /// Slots released this frame, promoted to `free` at frame end.
    pending_release: Vec<u32>,
}

impl EntityAllocator {
    /// Creates a new allocator. Slot 0 is reserved for [`Entity::INVALID`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            generations: vec![0],
            free: Vec::new(),
            pending_release: Vec::new(),
        }
    }

    /// Allocates a fresh or recycled entity handle.
    ///
    /// # Panics
    ///
    /// Panics if the 32-bit slot space is exhausted.
    pub fn allocate(&mut self) -> Entity {
        if let Some(index) = self.free.pop() {
            let generation = self.generations[index as usize];
            return Entity::from_parts(index, generation);
        }

        let index = u32::try_from(self.generations.len())
            .ok()
            .filter(|&i| i != u32::MAX)
            .unwrap_or_else(|| panic!("entity identifier space exhausted"));
        self.generations.push(0);
        Entity::from_parts(index, 0)
    }

    /// Releases a handle. The slot becomes reusable after the next
    /// [`EntityAllocator::end_frame`], with its generation bumped.
    pub fn release(&mut self, entity: Entity) {
        let index = entity.index();
        if let Some(generation) = self.generations.get_mut(index as usize) {
            *generation = generation.wrapping_add(1);
            self.pending_release.push(index);
        }
    }

    /// Promotes every slot released this frame to the free list.
    pub fn end_frame(&mut self) {
        self.free.append(&mut self.pending_release);
    }

    /// Returns the number of slots ever allocated.
    #[must_use]
    pub fn count(&self) -> u64 {
        (self.generations.len() - 1) as u64
    }

    /// Returns `true` if `entity` carries the slot's current generation.
    #[must_use]
    pub fn is_current(&self, entity: Entity) -> bool {
        entity.is_valid()
            && self
                .generations
                .get(entity.index() as usize)
                .is_some_and(|&g| g == entity.generation())
    }
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks live entities and the component types each one currently carries.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    allocator: EntityAllocator,
    /// Component types per slot, in add order. `None` for dead slots.
    slots: Vec<Option<Vec<ComponentTypeId>>>,
    live: usize,
}

impl EntityRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            allocator: EntityAllocator::new(),
            slots: vec![None],
            live: 0,
        }
    }

    /// Allocate a new live entity with no components.
    pub fn create(&mut self) -> Entity {
        let entity = self.allocator.allocate();
        let index = entity.index() as usize;
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        self.slots[index] = Some(Vec::new());
        self.live += 1;
        debug!(entity = %entity, "entity created");
        entity
    }

    /// Release a live entity. Its components must already have been removed.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownEntity`] if `entity` is not live.
    pub fn release(&mut self, entity: Entity) -> EcsResult<()> {
        if !self.exists(entity) {
            return Err(EcsError::UnknownEntity(entity));
        }
        self.slots[entity.index() as usize] = None;
        self.allocator.release(entity);
        self.live -= 1;
        debug!(entity = %entity, "entity released");
        Ok(())
    }

    /// O(1) liveness check.
    #[must_use]
    pub fn exists(&self, entity: Entity) -> bool {
        self.allocator.is_current(entity)
            && self
                .slots
                .get(entity.index() as usize)
                .is_some_and(Option::is_some)
    }

    /// Component types currently attached to `entity`, in add order.
    #[must_use]
    pub fn component_types(&self, entity: Entity) -> Option<&[ComponentTypeId]> {
        if !self.allocator.is_current(entity) {
            return None;
        }
        self.slots
            .get(entity.index() as usize)
            .and_then(|s| s.as_deref())
    }

    /// Returns `true` if `entity` is live and carries every type in `types`.
    #[must_use]
    pub fn has_all(&self, entity: Entity, types: &[ComponentTypeId]) -> bool {
        self.component_types(entity)
            .is_some_and(|owned| types.iter().all(|t| owned.contains(t)))
    }

    /// Record that `entity` gained a component of type `type_id`.
    pub fn attach(&mut self, entity: Entity, type_id: ComponentTypeId) -> EcsResult<()> {
        let slot = self.slot_mut(entity)?;
        if !slot.contains(&type_id) {
            slot.push(type_id);
        }
        Ok(())
    }

    /// Record that `entity` lost its component of type `type_id`.
    pub fn detach(&mut self, entity: Entity, type_id: ComponentTypeId) -> EcsResult<()> {
        let slot = self.slot_mut(entity)?;
        slot.retain(|&t| t != type_id);
        Ok(())
    }

    /// Makes slots released this frame available again.
    pub fn end_frame(&mut self) {
        self.allocator.end_frame();
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` when no entity is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Iterate over every live entity in slot order.
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.as_ref().map(|_| {
                let index = index as u32;
                Entity::from_parts(index, self.allocator.generations[index as usize])
            })
        })
    }

    fn slot_mut(&mut self, entity: Entity) -> EcsResult<&mut Vec<ComponentTypeId>> {
        if !self.allocator.is_current(entity) {
            return Err(EcsError::UnknownEntity(entity));
        }
        self.slots
            .get_mut(entity.index() as usize)
            .and_then(Option::as_mut)
            .ok_or(EcsError::UnknownEntity(entity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_parts() {
        let e = Entity::from_parts(42, 7);
        assert_eq!(e.index(), 42);
        assert_eq!(e.generation(), 7);
        assert!(e.is_valid());
    }

    #[test]
    fn test_entity_invalid() {
        assert!(!Entity::INVALID.is_valid());
        assert_eq!(Entity::INVALID.id(), 0);
    }

    #[test]
    fn test_allocator_produces_unique_ids() {
        let mut alloc = EntityAllocator::new();
        let e1 = alloc.allocate();
        let e2 = alloc.allocate();
        let e3 = alloc.allocate();
        assert_eq!(e1.index(), 1);
        assert_eq!(e2.index(), 2);
        assert_eq!(e3.index(), 3);
        assert_eq!(alloc.count(), 3);
    }

    #[test]
    fn test_released_slot_not_reused_within_frame() {
        let mut alloc = EntityAllocator::new();
        let e1 = alloc.allocate();
        alloc.release(e1);
        let e2 = alloc.allocate();
        assert_ne!(e1.index(), e2.index());

        alloc.end_frame();
        let e3 = alloc.allocate();
        assert_eq!(e3.index(), e1.index());
        assert_eq!(e3.generation(), e1.generation() + 1);
        assert_ne!(e3, e1);
    }

    #[test]
    fn test_registry_exists_and_release() {
        let mut registry = EntityRegistry::new();
        let e = registry.create();
        assert!(registry.exists(e));
        assert_eq!(registry.len(), 1);

        registry.release(e).unwrap();
        assert!(!registry.exists(e));
        assert!(registry.is_empty());
        assert!(matches!(
            registry.release(e),
            Err(EcsError::UnknownEntity(x)) if x == e
        ));
    }

    #[test]
    fn test_stale_handle_not_live_after_recycle() {
        let mut registry = EntityRegistry::new();
        let old = registry.create();
        registry.release(old).unwrap();
        registry.end_frame();

        let new = registry.create();
        assert_eq!(new.index(), old.index());
        assert!(registry.exists(new));
        assert!(!registry.exists(old));
    }

    #[test]
    fn test_registry_tracks_component_types() {
        let mut registry = EntityRegistry::new();
        let e = registry.create();
        let a = ComponentTypeId(1);
        let b = ComponentTypeId(2);
        registry.attach(e, a).unwrap();
        registry.attach(e, b).unwrap();
        assert_eq!(registry.component_types(e), Some(&[a, b][..]));
        assert!(registry.has_all(e, &[b, a]));

        registry.detach(e, a).unwrap();
        assert!(!registry.has_all(e, &[a]));
    }

    #[test]
    fn test_registry_iter_skips_dead() {
        let mut registry = EntityRegistry::new();
        let e1 = registry.create();
        let e2 = registry.create();
        registry.release(e1).unwrap();
        let live: Vec<_> = registry.iter().collect();
        assert_eq!(live, vec![e2]);
    }
}
