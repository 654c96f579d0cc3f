//! The [`System`] trait and its type-erased form.
//!
//! A system owns exactly one component type, declares the component types an
//! entity must carry before the system acts on it, and reacts to the owned
//! type's lifecycle plus a per-frame update.

use std::any::Any;

use engine_component::{Component, ComponentTypeId, EcsResult, Entity};
use tracing::warn;

use crate::context::Tick;
use crate::world::World;

/// Index of a registered system inside its [`World`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemId(pub usize);

/// A unit of behavior bound to one owned component type.
///
/// Hooks and `update` receive the whole [`World`] mutably; components are
/// borrowed from it for the duration of a call and must not be retained.
///
/// # Examples
///
/// ```rust
/// use engine_component::Component;
/// use engine_system::System;
///
/// struct Frozen;
/// impl Component for Frozen {
///     fn type_name() -> &'static str { "Frozen" }
/// }
///
/// /// Pure tag: no per-frame behavior.
/// struct FrozenSystem;
/// impl System for FrozenSystem {
///     type Component = Frozen;
/// }
/// ```
pub trait System: 'static {
    /// The owned component type.
    type Component: Component;

    /// Name used in logs and errors.
    fn name(&self) -> &str {
        <Self::Component as Component>::type_name()
    }

    /// Component types required on an entity before this system acts on it.
    /// The owned type is always implied.
    fn dependencies(&self) -> Vec<ComponentTypeId> {
        Vec::new()
    }

    /// Called once after a component of the owned type was added to `entity`.
    /// The component is already readable through `world`.
    fn add(&mut self, world: &mut World, entity: Entity) {
        let _ = (world, entity);
    }

    /// Called once when the owned component is removed from `entity`, either
    /// explicitly or because the entity is being destroyed. The value has
    /// already left the store and is dropped after this returns.
    fn remove(&mut self, world: &mut World, entity: Entity, component: &mut Self::Component) {
        let _ = (world, entity, component);
    }

    /// Called once per tick, in dependency order.
    ///
    /// # Errors
    ///
    /// Structural errors from world operations abort the tick and surface to
    /// the tick's caller.
    fn update(&mut self, world: &mut World, tick: &Tick) -> EcsResult<()> {
        let _ = (world, tick);
        Ok(())
    }
}

/// Object-safe view of a [`System`], used for storage in the registry.
pub(crate) trait AnySystem: Any {
    fn name(&self) -> &str;
    fn component_type(&self) -> ComponentTypeId;
    fn component_name(&self) -> &'static str;
    fn requirements(&self) -> Vec<ComponentTypeId>;
    fn on_add(&mut self, world: &mut World, entity: Entity);
    fn on_remove(&mut self, world: &mut World, entity: Entity, component: Box<dyn Any>);
    fn on_update(&mut self, world: &mut World, tick: &Tick) -> EcsResult<()>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<S: System> AnySystem for S {
    fn name(&self) -> &str {
        System::name(self)
    }

    fn component_type(&self) -> ComponentTypeId {
        S::Component::component_type_id()
    }

    fn component_name(&self) -> &'static str {
        S::Component::type_name()
    }

    /// Declared dependencies with the owned type first and duplicates removed.
    fn requirements(&self) -> Vec<ComponentTypeId> {
        let own = S::Component::component_type_id();
        let mut types = vec![own];
        for dep in self.dependencies() {
            if !types.contains(&dep) {
                types.push(dep);
            }
        }
        types
    }

    fn on_add(&mut self, world: &mut World, entity: Entity) {
        self.add(world, entity);
    }

    fn on_remove(&mut self, world: &mut World, entity: Entity, component: Box<dyn Any>) {
        match component.downcast::<S::Component>() {
            Ok(mut value) => self.remove(world, entity, &mut value),
            Err(_) => warn!(
                system = System::name(self),
                entity = %entity,
                "removed component has unexpected type, hook skipped"
            ),
        }
    }

    fn on_update(&mut self, world: &mut World, tick: &Tick) -> EcsResult<()> {
        self.update(world, tick)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
