//! System registry: registered systems, the owner-system index, and the
//! resolved update order.

use std::any::{Any, TypeId};
use std::collections::{HashMap, VecDeque};

use engine_component::{ComponentTypeId, EcsError, EcsResult, Entity};
use tracing::info;

use crate::scheduler::{self, SystemNode};
use crate::system::{AnySystem, SystemId};

/// A lifecycle notification addressed to a system that was busy when it was
/// raised.
pub(crate) enum Hook {
    Added(Entity),
    Removed(Entity, Box<dyn Any>),
}

/// Registry entry for one system.
pub(crate) struct SystemSlot {
    pub(crate) name: String,
    pub(crate) component: ComponentTypeId,
    pub(crate) component_name: &'static str,
    /// Owned type first, then declared dependencies.
    pub(crate) requirements: Vec<ComponentTypeId>,
    /// `None` while the system is executing (taken out of the registry).
    pub(crate) system: Option<Box<dyn AnySystem>>,
    /// Hooks raised while the system was executing, delivered on return.
    pub(crate) deferred: VecDeque<Hook>,
}

/// Registry of all systems known to a world.
#[derive(Default)]
pub struct SystemRegistry {
    slots: Vec<SystemSlot>,
    /// Owner-system index: component type -> owning system.
    owners: HashMap<ComponentTypeId, SystemId>,
    /// Concrete Rust type -> system, for typed lookups.
    by_type: HashMap<TypeId, SystemId>,
    order: Vec<SystemId>,
}

impl std::fmt::Debug for SystemRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemRegistry")
            .field("order", &self.order_names())
            .finish()
    }
}

impl SystemRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a system, rejecting duplicate owners and dependency cycles.
    /// On error the registry is left unchanged.
    pub(crate) fn register(
        &mut self,
        rust_type: TypeId,
        system: Box<dyn AnySystem>,
    ) -> EcsResult<SystemId> {
        let component = system.component_type();
        let name = system.name().to_string();

        if let Some(&existing) = self.owners.get(&component) {
            return Err(EcsError::DuplicateOwner {
                component: system.component_name(),
                existing: self.slots[existing.0].name.clone(),
                rejected: name,
            });
        }

        let id = SystemId(self.slots.len());
        self.slots.push(SystemSlot {
            name: name.clone(),
            component,
            component_name: system.component_name(),
            requirements: system.requirements(),
            system: Some(system),
            deferred: VecDeque::new(),
        });
        self.owners.insert(component, id);

        match self.resolve() {
            Ok(order) => {
                self.order = order;
                self.by_type.insert(rust_type, id);
                info!(
                    system = %name,
                    order = ?self.order_names(),
                    "system registered"
                );
                Ok(id)
            }
            Err(stuck) => {
                self.owners.remove(&component);
                self.slots.pop();
                Err(EcsError::DependencyCycle {
                    system: name,
                    involved: stuck,
                })
            }
        }
    }

    fn resolve(&self) -> Result<Vec<SystemId>, Vec<String>> {
        let nodes: Vec<SystemNode> = self
            .slots
            .iter()
            .map(|slot| SystemNode {
                component: slot.component,
                dependencies: slot.requirements.clone(),
            })
            .collect();
        scheduler::resolve_order(&nodes)
            .map(|order| order.into_iter().map(SystemId).collect())
            .map_err(|stuck| {
                stuck
                    .into_iter()
                    .map(|idx| self.slots[idx].name.clone())
                    .collect()
            })
    }

    /// The system owning `component`, if any.
    #[must_use]
    pub fn owner_of(&self, component: ComponentTypeId) -> Option<SystemId> {
        self.owners.get(&component).copied()
    }

    /// The system registered with concrete type `rust_type`.
    #[must_use]
    pub(crate) fn by_type(&self, rust_type: TypeId) -> Option<SystemId> {
        self.by_type.get(&rust_type).copied()
    }

    /// Name of a registered system.
    #[must_use]
    pub fn name(&self, id: SystemId) -> Option<&str> {
        self.slots.get(id.0).map(|s| s.name.as_str())
    }

    /// Component types a system requires (owned type first).
    #[must_use]
    pub fn requirements(&self, id: SystemId) -> Option<&[ComponentTypeId]> {
        self.slots.get(id.0).map(|s| s.requirements.as_slice())
    }

    /// Name of the component type a system owns.
    #[must_use]
    pub fn component_name(&self, id: SystemId) -> Option<&'static str> {
        self.slots.get(id.0).map(|s| s.component_name)
    }

    /// Systems in update order.
    #[must_use]
    pub fn order(&self) -> &[SystemId] {
        &self.order
    }

    /// System names in update order.
    #[must_use]
    pub fn order_names(&self) -> Vec<&str> {
        self.order
            .iter()
            .map(|id| self.slots[id.0].name.as_str())
            .collect()
    }

    /// Returns the number of registered systems.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub(crate) fn slot(&self, id: SystemId) -> &SystemSlot {
        &self.slots[id.0]
    }

    pub(crate) fn slot_mut(&mut self, id: SystemId) -> &mut SystemSlot {
        &mut self.slots[id.0]
    }

    /// Drop every system. Used at engine shutdown.
    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.owners.clear();
        self.by_type.clear();
        self.order.clear();
    }
}
