//! ECS error types.

use crate::component::ComponentTypeId;
use crate::entity::Entity;

/// Result alias for fallible ECS operations.
pub type EcsResult<T> = Result<T, EcsError>;

/// Structural and configuration errors raised by the ECS runtime.
///
/// Absence of a component is never an error: lookups return `Option`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EcsError {
    /// The entity already carries a component of this type.
    #[error("{entity} already has component '{component}'")]
    DuplicateComponent {
        entity: Entity,
        component: &'static str,
    },

    /// The entity carries no component of this type.
    #[error("{entity} has no component '{component}'")]
    ComponentNotFound {
        entity: Entity,
        component: &'static str,
    },

    /// A second system tried to claim an already-owned component type.
    #[error("component '{component}' is already owned by system '{existing}', cannot register '{rejected}'")]
    DuplicateOwner {
        component: &'static str,
        existing: String,
        rejected: String,
    },

    /// Registering this system would close a cycle in the dependency graph.
    #[error("registering system '{system}' creates a dependency cycle through {involved:?}")]
    DependencyCycle {
        system: String,
        involved: Vec<String>,
    },

    /// The entity is not live (never created, or already destroyed).
    #[error("unknown entity {0}")]
    UnknownEntity(Entity),

    /// Two distinct Rust types were registered under the same type tag.
    #[error("component type tag {type_id} ('{component}') is already bound to a different Rust type")]
    ComponentTypeConflict {
        type_id: ComponentTypeId,
        component: &'static str,
    },
}
