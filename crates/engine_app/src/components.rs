//! Demo-only components.

use engine_component::Component;
use engine_math::Vec3;
use serde::{Deserialize, Serialize};

/// Linear velocity in units per second.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Velocity(pub Vec3);

impl Component for Velocity {
    fn type_name() -> &'static str {
        "Velocity"
    }
}

/// Marks an entity as taking part in overlap tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Collider {
    /// Set once the entity's bounds exist.
    pub armed: bool,
    /// Overlaps reported for this entity so far.
    pub contacts: u32,
}

impl Component for Collider {
    fn type_name() -> &'static str {
        "Collider"
    }
}
