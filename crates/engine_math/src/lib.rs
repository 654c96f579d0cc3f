//! # engine_math
//!
//! Spatial components for the ECS. Re-exports [`glam`] for linear algebra and
//! defines [`Transform3D`] and [`Aabb`], both implementing
//! [`Component`](engine_component::Component).

pub mod bounds;
pub mod transform;

pub use glam::{Mat4, Quat, Vec3};

pub use bounds::Aabb;
pub use transform::Transform3D;
