//! 3D transform component.
//!
//! [`Transform3D`] carries position, rotation, and scale. Most other spatial
//! components (bounds, colliders) derive their placement from it.

use engine_component::Component;
use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Position, rotation, and per-axis scale in world space.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Transform3D {
    pub position: Vec3,
    /// Unit quaternion.
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform3D {
    /// Origin, no rotation, unit scale.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// Model matrix (scale, then rotate, then translate).
    #[must_use]
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Map a point from local to world space.
    #[must_use]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.rotation * (self.scale * point)
    }

    #[must_use]
    pub fn translated(mut self, offset: Vec3) -> Self {
        self.position += offset;
        self
    }

    /// Advance the position by `velocity * dt` seconds.
    pub fn integrate(&mut self, velocity: Vec3, dt: f32) {
        self.position += velocity * dt;
    }
}

impl Default for Transform3D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Component for Transform3D {
    fn type_name() -> &'static str {
        "Transform3D"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_matrix() {
        assert_eq!(Transform3D::IDENTITY.to_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn test_transform_point_matches_matrix() {
        let t = Transform3D {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
            scale: Vec3::splat(2.0),
        };
        let p = Vec3::new(1.0, 0.0, 0.0);
        let expected = t.to_matrix().transform_point3(p);
        assert!(t.transform_point(p).abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn test_integrate() {
        let mut t = Transform3D::from_position(Vec3::new(1.0, 0.0, 0.0));
        t.integrate(Vec3::new(2.0, 0.0, -4.0), 0.5);
        assert_eq!(t.position, Vec3::new(2.0, 0.0, -2.0));
        assert_eq!(t.translated(Vec3::ONE).position, Vec3::new(3.0, 1.0, -1.0));
    }

    #[test]
    fn test_json_requires_every_field() {
        let json = serde_json::to_string(&Transform3D::IDENTITY).unwrap();
        let restored: Transform3D = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, Transform3D::IDENTITY);
        assert!(serde_json::from_str::<Transform3D>(r#"{"position":[0,0,0]}"#).is_err());
    }
}
