//! Axis-aligned bounding box component.

use engine_component::Component;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// An axis-aligned box stored as center plus half extents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Aabb {
    pub center: Vec3,
    pub half_extents: Vec3,
}

impl Aabb {
    #[must_use]
    pub fn new(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            center,
            half_extents: half_extents.abs(),
        }
    }

    /// Box spanning two opposite corners, in any order.
    #[must_use]
    pub fn from_corners(a: Vec3, b: Vec3) -> Self {
        let min = a.min(b);
        let max = a.max(b);
        Self {
            center: (min + max) * 0.5,
            half_extents: (max - min) * 0.5,
        }
    }

    #[must_use]
    pub fn min(&self) -> Vec3 {
        self.center - self.half_extents
    }

    #[must_use]
    pub fn max(&self) -> Vec3 {
        self.center + self.half_extents
    }

    /// Overlap test. Touching faces count as intersecting.
    #[must_use]
    pub fn intersects(&self, other: &Aabb) -> bool {
        let gap = (self.center - other.center).abs();
        let reach = self.half_extents + other.half_extents;
        gap.cmple(reach).all()
    }

    #[must_use]
    pub fn contains_point(&self, point: Vec3) -> bool {
        (point - self.center).abs().cmple(self.half_extents).all()
    }

    /// Smallest box enclosing both.
    #[must_use]
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb::from_corners(self.min().min(other.min()), self.max().max(other.max()))
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::splat(0.5))
    }
}

impl Component for Aabb {
    fn type_name() -> &'static str {
        "Aabb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_corners_any_order() {
        let a = Aabb::from_corners(Vec3::new(2.0, 2.0, 2.0), Vec3::new(-2.0, 0.0, 1.0));
        assert_eq!(a.min(), Vec3::new(-2.0, 0.0, 1.0));
        assert_eq!(a.max(), Vec3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn test_intersects() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let touching = Aabb::new(Vec3::new(2.0, 0.0, 0.0), Vec3::ONE);
        let apart = Aabb::new(Vec3::new(2.5, 0.0, 0.0), Vec3::ONE);
        assert!(a.intersects(&touching));
        assert!(touching.intersects(&a));
        assert!(!a.intersects(&apart));
    }

    #[test]
    fn test_contains_point_and_union() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::new(Vec3::new(4.0, 0.0, 0.0), Vec3::ONE);
        assert!(a.contains_point(Vec3::new(1.0, -1.0, 0.5)));
        assert!(!a.contains_point(Vec3::new(1.1, 0.0, 0.0)));

        let u = a.union(&b);
        assert_eq!(u.min(), Vec3::new(-1.0, -1.0, -1.0));
        assert_eq!(u.max(), Vec3::new(5.0, 1.0, 1.0));
    }

    #[test]
    fn test_negative_extents_normalised() {
        let a = Aabb::new(Vec3::ZERO, Vec3::new(-1.0, 2.0, -3.0));
        assert_eq!(a.half_extents, Vec3::new(1.0, 2.0, 3.0));
    }
}
