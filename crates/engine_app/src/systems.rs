//! Demo systems: motion, bounds, and naive collision.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use engine_component::{Component, ComponentTypeId, EcsResult, Entity};
use engine_math::{Aabb, Transform3D, Vec3};
use engine_system::{EventSubscription, System, Tick, World};
use tracing::{debug, trace};

use crate::collisions::{COLLISION_EVENT, Collision, CollisionFeed};
use crate::components::{Collider, Velocity};

/// Owns [`Velocity`]. Pure data; integration happens in [`TransformSystem`].
pub struct VelocitySystem;

impl System for VelocitySystem {
    type Component = Velocity;
}

/// Owns [`Transform3D`] and integrates velocity, bouncing off the walls of a
/// cube of half-size `extent`.
pub struct TransformSystem {
    pub extent: f32,
}

impl System for TransformSystem {
    type Component = Transform3D;

    fn dependencies(&self) -> Vec<ComponentTypeId> {
        vec![Velocity::component_type_id()]
    }

    fn update(&mut self, world: &mut World, tick: &Tick) -> EcsResult<()> {
        let dt = tick.dt_secs();
        let extent = self.extent;
        let types = [
            Transform3D::component_type_id(),
            Velocity::component_type_id(),
        ];
        world.traverse_entities_with(&types, |world, entity| {
            let Some(Velocity(mut velocity)) = world.get::<Velocity>(entity).copied() else {
                return;
            };
            let Some(transform) = world.get_mut::<Transform3D>(entity) else {
                return;
            };
            transform.integrate(velocity, dt);

            let bound = Vec3::splat(extent);
            let outside = transform.position.abs().cmpgt(bound);
            if outside.any() {
                transform.position = transform.position.clamp(-bound, bound);
                velocity = Vec3::select(outside, -velocity, velocity);
                if let Some(v) = world.get_mut::<Velocity>(entity) {
                    v.0 = velocity;
                }
            }
        });
        Ok(())
    }
}

/// Owns [`Aabb`]. Keeps each box centered on its entity's transform.
pub struct BoundsSystem {
    /// Added to every half extent in overlap tests.
    pub margin: f32,
}

impl BoundsSystem {
    /// `aabb` grown by the margin.
    #[must_use]
    pub fn inflated(&self, aabb: &Aabb) -> Aabb {
        Aabb::new(aabb.center, aabb.half_extents + Vec3::splat(self.margin))
    }
}

impl System for BoundsSystem {
    type Component = Aabb;

    fn dependencies(&self) -> Vec<ComponentTypeId> {
        vec![Transform3D::component_type_id()]
    }

    fn add(&mut self, world: &mut World, entity: Entity) {
        let Some(position) = world.get::<Transform3D>(entity).map(|t| t.position) else {
            return;
        };
        if let Some(aabb) = world.get_mut::<Aabb>(entity) {
            aabb.center = position;
        }
    }

    fn update(&mut self, world: &mut World, _tick: &Tick) -> EcsResult<()> {
        let types = [Aabb::component_type_id(), Transform3D::component_type_id()];
        world.traverse_entities_with(&types, |world, entity| {
            let Some(position) = world.get::<Transform3D>(entity).map(|t| t.position) else {
                return;
            };
            if let Some(aabb) = world.get_mut::<Aabb>(entity) {
                aabb.center = position;
            }
        });
        Ok(())
    }
}

/// Owns [`Collider`]. Tests every armed pair for overlap once per tick and
/// raises a collision event on both entities.
pub struct ColliderSystem {
    feed: Rc<RefCell<CollisionFeed>>,
    subscriptions: HashMap<Entity, EventSubscription>,
    /// Overlaps detected since start.
    pub contacts: u64,
}

impl ColliderSystem {
    #[must_use]
    pub fn new(feed: Rc<RefCell<CollisionFeed>>) -> Self {
        Self {
            feed,
            subscriptions: HashMap::new(),
            contacts: 0,
        }
    }
}

impl System for ColliderSystem {
    type Component = Collider;

    fn dependencies(&self) -> Vec<ComponentTypeId> {
        vec![Aabb::component_type_id()]
    }

    fn add(&mut self, world: &mut World, entity: Entity) {
        let feed = Rc::clone(&self.feed);
        let subscription =
            world.subscribe_event(entity, COLLISION_EVENT, move |world, entity, payload| {
                let Some(collision) = payload.downcast_ref::<Collision>() else {
                    return;
                };
                if let Some(collider) = world.get_mut::<Collider>(entity) {
                    collider.contacts += 1;
                }
                if collision.a == entity {
                    feed.borrow_mut().observe(collision, world.elapsed());
                }
            });
        if let Some(stale) = self.subscriptions.insert(entity, subscription) {
            world.unsubscribe_event(&stale);
        }

        // Bounds may be added after the collider; arm it once they exist.
        let resolution = world.get_async::<Aabb>(entity, |world, entity| {
            if let Some(collider) = world.get_mut::<Collider>(entity) {
                collider.armed = true;
            }
        });
        debug!(entity = %entity, ?resolution, "collider registered");
    }

    fn remove(&mut self, world: &mut World, entity: Entity, _component: &mut Collider) {
        if let Some(subscription) = self.subscriptions.remove(&entity) {
            world.unsubscribe_event(&subscription);
        }
    }

    fn update(&mut self, world: &mut World, tick: &Tick) -> EcsResult<()> {
        self.feed.borrow_mut().poll(tick.elapsed);

        let Some(bounds) = world.owner_system::<BoundsSystem>(Aabb::component_type_id()) else {
            return Ok(());
        };
        let mut boxes = Vec::new();
        world.traverse::<(Collider, Aabb)>(|entity, (collider, aabb)| {
            if collider.armed {
                boxes.push((entity, bounds.inflated(aabb)));
            }
        });

        let mut hits = Vec::new();
        for (i, (a, box_a)) in boxes.iter().enumerate() {
            for (b, box_b) in &boxes[i + 1..] {
                if box_a.intersects(box_b) {
                    let overlap = (box_a.half_extents + box_b.half_extents)
                        - (box_a.center - box_b.center).abs();
                    hits.push(Collision {
                        a: *a,
                        b: *b,
                        depth: overlap.min_element(),
                    });
                }
            }
        }

        for collision in &hits {
            world.send_event(collision.a, COLLISION_EVENT, collision);
            world.send_event(collision.b, COLLISION_EVENT, collision);
        }
        self.contacts += hits.len() as u64;
        trace!(tick_id = tick.tick_id, pairs = hits.len(), "overlap pass");
        Ok(())
    }
}

/// Register every demo system.
///
/// # Errors
///
/// Fails only on an ownership or dependency misconfiguration.
pub fn register(
    world: &mut World,
    extent: f32,
    margin: f32,
    feed: &Rc<RefCell<CollisionFeed>>,
) -> EcsResult<()> {
    world.add_system(ColliderSystem::new(Rc::clone(feed)))?;
    world.add_system(BoundsSystem { margin })?;
    world.add_system(TransformSystem { extent })?;
    world.add_system(VelocitySystem)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn demo_world() -> (World, Rc<RefCell<CollisionFeed>>) {
        let feed = Rc::new(RefCell::new(CollisionFeed::new(
            Duration::from_millis(100),
            0.0,
        )));
        let mut world = World::new();
        register(&mut world, 10.0, 0.0, &feed).unwrap();
        (world, feed)
    }

    fn spawn(world: &mut World, at: Vec3, velocity: Vec3, collider_first: bool) -> Entity {
        let e = world.create();
        world.add(e, Transform3D::from_position(at)).unwrap();
        world.add(e, Velocity(velocity)).unwrap();
        if collider_first {
            world.add(e, Collider::default()).unwrap();
            world.add(e, Aabb::default()).unwrap();
        } else {
            world.add(e, Aabb::default()).unwrap();
            world.add(e, Collider::default()).unwrap();
        }
        e
    }

    #[test]
    fn test_update_order_follows_dependencies() {
        let (world, _) = demo_world();
        assert_eq!(
            world.update_order(),
            vec!["Velocity", "Transform3D", "Aabb", "Collider"]
        );
    }

    #[test]
    fn test_bounds_copy_position_on_add() {
        let (mut world, _) = demo_world();
        let e = spawn(&mut world, Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO, false);
        assert_eq!(world.get::<Aabb>(e).map(|a| a.center), Some(Vec3::new(1.0, 2.0, 3.0)));
    }

    #[test]
    fn test_collider_armed_regardless_of_add_order() {
        let (mut world, _) = demo_world();
        let early = spawn(&mut world, Vec3::ZERO, Vec3::ZERO, true);
        let late = spawn(&mut world, Vec3::X * 5.0, Vec3::ZERO, false);
        assert!(world.get::<Collider>(early).is_some_and(|c| c.armed));
        assert!(world.get::<Collider>(late).is_some_and(|c| c.armed));
        assert_eq!(world.pending_count(), 0);
    }

    #[test]
    fn test_collider_without_bounds_waits() {
        let (mut world, _) = demo_world();
        let e = world.create();
        world.add(e, Collider::default()).unwrap();
        assert!(world.get::<Collider>(e).is_some_and(|c| !c.armed));
        assert_eq!(world.pending_count(), 1);

        world.destroy(e).unwrap();
        assert_eq!(world.pending_count(), 0);
    }

    #[test]
    fn test_motion_and_bounds_follow_velocity() {
        let (mut world, _) = demo_world();
        let e = spawn(&mut world, Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), false);
        world.tick(Duration::from_millis(500)).unwrap();

        assert_eq!(
            world.get::<Transform3D>(e).map(|t| t.position),
            Some(Vec3::new(1.0, 0.0, 0.0))
        );
        assert_eq!(world.get::<Aabb>(e).map(|a| a.center), Some(Vec3::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn test_wall_bounce_reverses_velocity() {
        let (mut world, _) = demo_world();
        let e = spawn(&mut world, Vec3::new(9.5, 0.0, 0.0), Vec3::new(4.0, 0.0, 0.0), false);
        world.tick(Duration::from_millis(250)).unwrap();

        assert_eq!(world.get::<Transform3D>(e).map(|t| t.position.x), Some(10.0));
        assert_eq!(world.get::<Velocity>(e).map(|v| v.0.x), Some(-4.0));
    }

    #[test]
    fn test_overlaps_raise_events_and_feed_windows() {
        let (mut world, feed) = demo_world();
        let a = spawn(&mut world, Vec3::ZERO, Vec3::ZERO, false);
        let b = spawn(&mut world, Vec3::new(0.5, 0.0, 0.0), Vec3::ZERO, true);
        let far = spawn(&mut world, Vec3::new(5.0, 0.0, 0.0), Vec3::ZERO, false);

        world.tick(Duration::from_millis(16)).unwrap();
        assert_eq!(world.get::<Collider>(a).map(|c| c.contacts), Some(1));
        assert_eq!(world.get::<Collider>(b).map(|c| c.contacts), Some(1));
        assert_eq!(world.get::<Collider>(far).map(|c| c.contacts), Some(0));
        assert_eq!(world.system::<ColliderSystem>().map(|s| s.contacts), Some(1));
        assert_eq!(feed.borrow().pending(), 1);

        for _ in 0..10 {
            world.tick(Duration::from_millis(16)).unwrap();
        }
        let stats = feed.borrow().stats();
        assert!(stats.batches >= 1);
        assert!(stats.pairs >= 6);
    }

    #[test]
    fn test_readded_collider_counts_each_contact_once() {
        let (mut world, feed) = demo_world();
        let a = spawn(&mut world, Vec3::ZERO, Vec3::ZERO, false);
        let b = spawn(&mut world, Vec3::new(0.5, 0.0, 0.0), Vec3::ZERO, false);

        world.remove::<Collider>(a).unwrap();
        world.add(a, Collider::default()).unwrap();
        world.tick(Duration::from_millis(16)).unwrap();

        assert_eq!(world.get::<Collider>(a).map(|c| c.contacts), Some(1));
        assert_eq!(world.get::<Collider>(b).map(|c| c.contacts), Some(1));
        assert_eq!(feed.borrow().pending(), 1);

        world.remove::<Collider>(a).unwrap();
        world.tick(Duration::from_millis(16)).unwrap();
        assert_eq!(world.send_event(a, COLLISION_EVENT, &0u8), 0);
    }
}
