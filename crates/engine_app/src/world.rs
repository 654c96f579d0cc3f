//! Procedural population of the demo world.
//!
//! Batch insertion is just repeated `add`. Every other entity receives its
//! collider before its bounds so both resolution paths of the collider's
//! bounds request are exercised.

use anyhow::{Context, Result};
use engine_component::Entity;
use engine_math::{Aabb, Transform3D, Vec3};
use engine_system::World;
use tracing::info;

use crate::components::{Collider, Velocity};
use crate::config::WorldConfig;

/// Spawn `config.entities` moving boxes. Deterministic for a given seed.
///
/// # Errors
///
/// Fails if any `add` is rejected, which indicates a bug in the generator.
pub fn populate(world: &mut World, config: &WorldConfig) -> Result<Vec<Entity>> {
    let mut rng = fastrand::Rng::with_seed(config.seed);
    let mut spawned = Vec::with_capacity(config.entities);
    let mut colliders = 0usize;

    let mut unit = move || rng.f32() * 2.0 - 1.0;

    for i in 0..config.entities {
        let entity = world.create();
        let position = Vec3::new(unit(), unit(), unit()) * config.extent;
        let velocity = Vec3::new(unit(), unit(), unit()) * config.max_speed;
        let half = config.half_size * (0.5 + unit().abs());

        world
            .add(entity, Transform3D::from_position(position))
            .with_context(|| format!("spawning entity #{i}"))?;
        world.add(entity, Velocity(velocity))?;

        let bounds = Aabb::new(Vec3::ZERO, Vec3::splat(half));
        let with_collider = i % 3 != 2;
        if with_collider && i % 2 == 1 {
            world.add(entity, Collider::default())?;
            world.add(entity, bounds)?;
        } else {
            world.add(entity, bounds)?;
            if with_collider {
                world.add(entity, Collider::default())?;
            }
        }
        colliders += usize::from(with_collider);
        spawned.push(entity);
    }

    info!(
        entities = spawned.len(),
        colliders,
        seed = config.seed,
        "world populated"
    );
    Ok(spawned)
}
