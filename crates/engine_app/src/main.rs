//! # engine_app: ECS demo
//!
//! Generates a world of moving boxes, registers the transform, bounds, and
//! collider systems, and drives them with the tick loop until the tick cap is
//! reached or Ctrl-C is pressed.
//!
//! ## Startup Sequence
//!
//! 1. Parse arguments and load the JSON configuration, if any.
//! 2. Register systems (fails fast on ownership or dependency errors).
//! 3. Populate the world.
//! 4. Run the tick loop, then flush pending collision windows and shut the
//!    world down.

mod collisions;
mod components;
mod config;
mod systems;
mod world;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use collisions::CollisionFeed;
use config::{AppConfig, Args};
use engine_system::{TickLoop, World};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("engine_app=info".parse()?))
        .init();

    let args = Args::parse();
    let config = AppConfig::load(&args)?;
    info!(?config, "engine starting");

    let feed = Rc::new(RefCell::new(CollisionFeed::new(
        Duration::from_millis(config.collisions.window_ms),
        config.collisions.min_depth,
    )));

    let mut world = World::new();
    systems::register(
        &mut world,
        config.world.extent,
        config.collisions.margin,
        &feed,
    )
    .context("registering systems")?;
    info!(order = ?world.update_order(), "systems registered");

    world::populate(&mut world, &config.world)?;

    let mut tick_loop = TickLoop::new(config.tick.clone(), world)?;
    let ticks = tick_loop
        .run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "cannot listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    feed.borrow_mut().finish();
    let stats = feed.borrow().stats();
    let mut world = tick_loop.into_world();
    let contacts = world
        .system::<systems::ColliderSystem>()
        .map_or(0, |s| s.contacts);
    info!(
        ticks,
        entities = world.entity_count(),
        contacts,
        batches = stats.batches,
        reported = stats.pairs,
        "simulation finished"
    );

    world.shutdown();
    info!("engine shut down");
    Ok(())
}
