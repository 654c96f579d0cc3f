//! Frame loop driving a [`World`].
//!
//! Each iteration measures the wall time since the previous tick, clamps it
//! to [`TickConfig::max_delta`], and hands it to [`World::tick`]. The blocking
//! [`TickLoop::run`] sleeps out the rest of the frame budget; the async
//! [`TickLoop::run_until`] waits on a tokio interval and stops when its
//! shutdown future resolves.

use std::future::Future;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::TickConfig;
use crate::context::Tick;
use crate::world::World;

/// Owns a world and advances it at the configured rate.
#[derive(Debug)]
pub struct TickLoop {
    config: TickConfig,
    world: World,
    last: Option<Instant>,
}

impl TickLoop {
    /// Create a loop around `world`.
    ///
    /// # Errors
    ///
    /// Fails if `config` does not validate.
    pub fn new(config: TickConfig, world: World) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            world,
            last: None,
        })
    }

    #[must_use]
    pub fn config(&self) -> &TickConfig {
        &self.config
    }

    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Consume the loop, returning the world.
    #[must_use]
    pub fn into_world(self) -> World {
        self.world
    }

    /// Returns the number of ticks run so far.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.world.tick_id()
    }

    fn finished(&self) -> bool {
        self.config.max_ticks > 0 && self.world.tick_id() >= self.config.max_ticks
    }

    /// Run one tick with an explicit delta, clamped to the configured maximum.
    ///
    /// # Errors
    ///
    /// Propagates the first system update error.
    pub fn step(&mut self, dt: Duration) -> Result<Tick> {
        let max = self.config.max_delta();
        let dt = if dt > max {
            debug!(
                dt_ms = dt.as_millis() as u64,
                max_ms = self.config.max_delta_ms,
                "frame delta clamped"
            );
            max
        } else {
            dt
        };
        let tick = self
            .world
            .tick(dt)
            .with_context(|| format!("tick {} failed", self.world.tick_id()))?;
        Ok(tick)
    }

    /// Wall time since the previous frame; the first frame uses the nominal
    /// tick duration.
    fn frame_delta(&mut self) -> Duration {
        let now = Instant::now();
        let dt = self
            .last
            .map_or_else(|| self.config.tick_duration(), |last| now - last);
        self.last = Some(now);
        dt
    }

    /// Run the blocking loop until `max_ticks` is reached. With `max_ticks`
    /// at zero this never returns unless a system fails.
    ///
    /// # Errors
    ///
    /// Propagates the first system update error.
    pub fn run(&mut self) -> Result<u64> {
        let budget = self.config.tick_duration();
        info!(
            tick_rate = self.config.tick_rate,
            max_ticks = self.config.max_ticks,
            "starting tick loop"
        );

        while !self.finished() {
            let start = Instant::now();
            let dt = self.frame_delta();
            self.step(dt)?;

            if self.finished() {
                break;
            }

            let elapsed = start.elapsed();
            if elapsed < budget {
                std::thread::sleep(budget - elapsed);
            } else {
                warn!(
                    tick_id = self.world.tick_id(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = budget.as_millis() as u64,
                    "tick exceeded time budget"
                );
            }
        }

        info!(ticks = self.world.tick_id(), "tick loop complete");
        Ok(self.world.tick_id())
    }

    /// Run the loop on a tokio interval until `shutdown` resolves or
    /// `max_ticks` is reached. Returns the number of ticks run.
    ///
    /// # Errors
    ///
    /// Propagates the first system update error.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<u64>
    where
        F: Future<Output = ()>,
    {
        let mut interval = time::interval(self.config.tick_duration());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            tick_rate = self.config.tick_rate,
            max_ticks = self.config.max_ticks,
            "starting async tick loop"
        );

        while !self.finished() {
            tokio::select! {
                () = &mut shutdown => {
                    info!(tick_id = self.world.tick_id(), "shutdown requested");
                    break;
                }
                _ = interval.tick() => {
                    let dt = self.frame_delta();
                    self.step(dt)?;
                }
            }
        }

        info!(ticks = self.world.tick_id(), "tick loop complete");
        Ok(self.world.tick_id())
    }
}

#[cfg(test)]
mod tests {
    use engine_component::{Component, EcsError, EcsResult};

    use super::*;
    use crate::System;

    struct Counter;
    impl Component for Counter {
        fn type_name() -> &'static str {
            "Counter"
        }
    }

    /// Records every delta it sees.
    #[derive(Default)]
    struct CounterSystem {
        deltas: Vec<Duration>,
    }

    impl System for CounterSystem {
        type Component = Counter;

        fn update(&mut self, _world: &mut World, tick: &Tick) -> EcsResult<()> {
            self.deltas.push(tick.dt);
            Ok(())
        }
    }

    struct Failing;
    impl Component for Failing {
        fn type_name() -> &'static str {
            "Failing"
        }
    }

    struct FailingSystem;
    impl System for FailingSystem {
        type Component = Failing;

        fn update(&mut self, world: &mut World, _tick: &Tick) -> EcsResult<()> {
            let ghost = world.create();
            world.destroy(ghost)?;
            world.destroy(ghost)
        }
    }

    fn fast_config(max_ticks: u64) -> TickConfig {
        TickConfig {
            tick_rate: 1000.0,
            ..TickConfig::default()
        }
        .with_max_ticks(max_ticks)
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = TickConfig {
            tick_rate: 0.0,
            ..TickConfig::default()
        };
        assert!(TickLoop::new(config, World::new()).is_err());
    }

    #[test]
    fn test_step_clamps_delta() {
        let mut world = World::new();
        world.add_system(CounterSystem::default()).unwrap();
        let mut tick_loop = TickLoop::new(TickConfig::default(), world).unwrap();

        let tick = tick_loop.step(Duration::from_secs(5)).unwrap();
        assert_eq!(tick.dt, Duration::from_millis(250));
        tick_loop.step(Duration::from_millis(10)).unwrap();

        let system = tick_loop.world().system::<CounterSystem>().unwrap();
        assert_eq!(
            system.deltas,
            vec![Duration::from_millis(250), Duration::from_millis(10)]
        );
    }

    #[test]
    fn test_run_limited_ticks() {
        let mut tick_loop = TickLoop::new(fast_config(5), World::new()).unwrap();
        assert_eq!(tick_loop.run().unwrap(), 5);
        assert_eq!(tick_loop.tick_id(), 5);
    }

    #[test]
    fn test_run_stops_on_system_error() {
        let mut world = World::new();
        world.add_system(FailingSystem).unwrap();
        let mut tick_loop = TickLoop::new(fast_config(5), world).unwrap();

        let err = tick_loop.run().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EcsError>(),
            Some(EcsError::UnknownEntity(_))
        ));
        assert_eq!(tick_loop.tick_id(), 1);
    }

    #[tokio::test]
    async fn test_run_until_respects_max_ticks() {
        let mut tick_loop = TickLoop::new(fast_config(3), World::new()).unwrap();
        let ticks = tick_loop
            .run_until(std::future::pending::<()>())
            .await
            .unwrap();
        assert_eq!(ticks, 3);
    }

    #[tokio::test]
    async fn test_run_until_stops_on_shutdown() {
        let mut tick_loop = TickLoop::new(TickConfig::default(), World::new()).unwrap();
        let ticks = tick_loop.run_until(std::future::ready(())).await.unwrap();
        assert!(ticks <= 1);
    }
}
