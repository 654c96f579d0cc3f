//! # engine_system
//!
//! The runtime half of the ECS: systems, their scheduling, and the world that
//! ties entities, components, and systems together.
//!
//! - [`System`]: owns one component type, declares dependencies, and reacts
//!   to lifecycle hooks plus a per-tick update.
//! - [`World`]: entity lifecycle, component access, pending component
//!   requests (`get_async`), entity-scoped events, and the tick.
//! - [`scheduler`]: dependency ordering over registered systems.
//! - [`TickLoop`]: fixed-rate frame loop, blocking or on tokio.
//!
//! ## Usage
//!
//! ```rust
//! use engine_component::Component;
//! use engine_system::{System, World};
//!
//! struct Health(u32);
//! impl Component for Health {
//!     fn type_name() -> &'static str { "Health" }
//! }
//!
//! struct HealthSystem;
//! impl System for HealthSystem {
//!     type Component = Health;
//! }
//!
//! let mut world = World::new();
//! world.add_system(HealthSystem).unwrap();
//! let e = world.create();
//! world.add(e, Health(10)).unwrap();
//! assert_eq!(world.get::<Health>(e).map(|h| h.0), Some(10));
//! ```

pub mod config;
pub mod context;
pub mod events;
pub mod pending;
pub mod registry;
pub mod runner;
pub mod scheduler;
pub mod system;
pub mod world;

pub use config::TickConfig;
pub use context::Tick;
pub use events::{EventHandler, EventSubscription};
pub use pending::Resolution;
pub use registry::SystemRegistry;
pub use runner::TickLoop;
pub use system::{System, SystemId};
pub use world::World;
