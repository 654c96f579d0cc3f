//! # engine_component
//!
//! The "E" and "C" in ECS: entity handles, the component contract, and the
//! storage that owns every component instance.
//!
//! This crate provides:
//!
//! - [`Component`] trait and its stable [`ComponentTypeId`] tag.
//! - [`Entity`]: generational `u64` handles.
//! - [`EntityRegistry`]: allocation, recycling, and per-entity type sets.
//! - [`ComponentStore`]: dense per-type columns keyed by entity.
//! - [`Query`]: typed, read-only multi-component access.
//! - [`EcsError`]: the structural/configuration error taxonomy.

pub mod component;
pub mod entity;
pub mod error;
pub mod query;
pub mod storage;

pub use component::{Component, ComponentTypeId};
pub use entity::{Entity, EntityAllocator, EntityRegistry};
pub use error::{EcsError, EcsResult};
pub use query::{Query, matching_entities};
pub use storage::{AnyColumn, Column, ComponentStore};
