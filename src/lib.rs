#![warn(clippy::undocumented_unsafe_blocks)]
#![warn(missing_docs)]

//! # Pulse ECS
//!
//! ![MIT](https://img.shields.io/badge/license-MIT-blue.svg)
//!
//! ## What is Pulse ECS?
//!
//! The entity component system at the core of the Pulse game engine. Entities are handles into a
//! [World]; components are plain serde-enabled data kept in one packed array per type.
//!
//! - Handles pair a never-reused public ID with a recycled slot index, so stale handles are detected
//!   in O(1).
//! - Removing an entity hides it immediately. Its components are destroyed, and its slot recycled,
//!   by the next [World::collect_garbage].
//! - Component types are registered up front in a [ComponentTypeRegistry] shared by every world
//!   built from it.
//! - Worlds save to and load from JSON [WorldSnapshot]s.
//!
//! ```
//! use std::sync::Arc;
//!
//! use pulse_ecs::register_builtin_components;
//! use pulse_ecs::ComponentTypeRegistry;
//! use pulse_ecs::LocalTransform;
//! use pulse_ecs::World;
//!
//! let mut registry = ComponentTypeRegistry::new();
//! register_builtin_components(&mut registry);
//! let world = World::new(Arc::new(registry));
//!
//! let entity = world.add_entity();
//! world.add(entity, LocalTransform::IDENTITY);
//! assert!(world.has_component::<LocalTransform>(entity));
//!
//! world.remove_entity(entity);
//! assert!(!world.has_component::<LocalTransform>(entity));
//!
//! world.collect_garbage();
//! assert!(!world.is_handle_valid(entity));
//! ```

pub use crate::app::Application;
pub use crate::app::ApplicationState;
pub use crate::app::Event;
pub use crate::components::register_builtin_components;
pub use crate::components::ComputedVisibility;
pub use crate::components::LocalTransform;
pub use crate::components::Parent;
pub use crate::components::Visibility;
pub use crate::components::WorldTransform;
pub use crate::config::WorldConfig;
pub use crate::entity::EntityHandle;
pub use crate::entity::EntityRemap;
pub use crate::error::ApplicationError;
pub use crate::error::EcsError;
pub use crate::error::EcsResult;
pub use crate::lookup::ComponentMask;
pub use crate::lookup::EntityComponentLookup;
pub use crate::registry::Component;
pub use crate::registry::ComponentType;
pub use crate::registry::ComponentTypeInfo;
pub use crate::registry::ComponentTypeRegistry;
pub use crate::registry::InspectFn;
pub use crate::registry::Inspector;
pub use crate::registry::TypeIndex;
pub use crate::registry::MAX_COMPONENT_TYPES;
pub use crate::serialize::WorldSnapshot;
pub use crate::serialize::SNAPSHOT_TYPE_NAME;
pub use crate::storage::ComponentStorage;
pub use crate::storage::IterationGuard;
pub use crate::storage::LinearComponentStorage;
pub use crate::storage::MovedFn;
pub use crate::world::ComponentSlot;
pub use crate::world::World;

mod app;
mod components;
mod config;
mod entity;
mod error;
mod lookup;
pub mod queries;
mod registry;
mod serialize;
mod storage;
pub mod systems;
mod world;
