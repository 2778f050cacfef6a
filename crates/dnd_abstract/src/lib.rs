//! # dnd_abstract
//!
//! The framework-agnostic core of the drag-and-drop system.
//!
//! This crate provides:
//!
//! - [`Entity`] — a reactive, uniquely identified record that registers
//!   itself with its manager's registry on the deferred tier and follows
//!   changes to its own identifier.
//! - [`EntityRegistry`] — identifier to entity mapping.
//! - [`DragDropManager`] — owns the registry and the deferred task queue.
//! - [`UniqueIdentifier`] / [`EntityKey`] — public and internal identity.

pub mod config;
pub mod entity;
pub mod error;
pub mod identifier;
pub mod manager;
pub mod registry;

pub use config::{DuplicatePolicy, ManagerConfig};
pub use entity::{Entity, EntityInput, EntityOptions, EffectsAccessor};
pub use error::{EntityError, RegistryError};
pub use identifier::{EntityKey, KeyAllocator, UniqueIdentifier};
pub use manager::DragDropManager;
pub use registry::EntityRegistry;
