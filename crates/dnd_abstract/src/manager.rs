//! The drag-and-drop manager.
//!
//! Owns the shared [`EntityRegistry`], the deferred [`TaskQueue`] and the
//! instance key allocator. Entities hold only a weak back-reference to their
//! manager; the manager never depends on any entity staying alive.

use std::rc::Rc;

use dnd_state::TaskQueue;
use tracing::debug;

use crate::config::ManagerConfig;
use crate::error::EntityError;
use crate::identifier::{EntityKey, KeyAllocator};
use crate::registry::EntityRegistry;

/// Coordinates the entities of one drag-and-drop context.
#[derive(Debug)]
pub struct DragDropManager<T> {
    config: ManagerConfig,
    registry: EntityRegistry<T>,
    scheduler: TaskQueue,
    keys: KeyAllocator,
}

impl<T: 'static> DragDropManager<T> {
    /// Create a manager with the given configuration.
    #[must_use]
    pub fn new(config: ManagerConfig) -> Rc<Self> {
        Rc::new(Self {
            registry: EntityRegistry::new(config.duplicate_policy),
            scheduler: TaskQueue::new(),
            keys: KeyAllocator::new(),
            config,
        })
    }

    /// Returns the configuration the manager was built with.
    #[must_use]
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Returns the entity registry.
    #[must_use]
    pub fn registry(&self) -> &EntityRegistry<T> {
        &self.registry
    }

    /// Returns the deferred task queue.
    #[must_use]
    pub fn scheduler(&self) -> &TaskQueue {
        &self.scheduler
    }

    pub(crate) fn allocate_key(&self) -> EntityKey {
        self.keys.allocate()
    }

    /// Run all deferred work, including pending entity registrations.
    ///
    /// # Errors
    ///
    /// Returns the first failing task's error; see [`TaskQueue::flush`].
    pub fn flush(&self) -> Result<usize, EntityError> {
        Ok(self.scheduler.flush()?)
    }

    /// Destroy every registered entity and empty the registry.
    ///
    /// The manager remains usable afterwards.
    pub fn destroy(&self) {
        let entities = self.registry.entities();
        debug!(count = entities.len(), "destroying registered entities");
        for entity in &entities {
            entity.destroy();
        }
        self.registry.clear();
    }
}
