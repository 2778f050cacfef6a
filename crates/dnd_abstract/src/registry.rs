//! Entity registry — maps identifiers to live entities.
//!
//! The manager keeps one registry shared by every entity it owns. Entities
//! register themselves on the deferred tier and re-register whenever their
//! identifier changes; the registry keeps a reverse index from instance key
//! to identifier so a re-registration moves the existing mapping instead of
//! leaving a stale one behind.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::config::DuplicatePolicy;
use crate::entity::Entity;
use crate::error::RegistryError;
use crate::identifier::{EntityKey, UniqueIdentifier};

/// Registry of the entities known to a manager.
pub struct EntityRegistry<T> {
    /// How a second entity claiming a held identifier is treated.
    policy: DuplicatePolicy,
    /// Entities keyed by their registered identifier.
    entries: RefCell<HashMap<UniqueIdentifier, Rc<Entity<T>>>>,
    /// Identifier each registered instance is mapped under.
    index: RefCell<HashMap<EntityKey, UniqueIdentifier>>,
}

impl<T: 'static> EntityRegistry<T> {
    /// Create an empty registry.
    #[must_use]
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            entries: RefCell::new(HashMap::new()),
            index: RefCell::new(HashMap::new()),
        }
    }

    /// Map the entity's current identifier to it.
    ///
    /// If the entity is already mapped under another identifier, that mapping
    /// is moved. Registering an entity under the identifier it already holds
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateId`] if another entity holds the
    /// identifier and the policy is [`DuplicatePolicy::Reject`].
    pub fn register(&self, entity: &Rc<Entity<T>>) -> Result<(), RegistryError> {
        let id = entity.peek_id();
        let key = entity.key();

        // Replaced entities are dropped only after the borrows are released.
        let (evicted, moved) = {
            let mut entries = self.entries.borrow_mut();
            let mut index = self.index.borrow_mut();

            if let Some(holder) = entries.get(&id) {
                let holder = holder.key();
                if holder == key {
                    return Ok(());
                }
                match self.policy {
                    DuplicatePolicy::Reject => {
                        return Err(RegistryError::DuplicateId { id, holder });
                    }
                    DuplicatePolicy::Replace => {
                        warn!(%id, evicted = %holder, by = %key, "identifier taken over");
                        index.remove(&holder);
                    }
                }
            }

            let mut moved = None;
            if let Some(previous) = index.insert(key, id.clone())
                && previous != id
                && entries.get(&previous).is_some_and(|e| e.key() == key)
            {
                moved = entries.remove(&previous).map(|_| previous);
            }
            (entries.insert(id.clone(), Rc::clone(entity)), moved)
        };
        drop(evicted);

        match moved {
            Some(from) => debug!(%key, %from, to = %id, "registration moved"),
            None => debug!(%key, %id, "entity registered"),
        }
        Ok(())
    }

    /// Remove the entity's current mapping.
    ///
    /// Returns `true` if a mapping was removed. Entities that are not mapped
    /// are ignored.
    pub fn unregister(&self, entity: &Entity<T>) -> bool {
        let key = entity.key();
        let removed = {
            let mut index = self.index.borrow_mut();
            let Some(id) = index.remove(&key) else {
                return false;
            };
            let mut entries = self.entries.borrow_mut();
            if entries.get(&id).is_some_and(|e| e.key() == key) {
                entries.remove(&id).map(|entity| (id, entity))
            } else {
                None
            }
        };

        match removed {
            Some((id, _entity)) => {
                debug!(%key, %id, "entity unregistered");
                true
            }
            None => false,
        }
    }

    /// Returns the entity registered under `id`.
    #[must_use]
    pub fn get(&self, id: &UniqueIdentifier) -> Option<Rc<Entity<T>>> {
        self.entries.borrow().get(id).cloned()
    }

    /// Returns `true` if some entity is registered under `id`.
    #[must_use]
    pub fn contains(&self, id: &UniqueIdentifier) -> bool {
        self.entries.borrow().contains_key(id)
    }

    /// Returns the identifier the entity is registered under, if any.
    #[must_use]
    pub fn id_of(&self, key: EntityKey) -> Option<UniqueIdentifier> {
        self.index.borrow().get(&key).cloned()
    }

    /// Returns the number of registered entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Returns the registered identifiers.
    #[must_use]
    pub fn ids(&self) -> Vec<UniqueIdentifier> {
        self.entries.borrow().keys().cloned().collect()
    }

    /// Returns the registered entities.
    #[must_use]
    pub fn entities(&self) -> Vec<Rc<Entity<T>>> {
        self.entries.borrow().values().cloned().collect()
    }

    /// Drop every mapping without touching the entities themselves.
    pub fn clear(&self) {
        let entries = std::mem::take(&mut *self.entries.borrow_mut());
        self.index.borrow_mut().clear();
        drop(entries);
    }
}

impl<T> std::fmt::Debug for EntityRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("policy", &self.policy)
            .field("ids", &self.entries.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}
