//! Registry and entity error types.

use dnd_state::StateError;

use crate::identifier::{EntityKey, UniqueIdentifier};

/// Errors raised by [`EntityRegistry`](crate::EntityRegistry).
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The identifier is held by another entity and the registry rejects
    /// duplicates.
    #[error("identifier {id} is already registered to {holder}")]
    DuplicateId {
        /// The contested identifier.
        id: UniqueIdentifier,
        /// Key of the entity currently holding it.
        holder: EntityKey,
    },
}

/// Errors surfaced by entity and manager operations.
///
/// Registry failures raised inside an effect or a deferred task are unwrapped
/// back into [`EntityError::Registry`].
#[derive(Debug, thiserror::Error)]
pub enum EntityError {
    /// A registry operation failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// An effect or deferred task failed for another reason.
    #[error(transparent)]
    State(StateError),
}

impl From<StateError> for EntityError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::Effect { effect, source } => match source.downcast::<RegistryError>() {
                Ok(registry) => Self::Registry(registry),
                Err(source) => Self::State(StateError::Effect { effect, source }),
            },
            StateError::Task(source) => match source.downcast::<RegistryError>() {
                Ok(registry) => Self::Registry(registry),
                Err(source) => Self::State(StateError::Task(source)),
            },
            other => Self::State(other),
        }
    }
}
