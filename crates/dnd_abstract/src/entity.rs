//! The base lifecycle unit of the drag-and-drop system.
//!
//! An [`Entity`] is a reactive record with an identifier, an optional data
//! payload and a disabled flag. Constructing one assigns those fields right
//! away but touches the registry only on the manager's deferred tier, so the
//! caller can finish configuring it before it becomes visible to lookups.
//!
//! ## Lifecycle
//!
//! 1. [`Entity::new`] sets the fields and queues the deferred registration.
//! 2. When the queue is flushed the entity registers itself (unless
//!    [`EntityOptions::register`] is `false`), installs its identity effect
//!    plus any extra effects, and arms its teardown.
//! 3. Each change of the identifier moves the registration to the new value.
//! 4. [`Entity::destroy`] unregisters the entity and disposes its effects.
//!
//! Calling [`Entity::destroy`] before step 2 does nothing: the deferred
//! registration still happens afterwards.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use dnd_state::{Cleanup, Effect, EffectResult, Signal};
use tracing::debug;

use crate::error::EntityError;
use crate::identifier::{EntityKey, UniqueIdentifier};
use crate::manager::DragDropManager;

/// Produces extra effects to install alongside the identity effect.
pub type EffectsAccessor = Box<dyn FnOnce() -> Vec<Effect>>;

type Teardown = Rc<dyn Fn()>;

/// Construction options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityOptions {
    /// Register with the manager's registry on the deferred tier.
    pub register: bool,
}

impl Default for EntityOptions {
    fn default() -> Self {
        Self { register: true }
    }
}

/// Initial properties of an [`Entity`].
pub struct EntityInput<T> {
    pub id: UniqueIdentifier,
    pub data: Option<T>,
    pub disabled: bool,
    pub options: EntityOptions,
    pub effects: Option<EffectsAccessor>,
}

impl<T> EntityInput<T> {
    /// Input with the given identifier and defaults for everything else.
    #[must_use]
    pub fn new(id: impl Into<UniqueIdentifier>) -> Self {
        Self {
            id: id.into(),
            data: None,
            disabled: false,
            options: EntityOptions::default(),
            effects: None,
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: T) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: EntityOptions) -> Self {
        self.options = options;
        self
    }

    /// Skip automatic registration.
    #[must_use]
    pub fn without_registration(self) -> Self {
        self.with_options(EntityOptions { register: false })
    }

    /// Extra effects, produced when the deferred registration runs.
    #[must_use]
    pub fn with_effects(mut self, effects: impl FnOnce() -> Vec<Effect> + 'static) -> Self {
        self.effects = Some(Box::new(effects));
        self
    }
}

impl<T> std::fmt::Debug for EntityInput<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityInput")
            .field("id", &self.id)
            .field("has_data", &self.data.is_some())
            .field("disabled", &self.disabled)
            .field("options", &self.options)
            .field("has_effects", &self.effects.is_some())
            .finish()
    }
}

/// A reactive, uniquely identified unit managed by a [`DragDropManager`].
pub struct Entity<T> {
    key: EntityKey,
    id: Signal<UniqueIdentifier>,
    data: Signal<Option<T>>,
    disabled: Signal<bool>,
    manager: Weak<DragDropManager<T>>,
    /// Installed once the deferred registration has run.
    teardown: RefCell<Option<Teardown>>,
}

impl<T: 'static> Entity<T> {
    /// Create an entity owned by `manager`.
    ///
    /// Fields are readable as soon as this returns. Registration, the
    /// identity effect and the teardown are set up by a task queued on the
    /// manager's scheduler.
    #[must_use]
    pub fn new(input: EntityInput<T>, manager: &Rc<DragDropManager<T>>) -> Rc<Self> {
        let EntityInput {
            id,
            data,
            disabled,
            options,
            effects,
        } = input;
        let baseline = id.clone();

        let entity = Rc::new(Self {
            key: manager.allocate_key(),
            id: Signal::new(id),
            data: Signal::new(data),
            disabled: Signal::new(disabled),
            manager: Rc::downgrade(manager),
            teardown: RefCell::new(None),
        });
        debug!(key = %entity.key, id = %baseline, "entity constructed, registration deferred");

        let pending = Rc::clone(&entity);
        manager
            .scheduler()
            .queue(move || pending.arm(baseline, options, effects));
        entity
    }

    /// Deferred half of construction.
    fn arm(
        self: &Rc<Self>,
        baseline: UniqueIdentifier,
        options: EntityOptions,
        effects: Option<EffectsAccessor>,
    ) -> anyhow::Result<()> {
        let Some(manager) = self.manager.upgrade() else {
            debug!(key = %self.key, "manager dropped before deferred registration");
            return Ok(());
        };

        if options.register {
            manager.registry().register(self)?;
        }

        let extra = effects.map(|produce| produce()).unwrap_or_default();
        let group = dnd_state::effects(self.identity_effect(baseline), extra)?;

        let entity = Rc::downgrade(self);
        let owner = self.manager.clone();
        let teardown: Teardown = Rc::new(move || {
            if let (Some(entity), Some(manager)) = (entity.upgrade(), owner.upgrade()) {
                manager.registry().unregister(&entity);
            }
            group.dispose();
        });
        *self.teardown.borrow_mut() = Some(teardown);

        debug!(key = %self.key, registered = options.register, "entity armed");
        Ok(())
    }

    /// Moves the registration whenever the identifier changes.
    ///
    /// The first run sees the construction-time identifier and does nothing:
    /// the deferred registration already covered it.
    fn identity_effect(self: &Rc<Self>, baseline: UniqueIdentifier) -> Effect {
        let entity = Rc::downgrade(self);
        let mut previous = baseline;

        Box::new(move || -> EffectResult {
            let Some(entity) = entity.upgrade() else {
                return Ok(None);
            };
            // Read before branching so the subscription survives no-op runs.
            let current = entity.id.get();
            if current == previous {
                return Ok(None);
            }
            let Some(manager) = entity.manager.upgrade() else {
                return Ok(None);
            };

            // Advance before registering: the prior cleanup already dropped the
            // old mapping, so a rejected value still counts as observed.
            let from = std::mem::replace(&mut previous, current.clone());
            manager.registry().register(&entity)?;
            debug!(key = %entity.key, %from, to = %current, "identifier changed");

            let registered = Rc::downgrade(&entity);
            let owner = entity.manager.clone();
            let cleanup: Cleanup = Box::new(move || {
                if let (Some(entity), Some(manager)) = (registered.upgrade(), owner.upgrade()) {
                    manager.registry().unregister(&entity);
                }
            });
            Ok(Some(cleanup))
        })
    }

    /// Tear the entity down: unregister it and dispose its effects.
    ///
    /// Before the deferred registration has run this is a no-op.
    pub fn destroy(&self) {
        let teardown = self.teardown.borrow().clone();
        match teardown {
            Some(teardown) => {
                teardown();
                debug!(key = %self.key, "entity destroyed");
            }
            None => debug!(key = %self.key, "destroy before deferred registration ignored"),
        }
    }

    /// Returns `true` once the deferred registration has installed the
    /// teardown.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.teardown.borrow().is_some()
    }

    /// The instance key; stable across identifier changes.
    #[must_use]
    pub fn key(&self) -> EntityKey {
        self.key
    }

    /// The current identifier. Tracked when read inside an effect.
    pub fn id(&self) -> UniqueIdentifier {
        self.id.get()
    }

    /// The current identifier, without tracking.
    #[must_use]
    pub fn peek_id(&self) -> UniqueIdentifier {
        self.id.peek()
    }

    /// Change the identifier. Once armed, the registration follows.
    ///
    /// # Errors
    ///
    /// Returns the registry's refusal of the new identifier, or any other
    /// failure raised by an effect subscribed to the identifier.
    pub fn set_id(&self, id: impl Into<UniqueIdentifier>) -> Result<(), EntityError> {
        Ok(self.id.set(id.into())?)
    }

    /// Read the data payload by reference. Tracked when read inside an effect.
    ///
    /// The payload is borrowed for the duration of `f`; calling
    /// [`set_data`](Entity::set_data) from inside `f` panics.
    pub fn with_data<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        self.data.with(|data| f(data.as_ref()))
    }

    /// Replace the data payload.
    ///
    /// # Errors
    ///
    /// Returns the failure of an effect subscribed to the payload.
    pub fn set_data(&self, data: Option<T>) -> Result<(), EntityError> {
        Ok(self.data.update(|slot| *slot = data)?)
    }

    /// Whether the entity is disabled. Tracked when read inside an effect.
    pub fn disabled(&self) -> bool {
        self.disabled.get()
    }

    /// Enable or disable the entity.
    ///
    /// # Errors
    ///
    /// Returns the failure of an effect subscribed to the flag.
    pub fn set_disabled(&self, disabled: bool) -> Result<(), EntityError> {
        Ok(self.disabled.set(disabled)?)
    }

    /// The owning manager, if it is still alive.
    #[must_use]
    pub fn manager(&self) -> Option<Rc<DragDropManager<T>>> {
        self.manager.upgrade()
    }
}

impl<T: Clone + 'static> Entity<T> {
    /// A copy of the data payload. Tracked when read inside an effect.
    pub fn data(&self) -> Option<T> {
        self.data.get()
    }
}

impl<T> std::fmt::Debug for Entity<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entity")
            .field("key", &self.key)
            .field("armed", &self.teardown.borrow().is_some())
            .finish_non_exhaustive()
    }
}
