//! # dnd_state
//!
//! Reactive primitives for the drag-and-drop framework.
//!
//! This crate provides:
//!
//! - [`Signal`] — an observable value cell. Reads inside an effect subscribe
//!   that effect; writes re-run subscribers synchronously.
//! - [`effects`] — installs tracked effects and returns one [`EffectGroup`]
//!   disposer for all of them.
//! - [`TaskQueue`] — the deferred (microtask) tier, drained FIFO after the
//!   current synchronous work.
//!
//! Everything here is single-threaded: handles are `Rc`-based and not `Send`.

pub mod effect;
pub mod error;
pub mod scheduler;
pub mod signal;

pub use effect::{Cleanup, Effect, EffectGroup, EffectId, EffectResult, effect, effects};
pub use error::StateError;
pub use scheduler::{Task, TaskQueue};
pub use signal::Signal;
