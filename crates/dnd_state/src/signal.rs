//! Observable value cells.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::warn;

use crate::effect::{EffectId, EffectNode, Source, current_observer};
use crate::error::StateError;

struct SignalInner<T> {
    value: RefCell<T>,
    subscribers: RefCell<Vec<(EffectId, Weak<EffectNode>)>>,
}

impl<T> Source for SignalInner<T> {
    fn unsubscribe(&self, effect: EffectId) {
        self.subscribers.borrow_mut().retain(|(id, _)| *id != effect);
    }
}

/// A reactive value.
///
/// Cloning a `Signal` yields another handle to the same cell. Reading it
/// through [`get`](Signal::get) or [`with`](Signal::with) while an effect is
/// executing subscribes that effect; writing it re-runs every subscriber
/// before the write returns.
pub struct Signal<T> {
    inner: Rc<SignalInner<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> Signal<T> {
    /// Create a signal holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(SignalInner {
                value: RefCell::new(value),
                subscribers: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Read the value by reference, subscribing the running effect.
    ///
    /// The value is borrowed for the duration of `f`; writing the same
    /// signal from inside `f` panics.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&self.inner.value.borrow())
    }

    /// Read the value by reference without subscribing anything.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Mutate the value in place and notify subscribers unconditionally.
    ///
    /// # Errors
    ///
    /// Returns the first failure raised by a re-run subscriber.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> Result<(), StateError> {
        f(&mut self.inner.value.borrow_mut());
        self.notify()
    }

    /// Returns the number of effects currently subscribed.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .borrow()
            .iter()
            .filter(|(_, node)| node.strong_count() > 0)
            .count()
    }

    fn track(&self) {
        let Some(observer) = current_observer() else {
            return;
        };
        let id = observer.id();
        {
            let mut subscribers = self.inner.subscribers.borrow_mut();
            if subscribers.iter().any(|(existing, _)| *existing == id) {
                return;
            }
            subscribers.push((id, Rc::downgrade(&observer)));
        }
        let weak = Rc::downgrade(&self.inner);
        let source: Weak<dyn Source> = weak;
        observer.add_source(source);
    }

    fn notify(&self) -> Result<(), StateError> {
        let subscribers: Vec<Rc<EffectNode>> = {
            let mut subscribers = self.inner.subscribers.borrow_mut();
            subscribers.retain(|(_, node)| node.strong_count() > 0);
            subscribers.iter().filter_map(|(_, node)| node.upgrade()).collect()
        };

        let mut first_error = None;
        for node in subscribers {
            if let Err(err) = node.execute() {
                if first_error.is_none() {
                    first_error = Some(err);
                } else {
                    warn!(effect = %node.id(), error = %err, "further effect failure during notify");
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl<T: Clone + 'static> Signal<T> {
    /// Read the value, subscribing the running effect.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Read the value without subscribing anything.
    #[must_use]
    pub fn peek(&self) -> T {
        self.with_untracked(T::clone)
    }
}

impl<T: PartialEq + 'static> Signal<T> {
    /// Store `value` and re-run subscribers. Writing a value equal to the
    /// current one does nothing.
    ///
    /// # Errors
    ///
    /// Returns the first failure raised by a re-run subscriber. The value is
    /// stored regardless.
    pub fn set(&self, value: T) -> Result<(), StateError> {
        {
            let mut current = self.inner.value.borrow_mut();
            if *current == value {
                return Ok(());
            }
            *current = value;
        }
        self.notify()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("value", &*self.inner.value.borrow())
            .field("subscribers", &self.inner.subscribers.borrow().len())
            .finish()
    }
}
