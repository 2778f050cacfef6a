//! Tracked effects.
//!
//! An effect is a callback that re-runs whenever a [`Signal`](crate::Signal)
//! it read during its previous run changes. A run may return a [`Cleanup`];
//! that cleanup is invoked before the next run and on disposal.
//!
//! Each installed effect is an [`EffectNode`] record holding the callback,
//! the cleanup returned by its last run, and the signals it is currently
//! subscribed to. Subscriptions are rebuilt on every run, so an effect only
//! ever reacts to the signals its most recent run actually read.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::error::StateError;

/// Teardown returned by an effect run.
pub type Cleanup = Box<dyn FnOnce()>;

/// Outcome of one effect run.
pub type EffectResult = anyhow::Result<Option<Cleanup>>;

/// An effect callback.
pub type Effect = Box<dyn FnMut() -> EffectResult>;

/// Identifier of an installed effect, unique per thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(pub u64);

impl std::fmt::Display for EffectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Effect({})", self.0)
    }
}

thread_local! {
    /// Effects currently executing, innermost last.
    static OBSERVERS: RefCell<Vec<Rc<EffectNode>>> = const { RefCell::new(Vec::new()) };
    static NEXT_EFFECT_ID: Cell<u64> = const { Cell::new(1) };
}

/// Something an effect can be subscribed to.
pub(crate) trait Source {
    fn unsubscribe(&self, effect: EffectId);
}

/// The innermost effect currently executing, if any.
pub(crate) fn current_observer() -> Option<Rc<EffectNode>> {
    OBSERVERS.with(|stack| stack.borrow().last().cloned())
}

/// One installed effect: `{run, last_cleanup}` plus its subscriptions.
pub(crate) struct EffectNode {
    id: EffectId,
    run: RefCell<Effect>,
    cleanup: RefCell<Option<Cleanup>>,
    sources: RefCell<Vec<Weak<dyn Source>>>,
    running: Cell<bool>,
    disposed: Cell<bool>,
}

impl EffectNode {
    fn new(run: Effect) -> Rc<Self> {
        let id = NEXT_EFFECT_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            EffectId(id)
        });
        Rc::new(Self {
            id,
            run: RefCell::new(run),
            cleanup: RefCell::new(None),
            sources: RefCell::new(Vec::new()),
            running: Cell::new(false),
            disposed: Cell::new(false),
        })
    }

    pub(crate) fn id(&self) -> EffectId {
        self.id
    }

    /// Records a source this effect subscribed to during the current run.
    pub(crate) fn add_source(&self, source: Weak<dyn Source>) {
        self.sources.borrow_mut().push(source);
    }

    /// Runs the previous cleanup, then the callback, storing its new cleanup.
    pub(crate) fn execute(self: &Rc<Self>) -> Result<(), StateError> {
        if self.disposed.get() {
            return Ok(());
        }
        if self.running.get() {
            return Err(StateError::Cycle(self.id.0));
        }
        self.running.set(true);

        let previous = self.cleanup.borrow_mut().take();
        if let Some(cleanup) = previous {
            cleanup();
        }
        self.release_sources();

        OBSERVERS.with(|stack| stack.borrow_mut().push(Rc::clone(self)));
        let result = {
            let mut run = self.run.borrow_mut();
            (*run)()
        };
        OBSERVERS.with(|stack| {
            stack.borrow_mut().pop();
        });
        self.running.set(false);

        match result {
            Ok(cleanup) => {
                // Disposed from inside its own run: nothing will call this later.
                if self.disposed.get() {
                    if let Some(cleanup) = cleanup {
                        cleanup();
                    }
                } else {
                    *self.cleanup.borrow_mut() = cleanup;
                }
                Ok(())
            }
            Err(source) => Err(StateError::Effect {
                effect: self.id.0,
                source,
            }),
        }
    }

    fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        let cleanup = self.cleanup.borrow_mut().take();
        if let Some(cleanup) = cleanup {
            cleanup();
        }
        self.release_sources();
        tracing::trace!(effect = %self.id, "effect disposed");
    }

    fn release_sources(&self) {
        let sources: Vec<_> = self.sources.borrow_mut().drain(..).collect();
        for source in sources {
            if let Some(source) = source.upgrade() {
                source.unsubscribe(self.id);
            }
        }
    }
}

/// Disposer for a set of effects installed together.
///
/// Dropping the group disposes it.
#[must_use = "dropping an EffectGroup disposes its effects"]
pub struct EffectGroup {
    nodes: Vec<Rc<EffectNode>>,
}

impl EffectGroup {
    /// Runs every pending cleanup and unsubscribes every effect in the group.
    /// Calling it again is a no-op.
    pub fn dispose(&self) {
        for node in &self.nodes {
            node.dispose();
        }
    }

    /// Returns `true` once every effect in the group has been disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.nodes.iter().all(|node| node.disposed.get())
    }

    /// Returns the number of effects in the group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the group holds no effects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the identifiers of the effects in installation order.
    pub fn ids(&self) -> impl Iterator<Item = EffectId> + '_ {
        self.nodes.iter().map(|node| node.id)
    }
}

impl Drop for EffectGroup {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for EffectGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectGroup")
            .field("effects", &self.ids().collect::<Vec<_>>())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Installs `primary` followed by every effect in `extra`, running each once
/// immediately, and returns a single disposer for all of them.
///
/// # Errors
///
/// Returns the first failure of an effect's initial run. Effects installed
/// by this call before the failing one are disposed.
pub fn effects(
    primary: Effect,
    extra: impl IntoIterator<Item = Effect>,
) -> Result<EffectGroup, StateError> {
    let mut group = EffectGroup { nodes: Vec::new() };
    for run in std::iter::once(primary).chain(extra) {
        let node = EffectNode::new(run);
        group.nodes.push(Rc::clone(&node));
        // On error `group` is dropped, which disposes what was installed so far.
        node.execute()?;
    }
    Ok(group)
}

/// Installs a single effect.
///
/// # Errors
///
/// Returns the failure of the effect's initial run.
pub fn effect(run: impl FnMut() -> EffectResult + 'static) -> Result<EffectGroup, StateError> {
    effects(Box::new(run), [])
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::Signal;

    #[test]
    fn test_effect_runs_immediately() {
        let runs = Rc::new(Cell::new(0));
        let counter = Rc::clone(&runs);
        let _group = effect(move || {
            counter.set(counter.get() + 1);
            Ok(None)
        })
        .unwrap();
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn test_effect_reruns_on_tracked_write() {
        let count = Signal::new(0);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let (source, log) = (count.clone(), Rc::clone(&seen));
        let _group = effect(move || {
            log.borrow_mut().push(source.get());
            Ok(None)
        })
        .unwrap();

        count.set(1).unwrap();
        count.set(2).unwrap();
        assert_eq!(*seen.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_cleanup_runs_before_rerun() {
        let count = Signal::new(0);
        let events = Rc::new(RefCell::new(Vec::new()));

        let (source, log) = (count.clone(), Rc::clone(&events));
        let _group = effect(move || {
            let value = source.get();
            log.borrow_mut().push(format!("run {value}"));
            let log = Rc::clone(&log);
            Ok(Some(Box::new(move || log.borrow_mut().push(format!("cleanup {value}"))) as Cleanup))
        })
        .unwrap();

        count.set(1).unwrap();
        assert_eq!(*events.borrow(), vec!["run 0", "cleanup 0", "run 1"]);
    }

    #[test]
    fn test_dispose_runs_cleanup_and_stops_tracking() {
        let count = Signal::new(0);
        let runs = Rc::new(Cell::new(0));
        let cleaned = Rc::new(Cell::new(false));

        let (source, counter, flag) = (count.clone(), Rc::clone(&runs), Rc::clone(&cleaned));
        let group = effect(move || {
            source.get();
            counter.set(counter.get() + 1);
            let flag = Rc::clone(&flag);
            Ok(Some(Box::new(move || flag.set(true)) as Cleanup))
        })
        .unwrap();

        group.dispose();
        assert!(cleaned.get());
        assert!(group.is_disposed());

        count.set(5).unwrap();
        assert_eq!(runs.get(), 1);
        assert_eq!(count.subscriber_count(), 0);
    }

    #[test]
    fn test_dispose_twice_is_noop() {
        let cleanups = Rc::new(Cell::new(0));
        let counter = Rc::clone(&cleanups);
        let group = effect(move || {
            let counter = Rc::clone(&counter);
            Ok(Some(Box::new(move || counter.set(counter.get() + 1)) as Cleanup))
        })
        .unwrap();

        group.dispose();
        group.dispose();
        drop(group);
        assert_eq!(cleanups.get(), 1);
    }

    #[test]
    fn test_dropping_group_disposes() {
        let count = Signal::new(0);
        let runs = Rc::new(Cell::new(0));

        let (source, counter) = (count.clone(), Rc::clone(&runs));
        let group = effect(move || {
            source.get();
            counter.set(counter.get() + 1);
            Ok(None)
        })
        .unwrap();
        drop(group);

        count.set(1).unwrap();
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn test_dependencies_follow_last_run() {
        let use_left = Signal::new(true);
        let left = Signal::new("l0");
        let right = Signal::new("r0");
        let runs = Rc::new(Cell::new(0));

        let (flag, l, r, counter) = (use_left.clone(), left.clone(), right.clone(), Rc::clone(&runs));
        let _group = effect(move || {
            counter.set(counter.get() + 1);
            if flag.get() {
                l.get();
            } else {
                r.get();
            }
            Ok(None)
        })
        .unwrap();

        right.set("r1").unwrap();
        assert_eq!(runs.get(), 1, "right is not read yet");

        use_left.set(false).unwrap();
        assert_eq!(runs.get(), 2);

        left.set("l1").unwrap();
        assert_eq!(runs.get(), 2, "left is no longer read");

        right.set("r2").unwrap();
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn test_group_runs_all_effects_in_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let (first, second) = (Rc::clone(&order), Rc::clone(&order));

        let group = effects(
            Box::new(move || -> EffectResult {
                first.borrow_mut().push("primary");
                Ok(None)
            }),
            [Box::new(move || -> EffectResult {
                second.borrow_mut().push("extra");
                Ok(None)
            }) as Effect],
        )
        .unwrap();

        assert_eq!(group.len(), 2);
        assert_eq!(*order.borrow(), vec!["primary", "extra"]);
    }

    #[test]
    fn test_failed_initial_run_disposes_installed_effects() {
        let cleaned = Rc::new(Cell::new(false));
        let flag = Rc::clone(&cleaned);

        let result = effects(
            Box::new(move || -> EffectResult {
                let flag = Rc::clone(&flag);
                Ok(Some(Box::new(move || flag.set(true)) as Cleanup))
            }),
            [Box::new(|| -> EffectResult { Err(anyhow::anyhow!("boom")) }) as Effect],
        );

        assert!(matches!(result, Err(StateError::Effect { .. })));
        assert!(cleaned.get());
    }

    #[test]
    fn test_self_trigger_is_reported_as_cycle() {
        let count = Signal::new(0);
        let source = count.clone();
        let result = effect(move || {
            let value = source.get();
            source.set(value + 1)?;
            Ok(None)
        });

        let err = result.unwrap_err();
        match err {
            StateError::Effect { source, .. } => {
                assert!(matches!(
                    source.downcast_ref::<StateError>(),
                    Some(StateError::Cycle(_))
                ));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_write_failure_surfaces_to_writer() {
        let count = Signal::new(0);
        let source = count.clone();
        let _group = effect(move || {
            if source.get() > 1 {
                anyhow::bail!("too large");
            }
            Ok(None)
        })
        .unwrap();

        assert!(count.set(1).is_ok());
        assert!(matches!(count.set(2), Err(StateError::Effect { .. })));
    }
}
