#![forbid(unsafe_code)]

//! Lazy computed values driven by the effect graph.
//!
//! # Design
//!
//! [`Computed<T>`] owns a [`ReactiveEffect`] that runs the getter, plus a
//! [`Dep`] of its own readers. The effect is built with a scheduler, so a
//! triggered dependency never re-runs the getter directly: it only marks the
//! cached value dirty and forwards the trigger to the computed's readers. The
//! next call to [`get()`](Computed::get) recomputes.
//!
//! # Invariants
//!
//! 1. The getter does not run until the first `get()`.
//! 2. While no dependency has changed, `get()` returns the cached value
//!    without calling the getter.
//! 3. A dependency change or `invalidate()` marks the value dirty at most once
//!    per cycle; the readers are triggered on the clean → dirty edge only.
//! 4. Version increments by exactly 1 per recomputation.
//!
//! # Failure Modes
//!
//! - **Getter panics**: the cached value remains from the last successful
//!   computation and the dirty flag stays set, so the next `get()` retries.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::dep::{Dep, track_effects, trigger_effects};
use crate::effect::{EffectOptions, ReactiveEffect};

struct ComputedInner<T> {
    /// Cached result (None only before first computation).
    cached: RefCell<Option<T>>,
    /// Whether the cached value is stale.
    dirty: Cell<bool>,
    /// Bumped on each recomputation.
    version: Cell<u64>,
    /// Effects that read this computed value.
    dep: Dep,
    effect: ReactiveEffect,
}

impl<T> Drop for ComputedInner<T> {
    fn drop(&mut self) {
        self.effect.stop();
    }
}

/// A lazily-evaluated, memoized value derived from reactive reads.
///
/// Cloning a `Computed` creates a new handle to the **same** inner state.
pub struct Computed<T> {
    inner: Rc<ComputedInner<T>>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Computed");
        match self.inner.cached.try_borrow() {
            Ok(cached) => s.field("cached", &*cached),
            Err(_) => s.field("cached", &"<computing>"),
        };
        s.field("dirty", &self.inner.dirty.get())
            .field("version", &self.inner.version.get())
            .finish()
    }
}

/// Create a computed value from a getter.
pub fn computed<T: Clone + 'static>(getter: impl Fn() -> T + 'static) -> Computed<T> {
    Computed::new(getter)
}

impl<T: Clone + 'static> Computed<T> {
    pub fn new(getter: impl Fn() -> T + 'static) -> Self {
        let inner = Rc::new_cyclic(|weak: &Weak<ComputedInner<T>>| {
            let work_target = Weak::clone(weak);
            let work = move || {
                let value = getter();
                if let Some(inner) = work_target.upgrade() {
                    *inner.cached.borrow_mut() = Some(value);
                }
            };

            let sched_target = Weak::clone(weak);
            let scheduler = move || {
                let Some(inner) = sched_target.upgrade() else {
                    return;
                };
                if !inner.dirty.replace(true) {
                    trigger_effects(&inner.dep);
                }
            };

            ComputedInner {
                cached: RefCell::new(None),
                dirty: Cell::new(true),
                version: Cell::new(0),
                dep: Dep::new(),
                effect: ReactiveEffect::new(work, EffectOptions::new().scheduler(scheduler)),
            }
        });
        Self { inner }
    }

    fn refresh(&self) {
        track_effects(&self.inner.dep);
        if self.inner.dirty.get() || self.inner.cached.borrow().is_none() {
            self.inner.effect.run();
            self.inner.dirty.set(false);
            self.inner.version.set(self.inner.version.get() + 1);
        }
    }

    /// Get the current value, recomputing first if stale.
    ///
    /// Reading inside an effect subscribes that effect to this value.
    #[must_use]
    pub fn get(&self) -> T {
        self.refresh();
        self.inner
            .cached
            .borrow()
            .as_ref()
            .expect("cached is always Some after refresh")
            .clone()
    }

    /// Access the current value by reference without cloning.
    ///
    /// # Panics
    ///
    /// Panics if the closure re-enters `get()` on the same `Computed`
    /// while it is stale.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.refresh();
        let cached = self.inner.cached.borrow();
        f(cached.as_ref().expect("cached is always Some after refresh"))
    }

    /// Whether the cached value is stale.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }

    /// Force invalidation. The next `get()` recomputes.
    ///
    /// Readers are triggered when this flips a clean value dirty.
    pub fn invalidate(&self) {
        if !self.inner.dirty.replace(true) {
            trigger_effects(&self.inner.dep);
        }
    }

    /// Number of recomputations so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
