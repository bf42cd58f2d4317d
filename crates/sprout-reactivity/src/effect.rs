#![forbid(unsafe_code)]

//! Computation units ("effects").
//!
//! A [`ReactiveEffect`] wraps a work function. Running it makes it the active
//! effect, so every reactive read inside the work function subscribes it to
//! the read's dependency. When one of those dependencies triggers, the effect
//! either re-runs directly or hands control to its scheduler.
//!
//! # Design
//!
//! Active effects form a stack. [`ReactiveEffect::run`] pushes the effect and
//! enables tracking; a drop guard pops it again and restores whatever tracking
//! state the outer frame had, even if the work function panics. Reads outside
//! any run never register a dependency, and reads during a nested run
//! attribute to the innermost effect.
//!
//! # Invariants
//!
//! 1. A stopped effect is in no dep and its reverse list is empty.
//! 2. The stop hook runs at most once.
//! 3. Running a stopped effect calls the work function without tracking.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;

use crate::dep::Dep;

static NEXT_EFFECT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of an effect inside dependency sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(u64);

impl EffectId {
    fn next() -> Self {
        Self(NEXT_EFFECT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

type Scheduler = Rc<dyn Fn()>;
type StopHook = Box<dyn FnOnce()>;

/// Construction options for [`ReactiveEffect`].
#[derive(Default)]
pub struct EffectOptions {
    scheduler: Option<Scheduler>,
    on_stop: Option<StopHook>,
}

impl EffectOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Called instead of re-running when a dependency triggers.
    #[must_use]
    pub fn scheduler(mut self, scheduler: impl Fn() + 'static) -> Self {
        self.scheduler = Some(Rc::new(scheduler));
        self
    }

    /// Called once when the effect is stopped.
    #[must_use]
    pub fn on_stop(mut self, hook: impl FnOnce() + 'static) -> Self {
        self.on_stop = Some(Box::new(hook));
        self
    }
}

impl fmt::Debug for EffectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectOptions")
            .field("scheduler", &self.scheduler.is_some())
            .field("on_stop", &self.on_stop.is_some())
            .finish()
    }
}

struct EffectInner {
    id: EffectId,
    work: Box<dyn Fn()>,
    active: Cell<bool>,
    /// Nesting depth of in-progress runs.
    running: Cell<u32>,
    scheduler: Option<Scheduler>,
    on_stop: RefCell<Option<StopHook>>,
    deps: RefCell<SmallVec<[Dep; 4]>>,
}

/// A re-runnable unit of work tracked against the dependencies it reads.
///
/// Cloning a `ReactiveEffect` creates a new handle to the **same** effect.
/// Dependency sets hold strong handles, so an effect stays alive while it is
/// subscribed to anything; call [`stop`](Self::stop) to release it.
#[derive(Clone)]
pub struct ReactiveEffect {
    inner: Rc<EffectInner>,
}

impl ReactiveEffect {
    /// Create an effect without running it.
    pub fn new(work: impl Fn() + 'static, options: EffectOptions) -> Self {
        Self {
            inner: Rc::new(EffectInner {
                id: EffectId::next(),
                work: Box::new(work),
                active: Cell::new(true),
                running: Cell::new(0),
                scheduler: options.scheduler,
                on_stop: RefCell::new(options.on_stop),
                deps: RefCell::new(SmallVec::new()),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> EffectId {
        self.inner.id
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.running.get() > 0
    }

    #[must_use]
    pub fn has_scheduler(&self) -> bool {
        self.inner.scheduler.is_some()
    }

    /// Number of deps this effect is subscribed to.
    #[must_use]
    pub fn dep_count(&self) -> usize {
        self.inner.deps.borrow().len()
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Non-owning handle, for jobs that must not keep the effect alive.
    #[must_use]
    pub fn downgrade(&self) -> WeakEffect {
        WeakEffect {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Execute the work function with this effect as the tracking context.
    pub fn run(&self) {
        if !self.is_active() {
            (self.inner.work)();
            return;
        }
        let _frame = ActiveFrame::enter(self);
        (self.inner.work)();
    }

    /// Replace the stop hook.
    pub fn set_on_stop(&self, hook: impl FnOnce() + 'static) {
        *self.inner.on_stop.borrow_mut() = Some(Box::new(hook));
    }

    /// Run the stop hook, unsubscribe from every dep, and deactivate.
    ///
    /// Idempotent.
    pub fn stop(&self) {
        if !self.is_active() {
            return;
        }
        let hook = self.inner.on_stop.borrow_mut().take();
        if let Some(hook) = hook {
            hook();
        }
        self.cleanup();
        self.inner.active.set(false);
    }

    fn cleanup(&self) {
        let deps = std::mem::take(&mut *self.inner.deps.borrow_mut());
        for dep in &deps {
            dep.remove(self.id());
        }
    }

    pub(crate) fn record_dep(&self, dep: Dep) {
        self.inner.deps.borrow_mut().push(dep);
    }

    /// React to a triggered dependency: schedule if a scheduler is set,
    /// otherwise run now.
    pub(crate) fn notify(&self) {
        match &self.inner.scheduler {
            Some(scheduler) => scheduler(),
            None => self.run(),
        }
    }
}

impl fmt::Debug for ReactiveEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveEffect")
            .field("id", &self.inner.id)
            .field("active", &self.is_active())
            .field("running", &self.is_running())
            .field("deps", &self.dep_count())
            .finish()
    }
}

/// Weak counterpart of [`ReactiveEffect`].
#[derive(Clone, Default)]
pub struct WeakEffect {
    inner: Weak<EffectInner>,
}

impl WeakEffect {
    #[must_use]
    pub fn upgrade(&self) -> Option<ReactiveEffect> {
        self.inner.upgrade().map(|inner| ReactiveEffect { inner })
    }
}

impl fmt::Debug for WeakEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakEffect")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

// ─── Active-effect context ───────────────────────────────────────────────────

thread_local! {
    static EFFECT_STACK: RefCell<Vec<ReactiveEffect>> = const { RefCell::new(Vec::new()) };
    static SHOULD_TRACK: Cell<bool> = const { Cell::new(false) };
}

/// One entry on the active-effect stack. Popped on drop.
struct ActiveFrame {
    effect: ReactiveEffect,
    outer_should_track: bool,
}

impl ActiveFrame {
    fn enter(effect: &ReactiveEffect) -> Self {
        effect.inner.running.set(effect.inner.running.get() + 1);
        EFFECT_STACK.with(|stack| stack.borrow_mut().push(effect.clone()));
        let outer_should_track = SHOULD_TRACK.with(|flag| flag.replace(true));
        Self {
            effect: effect.clone(),
            outer_should_track,
        }
    }
}

impl Drop for ActiveFrame {
    fn drop(&mut self) {
        SHOULD_TRACK.with(|flag| flag.set(self.outer_should_track));
        EFFECT_STACK.with(|stack| stack.borrow_mut().pop());
        let running = &self.effect.inner.running;
        running.set(running.get().saturating_sub(1));
    }
}

pub(crate) fn active_effect() -> Option<ReactiveEffect> {
    EFFECT_STACK.with(|stack| stack.borrow().last().cloned())
}

pub(crate) fn is_tracking() -> bool {
    SHOULD_TRACK.with(Cell::get) && EFFECT_STACK.with(|stack| !stack.borrow().is_empty())
}

/// Run `f` with dependency tracking suspended.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    struct Restore(bool);
    impl Drop for Restore {
        fn drop(&mut self) {
            SHOULD_TRACK.with(|flag| flag.set(self.0));
        }
    }
    let _restore = Restore(SHOULD_TRACK.with(|flag| flag.replace(false)));
    f()
}

// ─── Runner API ──────────────────────────────────────────────────────────────

/// Handle returned by [`effect`]; re-runs or stops the underlying effect.
#[derive(Clone, Debug)]
pub struct EffectRunner {
    effect: ReactiveEffect,
}

impl EffectRunner {
    pub fn run(&self) {
        self.effect.run();
    }

    pub fn stop(&self) {
        self.effect.stop();
    }

    #[must_use]
    pub fn effect(&self) -> &ReactiveEffect {
        &self.effect
    }
}

/// Create an effect and run it once immediately.
pub fn effect(work: impl Fn() + 'static) -> EffectRunner {
    effect_with(work, EffectOptions::default())
}

/// Create an effect with options and run it once immediately.
pub fn effect_with(work: impl Fn() + 'static, options: EffectOptions) -> EffectRunner {
    let effect = ReactiveEffect::new(work, options);
    effect.run();
    EffectRunner { effect }
}

/// Stop the effect behind `runner`.
pub fn stop(runner: &EffectRunner) {
    runner.stop();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
