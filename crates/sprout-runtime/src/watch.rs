#![forbid(unsafe_code)]

//! Side-effecting watchers.
//!
//! [`watch_effect`] runs its source immediately and again, as a pre-flush
//! callback, whenever something it read changes. The source can register a
//! cleanup through [`OnCleanup`]; the cleanup runs before the next run and
//! when the watcher stops.

use std::cell::{OnceCell, RefCell};
use std::fmt;
use std::rc::Rc;

use sprout_reactivity::{EffectOptions, ReactiveEffect};
use tracing::trace;

use crate::scheduler::{Job, queue_pre_flush_cb};

type Cleanup = Box<dyn FnOnce()>;

/// Handed to a watcher's source to register its cleanup.
pub struct OnCleanup {
    slot: Rc<RefCell<Option<Cleanup>>>,
}

impl OnCleanup {
    /// Replace the pending cleanup with `f`.
    pub fn register(&self, f: impl FnOnce() + 'static) {
        *self.slot.borrow_mut() = Some(Box::new(f));
    }
}

impl fmt::Debug for OnCleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnCleanup")
            .field("pending", &self.slot.borrow().is_some())
            .finish()
    }
}

/// Stops a watcher.
#[derive(Debug, Clone)]
pub struct WatchHandle {
    effect: ReactiveEffect,
}

impl WatchHandle {
    /// Stop re-running and run the pending cleanup. Idempotent.
    pub fn stop(&self) {
        self.effect.stop();
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.effect.is_active()
    }
}

/// Run `source` now and again before the next flush after any of its reads
/// change.
pub fn watch_effect(source: impl Fn(&OnCleanup) + 'static) -> WatchHandle {
    let slot: Rc<RefCell<Option<Cleanup>>> = Rc::default();
    let run_cleanup = {
        let slot = Rc::clone(&slot);
        move || {
            let cleanup = slot.borrow_mut().take();
            if let Some(cleanup) = cleanup {
                trace!("watcher cleanup");
                cleanup();
            }
        }
    };

    let on_cleanup = OnCleanup { slot };
    let work = {
        let run_cleanup = run_cleanup.clone();
        move || {
            run_cleanup();
            source(&on_cleanup);
        }
    };

    let job_slot: Rc<OnceCell<Job>> = Rc::default();
    let scheduler = {
        let job_slot = Rc::clone(&job_slot);
        move || {
            if let Some(job) = job_slot.get() {
                queue_pre_flush_cb(job);
            }
        }
    };

    let effect = ReactiveEffect::new(
        work,
        EffectOptions::new().scheduler(scheduler).on_stop(run_cleanup),
    );
    let weak = effect.downgrade();
    let job: Job = Rc::new(move || {
        if let Some(effect) = weak.upgrade()
            && effect.is_active()
        {
            effect.run();
        }
    });
    let _ = job_slot.set(job);

    effect.run();
    WatchHandle { effect }
}
