#![forbid(unsafe_code)]

//! Coalescing render scheduler.
//!
//! # Design
//!
//! Jobs are `Rc` closures deduplicated by pointer identity. The first job
//! queued in a tick arranges one flush microtask; further jobs in the same
//! tick join the pending queue. A flush runs all pre-flush callbacks, then
//! jobs FIFO, and keeps draining both queues until they are empty, so jobs
//! queued during the flush run in the same flush.
//!
//! # Invariants
//!
//! 1. A job is in the queue at most once.
//! 2. At most one flush microtask is pending at a time.
//! 3. Jobs run in first-queued order within a flush.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use tracing::trace;

use crate::microtask::{queue_microtask, run_microtasks};

/// A unit of deferred work. Identity is the `Rc` allocation.
pub type Job = Rc<dyn Fn()>;

#[derive(Default)]
struct SchedulerState {
    queue: VecDeque<Job>,
    pre_flush: VecDeque<Job>,
    flush_pending: bool,
}

thread_local! {
    static SCHEDULER: RefCell<SchedulerState> = RefCell::new(SchedulerState::default());
}

fn same_job(a: &Job, b: &Job) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// Queue a render job for the next flush. Queuing a job that is already
/// pending does nothing.
pub fn queue_job(job: &Job) {
    SCHEDULER.with(|state| {
        let mut state = state.borrow_mut();
        if !state.queue.iter().any(|queued| same_job(queued, job)) {
            state.queue.push_back(Rc::clone(job));
        }
    });
    queue_flush();
}

/// Queue a callback that runs at the start of the next flush, before jobs.
pub fn queue_pre_flush_cb(cb: &Job) {
    SCHEDULER.with(|state| {
        let mut state = state.borrow_mut();
        if !state.pre_flush.iter().any(|queued| same_job(queued, cb)) {
            state.pre_flush.push_back(Rc::clone(cb));
        }
    });
    queue_flush();
}

/// Drop a pending job without running it.
pub fn invalidate_job(job: &Job) {
    SCHEDULER.with(|state| state.borrow_mut().queue.retain(|queued| !same_job(queued, job)));
}

/// Number of jobs waiting for the next flush.
#[must_use]
pub fn pending_jobs() -> usize {
    SCHEDULER.with(|state| state.borrow().queue.len())
}

fn queue_flush() {
    let schedule = SCHEDULER.with(|state| {
        let mut state = state.borrow_mut();
        !std::mem::replace(&mut state.flush_pending, true)
    });
    if schedule {
        queue_microtask(flush_jobs);
    }
}

/// Clears the pending flag when the flush ends, even if a job panicked.
struct FlushGuard;

impl Drop for FlushGuard {
    fn drop(&mut self) {
        let _ = SCHEDULER.try_with(|state| state.borrow_mut().flush_pending = false);
    }
}

fn flush_jobs() {
    let _guard = FlushGuard;
    let mut ran = 0usize;
    loop {
        let next = SCHEDULER.with(|state| {
            let mut state = state.borrow_mut();
            state
                .pre_flush
                .pop_front()
                .or_else(|| state.queue.pop_front())
        });
        let Some(job) = next else {
            break;
        };
        job();
        ran += 1;
    }
    trace!(ran, "scheduler flush");
}

// ─── nextTick ────────────────────────────────────────────────────────────────

/// Future returned by [`next_tick`]; resolves once every microtask queued
/// before it (including a pending flush) has run.
///
/// Polling drains the microtask queue, so it completes on the first poll
/// under any executor.
#[must_use = "futures do nothing unless polled"]
#[derive(Debug)]
pub struct NextTick {
    done: Rc<Cell<bool>>,
}

impl NextTick {
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done.get()
    }
}

impl Future for NextTick {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if !self.done.get() {
            run_microtasks();
        }
        if self.done.get() {
            Poll::Ready(())
        } else {
            // The marker task panicked or was drained elsewhere mid-run.
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

/// A tick marker that resolves after the pending flush.
pub fn next_tick() -> NextTick {
    next_tick_then(|| {})
}

/// Run `f` after the pending flush. The returned future resolves after `f`.
pub fn next_tick_then(f: impl FnOnce() + 'static) -> NextTick {
    let done = Rc::new(Cell::new(false));
    let flag = Rc::clone(&done);
    queue_microtask(move || {
        f();
        flag.set(true);
    });
    NextTick { done }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprout_reactivity::{EffectOptions, ReactiveEffect, Ref};

    fn counting_job(counter: &Rc<Cell<u32>>) -> Job {
        let c = Rc::clone(counter);
        Rc::new(move || c.set(c.get() + 1))
    }

    #[test]
    fn duplicate_jobs_coalesce() {
        let runs = Rc::new(Cell::new(0));
        let job = counting_job(&runs);
        queue_job(&job);
        queue_job(&job);
        queue_job(&job);
        assert_eq!(pending_jobs(), 1);
        assert_eq!(runs.get(), 0);
        run_microtasks();
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn jobs_queued_during_flush_run_in_same_flush() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let l2 = Rc::clone(&log);
        let second: Job = Rc::new(move || l2.borrow_mut().push("second"));
        let l1 = Rc::clone(&log);
        let first: Job = Rc::new(move || {
            l1.borrow_mut().push("first");
            queue_job(&second);
        });
        queue_job(&first);
        run_microtasks();
        assert_eq!(*log.borrow(), vec!["first", "second"]);
        assert_eq!(pending_jobs(), 0);
    }

    #[test]
    fn pre_flush_callbacks_run_before_jobs() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let l1 = Rc::clone(&log);
        let job: Job = Rc::new(move || l1.borrow_mut().push("job"));
        let l2 = Rc::clone(&log);
        let pre: Job = Rc::new(move || l2.borrow_mut().push("pre"));
        queue_job(&job);
        queue_pre_flush_cb(&pre);
        run_microtasks();
        assert_eq!(*log.borrow(), vec!["pre", "job"]);
    }

    #[test]
    fn invalidated_job_does_not_run() {
        let runs = Rc::new(Cell::new(0));
        let job = counting_job(&runs);
        queue_job(&job);
        invalidate_job(&job);
        run_microtasks();
        assert_eq!(runs.get(), 0);
    }

    #[test]
    fn next_tick_resolves_after_flush() {
        let runs = Rc::new(Cell::new(0));
        let job = counting_job(&runs);
        queue_job(&job);
        let seen = Rc::new(Cell::new(u32::MAX));
        let (s, r) = (Rc::clone(&seen), Rc::clone(&runs));
        let tick = next_tick_then(move || s.set(r.get()));
        assert!(!tick.is_done());
        futures::executor::block_on(tick);
        assert_eq!(seen.get(), 1, "callback observed the flushed job");
    }

    #[test]
    fn stopped_effect_runs_queued_job_once_untracked() {
        let count = Ref::new(0);
        let runs = Rc::new(Cell::new(0u32));
        let slot: Rc<RefCell<Option<ReactiveEffect>>> = Rc::default();
        let job: Job = {
            let slot = Rc::clone(&slot);
            Rc::new(move || {
                let effect = slot.borrow().clone();
                if let Some(effect) = effect {
                    effect.run();
                }
            })
        };
        let (r, c, queued) = (Rc::clone(&runs), count.clone(), Rc::clone(&job));
        let effect = ReactiveEffect::new(
            move || {
                r.set(r.get() + 1);
                let _ = c.value();
            },
            EffectOptions::new().scheduler(move || queue_job(&queued)),
        );
        *slot.borrow_mut() = Some(effect.clone());
        effect.run();
        assert_eq!(count.subscriber_count(), 1);

        count.set(1);
        assert_eq!(pending_jobs(), 1);
        effect.stop();
        assert_eq!(count.subscriber_count(), 0);

        run_microtasks();
        assert_eq!(runs.get(), 2, "queued job ran once after stop");
        assert_eq!(count.subscriber_count(), 0);
        assert_eq!(effect.dep_count(), 0);

        count.set(2);
        run_microtasks();
        assert_eq!(runs.get(), 2);
        slot.borrow_mut().take();
    }
}
