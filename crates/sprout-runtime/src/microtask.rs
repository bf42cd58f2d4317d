#![forbid(unsafe_code)]

//! Thread-local microtask queue.
//!
//! Stands in for the host event loop's microtask turn: work queued here runs
//! only when the embedder (or an awaited [`NextTick`](crate::NextTick))
//! drains the queue with [`run_microtasks`].

use std::cell::RefCell;
use std::collections::VecDeque;

use tracing::trace;

type Microtask = Box<dyn FnOnce()>;

thread_local! {
    static MICROTASKS: RefCell<VecDeque<Microtask>> = const { RefCell::new(VecDeque::new()) };
}

/// Queue `task` to run on the next drain.
pub fn queue_microtask(task: impl FnOnce() + 'static) {
    MICROTASKS.with(|queue| queue.borrow_mut().push_back(Box::new(task)));
}

/// Run queued microtasks FIFO until the queue is empty, including tasks
/// queued by the tasks themselves. Returns how many ran.
pub fn run_microtasks() -> usize {
    let mut ran = 0;
    loop {
        let next = MICROTASKS.with(|queue| queue.borrow_mut().pop_front());
        let Some(task) = next else {
            break;
        };
        task();
        ran += 1;
    }
    if ran > 0 {
        trace!(ran, "microtasks drained");
    }
    ran
}

#[must_use]
pub fn pending_microtasks() -> usize {
    MICROTASKS.with(|queue| queue.borrow().len())
}
