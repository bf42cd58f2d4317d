#![forbid(unsafe_code)]

//! The dependency graph.
//!
//! A two-level index `target → key → Dep`, where a [`Dep`] is the set of
//! effects subscribed to one `(target, key)` pair. Entries are created lazily
//! by [`track`] and only while an effect is running with tracking enabled.
//!
//! # Invariants
//!
//! 1. An effect appears in a dep at most once.
//! 2. Every dep an effect is a member of is also listed in that effect's
//!    reverse list, so `stop()` can sever all links.
//! 3. [`trigger`] on a key that was never tracked is a no-op.
//! 4. Subscribers run in subscription order.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::trace;

use crate::effect::{self, EffectId, ReactiveEffect};
use crate::value::{Key, TargetId};

/// A set of subscribed effects.
///
/// Cloning a `Dep` creates a new handle to the **same** set.
#[derive(Clone, Default)]
pub struct Dep {
    subscribers: Rc<RefCell<IndexMap<EffectId, ReactiveEffect>>>,
}

impl Dep {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.borrow().is_empty()
    }

    #[must_use]
    pub fn contains(&self, effect: &ReactiveEffect) -> bool {
        self.subscribers.borrow().contains_key(&effect.id())
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.subscribers, &other.subscribers)
    }

    /// Returns `false` if the effect was already subscribed.
    fn insert(&self, effect: &ReactiveEffect) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        if subscribers.contains_key(&effect.id()) {
            return false;
        }
        subscribers.insert(effect.id(), effect.clone());
        true
    }

    pub(crate) fn remove(&self, id: EffectId) {
        // Release the borrow before the removed handle is dropped.
        let removed = self.subscribers.borrow_mut().shift_remove(&id);
        drop(removed);
    }

    fn snapshot(&self) -> SmallVec<[ReactiveEffect; 8]> {
        self.subscribers.borrow().values().cloned().collect()
    }
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dep")
            .field("subscribers", &self.len())
            .finish()
    }
}

type KeyMap = AHashMap<Key, Dep>;

thread_local! {
    static TARGET_MAP: RefCell<AHashMap<TargetId, KeyMap>> = RefCell::new(AHashMap::new());
}

/// Whether a read right now would register a dependency.
#[must_use]
pub fn is_tracking() -> bool {
    effect::is_tracking()
}

/// Record that the active effect depends on `target[key]`.
///
/// No-op when no effect is running or tracking is suspended.
pub fn track(target: TargetId, key: &Key) {
    if !is_tracking() {
        return;
    }
    let dep = TARGET_MAP.with(|map| {
        map.borrow_mut()
            .entry(target)
            .or_default()
            .entry(key.clone())
            .or_default()
            .clone()
    });
    track_effects(&dep);
}

/// Subscribe the active effect to `dep`.
pub fn track_effects(dep: &Dep) {
    let Some(active) = effect::active_effect() else {
        return;
    };
    if !is_tracking() {
        return;
    }
    if dep.insert(&active) {
        active.record_dep(dep.clone());
    }
}

/// Re-run (or schedule) every effect subscribed to `target[key]`.
pub fn trigger(target: TargetId, key: &Key) {
    let dep = TARGET_MAP.with(|map| {
        map.borrow()
            .get(&target)
            .and_then(|keys| keys.get(key))
            .cloned()
    });
    match dep {
        Some(dep) => trigger_effects(&dep),
        None => trace!(target_id = target.get(), %key, "trigger without subscribers"),
    }
}

/// Re-run (or schedule) every effect in `dep`.
///
/// The subscriber set is snapshotted first, so effects that re-subscribe
/// while running do not extend this pass. An effect that is currently
/// executing is skipped rather than re-entered.
pub fn trigger_effects(dep: &Dep) {
    for effect in dep.snapshot() {
        if effect.is_running() {
            continue;
        }
        effect.notify();
    }
}

/// Number of effects subscribed to `target[key]`.
#[must_use]
pub fn subscriber_count(target: TargetId, key: &Key) -> usize {
    TARGET_MAP.with(|map| {
        map.borrow()
            .get(&target)
            .and_then(|keys| keys.get(key))
            .map_or(0, Dep::len)
    })
}

/// Drop every dep recorded for a container that no longer exists.
pub(crate) fn forget_target(target: TargetId) {
    // The thread-local may already be gone during thread teardown.
    let _ = TARGET_MAP.try_with(|map| {
        if let Ok(mut map) = map.try_borrow_mut() {
            map.remove(&target);
        }
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
