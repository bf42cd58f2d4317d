#![forbid(unsafe_code)]

//! Fine-grained reactivity for Sprout.
//!
//! - [`Value`], [`Object`], [`Array`]: dynamically typed state and the raw
//!   containers reactive views are built over.
//! - [`reactive`], [`readonly`], [`shallow_readonly`]: tracking views.
//! - [`ReactiveEffect`] / [`effect`]: work functions that re-run when the
//!   state they read changes.
//! - [`Ref`]: a single reactive cell. [`Computed`]: a lazy derived value.
//!
//! # Architecture
//!
//! Everything is single-threaded. Shared state uses `Rc<RefCell<..>>`, and
//! the dependency graph and active-effect stack live in thread-locals.
//!
//! ```text
//! target map: TargetId ─► Key ─► Dep ─► {ReactiveEffect}
//!                                  ▲            │
//!                                  └── deps ◄───┘   (reverse list, for stop)
//! ```
//!
//! # Invariants
//!
//! 1. A read registers a dependency only inside a running effect with
//!    tracking enabled.
//! 2. An effect is subscribed to a given dep at most once.
//! 3. A stopped effect is removed from every dep and is never triggered.
//! 4. Assigning an equal value to a [`Ref`] triggers nothing.
//! 5. Writes through readonly views are rejected and leave the target intact.

pub mod computed;
pub mod dep;
pub mod effect;
pub mod error;
pub mod reactive;
pub mod refs;
pub mod value;

pub use computed::{Computed, computed};
pub use dep::{Dep, is_tracking, subscriber_count, track, track_effects, trigger, trigger_effects};
pub use effect::{
    EffectId, EffectOptions, EffectRunner, ReactiveEffect, WeakEffect, effect, effect_with, stop,
    untracked,
};
pub use error::{ReactivityError, Result};
pub use reactive::{
    ProxyMode, Reactive, is_proxy, is_reactive, is_readonly, reactive, readonly,
    shallow_readonly, to_raw,
};
pub use refs::{ProxyRefs, Ref, is_ref, proxy_refs, ref_value, unref};
pub use value::{Array, Container, Func, Key, Object, TargetId, Value, has_changed};
