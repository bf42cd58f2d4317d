#![forbid(unsafe_code)]

//! Virtual-node renderer and component runtime for Sprout.
//!
//! # Architecture
//!
//! ```text
//!   h(...) ──► VNode tree ──► Renderer::render ──► patch ──► HostAdapter
//!                                   │                 │
//!                                   │                 ├─ keyed child diff (LIS)
//!                                   │                 └─ component lifecycle
//!                                   │                        │
//!                                   │                 render effect ──► scheduler
//!                                   │                                     │
//!                                   └──────────── next tick ◄─── microtasks
//! ```
//!
//! Components re-render through one [`ReactiveEffect`](sprout_reactivity::ReactiveEffect)
//! per instance. The effect's scheduler queues a job; jobs queued in one tick
//! run in a single flush on the next microtask drain.
//!
//! The renderer is host-agnostic. [`MemoryHost`] (feature `memory-host`)
//! keeps an in-memory tree and logs every operation.

pub mod app;
pub mod component;
pub mod emit;
pub mod error;
pub mod host;
pub mod inject;
mod keyed;
mod lifecycle;
pub mod lis;
#[cfg(feature = "memory-host")]
pub mod memory_host;
pub mod microtask;
pub mod renderer;
pub mod scheduler;
pub mod shape;
pub mod slots;
pub mod vnode;
pub mod watch;

pub use app::{App, create_app};
pub use component::{
    Component, ComponentInstance, PublicInstance, RenderFn, SetupContext, SetupFn, SetupResult,
    current_instance, should_update_component,
};
pub use emit::{camelize, capitalize, emit, handler_name};
pub use error::{Result, RuntimeError};
pub use host::{HostAdapter, HostNode, is_on};
pub use inject::{Provides, inject, inject_or, inject_or_else, provide};
pub use lis::longest_increasing_subsequence;
#[cfg(feature = "memory-host")]
pub use memory_host::{HostOp, MemoryHost};
pub use microtask::{pending_microtasks, queue_microtask, run_microtasks};
pub use renderer::Renderer;
pub use scheduler::{
    Job, NextTick, invalidate_job, next_tick, next_tick_then, pending_jobs, queue_job,
    queue_pre_flush_cb,
};
pub use shape::ShapeFlags;
pub use slots::{SlotFn, Slots, render_slot};
pub use vnode::{Children, KEY_PROP, NodeKey, VNode, VNodeRef, VNodeType, fragment, h, text};
pub use watch::{OnCleanup, WatchHandle, watch_effect};
