#![forbid(unsafe_code)]

//! Sprout public facade crate.
//!
//! Reactivity is always available. The renderer and component runtime sit
//! behind the `runtime` feature, the in-memory host behind `memory-host`.

pub use sprout_reactivity as reactivity;
#[cfg(feature = "runtime")]
pub use sprout_runtime as runtime;

pub mod prelude {
    pub use sprout_reactivity as reactivity;
    pub use sprout_reactivity::{
        Array, Computed, Func, Object, Reactive, Ref, Value, computed, effect, reactive, readonly,
        ref_value, shallow_readonly, unref,
    };

    #[cfg(feature = "runtime")]
    pub use sprout_runtime as runtime;
    #[cfg(feature = "runtime")]
    pub use sprout_runtime::{
        Component, HostAdapter, HostNode, PublicInstance, Renderer, SetupContext, SetupResult,
        Slots, VNodeRef, create_app, fragment, h, inject, inject_or, next_tick, next_tick_then,
        provide, render_slot, text, watch_effect,
    };
    #[cfg(feature = "memory-host")]
    pub use sprout_runtime::MemoryHost;
}
