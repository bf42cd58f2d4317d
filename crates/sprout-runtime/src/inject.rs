#![forbid(unsafe_code)]

//! Provide/inject across the component tree.
//!
//! Every instance owns a [`Provides`] bag linked to its parent's bag. A
//! lookup that misses locally continues up the parent chain. `inject` starts
//! at the *parent's* bag, so a component never sees its own provides.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use sprout_reactivity::Value;
use tracing::warn;

use crate::component::current_instance;

/// One component's provided values, chained to its parent's.
#[derive(Default)]
pub struct Provides {
    values: RefCell<AHashMap<Rc<str>, Value>>,
    parent: Option<Rc<Provides>>,
}

impl Provides {
    /// A bag with no parent.
    #[must_use]
    pub fn root() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// An empty bag whose lookups fall back to `parent`.
    #[must_use]
    pub fn child_of(parent: &Rc<Self>) -> Rc<Self> {
        Rc::new(Self {
            values: RefCell::default(),
            parent: Some(Rc::clone(parent)),
        })
    }

    #[must_use]
    pub fn parent(&self) -> Option<&Rc<Self>> {
        self.parent.as_ref()
    }

    pub fn provide(&self, key: &str, value: impl Into<Value>) {
        self.values.borrow_mut().insert(Rc::from(key), value.into());
    }

    #[must_use]
    pub fn has_own(&self, key: &str) -> bool {
        self.values.borrow().contains_key(key)
    }

    /// Nearest value for `key`, searching this bag then its ancestors.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<Value> {
        let mut bag = Some(self);
        while let Some(current) = bag {
            if let Some(value) = current.values.borrow().get(key) {
                return Some(value.clone());
            }
            bag = current.parent.as_deref();
        }
        None
    }
}

impl fmt::Debug for Provides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values = self.values.borrow();
        let mut keys: Vec<_> = values.keys().map(|k| &**k).collect();
        keys.sort_unstable();
        f.debug_struct("Provides")
            .field("keys", &keys)
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

/// Provide `value` under `key` from the component whose setup is running.
///
/// Outside setup this warns and does nothing.
pub fn provide(key: &str, value: impl Into<Value>) {
    match current_instance() {
        Some(instance) => instance.provides().provide(key, value),
        None => warn!(key, "provide() called outside of setup"),
    }
}

/// Nearest ancestor's value for `key`.
///
/// Outside setup this warns and returns `None`.
#[must_use]
pub fn inject(key: &str) -> Option<Value> {
    let Some(instance) = current_instance() else {
        warn!(key, "inject() called outside of setup");
        return None;
    };
    instance.provides().parent().and_then(|bag| bag.lookup(key))
}

/// Like [`inject`], falling back to `default` when no ancestor provides `key`.
#[must_use]
pub fn inject_or(key: &str, default: impl Into<Value>) -> Value {
    inject(key).unwrap_or_else(|| default.into())
}

/// Like [`inject`], calling `default` only when no ancestor provides `key`.
pub fn inject_or_else(key: &str, default: impl FnOnce() -> Value) -> Value {
    inject(key).unwrap_or_else(default)
}
