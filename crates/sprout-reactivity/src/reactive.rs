#![forbid(unsafe_code)]

//! Reactive views over raw containers.
//!
//! Rust has no transparent property interception, so a [`Reactive`] is an
//! explicit view with `get`/`set` accessors that perform the tracking and
//! triggering a proxy trap would.
//!
//! | mode | reads track | writes | nested containers |
//! |---|---|---|---|
//! | [`ProxyMode::Mutable`] | yes | store, then trigger | wrapped mutable |
//! | [`ProxyMode::Readonly`] | no | rejected with a warning | wrapped readonly |
//! | [`ProxyMode::ShallowReadonly`] | no | rejected with a warning | returned raw |
//!
//! Views are not cached: wrapping the same container twice yields two views
//! that compare equal.

use std::fmt;

use tracing::warn;

use crate::dep::{track, trigger};
use crate::error::{ReactivityError, Result};
use crate::value::{Container, Key, Value};

/// Reserved probe key answering whether a view is mutable-reactive.
pub const IS_REACTIVE: &str = "__v_isReactive";
/// Reserved probe key answering whether a view is readonly.
pub const IS_READONLY: &str = "__v_isReadonly";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyMode {
    Mutable,
    Readonly,
    ShallowReadonly,
}

impl ProxyMode {
    #[must_use]
    pub const fn is_readonly(self) -> bool {
        !matches!(self, Self::Mutable)
    }

    #[must_use]
    pub const fn is_shallow(self) -> bool {
        matches!(self, Self::ShallowReadonly)
    }
}

/// A tracking view over an [`Object`](crate::Object) or [`Array`](crate::Array).
#[derive(Clone)]
pub struct Reactive {
    target: Container,
    mode: ProxyMode,
}

/// Wrap a container in a mutable view.
///
/// Returns `None` (and warns) when `value` is not a container.
pub fn reactive(value: impl Into<Value>) -> Option<Reactive> {
    create_reactive(value.into(), ProxyMode::Mutable)
}

/// Wrap a container in a deep readonly view.
pub fn readonly(value: impl Into<Value>) -> Option<Reactive> {
    create_reactive(value.into(), ProxyMode::Readonly)
}

/// Wrap a container in a readonly view that returns nested values raw.
pub fn shallow_readonly(value: impl Into<Value>) -> Option<Reactive> {
    create_reactive(value.into(), ProxyMode::ShallowReadonly)
}

fn create_reactive(value: Value, mode: ProxyMode) -> Option<Reactive> {
    match value {
        Value::Object(object) => Some(Reactive::new(Container::Object(object), mode)),
        Value::Array(array) => Some(Reactive::new(Container::Array(array), mode)),
        // A readonly view is never upgraded back to a mutable one.
        Value::Proxy(proxy) if mode == ProxyMode::Mutable && proxy.mode.is_readonly() => {
            Some(proxy)
        }
        Value::Proxy(proxy) => Some(Reactive::new(proxy.target, mode)),
        other => {
            let err = ReactivityError::NotAContainer { kind: other.kind() };
            warn!(mode = ?mode, "{err}");
            None
        }
    }
}

impl Reactive {
    #[must_use]
    pub fn new(target: Container, mode: ProxyMode) -> Self {
        Self { target, mode }
    }

    #[must_use]
    pub fn mode(&self) -> ProxyMode {
        self.mode
    }

    /// The raw container behind this view.
    #[must_use]
    pub fn target(&self) -> &Container {
        &self.target
    }

    /// Raw value of the container, bypassing the view.
    #[must_use]
    pub fn to_raw(&self) -> Value {
        self.target.to_value()
    }

    #[must_use]
    pub fn is_reactive(&self) -> bool {
        self.get(IS_REACTIVE).as_bool().unwrap_or(false)
    }

    #[must_use]
    pub fn is_readonly(&self) -> bool {
        self.get(IS_READONLY).as_bool().unwrap_or(false)
    }

    /// Read `key` through the view.
    pub fn get(&self, key: impl Into<Key>) -> Value {
        let key = key.into();
        if let Key::Name(name) = &key {
            match &**name {
                IS_REACTIVE => return Value::Bool(!self.mode.is_readonly()),
                IS_READONLY => return Value::Bool(self.mode.is_readonly()),
                _ => {}
            }
        }

        let raw = self.target.get_raw(&key);
        if !self.mode.is_readonly() {
            track(self.target.id(), &key);
        }
        if self.mode.is_shallow() {
            return raw;
        }
        self.wrap_nested(raw)
    }

    fn wrap_nested(&self, raw: Value) -> Value {
        match raw {
            Value::Object(_) | Value::Array(_) => {
                let mode = if self.mode.is_readonly() {
                    ProxyMode::Readonly
                } else {
                    ProxyMode::Mutable
                };
                create_reactive(raw, mode).map_or(Value::Null, Value::Proxy)
            }
            Value::Proxy(proxy) if self.mode.is_readonly() => {
                Value::Proxy(Self::new(proxy.target, ProxyMode::Readonly))
            }
            Value::Ref(r) => r.value(),
            Value::Computed(c) => c.get(),
            other => other,
        }
    }

    /// Write `key` through the view.
    ///
    /// Mutable views store the value and trigger the key's subscribers (and
    /// the length or key-set subscribers when the container grew). Shrinking an
    /// array through `length` triggers every index it cut off. Writing a
    /// plain value onto a key that holds a ref writes through the ref.
    ///
    /// # Errors
    ///
    /// Readonly views leave the container unchanged, log a warning and return
    /// [`ReactivityError::ReadonlyWrite`]. Array views reject non-index keys.
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        self.ensure_writable(&key)?;
        let value = value.into();

        if let Value::Ref(existing) = self.target.get_raw(&key)
            && !matches!(value, Value::Ref(_))
        {
            existing.set(value);
            return Ok(());
        }

        let outcome = self.target.set_raw(&key, value)?;
        let id = self.target.id();
        trigger(id, &key);
        if outcome.added {
            trigger(id, &self.shape_key());
        }
        for index in outcome.truncated {
            trigger(id, &Key::Index(index));
        }
        Ok(())
    }

    /// Append to an array view.
    ///
    /// # Errors
    ///
    /// Fails on readonly views and on object views.
    pub fn push(&self, value: impl Into<Value>) -> Result<usize> {
        self.ensure_writable(&Key::length())?;
        let Container::Array(array) = &self.target else {
            return Err(ReactivityError::InvalidArrayKey {
                key: "push on object".into(),
            });
        };
        let index = array.push_raw(value);
        trigger(array.id(), &Key::Index(index));
        trigger(array.id(), &Key::length());
        Ok(index)
    }

    /// Delete a key from an object view, or splice an item out of an array.
    ///
    /// # Errors
    ///
    /// Fails on readonly views and on non-index array keys.
    pub fn remove(&self, key: impl Into<Key>) -> Result<Value> {
        let key = key.into();
        self.ensure_writable(&key)?;
        let id = self.target.id();
        match &self.target {
            Container::Object(object) => {
                let removed = object.remove_raw(&key.to_name());
                if removed.is_some() {
                    trigger(id, &key);
                    trigger(id, &Key::iterate());
                }
                Ok(removed.unwrap_or_default())
            }
            Container::Array(array) => {
                let index = key
                    .to_index()
                    .ok_or_else(|| ReactivityError::InvalidArrayKey {
                        key: key.to_string(),
                    })?;
                let old_len = array.len();
                let removed = array.remove_raw(index);
                if removed.is_some() {
                    // Every later position shifted.
                    for shifted in index..old_len {
                        trigger(id, &Key::Index(shifted));
                    }
                    trigger(id, &Key::length());
                }
                Ok(removed.unwrap_or_default())
            }
        }
    }

    /// Whether `key` exists. Tracks the key on mutable views.
    pub fn has(&self, key: impl Into<Key>) -> bool {
        let key = key.into();
        if !self.mode.is_readonly() {
            track(self.target.id(), &key);
        }
        match &self.target {
            Container::Object(object) => object.contains_key(&key.to_name()),
            Container::Array(array) => key.to_index().is_some_and(|i| i < array.len()),
        }
    }

    /// Number of entries. Tracks the container's shape on mutable views.
    pub fn len(&self) -> usize {
        if !self.mode.is_readonly() {
            track(self.target.id(), &self.shape_key());
        }
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys in order. Tracks the container's shape on mutable views.
    pub fn keys(&self) -> Vec<Key> {
        if !self.mode.is_readonly() {
            track(self.target.id(), &self.shape_key());
        }
        match &self.target {
            Container::Object(object) => object.keys().into_iter().map(Key::Name).collect(),
            Container::Array(array) => (0..array.len()).map(Key::Index).collect(),
        }
    }

    /// Every value, read through the view in key order.
    pub fn values(&self) -> Vec<Value> {
        self.keys().into_iter().map(|key| self.get(key)).collect()
    }

    fn shape_key(&self) -> Key {
        match self.target {
            Container::Object(_) => Key::iterate(),
            Container::Array(_) => Key::length(),
        }
    }

    fn ensure_writable(&self, key: &Key) -> Result<()> {
        if self.mode.is_readonly() {
            let err = ReactivityError::readonly(key);
            warn!(target_id = self.target.id().get(), %key, "{err}");
            return Err(err);
        }
        Ok(())
    }
}

impl PartialEq for Reactive {
    fn eq(&self, other: &Self) -> bool {
        self.mode == other.mode && self.target.ptr_eq(&other.target)
    }
}

impl fmt::Debug for Reactive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactive")
            .field("mode", &self.mode)
            .field("target", &self.target)
            .finish()
    }
}

/// `true` for mutable views.
#[must_use]
pub fn is_reactive(value: &Value) -> bool {
    value.as_proxy().is_some_and(Reactive::is_reactive)
}

/// `true` for readonly and shallow-readonly views.
#[must_use]
pub fn is_readonly(value: &Value) -> bool {
    value.as_proxy().is_some_and(Reactive::is_readonly)
}

/// `true` for any view.
#[must_use]
pub fn is_proxy(value: &Value) -> bool {
    is_reactive(value) || is_readonly(value)
}

/// Strip a view, returning the raw container (other values pass through).
#[must_use]
pub fn to_raw(value: Value) -> Value {
    match value {
        Value::Proxy(proxy) => proxy.to_raw(),
        other => other,
    }
}

impl From<&Reactive> for Value {
    fn from(proxy: &Reactive) -> Self {
        Self::Proxy(proxy.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
