#![forbid(unsafe_code)]

//! Single-value reactive cells.
//!
//! A [`Ref`] owns its own [`Dep`] rather than going through the target map.
//! Container values are stored behind a mutable [`Reactive`] view so nested
//! writes are observed too.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::dep::{Dep, track_effects, trigger_effects};
use crate::error::Result;
use crate::reactive::reactive;
use crate::value::{Key, Value, has_changed};

/// Reserved probe key answering whether a value is a ref.
pub const IS_REF: &str = "__v_isRef";

struct RefInner {
    /// Value as last assigned, before container wrapping.
    raw: RefCell<Value>,
    /// Value handed out by reads.
    value: RefCell<Value>,
    dep: Dep,
}

/// A reactive cell holding one [`Value`].
///
/// Cloning a `Ref` creates a new handle to the **same** cell.
#[derive(Clone)]
pub struct Ref {
    inner: Rc<RefInner>,
}

fn convert(value: &Value) -> Value {
    if value.is_container() {
        reactive(value.clone()).map_or(Value::Null, Value::Proxy)
    } else {
        value.clone()
    }
}

impl Ref {
    pub fn new(value: impl Into<Value>) -> Self {
        let raw = value.into();
        Self {
            inner: Rc::new(RefInner {
                value: RefCell::new(convert(&raw)),
                raw: RefCell::new(raw),
                dep: Dep::new(),
            }),
        }
    }

    /// Read the value, subscribing the active effect.
    #[must_use]
    pub fn value(&self) -> Value {
        track_effects(&self.inner.dep);
        self.peek()
    }

    /// Read the value without subscribing.
    #[must_use]
    pub fn peek(&self) -> Value {
        self.inner.value.borrow().clone()
    }

    /// Assign a new value.
    ///
    /// Assigning a value equal (SameValueZero) to the current raw value does
    /// nothing. Otherwise every subscriber is triggered.
    pub fn set(&self, value: impl Into<Value>) {
        let value = value.into();
        if !has_changed(&value, &self.inner.raw.borrow()) {
            return;
        }
        *self.inner.value.borrow_mut() = convert(&value);
        *self.inner.raw.borrow_mut() = value;
        trigger_effects(&self.inner.dep);
    }

    /// Answer a reserved probe key.
    #[must_use]
    pub fn probe(&self, key: &str) -> Option<Value> {
        (key == IS_REF).then_some(Value::Bool(true))
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of effects currently subscribed to this cell.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.dep.len()
    }
}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Ref");
        match self.inner.value.try_borrow() {
            Ok(value) => s.field("value", &*value),
            Err(_) => s.field("value", &"<borrowed>"),
        };
        s.field("subscribers", &self.subscriber_count()).finish()
    }
}

/// Create a ref. Shorthand for [`Ref::new`].
pub fn ref_value(value: impl Into<Value>) -> Ref {
    Ref::new(value)
}

/// `true` for [`Value::Ref`].
#[must_use]
pub fn is_ref(value: &Value) -> bool {
    value
        .as_ref_cell()
        .and_then(|r| r.probe(IS_REF))
        .and_then(|probe| probe.as_bool())
        .unwrap_or(false)
}

/// The inner value of a ref or computed value; anything else unchanged.
#[must_use]
pub fn unref(value: Value) -> Value {
    match value {
        Value::Ref(r) => r.value(),
        Value::Computed(c) => c.get(),
        other => other,
    }
}

/// A view over an object that unwraps refs on read and writes through
/// them on plain assignment.
///
/// Component setup state is exposed to render functions through this view,
/// so `count` reads as the ref's value rather than the ref itself.
#[derive(Clone, Debug)]
pub struct ProxyRefs {
    target: Value,
}

/// Wrap an object (raw or reactive) so refs inside it read as plain values.
pub fn proxy_refs(target: impl Into<Value>) -> ProxyRefs {
    ProxyRefs {
        target: target.into(),
    }
}

impl ProxyRefs {
    /// The wrapped object.
    #[must_use]
    pub fn target(&self) -> &Value {
        &self.target
    }

    pub fn get(&self, key: impl Into<Key>) -> Value {
        let key = key.into();
        match &self.target {
            Value::Proxy(proxy) => unref(proxy.get(key)),
            Value::Object(object) => unref(object.get_raw(&key.to_name())),
            _ => Value::Null,
        }
    }

    /// Assign through the view.
    ///
    /// # Errors
    ///
    /// Propagates the error of a readonly or array target.
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        let value = value.into();
        match &self.target {
            Value::Proxy(proxy) => proxy.set(key, value),
            Value::Object(object) => {
                let name = key.to_name();
                match object.get_raw(&name) {
                    Value::Ref(existing) if !matches!(value, Value::Ref(_)) => existing.set(value),
                    _ => {
                        object.insert_raw(name, value);
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    #[must_use]
    pub fn has(&self, key: impl Into<Key>) -> bool {
        let key = key.into();
        match &self.target {
            Value::Proxy(proxy) => proxy.has(key),
            Value::Object(object) => object.contains_key(&key.to_name()),
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::effect;
    use crate::reactive::is_reactive;
    use crate::value::Object;
    use std::cell::Cell;

    #[test]
    fn ref_reads_and_writes() {
        let count = Ref::new(1);
        assert_eq!(count.value(), Value::Int(1));
        count.set(2);
        assert_eq!(count.value(), Value::Int(2));
        assert!(is_ref(&Value::from(count)));
        assert!(!is_ref(&Value::from(1)));
    }

    #[test]
    fn equal_assignment_does_not_trigger() {
        let count = Ref::new(1);
        let runs = Rc::new(Cell::new(0));
        let (r, c) = (Rc::clone(&runs), count.clone());
        let _runner = effect(move || {
            let _ = c.value();
            r.set(r.get() + 1);
        });
        assert_eq!(runs.get(), 1);
        count.set(1);
        assert_eq!(runs.get(), 1);
        count.set(2);
        assert_eq!(runs.get(), 2);
        count.set(2);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn nan_assignment_is_not_a_change() {
        let value = Ref::new(f64::NAN);
        let runs = Rc::new(Cell::new(0));
        let (r, v) = (Rc::clone(&runs), value.clone());
        let _runner = effect(move || {
            let _ = v.value();
            r.set(r.get() + 1);
        });
        value.set(f64::NAN);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn container_values_become_reactive() {
        let state = Ref::new(Object::new().with("count", 1));
        assert!(is_reactive(&state.value()));

        let seen = Rc::new(Cell::new(0));
        let (s, st) = (Rc::clone(&seen), state.clone());
        let _runner = effect(move || {
            let inner = st.value();
            s.set(inner.as_proxy().unwrap().get("count").as_i64().unwrap());
        });
        state
            .value()
            .as_proxy()
            .unwrap()
            .set("count", 2)
            .unwrap();
        assert_eq!(seen.get(), 2);
    }

    #[test]
    fn unref_unwraps_refs_only() {
        assert_eq!(unref(Value::from(Ref::new(1))), Value::Int(1));
        assert_eq!(unref(Value::from(1)), Value::Int(1));
    }

    #[test]
    fn proxy_refs_unwraps_and_writes_through() {
        let age = Ref::new(10);
        let user = Object::new().with("age", age.clone()).with("name", "ann");
        let view = proxy_refs(user.clone());
        assert_eq!(view.get("age"), Value::Int(10));
        assert_eq!(view.get("name"), Value::from("ann"));

        view.set("age", 20).unwrap();
        assert_eq!(age.value(), Value::Int(20));
        assert!(is_ref(&user.get_raw("age")));

        let replacement = Ref::new(30);
        view.set("age", replacement.clone()).unwrap();
        assert_eq!(view.get("age"), Value::Int(30));
        assert!(user.get_raw("age").as_ref_cell().unwrap().ptr_eq(&replacement));
    }
}
