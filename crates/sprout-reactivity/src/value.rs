#![forbid(unsafe_code)]

//! Dynamic values and raw containers.
//!
//! Reactive state, component props and event handlers all travel as [`Value`]s.
//! The two container kinds, [`Object`] and [`Array`], are reference types with
//! a stable [`TargetId`]; that id is what the dependency graph keys on.
//!
//! Raw containers never track or trigger. Wrap them with
//! [`reactive`](crate::reactive::reactive) (or a readonly variant) to get a
//! view whose accessors participate in dependency tracking.

use std::cell::RefCell;
use std::fmt;
use std::ops::Range;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use crate::computed::Computed;
use crate::dep;
use crate::error::{ReactivityError, Result};
use crate::reactive::Reactive;
use crate::refs::Ref;

// ─── Target identity ─────────────────────────────────────────────────────────

static NEXT_TARGET_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a raw container inside the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(u64);

impl TargetId {
    fn next() -> Self {
        Self(NEXT_TARGET_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

// ─── Keys ────────────────────────────────────────────────────────────────────

/// Reserved key tracked by array length reads and triggered when an array grows.
pub const LENGTH_KEY: &str = "length";

/// Reserved key tracked by object key enumeration and triggered when a key is
/// added or removed.
pub const ITERATE_KEY: &str = "__v_iterate";

/// A property key: a named field or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Name(Rc<str>),
    Index(usize),
}

impl Key {
    /// The reserved `length` key.
    #[must_use]
    pub fn length() -> Self {
        Self::Name(Rc::from(LENGTH_KEY))
    }

    /// The reserved key-enumeration key.
    #[must_use]
    pub fn iterate() -> Self {
        Self::Name(Rc::from(ITERATE_KEY))
    }

    /// Name form of the key, stringifying indices.
    #[must_use]
    pub fn to_name(&self) -> Rc<str> {
        match self {
            Self::Name(name) => Rc::clone(name),
            Self::Index(index) => Rc::from(index.to_string()),
        }
    }

    /// Index form of the key, parsing numeric names.
    #[must_use]
    pub fn to_index(&self) -> Option<usize> {
        match self {
            Self::Name(name) => name.parse().ok(),
            Self::Index(index) => Some(*index),
        }
    }

    fn is_name(&self, name: &str) -> bool {
        matches!(self, Self::Name(n) if &**n == name)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Self::Name(Rc::from(name))
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Self::Name(Rc::from(name))
    }
}

impl From<Rc<str>> for Key {
    fn from(name: Rc<str>) -> Self {
        Self::Name(name)
    }
}

impl From<&Rc<str>> for Key {
    fn from(name: &Rc<str>) -> Self {
        Self::Name(Rc::clone(name))
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

// ─── Callable values ─────────────────────────────────────────────────────────

/// A callable value, used for event handler props.
#[derive(Clone)]
pub struct Func(Rc<dyn Fn(&[Value]) -> Value>);

impl Func {
    pub fn new(f: impl Fn(&[Value]) -> Value + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Handler that ignores its return value.
    pub fn handler(f: impl Fn(&[Value]) + 'static) -> Self {
        Self::new(move |args| {
            f(args);
            Value::Null
        })
    }

    pub fn call(&self, args: &[Value]) -> Value {
        (self.0)(args)
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Func({:p})", Rc::as_ptr(&self.0).cast::<()>())
    }
}

// ─── Object ──────────────────────────────────────────────────────────────────

struct ObjectInner {
    id: TargetId,
    entries: RefCell<IndexMap<Rc<str>, Value>>,
}

impl Drop for ObjectInner {
    fn drop(&mut self) {
        dep::forget_target(self.id);
    }
}

/// A raw, insertion-ordered map container.
///
/// Cloning an `Object` creates a new handle to the **same** entries.
#[derive(Clone)]
pub struct Object {
    inner: Rc<ObjectInner>,
}

impl Object {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ObjectInner {
                id: TargetId::next(),
                entries: RefCell::new(IndexMap::new()),
            }),
        }
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(self, key: impl Into<Rc<str>>, value: impl Into<Value>) -> Self {
        self.insert_raw(key, value);
        self
    }

    #[must_use]
    pub fn id(&self) -> TargetId {
        self.inner.id
    }

    /// Read without tracking. Missing keys read as [`Value::Null`].
    #[must_use]
    pub fn get_raw(&self, key: &str) -> Value {
        self.inner
            .entries
            .borrow()
            .get(key)
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Write without triggering. Returns the previous value, if any.
    pub fn insert_raw(&self, key: impl Into<Rc<str>>, value: impl Into<Value>) -> Option<Value> {
        self.inner
            .entries
            .borrow_mut()
            .insert(key.into(), value.into())
    }

    /// Remove without triggering, preserving the order of the remaining keys.
    pub fn remove_raw(&self, key: &str) -> Option<Value> {
        self.inner.entries.borrow_mut().shift_remove(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.entries.borrow().contains_key(key)
    }

    #[must_use]
    pub fn keys(&self) -> Vec<Rc<str>> {
        self.inner.entries.borrow().keys().cloned().collect()
    }

    /// Snapshot of all entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> Vec<(Rc<str>, Value)> {
        self.inner
            .entries
            .borrow()
            .iter()
            .map(|(k, v)| (Rc::clone(k), v.clone()))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.entries.borrow().is_empty()
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<Rc<str>>, V: Into<Value>> FromIterator<(K, V)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let object = Self::new();
        for (key, value) in iter {
            object.insert_raw(key, value);
        }
        object
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.inner.entries.borrow().iter())
            .finish()
    }
}

// ─── Array ───────────────────────────────────────────────────────────────────

struct ArrayInner {
    id: TargetId,
    items: RefCell<Vec<Value>>,
}

impl Drop for ArrayInner {
    fn drop(&mut self) {
        dep::forget_target(self.id);
    }
}

/// A raw list container.
///
/// Cloning an `Array` creates a new handle to the **same** items.
#[derive(Clone)]
pub struct Array {
    inner: Rc<ArrayInner>,
}

impl Array {
    #[must_use]
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    #[must_use]
    pub fn from_vec(items: Vec<Value>) -> Self {
        Self {
            inner: Rc::new(ArrayInner {
                id: TargetId::next(),
                items: RefCell::new(items),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> TargetId {
        self.inner.id
    }

    /// Read without tracking. Out-of-range reads yield [`Value::Null`].
    #[must_use]
    pub fn get_raw(&self, index: usize) -> Value {
        self.inner
            .items
            .borrow()
            .get(index)
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Write without triggering. Writing past the end pads with nulls.
    ///
    /// Returns `true` when the array grew.
    pub fn set_raw(&self, index: usize, value: impl Into<Value>) -> bool {
        let mut items = self.inner.items.borrow_mut();
        let grew = index >= items.len();
        if grew {
            items.resize(index + 1, Value::Null);
        }
        items[index] = value.into();
        grew
    }

    pub fn push_raw(&self, value: impl Into<Value>) -> usize {
        let mut items = self.inner.items.borrow_mut();
        items.push(value.into());
        items.len() - 1
    }

    /// Remove the item at `index`, shifting later items down.
    pub fn remove_raw(&self, index: usize) -> Option<Value> {
        let mut items = self.inner.items.borrow_mut();
        (index < items.len()).then(|| items.remove(index))
    }

    /// Truncate or pad to `len`. Returns the previous length.
    pub fn set_len_raw(&self, len: usize) -> usize {
        let mut items = self.inner.items.borrow_mut();
        let previous = items.len();
        items.resize(len, Value::Null);
        previous
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.items.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.items.borrow().is_empty()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<Value> {
        self.inner.items.borrow().clone()
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Array {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Into<Value>> FromIterator<V> for Array {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.inner.items.borrow().iter()).finish()
    }
}

// ─── Container ───────────────────────────────────────────────────────────────

/// Result of a raw container write.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct WriteOutcome {
    /// A key that did not exist before now exists (or an array grew).
    pub added: bool,
    /// Array indices cut off by a `length` write.
    pub truncated: Range<usize>,
}

/// Either raw container kind.
#[derive(Clone, Debug)]
pub enum Container {
    Object(Object),
    Array(Array),
}

impl Container {
    #[must_use]
    pub fn id(&self) -> TargetId {
        match self {
            Self::Object(object) => object.id(),
            Self::Array(array) => array.id(),
        }
    }

    /// Read without tracking.
    #[must_use]
    pub fn get_raw(&self, key: &Key) -> Value {
        match self {
            Self::Object(object) => object.get_raw(&key.to_name()),
            Self::Array(array) => {
                if key.is_name(LENGTH_KEY) {
                    return Value::Int(array.len() as i64);
                }
                key.to_index()
                    .map_or(Value::Null, |index| array.get_raw(index))
            }
        }
    }

    pub(crate) fn set_raw(&self, key: &Key, value: Value) -> Result<WriteOutcome> {
        match self {
            Self::Object(object) => {
                let previous = object.insert_raw(key.to_name(), value);
                Ok(WriteOutcome {
                    added: previous.is_none(),
                    ..WriteOutcome::default()
                })
            }
            Self::Array(array) => {
                if key.is_name(LENGTH_KEY) {
                    let len = value
                        .as_i64()
                        .and_then(|len| usize::try_from(len).ok())
                        .ok_or_else(|| ReactivityError::InvalidArrayKey {
                            key: format!("{LENGTH_KEY}={value:?}"),
                        })?;
                    let previous = array.set_len_raw(len);
                    return Ok(WriteOutcome {
                        added: false,
                        truncated: len..previous.max(len),
                    });
                }
                let index = key
                    .to_index()
                    .ok_or_else(|| ReactivityError::InvalidArrayKey {
                        key: key.to_string(),
                    })?;
                Ok(WriteOutcome {
                    added: array.set_raw(index, value),
                    ..WriteOutcome::default()
                })
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Object(object) => object.len(),
            Self::Array(array) => array.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            (Self::Array(a), Self::Array(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Object(object) => Value::Object(object.clone()),
            Self::Array(array) => Value::Array(array.clone()),
        }
    }
}

// ─── Value ───────────────────────────────────────────────────────────────────

/// A dynamically typed value.
///
/// Equality (`==`) is SameValueZero: numbers compare numerically with
/// `NaN == NaN` and `0.0 == -0.0`; strings compare by content; containers,
/// refs, computed values and functions compare by identity.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Object(Object),
    Array(Array),
    Proxy(Reactive),
    Ref(Ref),
    Computed(Computed<Value>),
    Func(Func),
}

impl Value {
    /// Short name of the variant, for diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Object(_) => "object",
            Self::Array(_) => "array",
            Self::Proxy(_) => "proxy",
            Self::Ref(_) => "ref",
            Self::Computed(_) => "computed",
            Self::Func(_) => "function",
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Raw object or array.
    #[must_use]
    pub const fn is_container(&self) -> bool {
        matches!(self, Self::Object(_) | Self::Array(_))
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_array(&self) -> Option<&Array> {
        match self {
            Self::Array(array) => Some(array),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_proxy(&self) -> Option<&Reactive> {
        match self {
            Self::Proxy(proxy) => Some(proxy),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_ref_cell(&self) -> Option<&Ref> {
        match self {
            Self::Ref(r) => Some(r),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_func(&self) -> Option<&Func> {
        match self {
            Self::Func(func) => Some(func),
            _ => None,
        }
    }

    /// Raw container behind an object, array or proxy.
    #[must_use]
    pub fn container(&self) -> Option<Container> {
        match self {
            Self::Object(object) => Some(Container::Object(object.clone())),
            Self::Array(array) => Some(Container::Array(array.clone())),
            Self::Proxy(proxy) => Some(proxy.target().clone()),
            _ => None,
        }
    }

    /// Text form used when a value is rendered as text content.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Str(s) => s.to_string(),
            other => format!("{other:?}"),
        }
    }

    /// SameValueZero comparison.
    #[must_use]
    pub fn same_value_zero(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Self::Int(a), Self::Float(b)) | (Self::Float(b), Self::Int(a)) => (*a as f64) == *b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            (Self::Array(a), Self::Array(b)) => a.ptr_eq(b),
            (Self::Proxy(a), Self::Proxy(b)) => a == b,
            (Self::Ref(a), Self::Ref(b)) => a.ptr_eq(b),
            (Self::Computed(a), Self::Computed(b)) => a.ptr_eq(b),
            (Self::Func(a), Self::Func(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

/// `true` when `value` differs from `previous` under SameValueZero.
#[must_use]
pub fn has_changed(value: &Value, previous: &Value) -> bool {
    !value.same_value_zero(previous)
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same_value_zero(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Object(object) => object.fmt(f),
            Self::Array(array) => array.fmt(f),
            Self::Proxy(proxy) => proxy.fmt(f),
            Self::Ref(r) => r.fmt(f),
            Self::Computed(c) => c.fmt(f),
            Self::Func(func) => func.fmt(f),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => |$v:ident| $e:expr),* $(,)?) => {
        $(impl From<$ty> for Value {
            fn from($v: $ty) -> Self {
                $e
            }
        })*
    };
}

value_from! {
    bool => |v| Self::Bool(v),
    i32 => |v| Self::Int(i64::from(v)),
    i64 => |v| Self::Int(v),
    u32 => |v| Self::Int(i64::from(v)),
    usize => |v| Self::Int(v as i64),
    f64 => |v| Self::Float(v),
    &str => |v| Self::Str(Rc::from(v)),
    String => |v| Self::Str(Rc::from(v)),
    Rc<str> => |v| Self::Str(v),
    Object => |v| Self::Object(v),
    Array => |v| Self::Array(v),
    Reactive => |v| Self::Proxy(v),
    Ref => |v| Self::Ref(v),
    Computed<Value> => |v| Self::Computed(v),
    Func => |v| Self::Func(v),
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Self::Null
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<Container> for Value {
    fn from(container: Container) -> Self {
        container.to_value()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
