#![forbid(unsafe_code)]

//! Named slot content passed from a parent to a component.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use sprout_reactivity::Value;

use crate::vnode::{VNodeRef, fragment};

/// A slot function: slot props in, vnodes out.
pub type SlotFn = Rc<dyn Fn(&Value) -> Vec<VNodeRef>>;

/// Named slot functions, in declaration order.
///
/// Cloning a `Slots` shares the underlying functions.
#[derive(Clone, Default)]
pub struct Slots {
    slots: IndexMap<Rc<str>, SlotFn>,
}

impl Slots {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a slot producing a list of nodes.
    #[must_use]
    pub fn with(mut self, name: &str, slot: impl Fn(&Value) -> Vec<VNodeRef> + 'static) -> Self {
        self.slots.insert(Rc::from(name), Rc::new(slot));
        self
    }

    /// Add a slot producing a single node.
    #[must_use]
    pub fn with_node(self, name: &str, slot: impl Fn(&Value) -> VNodeRef + 'static) -> Self {
        self.with(name, move |props| vec![slot(props)])
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SlotFn> {
        self.slots.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(|name| &**name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl fmt::Debug for Slots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// Render slot `name` with `props` into a fragment.
///
/// A missing slot renders as an empty fragment.
pub fn render_slot(slots: &Slots, name: &str, props: impl Into<Value>) -> VNodeRef {
    let props = props.into();
    let children = slots.get(name).map_or_else(Vec::new, |slot| slot(&props));
    fragment(children)
}
