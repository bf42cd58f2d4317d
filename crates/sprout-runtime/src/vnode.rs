#![forbid(unsafe_code)]

//! Virtual nodes.
//!
//! A [`VNode`] describes one element, component, text leaf or fragment for a
//! single render pass. The renderer fills in its host handle when it is
//! mounted; the previous pass's tree is kept only as the diff baseline.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use sprout_reactivity::{Object, Value};

use crate::component::{Component, ComponentInstance};
use crate::host::HostNode;
use crate::shape::ShapeFlags;
use crate::slots::Slots;

pub type VNodeRef = Rc<VNode>;

/// Reserved prop naming a vnode's identity among its siblings.
pub const KEY_PROP: &str = "key";

/// What a vnode renders to.
#[derive(Clone)]
pub enum VNodeType {
    Element(Rc<str>),
    Component(Rc<Component>),
    Text,
    Fragment,
}

impl PartialEq for VNodeType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Element(a), Self::Element(b)) => a == b,
            (Self::Component(a), Self::Component(b)) => Rc::ptr_eq(a, b),
            (Self::Text, Self::Text) | (Self::Fragment, Self::Fragment) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for VNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Element(tag) => write!(f, "Element({tag})"),
            Self::Component(component) => write!(f, "Component({})", component.name()),
            Self::Text => f.write_str("Text"),
            Self::Fragment => f.write_str("Fragment"),
        }
    }
}

impl From<&str> for VNodeType {
    fn from(tag: &str) -> Self {
        Self::Element(Rc::from(tag))
    }
}

impl From<Rc<Component>> for VNodeType {
    fn from(component: Rc<Component>) -> Self {
        Self::Component(component)
    }
}

impl From<&Rc<Component>> for VNodeType {
    fn from(component: &Rc<Component>) -> Self {
        Self::Component(Rc::clone(component))
    }
}

/// Stable sibling identity taken from the `key` prop.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKey {
    Int(i64),
    Str(Rc<str>),
}

impl NodeKey {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => Some(Self::Int(*i)),
            Value::Str(s) => Some(Self::Str(Rc::clone(s))),
            _ => value.as_i64().map(Self::Int),
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

/// Children of a vnode.
#[derive(Clone, Default)]
pub enum Children {
    #[default]
    None,
    Text(Rc<str>),
    Nodes(Vec<VNodeRef>),
    /// Named slot functions; meaningful on component vnodes only.
    Slots(Slots),
}

impl Children {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_nodes(&self) -> Option<&[VNodeRef]> {
        match self {
            Self::Nodes(nodes) => Some(nodes),
            _ => None,
        }
    }
}

impl fmt::Debug for Children {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Text(text) => write!(f, "Text({text:?})"),
            Self::Nodes(nodes) => f.debug_list().entries(nodes.iter()).finish(),
            Self::Slots(slots) => slots.fmt(f),
        }
    }
}

impl From<()> for Children {
    fn from((): ()) -> Self {
        Self::None
    }
}

impl From<&str> for Children {
    fn from(text: &str) -> Self {
        Self::Text(Rc::from(text))
    }
}

impl From<String> for Children {
    fn from(text: String) -> Self {
        Self::Text(Rc::from(text))
    }
}

impl From<Rc<str>> for Children {
    fn from(text: Rc<str>) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<VNodeRef>> for Children {
    fn from(nodes: Vec<VNodeRef>) -> Self {
        Self::Nodes(nodes)
    }
}

impl From<Slots> for Children {
    fn from(slots: Slots) -> Self {
        Self::Slots(slots)
    }
}

/// One node of a render pass.
pub struct VNode {
    ty: VNodeType,
    props: Object,
    children: Children,
    key: Option<NodeKey>,
    shape: ShapeFlags,
    /// Host node once mounted. For fragments, the start marker; for
    /// components, the first host node of the rendered subtree.
    pub(crate) el: Cell<Option<HostNode>>,
    /// End marker of a mounted fragment.
    pub(crate) anchor: Cell<Option<HostNode>>,
    pub(crate) component: RefCell<Option<Rc<ComponentInstance>>>,
}

impl VNode {
    /// Build a vnode. A fragment's text children become one text vnode, so
    /// fragments only ever hold a node list.
    pub fn new(ty: VNodeType, props: Object, children: Children) -> VNodeRef {
        let children = match (&ty, children) {
            (VNodeType::Fragment, Children::Text(content)) => Children::Nodes(vec![text(content)]),
            (VNodeType::Fragment, Children::Slots(_)) => Children::None,
            (_, children) => children,
        };
        let mut shape = match ty {
            VNodeType::Element(_) => ShapeFlags::ELEMENT,
            VNodeType::Component(_) => ShapeFlags::STATEFUL_COMPONENT,
            VNodeType::Text | VNodeType::Fragment => ShapeFlags::empty(),
        };
        match &children {
            Children::Text(_) => shape |= ShapeFlags::TEXT_CHILDREN,
            Children::Nodes(_) => shape |= ShapeFlags::ARRAY_CHILDREN,
            Children::Slots(_) if shape.contains(ShapeFlags::STATEFUL_COMPONENT) => {
                shape |= ShapeFlags::SLOT_CHILDREN;
            }
            Children::Slots(_) | Children::None => {}
        }
        let key = NodeKey::from_value(&props.get_raw(KEY_PROP));
        Rc::new(Self {
            ty,
            props,
            children,
            key,
            shape,
            el: Cell::new(None),
            anchor: Cell::new(None),
            component: RefCell::new(None),
        })
    }

    #[must_use]
    pub fn ty(&self) -> &VNodeType {
        &self.ty
    }

    #[must_use]
    pub fn props(&self) -> &Object {
        &self.props
    }

    #[must_use]
    pub fn children(&self) -> &Children {
        &self.children
    }

    #[must_use]
    pub fn key(&self) -> Option<&NodeKey> {
        self.key.as_ref()
    }

    #[must_use]
    pub fn shape(&self) -> ShapeFlags {
        self.shape
    }

    /// Host node, once mounted.
    #[must_use]
    pub fn el(&self) -> Option<HostNode> {
        self.el.get()
    }

    /// Component instance behind a mounted component vnode.
    #[must_use]
    pub fn component(&self) -> Option<Rc<ComponentInstance>> {
        self.component.borrow().clone()
    }

    /// Same type and same key: the renderer may patch one into the other.
    #[must_use]
    pub fn same_type(&self, other: &Self) -> bool {
        self.ty == other.ty && self.key == other.key
    }
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VNode")
            .field("ty", &self.ty)
            .field("key", &self.key)
            .field("shape", &self.shape)
            .field("el", &self.el.get())
            .field("children", &self.children)
            .finish()
    }
}

/// Build a vnode.
///
/// `ty` is an element tag or a component; `children` may be text, a list of
/// vnodes, slots (for components), or `()`.
pub fn h(ty: impl Into<VNodeType>, props: Object, children: impl Into<Children>) -> VNodeRef {
    VNode::new(ty.into(), props, children.into())
}

/// Build a text leaf.
pub fn text(content: impl Into<Rc<str>>) -> VNodeRef {
    VNode::new(VNodeType::Text, Object::new(), Children::Text(content.into()))
}

/// Build a fragment: children rendered in place without a wrapper element.
pub fn fragment(children: Vec<VNodeRef>) -> VNodeRef {
    VNode::new(VNodeType::Fragment, Object::new(), Children::Nodes(children))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_follows_children() {
        let leaf = h("p", Object::new(), "hi");
        assert_eq!(leaf.shape(), ShapeFlags::ELEMENT | ShapeFlags::TEXT_CHILDREN);

        let list = h("ul", Object::new(), vec![leaf]);
        assert_eq!(list.shape(), ShapeFlags::ELEMENT | ShapeFlags::ARRAY_CHILDREN);

        let empty = h("br", Object::new(), ());
        assert_eq!(empty.shape(), ShapeFlags::ELEMENT);

        let component = Rc::new(Component::new("Card"));
        let with_slots = h(&component, Object::new(), Slots::new());
        assert_eq!(
            with_slots.shape(),
            ShapeFlags::STATEFUL_COMPONENT | ShapeFlags::SLOT_CHILDREN
        );

        // Slots on an element are ignored.
        let bogus = h("div", Object::new(), Slots::new());
        assert_eq!(bogus.shape(), ShapeFlags::ELEMENT);
    }

    #[test]
    fn fragment_text_becomes_a_text_child() {
        let frag = h(VNodeType::Fragment, Object::new(), "hi");
        let children = frag.children().as_nodes().unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].ty(), &VNodeType::Text);
        assert_eq!(frag.shape(), ShapeFlags::ARRAY_CHILDREN);
    }

    #[test]
    fn key_comes_from_props() {
        let a = h("li", Object::new().with("key", "a"), ());
        let one = h("li", Object::new().with("key", 1), ());
        let none = h("li", Object::new(), ());
        assert_eq!(a.key(), Some(&NodeKey::Str(Rc::from("a"))));
        assert_eq!(one.key(), Some(&NodeKey::Int(1)));
        assert_eq!(none.key(), None);
    }

    #[test]
    fn identity_is_type_and_key() {
        let a1 = h("li", Object::new().with("key", "a"), "1");
        let a2 = h("li", Object::new().with("key", "a"), "2");
        let b = h("li", Object::new().with("key", "b"), "1");
        let div = h("div", Object::new().with("key", "a"), "1");
        assert!(a1.same_type(&a2));
        assert!(!a1.same_type(&b));
        assert!(!a1.same_type(&div));

        let first = Rc::new(Component::new("Same"));
        let second = Rc::new(Component::new("Same"));
        let c1 = h(&first, Object::new(), ());
        let c2 = h(&first, Object::new(), ());
        let c3 = h(&second, Object::new(), ());
        assert!(c1.same_type(&c2));
        assert!(!c1.same_type(&c3), "components compare by descriptor identity");

        assert!(text("x").same_type(&text("y")));
        assert!(fragment(vec![]).same_type(&fragment(vec![])));
    }
}
