#![forbid(unsafe_code)]

//! Arena-backed [`HostAdapter`] that records every operation.
//!
//! `MemoryHost` is the reference host for headless use. Tests assert on its
//! operation log to check that a diff produced exactly the expected
//! creations, moves and removals, and on [`serialize`](MemoryHost::serialize)
//! to check the resulting tree.
//!
//! Handles are arena indices. Passing a handle from another host panics.

use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::Rc;

use indexmap::IndexMap;
use sprout_reactivity::{Func, Value};
use tracing::trace;

use crate::host::{HostAdapter, HostNode, is_on};

/// One recorded host call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOp {
    CreateElement {
        node: HostNode,
        tag: String,
    },
    CreateText {
        node: HostNode,
        text: String,
    },
    SetText {
        node: HostNode,
        text: String,
    },
    /// `value` is `None` when the property was cleared.
    PatchProp {
        node: HostNode,
        key: String,
        value: Option<String>,
    },
    Insert {
        node: HostNode,
        parent: HostNode,
        anchor: Option<HostNode>,
    },
    Remove {
        node: HostNode,
    },
    SetElementText {
        node: HostNode,
        text: String,
    },
}

impl HostOp {
    /// The node the operation acted on.
    #[must_use]
    pub fn node(&self) -> HostNode {
        match self {
            Self::CreateElement { node, .. }
            | Self::CreateText { node, .. }
            | Self::SetText { node, .. }
            | Self::PatchProp { node, .. }
            | Self::Insert { node, .. }
            | Self::Remove { node }
            | Self::SetElementText { node, .. } => *node,
        }
    }

    /// Creations, insertions and removals; everything that changes the tree
    /// shape rather than node content.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::CreateElement { .. }
                | Self::CreateText { .. }
                | Self::Insert { .. }
                | Self::Remove { .. }
        )
    }
}

#[derive(Debug, Clone)]
enum NodeKind {
    Root,
    Element(Rc<str>),
    Text(String),
}

#[derive(Debug)]
struct NodeData {
    kind: NodeKind,
    attrs: IndexMap<String, String>,
    listeners: IndexMap<String, Func>,
    children: Vec<HostNode>,
    parent: Option<HostNode>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            attrs: IndexMap::new(),
            listeners: IndexMap::new(),
            children: Vec::new(),
            parent: None,
        }
    }
}

#[derive(Debug, Default)]
struct Arena {
    nodes: Vec<NodeData>,
    ops: Vec<HostOp>,
}

impl Arena {
    fn alloc(&mut self, kind: NodeKind) -> HostNode {
        let node = HostNode::from_raw(self.nodes.len() as u64);
        self.nodes.push(NodeData::new(kind));
        node
    }

    fn node(&self, node: HostNode) -> &NodeData {
        &self.nodes[node.raw() as usize]
    }

    fn node_mut(&mut self, node: HostNode) -> &mut NodeData {
        &mut self.nodes[node.raw() as usize]
    }

    fn detach(&mut self, node: HostNode) {
        if let Some(parent) = self.node_mut(node).parent.take() {
            self.node_mut(parent).children.retain(|child| *child != node);
        }
    }
}

/// An in-memory output tree.
#[derive(Debug, Default)]
pub struct MemoryHost {
    arena: RefCell<Arena>,
}

impl MemoryHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detached container to render into. Not logged.
    pub fn create_root(&self) -> HostNode {
        self.arena.borrow_mut().alloc(NodeKind::Root)
    }

    /// Snapshot of the operation log.
    #[must_use]
    pub fn ops(&self) -> Vec<HostOp> {
        self.arena.borrow().ops.clone()
    }

    /// Drain the operation log.
    pub fn take_ops(&self) -> Vec<HostOp> {
        std::mem::take(&mut self.arena.borrow_mut().ops)
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.arena.borrow().nodes.len()
    }

    #[must_use]
    pub fn children(&self, node: HostNode) -> Vec<HostNode> {
        self.arena.borrow().node(node).children.clone()
    }

    #[must_use]
    pub fn parent(&self, node: HostNode) -> Option<HostNode> {
        self.arena.borrow().node(node).parent
    }

    /// Element tag, or `None` for text and root nodes.
    #[must_use]
    pub fn tag(&self, node: HostNode) -> Option<String> {
        match &self.arena.borrow().node(node).kind {
            NodeKind::Element(tag) => Some(tag.to_string()),
            _ => None,
        }
    }

    #[must_use]
    pub fn attr(&self, node: HostNode, key: &str) -> Option<String> {
        self.arena.borrow().node(node).attrs.get(key).cloned()
    }

    #[must_use]
    pub fn has_listener(&self, node: HostNode, event: &str) -> bool {
        self.arena
            .borrow()
            .node(node)
            .listeners
            .contains_key(&event.to_ascii_lowercase())
    }

    /// Concatenated text of `node` and its descendants.
    #[must_use]
    pub fn text_content(&self, node: HostNode) -> String {
        let arena = self.arena.borrow();
        let mut out = String::new();
        collect_text(&arena, node, &mut out);
        out
    }

    /// Invoke the listener registered for `event` on `node`.
    ///
    /// Returns `false` when no listener is registered.
    pub fn dispatch(&self, node: HostNode, event: &str, args: &[Value]) -> bool {
        let listener = self
            .arena
            .borrow()
            .node(node)
            .listeners
            .get(&event.to_ascii_lowercase())
            .cloned();
        match listener {
            Some(listener) => {
                trace!(node = node.raw(), event, "dispatch");
                listener.call(args);
                true
            }
            None => false,
        }
    }

    /// Markup form of the subtree rooted at `node`.
    ///
    /// Root containers serialize as their children only.
    #[must_use]
    pub fn serialize(&self, node: HostNode) -> String {
        let arena = self.arena.borrow();
        let mut out = String::new();
        write_markup(&arena, node, &mut out);
        out
    }
}

fn collect_text(arena: &Arena, node: HostNode, out: &mut String) {
    let data = arena.node(node);
    if let NodeKind::Text(text) = &data.kind {
        out.push_str(text);
    }
    for child in &data.children {
        collect_text(arena, *child, out);
    }
}

fn write_markup(arena: &Arena, node: HostNode, out: &mut String) {
    let data = arena.node(node);
    match &data.kind {
        NodeKind::Text(text) => out.push_str(text),
        NodeKind::Root => {
            for child in &data.children {
                write_markup(arena, *child, out);
            }
        }
        NodeKind::Element(tag) => {
            out.push('<');
            out.push_str(tag);
            for (key, value) in &data.attrs {
                let _ = write!(out, " {key}=\"{value}\"");
            }
            out.push('>');
            for child in &data.children {
                write_markup(arena, *child, out);
            }
            let _ = write!(out, "</{tag}>");
        }
    }
}

fn prop_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Func(_) => Some("<fn>".into()),
        other => Some(other.to_text()),
    }
}

impl HostAdapter for MemoryHost {
    fn create_element(&self, tag: &str) -> HostNode {
        let mut arena = self.arena.borrow_mut();
        let node = arena.alloc(NodeKind::Element(Rc::from(tag)));
        arena.ops.push(HostOp::CreateElement {
            node,
            tag: tag.to_owned(),
        });
        node
    }

    fn create_text(&self, text: &str) -> HostNode {
        let mut arena = self.arena.borrow_mut();
        let node = arena.alloc(NodeKind::Text(text.to_owned()));
        arena.ops.push(HostOp::CreateText {
            node,
            text: text.to_owned(),
        });
        node
    }

    fn set_text(&self, node: HostNode, text: &str) {
        let mut arena = self.arena.borrow_mut();
        if let NodeKind::Text(content) = &mut arena.node_mut(node).kind {
            text.clone_into(content);
        }
        arena.ops.push(HostOp::SetText {
            node,
            text: text.to_owned(),
        });
    }

    fn patch_prop(&self, node: HostNode, key: &str, _prev: &Value, next: &Value) {
        let mut arena = self.arena.borrow_mut();
        let data = arena.node_mut(node);
        if is_on(key) {
            let event = key[2..].to_ascii_lowercase();
            match next.as_func() {
                Some(handler) => {
                    data.listeners.insert(event, handler.clone());
                }
                None => {
                    data.listeners.shift_remove(&event);
                }
            }
        } else {
            match prop_text(next) {
                Some(value) => {
                    data.attrs.insert(key.to_owned(), value);
                }
                None => {
                    data.attrs.shift_remove(key);
                }
            }
        }
        arena.ops.push(HostOp::PatchProp {
            node,
            key: key.to_owned(),
            value: prop_text(next),
        });
    }

    fn insert(&self, node: HostNode, parent: HostNode, anchor: Option<HostNode>) {
        let mut arena = self.arena.borrow_mut();
        arena.detach(node);
        let siblings = &mut arena.node_mut(parent).children;
        let position = anchor
            .and_then(|anchor| siblings.iter().position(|child| *child == anchor))
            .unwrap_or(siblings.len());
        siblings.insert(position, node);
        arena.node_mut(node).parent = Some(parent);
        arena.ops.push(HostOp::Insert {
            node,
            parent,
            anchor,
        });
    }

    fn remove(&self, node: HostNode) {
        let mut arena = self.arena.borrow_mut();
        arena.detach(node);
        arena.ops.push(HostOp::Remove { node });
    }

    fn set_element_text(&self, node: HostNode, text: &str) {
        let mut arena = self.arena.borrow_mut();
        let children = std::mem::take(&mut arena.node_mut(node).children);
        for child in children {
            arena.node_mut(child).parent = None;
        }
        if !text.is_empty() {
            let content = arena.alloc(NodeKind::Text(text.to_owned()));
            arena.node_mut(content).parent = Some(node);
            arena.node_mut(node).children.push(content);
        }
        arena.ops.push(HostOp::SetElementText {
            node,
            text: text.to_owned(),
        });
    }
}
