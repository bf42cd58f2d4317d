#![forbid(unsafe_code)]

//! The renderer: mounts, patches and unmounts vnode trees on a host.
//!
//! # Design
//!
//! [`Renderer::render`] diffs a new root vnode against the one previously
//! rendered into the same container. `patch` dispatches on the new node's
//! type. Two nodes that are not [`same_type`](crate::VNode::same_type) are
//! never patched into each other: the new node is mounted in the old one's
//! place and the old one is unmounted.
//!
//! Host nodes live on the vnodes (`el`, and `anchor` for a fragment's end
//! marker). A patched vnode inherits its predecessor's host nodes.
//!
//! # Invariants
//!
//! 1. After a patch, every mounted vnode's `el` is the host node that
//!    currently represents it.
//! 2. Host props equal the new vnode's props, minus `key`.
//! 3. Children end up in new-list order, anchored before the next sibling
//!    (or the parent's tail anchor).
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Component without render function | `Err(MissingRender)` from the mount |
//! | Render error in a scheduled update | Logged; previous subtree kept |

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use sprout_reactivity::{Object, Value};
use tracing::{debug, trace};

use crate::app::{App, create_app};
use crate::component::{Component, ComponentInstance};
use crate::error::Result;
use crate::host::{HostAdapter, HostNode};
use crate::vnode::{Children, KEY_PROP, VNodeRef, VNodeType};

/// Drives a [`HostAdapter`] from vnode trees.
pub struct Renderer<H> {
    host: H,
    roots: RefCell<AHashMap<HostNode, VNodeRef>>,
    pub(crate) weak_self: Weak<Self>,
}

impl<H: HostAdapter + 'static> Renderer<H> {
    /// Wrap `host`. Renderers are shared: component render effects hold a
    /// weak handle back to the renderer that mounted them.
    #[must_use]
    pub fn new(host: H) -> Rc<Self> {
        Rc::new_cyclic(|weak_self| Self {
            host,
            roots: RefCell::new(AHashMap::new()),
            weak_self: weak_self.clone(),
        })
    }

    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Root vnode last rendered into `container`.
    #[must_use]
    pub fn root(&self, container: HostNode) -> Option<VNodeRef> {
        self.roots.borrow().get(&container).cloned()
    }

    /// Render `vnode` into `container`, patching against whatever was
    /// rendered there before. `None` unmounts the previous tree.
    ///
    /// # Errors
    ///
    /// Fails when a component being mounted has no render function.
    pub fn render(&self, vnode: Option<&VNodeRef>, container: HostNode) -> Result<()> {
        let previous = self.roots.borrow_mut().remove(&container);
        match (previous, vnode) {
            (Some(previous), None) => {
                debug!(container = container.raw(), "unmounting root");
                self.unmount(&previous, true);
            }
            (previous, Some(vnode)) => {
                self.patch(previous.as_ref(), vnode, container, None, None)?;
                self.roots.borrow_mut().insert(container, Rc::clone(vnode));
            }
            (None, None) => {}
        }
        Ok(())
    }

    /// Start an application rooted at `root`.
    #[must_use]
    pub fn create_app(self: &Rc<Self>, root: &Rc<Component>) -> App<H> {
        create_app(self, root)
    }

    // ─── Dispatch ───────────────────────────────────────────────────────────

    pub(crate) fn patch(
        &self,
        old: Option<&VNodeRef>,
        new: &VNodeRef,
        container: HostNode,
        parent: Option<&Rc<ComponentInstance>>,
        anchor: Option<HostNode>,
    ) -> Result<()> {
        if let Some(prev) = old {
            if Rc::ptr_eq(prev, new) {
                return Ok(());
            }
            if !prev.same_type(new) {
                trace!(old = ?prev.ty(), new = ?new.ty(), "replacing node of different type");
                self.patch(None, new, container, parent, prev.el())?;
                self.unmount(prev, true);
                return Ok(());
            }
        }

        match new.ty() {
            VNodeType::Text => {
                self.process_text(old, new, container, anchor);
                Ok(())
            }
            VNodeType::Fragment => self.process_fragment(old, new, container, parent, anchor),
            VNodeType::Element(tag) => match old {
                None => self.mount_element(tag, new, container, parent, anchor),
                Some(prev) => self.patch_element(prev, new, container, parent, anchor),
            },
            VNodeType::Component(component) => match old {
                None => self.mount_component(component, new, container, parent, anchor),
                Some(prev) => self.update_component(prev, new),
            },
        }
    }

    // ─── Text ───────────────────────────────────────────────────────────────

    fn process_text(
        &self,
        old: Option<&VNodeRef>,
        new: &VNodeRef,
        container: HostNode,
        anchor: Option<HostNode>,
    ) {
        let content = new.children().as_text().unwrap_or_default();
        match old.and_then(|prev| prev.el().map(|el| (prev, el))) {
            Some((prev, el)) => {
                new.el.set(Some(el));
                if prev.children().as_text().unwrap_or_default() != content {
                    self.host.set_text(el, content);
                }
            }
            None => {
                let el = self.host.create_text(content);
                new.el.set(Some(el));
                self.host.insert(el, container, anchor);
            }
        }
    }

    // ─── Fragment ───────────────────────────────────────────────────────────

    fn process_fragment(
        &self,
        old: Option<&VNodeRef>,
        new: &VNodeRef,
        container: HostNode,
        parent: Option<&Rc<ComponentInstance>>,
        anchor: Option<HostNode>,
    ) -> Result<()> {
        match old {
            None => {
                let start = self.host.create_text("");
                let end = self.host.create_text("");
                new.el.set(Some(start));
                new.anchor.set(Some(end));
                self.host.insert(start, container, anchor);
                self.host.insert(end, container, anchor);
                if let Some(children) = new.children().as_nodes() {
                    self.mount_children(children, container, parent, Some(end))?;
                }
                Ok(())
            }
            Some(prev) => {
                new.el.set(prev.el());
                new.anchor.set(prev.anchor.get());
                self.patch_children(prev, new, container, parent, prev.anchor.get())
            }
        }
    }

    // ─── Element ────────────────────────────────────────────────────────────

    fn mount_element(
        &self,
        tag: &str,
        vnode: &VNodeRef,
        container: HostNode,
        parent: Option<&Rc<ComponentInstance>>,
        anchor: Option<HostNode>,
    ) -> Result<()> {
        let el = self.host.create_element(tag);
        vnode.el.set(Some(el));

        match vnode.children() {
            Children::Text(content) => self.host.set_element_text(el, content),
            Children::Nodes(children) => self.mount_children(children, el, parent, None)?,
            Children::Slots(_) | Children::None => {}
        }

        for (key, value) in vnode.props().entries() {
            if &*key != KEY_PROP {
                self.host.patch_prop(el, &key, &Value::Null, &value);
            }
        }

        self.host.insert(el, container, anchor);
        Ok(())
    }

    fn patch_element(
        &self,
        old: &VNodeRef,
        new: &VNodeRef,
        container: HostNode,
        parent: Option<&Rc<ComponentInstance>>,
        anchor: Option<HostNode>,
    ) -> Result<()> {
        let Some(el) = old.el() else {
            let VNodeType::Element(tag) = new.ty() else {
                return Ok(());
            };
            return self.mount_element(tag, new, container, parent, anchor);
        };
        new.el.set(Some(el));
        self.patch_children(old, new, el, parent, None)?;
        self.patch_props(el, old.props(), new.props());
        Ok(())
    }

    /// Bring `el`'s props from `old` to `new`. `key` is never forwarded.
    pub(crate) fn patch_props(&self, el: HostNode, old: &Object, new: &Object) {
        if old.ptr_eq(new) {
            return;
        }
        for (key, next) in new.entries() {
            if &*key == KEY_PROP {
                continue;
            }
            let prev = old.get_raw(&key);
            if prev != next {
                self.host.patch_prop(el, &key, &prev, &next);
            }
        }
        for (key, prev) in old.entries() {
            if &*key != KEY_PROP && !new.contains_key(&key) {
                self.host.patch_prop(el, &key, &prev, &Value::Null);
            }
        }
    }

    // ─── Children ───────────────────────────────────────────────────────────

    /// Diff `old`'s children into `new`'s inside `container`.
    ///
    /// `tail_anchor` is the host node the last child sits before: `None` for
    /// an element, the end marker for a fragment.
    /// Text arms only fire for element containers; fragments always carry a
    /// node list (see [`VNode::new`](crate::vnode::VNode::new)).
    fn patch_children(
        &self,
        old: &VNodeRef,
        new: &VNodeRef,
        container: HostNode,
        parent: Option<&Rc<ComponentInstance>>,
        tail_anchor: Option<HostNode>,
    ) -> Result<()> {
        match (old.children(), new.children()) {
            (Children::Nodes(prev), Children::Nodes(next)) => {
                self.patch_keyed_children(prev, next, container, parent, tail_anchor)
            }
            (Children::Nodes(prev), Children::Text(content)) => {
                self.unmount_children(prev);
                self.host.set_element_text(container, content);
                Ok(())
            }
            (Children::Nodes(prev), Children::None | Children::Slots(_)) => {
                self.unmount_children(prev);
                Ok(())
            }
            (Children::Text(prev), Children::Text(content)) => {
                if prev != content {
                    self.host.set_element_text(container, content);
                }
                Ok(())
            }
            (Children::Text(_), Children::Nodes(next)) => {
                self.host.set_element_text(container, "");
                self.mount_children(next, container, parent, tail_anchor)
            }
            (Children::Text(_), Children::None | Children::Slots(_)) => {
                self.host.set_element_text(container, "");
                Ok(())
            }
            (Children::None | Children::Slots(_), Children::Text(content)) => {
                self.host.set_element_text(container, content);
                Ok(())
            }
            (Children::None | Children::Slots(_), Children::Nodes(next)) => {
                self.mount_children(next, container, parent, tail_anchor)
            }
            (Children::None | Children::Slots(_), Children::None | Children::Slots(_)) => Ok(()),
        }
    }

    pub(crate) fn mount_children(
        &self,
        children: &[VNodeRef],
        container: HostNode,
        parent: Option<&Rc<ComponentInstance>>,
        anchor: Option<HostNode>,
    ) -> Result<()> {
        for child in children {
            self.patch(None, child, container, parent, anchor)?;
        }
        Ok(())
    }

    fn unmount_children(&self, children: &[VNodeRef]) {
        for child in children {
            self.unmount(child, true);
        }
    }

    // ─── Unmount and move ───────────────────────────────────────────────────

    /// Tear `vnode` down. With `remove`, its host nodes are detached too;
    /// without, only component effects are stopped (an ancestor's removal
    /// takes the host nodes with it).
    pub(crate) fn unmount(&self, vnode: &VNodeRef, remove: bool) {
        match vnode.ty() {
            VNodeType::Component(_) => {
                if let Some(instance) = vnode.component() {
                    debug!(component = instance.name(), uid = instance.uid(), "unmounting component");
                    if let Some(subtree) = instance.teardown() {
                        self.unmount(&subtree, remove);
                    }
                }
            }
            VNodeType::Fragment => {
                if let Some(children) = vnode.children().as_nodes() {
                    for child in children {
                        self.unmount(child, remove);
                    }
                }
                if remove {
                    for marker in [vnode.el(), vnode.anchor.get()].into_iter().flatten() {
                        self.host.remove(marker);
                    }
                }
            }
            VNodeType::Element(_) => {
                if let Some(children) = vnode.children().as_nodes() {
                    for child in children {
                        self.unmount(child, false);
                    }
                }
                if remove && let Some(el) = vnode.el() {
                    self.host.remove(el);
                }
            }
            VNodeType::Text => {
                if remove && let Some(el) = vnode.el() {
                    self.host.remove(el);
                }
            }
        }
    }

    /// Re-insert every host node of `vnode` before `anchor`.
    pub(crate) fn move_vnode(&self, vnode: &VNodeRef, container: HostNode, anchor: Option<HostNode>) {
        match vnode.ty() {
            VNodeType::Component(_) => {
                if let Some(subtree) = vnode.component().and_then(|instance| instance.subtree()) {
                    self.move_vnode(&subtree, container, anchor);
                }
            }
            VNodeType::Fragment => {
                if let Some(start) = vnode.el() {
                    self.host.insert(start, container, anchor);
                }
                if let Some(children) = vnode.children().as_nodes() {
                    for child in children {
                        self.move_vnode(child, container, anchor);
                    }
                }
                if let Some(end) = vnode.anchor.get() {
                    self.host.insert(end, container, anchor);
                }
            }
            VNodeType::Element(_) | VNodeType::Text => {
                if let Some(el) = vnode.el() {
                    self.host.insert(el, container, anchor);
                }
            }
        }
    }
}

impl<H> std::fmt::Debug for Renderer<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("roots", &self.roots.borrow().len())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
