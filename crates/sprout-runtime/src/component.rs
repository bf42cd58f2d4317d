#![forbid(unsafe_code)]

//! Component descriptors and instances.
//!
//! A [`Component`] is the user-facing description: a name, an optional
//! `setup` function and an optional `render` function. Mounting a component
//! vnode creates a [`ComponentInstance`], which lives until the vnode is
//! unmounted and carries props, setup state, slots, provides and the render
//! effect across re-renders.
//!
//! # Setup
//!
//! `setup(props, ctx)` runs once, untracked, with a shallow-readonly props
//! view and a [`SetupContext`]. While it runs, the instance is the *current
//! instance* so the free [`provide`](crate::provide)/[`inject`](crate::inject)
//! functions can find it. A scope guard clears the pointer afterwards, also
//! when setup panics.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use sprout_reactivity::{
    Container, Object, ProxyMode, ProxyRefs, Reactive, ReactiveEffect, ReactivityError, Value,
    proxy_refs, untracked,
};
use tracing::warn;

use crate::emit::emit;
use crate::error::{Result, RuntimeError};
use crate::host::HostNode;
use crate::inject::Provides;
use crate::scheduler::{Job, invalidate_job};
use crate::shape::ShapeFlags;
use crate::slots::Slots;
use crate::vnode::{Children, VNodeRef};

/// Produces a component's subtree.
pub type RenderFn = Rc<dyn Fn(&PublicInstance) -> VNodeRef>;

/// Runs once per instance before the first render.
pub type SetupFn = Rc<dyn Fn(&Reactive, &SetupContext) -> SetupResult>;

/// What `setup` hands back.
#[derive(Clone, Default)]
pub enum SetupResult {
    /// Use this as the render function. Takes precedence over the
    /// descriptor's `render`.
    Render(RenderFn),
    /// Expose this object's entries to the render function, with refs
    /// unwrapped.
    State(Value),
    #[default]
    None,
}

impl SetupResult {
    pub fn render(f: impl Fn(&PublicInstance) -> VNodeRef + 'static) -> Self {
        Self::Render(Rc::new(f))
    }

    pub fn state(state: impl Into<Value>) -> Self {
        Self::State(state.into())
    }
}

impl fmt::Debug for SetupResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Render(_) => f.write_str("Render(..)"),
            Self::State(state) => f.debug_tuple("State").field(state).finish(),
            Self::None => f.write_str("None"),
        }
    }
}

/// A component descriptor.
///
/// Vnodes refer to descriptors by `Rc`; two vnodes have the same component
/// type only if they share the same `Rc`.
pub struct Component {
    name: Rc<str>,
    setup: Option<SetupFn>,
    render: Option<RenderFn>,
}

impl Component {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: Rc::from(name),
            setup: None,
            render: None,
        }
    }

    #[must_use]
    pub fn setup(mut self, f: impl Fn(&Reactive, &SetupContext) -> SetupResult + 'static) -> Self {
        self.setup = Some(Rc::new(f));
        self
    }

    #[must_use]
    pub fn render(mut self, f: impl Fn(&PublicInstance) -> VNodeRef + 'static) -> Self {
        self.render = Some(Rc::new(f));
        self
    }

    /// Finish building and share.
    #[must_use]
    pub fn build(self) -> Rc<Self> {
        Rc::new(self)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("setup", &self.setup.is_some())
            .field("render", &self.render.is_some())
            .finish()
    }
}

// ─── Instance ────────────────────────────────────────────────────────────────

static NEXT_UID: AtomicU64 = AtomicU64::new(1);

/// A mounted component.
pub struct ComponentInstance {
    uid: u64,
    ty: Rc<Component>,
    parent: Option<Weak<ComponentInstance>>,
    provides: Rc<Provides>,
    pub(crate) vnode: RefCell<VNodeRef>,
    /// Replacement vnode from a parent-driven update, applied before the
    /// next render.
    pub(crate) next: RefCell<Option<VNodeRef>>,
    props: RefCell<Object>,
    setup_state: RefCell<Option<ProxyRefs>>,
    render: RefCell<Option<RenderFn>>,
    slots: RefCell<Slots>,
    pub(crate) is_mounted: Cell<bool>,
    is_unmounted: Cell<bool>,
    pub(crate) subtree: RefCell<Option<VNodeRef>>,
    pub(crate) update: RefCell<Option<ReactiveEffect>>,
    pub(crate) job: RefCell<Option<Job>>,
    pub(crate) pending_error: RefCell<Option<RuntimeError>>,
}

impl ComponentInstance {
    pub(crate) fn new(
        vnode: &VNodeRef,
        ty: Rc<Component>,
        parent: Option<&Rc<ComponentInstance>>,
    ) -> Rc<Self> {
        let provides = match parent {
            Some(parent) => Provides::child_of(parent.provides()),
            None => Provides::root(),
        };
        Rc::new(Self {
            uid: NEXT_UID.fetch_add(1, Ordering::Relaxed),
            ty,
            parent: parent.map(Rc::downgrade),
            provides,
            vnode: RefCell::new(Rc::clone(vnode)),
            next: RefCell::new(None),
            props: RefCell::new(Object::new()),
            setup_state: RefCell::new(None),
            render: RefCell::new(None),
            slots: RefCell::new(Slots::new()),
            is_mounted: Cell::new(false),
            is_unmounted: Cell::new(false),
            subtree: RefCell::new(None),
            update: RefCell::new(None),
            job: RefCell::new(None),
            pending_error: RefCell::new(None),
        })
    }

    #[must_use]
    pub fn uid(&self) -> u64 {
        self.uid
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.ty.name()
    }

    #[must_use]
    pub fn component(&self) -> &Rc<Component> {
        &self.ty
    }

    #[must_use]
    pub fn parent(&self) -> Option<Rc<ComponentInstance>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    #[must_use]
    pub fn provides(&self) -> &Rc<Provides> {
        &self.provides
    }

    /// The vnode this instance currently renders for.
    #[must_use]
    pub fn vnode(&self) -> VNodeRef {
        Rc::clone(&self.vnode.borrow())
    }

    /// First host node of the rendered subtree (`$el`).
    #[must_use]
    pub fn el(&self) -> Option<HostNode> {
        self.vnode.borrow().el()
    }

    /// Raw props object.
    #[must_use]
    pub fn props(&self) -> Object {
        self.props.borrow().clone()
    }

    /// Shallow-readonly view of the props, as handed to `setup`.
    #[must_use]
    pub fn props_view(&self) -> Reactive {
        Reactive::new(
            Container::Object(self.props()),
            ProxyMode::ShallowReadonly,
        )
    }

    #[must_use]
    pub fn setup_state(&self) -> Option<ProxyRefs> {
        self.setup_state.borrow().clone()
    }

    #[must_use]
    pub fn slots(&self) -> Slots {
        self.slots.borrow().clone()
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.is_mounted.get()
    }

    #[must_use]
    pub fn is_unmounted(&self) -> bool {
        self.is_unmounted.get()
    }

    /// Last rendered subtree.
    #[must_use]
    pub fn subtree(&self) -> Option<VNodeRef> {
        self.subtree.borrow().clone()
    }

    /// The render effect, while mounted.
    #[must_use]
    pub fn update_effect(&self) -> Option<ReactiveEffect> {
        self.update.borrow().clone()
    }

    pub(crate) fn job(&self) -> Option<Job> {
        self.job.borrow().clone()
    }

    pub(crate) fn take_error(&self) -> Option<RuntimeError> {
        self.pending_error.borrow_mut().take()
    }

    /// Emit `event` to the parent's handler prop.
    pub fn emit(&self, event: &str, args: &[Value]) -> Option<Value> {
        emit(self, event, args)
    }

    fn load_vnode_inputs(&self, vnode: &VNodeRef) {
        *self.props.borrow_mut() = vnode.props().clone();
        if vnode.shape().contains(ShapeFlags::SLOT_CHILDREN)
            && let Children::Slots(slots) = vnode.children()
        {
            *self.slots.borrow_mut() = slots.clone();
        }
    }

    /// Resolve props and slots, run `setup`, and settle the render function.
    pub(crate) fn setup(self: &Rc<Self>) -> Result<()> {
        let vnode = self.vnode();
        self.load_vnode_inputs(&vnode);

        let result = match &self.ty.setup {
            Some(setup) => {
                let props = self.props_view();
                let ctx = SetupContext {
                    instance: Rc::clone(self),
                };
                let _current = CurrentInstanceGuard::enter(self);
                untracked(|| setup(&props, &ctx))
            }
            None => SetupResult::None,
        };

        match result {
            SetupResult::Render(render) => *self.render.borrow_mut() = Some(render),
            SetupResult::State(state) => *self.setup_state.borrow_mut() = Some(proxy_refs(state)),
            SetupResult::None => {}
        }

        if self.render.borrow().is_none() {
            let render = self
                .ty
                .render
                .clone()
                .ok_or_else(|| RuntimeError::missing_render(self.name()))?;
            *self.render.borrow_mut() = Some(render);
        }
        Ok(())
    }

    /// Call the render function.
    pub(crate) fn render_subtree(self: &Rc<Self>) -> Result<VNodeRef> {
        let render = self
            .render
            .borrow()
            .clone()
            .ok_or_else(|| RuntimeError::missing_render(self.name()))?;
        let public = PublicInstance {
            instance: Rc::clone(self),
        };
        Ok(render(&public))
    }

    /// Adopt a parent-supplied vnode before re-rendering.
    pub(crate) fn update_pre_render(&self, next: VNodeRef) {
        self.load_vnode_inputs(&next);
        *self.vnode.borrow_mut() = next;
    }

    /// Adopt a parent-supplied vnode whose props did not change.
    pub(crate) fn adopt_vnode(&self, next: VNodeRef) {
        *self.vnode.borrow_mut() = next;
    }

    /// Stop rendering. Returns the subtree so the renderer can unmount it.
    pub(crate) fn teardown(&self) -> Option<VNodeRef> {
        if let Some(job) = self.job.borrow_mut().take() {
            invalidate_job(&job);
        }
        let effect = self.update.borrow_mut().take();
        if let Some(effect) = effect {
            effect.stop();
        }
        self.is_unmounted.set(true);
        // The current vnode points back at this instance.
        self.vnode.borrow().component.borrow_mut().take();
        self.subtree.borrow_mut().take()
    }
}

impl fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("uid", &self.uid)
            .field("name", &self.name())
            .field("mounted", &self.is_mounted.get())
            .field("unmounted", &self.is_unmounted.get())
            .finish()
    }
}

/// `true` when any prop of `new` differs (by identity for containers and
/// functions) from the same prop of `old`, or a prop was added or removed.
#[must_use]
pub fn should_update_component(old: &VNodeRef, new: &VNodeRef) -> bool {
    let (prev, next) = (old.props(), new.props());
    if prev.ptr_eq(next) {
        return false;
    }
    if prev.len() != next.len() {
        return true;
    }
    next.entries()
        .iter()
        .any(|(key, value)| !prev.contains_key(key) || prev.get_raw(key) != *value)
}

// ─── Current instance ────────────────────────────────────────────────────────

thread_local! {
    static CURRENT_INSTANCE: RefCell<Option<Rc<ComponentInstance>>> = const { RefCell::new(None) };
}

/// The instance whose `setup` is running, if any.
#[must_use]
pub fn current_instance() -> Option<Rc<ComponentInstance>> {
    CURRENT_INSTANCE.with(|current| current.borrow().clone())
}

/// Makes an instance current for one `setup` call.
struct CurrentInstanceGuard {
    previous: Option<Rc<ComponentInstance>>,
}

impl CurrentInstanceGuard {
    fn enter(instance: &Rc<ComponentInstance>) -> Self {
        let previous =
            CURRENT_INSTANCE.with(|current| current.replace(Some(Rc::clone(instance))));
        Self { previous }
    }
}

impl Drop for CurrentInstanceGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        let _ = CURRENT_INSTANCE.try_with(|current| current.replace(previous));
    }
}

// ─── Setup context and public instance ──────────────────────────────────────

/// Second argument of `setup`.
#[derive(Clone)]
pub struct SetupContext {
    instance: Rc<ComponentInstance>,
}

impl SetupContext {
    #[must_use]
    pub fn instance(&self) -> &Rc<ComponentInstance> {
        &self.instance
    }

    pub fn emit(&self, event: &str, args: &[Value]) -> Option<Value> {
        self.instance.emit(event, args)
    }

    pub fn provide(&self, key: &str, value: impl Into<Value>) {
        self.instance.provides().provide(key, value);
    }

    /// Nearest ancestor's value for `key`.
    #[must_use]
    pub fn inject(&self, key: &str) -> Option<Value> {
        self.instance
            .provides()
            .parent()
            .and_then(|bag| bag.lookup(key))
    }

    #[must_use]
    pub fn inject_or(&self, key: &str, default: impl Into<Value>) -> Value {
        self.inject(key).unwrap_or_else(|| default.into())
    }

    pub fn inject_or_else(&self, key: &str, default: impl FnOnce() -> Value) -> Value {
        self.inject(key).unwrap_or_else(default)
    }

    #[must_use]
    pub fn slots(&self) -> Slots {
        self.instance.slots()
    }
}

impl fmt::Debug for SetupContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetupContext")
            .field("instance", &self.instance)
            .finish()
    }
}

/// What render functions see as `this`.
#[derive(Clone)]
pub struct PublicInstance {
    instance: Rc<ComponentInstance>,
}

impl PublicInstance {
    #[must_use]
    pub fn instance(&self) -> &Rc<ComponentInstance> {
        &self.instance
    }

    /// `$el`.
    #[must_use]
    pub fn el(&self) -> Option<HostNode> {
        self.instance.el()
    }

    /// `$slots`.
    #[must_use]
    pub fn slots(&self) -> Slots {
        self.instance.slots()
    }

    /// `$props`.
    #[must_use]
    pub fn props(&self) -> Reactive {
        self.instance.props_view()
    }

    /// Look `name` up in props, then in setup state.
    #[must_use]
    pub fn get(&self, name: &str) -> Value {
        let props = self.instance.props();
        if props.contains_key(name) {
            return props.get_raw(name);
        }
        self.instance
            .setup_state()
            .map_or(Value::Null, |state| state.get(name))
    }

    /// Write `name` in setup state.
    ///
    /// # Errors
    ///
    /// Props are readonly, and a component without setup state has nothing
    /// to write to.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let state = self.instance.setup_state();
        match state {
            Some(state) if !self.instance.props().contains_key(name) => {
                state.set(name, value).map_err(RuntimeError::from)
            }
            _ => {
                let err = ReactivityError::readonly(name);
                warn!(component = self.instance.name(), "{err}");
                Err(err.into())
            }
        }
    }

    pub fn emit(&self, event: &str, args: &[Value]) -> Option<Value> {
        self.instance.emit(event, args)
    }
}

impl fmt::Debug for PublicInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicInstance")
            .field("instance", &self.instance)
            .finish()
    }
}
