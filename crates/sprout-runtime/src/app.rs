#![forbid(unsafe_code)]

//! Application entry point.

use std::cell::Cell;
use std::rc::Rc;

use sprout_reactivity::Object;
use tracing::{debug, warn};

use crate::component::Component;
use crate::error::Result;
use crate::host::{HostAdapter, HostNode};
use crate::renderer::Renderer;
use crate::vnode::{VNodeRef, h};

/// A root component bound to a renderer.
pub struct App<H: HostAdapter + 'static> {
    renderer: Rc<Renderer<H>>,
    root: Rc<Component>,
    props: Object,
    container: Cell<Option<HostNode>>,
}

/// Bind `root` to `renderer`. Nothing renders until [`App::mount`].
pub fn create_app<H: HostAdapter + 'static>(
    renderer: &Rc<Renderer<H>>,
    root: &Rc<Component>,
) -> App<H> {
    App {
        renderer: Rc::clone(renderer),
        root: Rc::clone(root),
        props: Object::new(),
        container: Cell::new(None),
    }
}

impl<H: HostAdapter + 'static> App<H> {
    /// Props handed to the root component.
    #[must_use]
    pub fn with_props(mut self, props: Object) -> Self {
        self.props = props;
        self
    }

    #[must_use]
    pub fn renderer(&self) -> &Rc<Renderer<H>> {
        &self.renderer
    }

    /// Render the root component into `container` and return its vnode.
    ///
    /// # Errors
    ///
    /// Fails when a component in the initial tree has no render function.
    pub fn mount(&self, container: HostNode) -> Result<VNodeRef> {
        if let Some(previous) = self.container.get() {
            warn!(
                component = self.root.name(),
                previous = previous.raw(),
                "app already mounted; mounting again"
            );
        }
        let vnode = h(&self.root, self.props.clone(), ());
        debug!(component = self.root.name(), container = container.raw(), "mounting app");
        self.renderer.render(Some(&vnode), container)?;
        self.container.set(Some(container));
        Ok(vnode)
    }

    /// Tear down the mounted tree. Does nothing if not mounted.
    pub fn unmount(&self) {
        if let Some(container) = self.container.take() {
            debug!(component = self.root.name(), "unmounting app");
            // Unmounting never mounts, so it cannot fail.
            let _ = self.renderer.render(None, container);
        }
    }
}

impl<H: HostAdapter + 'static> std::fmt::Debug for App<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("root", &self.root.name())
            .field("container", &self.container.get())
            .finish_non_exhaustive()
    }
}
