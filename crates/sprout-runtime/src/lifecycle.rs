#![forbid(unsafe_code)]

//! Component mount and update.
//!
//! Each mounted instance owns one render effect. Its first run renders and
//! mounts the subtree; later runs re-render and patch against the previous
//! subtree. The effect's scheduler only queues the instance's job, so any
//! number of state changes in one tick cost one re-render.
//!
//! A parent re-render that hands the child new props runs the child's effect
//! immediately (after cancelling a queued job for it), so the child's subtree
//! is current before the parent's patch continues.

use std::rc::Rc;

use sprout_reactivity::{EffectOptions, ReactiveEffect};
use tracing::{debug, error};

use crate::component::{Component, ComponentInstance, should_update_component};
use crate::error::{Result, RuntimeError};
use crate::host::{HostAdapter, HostNode};
use crate::renderer::Renderer;
use crate::scheduler::{Job, invalidate_job, queue_job};
use crate::vnode::VNodeRef;

impl<H: HostAdapter + 'static> Renderer<H> {
    pub(crate) fn mount_component(
        &self,
        component: &Rc<Component>,
        vnode: &VNodeRef,
        container: HostNode,
        parent: Option<&Rc<ComponentInstance>>,
        anchor: Option<HostNode>,
    ) -> Result<()> {
        let instance = ComponentInstance::new(vnode, Rc::clone(component), parent);
        *vnode.component.borrow_mut() = Some(Rc::clone(&instance));
        debug!(component = instance.name(), uid = instance.uid(), "mounting component");
        instance.setup()?;
        self.setup_render_effect(&instance, container, anchor)
    }

    fn setup_render_effect(
        &self,
        instance: &Rc<ComponentInstance>,
        container: HostNode,
        anchor: Option<HostNode>,
    ) -> Result<()> {
        let renderer = self.weak_self.clone();
        let target = Rc::downgrade(instance);
        let render = move || {
            let Some(instance) = target.upgrade() else {
                error!("{}", RuntimeError::InstanceDropped);
                return;
            };
            let outcome = match renderer.upgrade() {
                Some(renderer) => renderer.render_component(&instance, container, anchor),
                None => Err(RuntimeError::InstanceDropped),
            };
            if let Err(err) = outcome {
                *instance.pending_error.borrow_mut() = Some(err);
            }
        };

        let target = Rc::downgrade(instance);
        let job: Job = Rc::new(move || {
            let Some(instance) = target.upgrade() else {
                return;
            };
            let Some(effect) = instance.update_effect() else {
                return;
            };
            effect.run();
            if let Some(err) = instance.take_error() {
                error!(
                    component = instance.name(),
                    uid = instance.uid(),
                    "re-render failed, keeping previous subtree: {err}"
                );
            }
        });

        let queued = Rc::clone(&job);
        let effect = ReactiveEffect::new(
            render,
            EffectOptions::new().scheduler(move || queue_job(&queued)),
        );
        *instance.job.borrow_mut() = Some(job);
        *instance.update.borrow_mut() = Some(effect.clone());

        effect.run();
        instance.take_error().map_or(Ok(()), Err)
    }

    /// One run of an instance's render effect.
    fn render_component(
        &self,
        instance: &Rc<ComponentInstance>,
        container: HostNode,
        anchor: Option<HostNode>,
    ) -> Result<()> {
        if !instance.is_mounted() {
            let subtree = instance.render_subtree()?;
            self.patch(None, &subtree, container, Some(instance), anchor)?;
            instance.vnode().el.set(subtree.el());
            *instance.subtree.borrow_mut() = Some(subtree);
            instance.is_mounted.set(true);
            debug!(component = instance.name(), uid = instance.uid(), "mounted");
            return Ok(());
        }

        let next = instance.next.borrow_mut().take();
        if let Some(next) = next {
            next.el.set(instance.el());
            instance.update_pre_render(next);
        }

        let subtree = instance.render_subtree()?;
        let previous = instance.subtree();
        self.patch(previous.as_ref(), &subtree, container, Some(instance), None)?;
        let el = subtree.el();
        instance.vnode().el.set(el);
        *instance.subtree.borrow_mut() = Some(subtree);
        sync_ancestor_els(instance, el);
        debug!(component = instance.name(), uid = instance.uid(), "updated");
        Ok(())
    }

    pub(crate) fn update_component(&self, old: &VNodeRef, new: &VNodeRef) -> Result<()> {
        let instance = old.component().ok_or(RuntimeError::InstanceDropped)?;
        *new.component.borrow_mut() = Some(Rc::clone(&instance));

        if !should_update_component(old, new) {
            new.el.set(old.el());
            instance.adopt_vnode(Rc::clone(new));
            return Ok(());
        }

        *instance.next.borrow_mut() = Some(Rc::clone(new));
        if let Some(job) = instance.job() {
            invalidate_job(&job);
        }
        let effect = instance
            .update_effect()
            .ok_or(RuntimeError::InstanceDropped)?;
        effect.run();
        instance.take_error().map_or(Ok(()), Err)
    }
}

/// Walk up through parents whose subtree root is this instance's vnode and
/// point their vnodes at the new first host node.
fn sync_ancestor_els(instance: &Rc<ComponentInstance>, el: Option<HostNode>) {
    let mut current = Rc::clone(instance);
    while let Some(parent) = current.parent() {
        let rooted_here = parent
            .subtree()
            .is_some_and(|root| Rc::ptr_eq(&root, &current.vnode()));
        if !rooted_here {
            break;
        }
        parent.vnode().el.set(el);
        current = parent;
    }
}
