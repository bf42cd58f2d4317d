#![forbid(unsafe_code)]

//! Child-list reconciliation.
//!
//! # Algorithm
//!
//! 1. Patch the common prefix of nodes with the same type and key.
//! 2. Patch the common suffix the same way.
//! 3. If only new nodes remain, mount them before the node after the
//!    suffix's start (or the tail anchor).
//! 4. If only old nodes remain, unmount them.
//! 5. Otherwise, for the unknown middle run:
//!    - index the new nodes by key,
//!    - match each old node to a new one (by key, or for unkeyed nodes the
//!      first unmatched unkeyed node of the same type), patch matches and
//!      unmount the rest,
//!    - walk the new run backwards, mounting unmatched nodes and moving
//!      matched ones that are not on the longest increasing subsequence of
//!      their old positions.
//!
//! Nodes on that subsequence are never moved, so the number of host
//! insertions for a reorder is the run length minus the subsequence length.
//!
//! # Keys
//!
//! Keys identify children across renders. Using an array position as a key
//! defeats this: after an insertion every later child gets its neighbour's
//! key and is patched instead of moved.
//!
//! Duplicate keys in one list are not supported. A second old node claiming
//! an already-matched new node is unmounted.

use std::rc::Rc;

use ahash::AHashMap;
use tracing::trace;

use crate::component::ComponentInstance;
use crate::error::Result;
use crate::host::{HostAdapter, HostNode};
use crate::lis::longest_increasing_subsequence;
use crate::renderer::Renderer;
use crate::vnode::{NodeKey, VNodeRef};

impl<H: HostAdapter + 'static> Renderer<H> {
    pub(crate) fn patch_keyed_children(
        &self,
        old: &[VNodeRef],
        new: &[VNodeRef],
        container: HostNode,
        parent: Option<&Rc<ComponentInstance>>,
        tail_anchor: Option<HostNode>,
    ) -> Result<()> {
        let mut start = 0;
        let mut old_end = old.len();
        let mut new_end = new.len();

        while start < old_end && start < new_end && old[start].same_type(&new[start]) {
            self.patch(Some(&old[start]), &new[start], container, parent, None)?;
            start += 1;
        }

        while start < old_end
            && start < new_end
            && old[old_end - 1].same_type(&new[new_end - 1])
        {
            self.patch(
                Some(&old[old_end - 1]),
                &new[new_end - 1],
                container,
                parent,
                None,
            )?;
            old_end -= 1;
            new_end -= 1;
        }

        let anchor_after = |index: usize| match new.get(index) {
            Some(next) => next.el(),
            None => tail_anchor,
        };

        if start >= old_end {
            if start < new_end {
                let anchor = anchor_after(new_end);
                trace!(count = new_end - start, "mounting appended children");
                self.mount_children(&new[start..new_end], container, parent, anchor)?;
            }
            return Ok(());
        }

        if start >= new_end {
            trace!(count = old_end - start, "unmounting removed children");
            for child in &old[start..old_end] {
                self.unmount(child, true);
            }
            return Ok(());
        }

        let to_be_patched = new_end - start;
        let key_to_new: AHashMap<&NodeKey, usize> = new[start..new_end]
            .iter()
            .enumerate()
            .filter_map(|(offset, child)| child.key().map(|key| (key, start + offset)))
            .collect();

        // Old position + 1 for each new node in the run; 0 means "mount".
        let mut new_to_old = vec![0usize; to_be_patched];
        let mut patched = 0;
        let mut moved = false;
        let mut max_new_index = 0;

        for (old_index, prev) in old.iter().enumerate().take(old_end).skip(start) {
            if patched >= to_be_patched {
                self.unmount(prev, true);
                continue;
            }

            let new_index = match prev.key() {
                Some(key) => key_to_new.get(key).copied(),
                None => (start..new_end).find(|&candidate| {
                    new_to_old[candidate - start] == 0
                        && new[candidate].key().is_none()
                        && prev.same_type(&new[candidate])
                }),
            };

            match new_index {
                Some(index) if new_to_old[index - start] == 0 => {
                    if index >= max_new_index {
                        max_new_index = index;
                    } else {
                        moved = true;
                    }
                    new_to_old[index - start] = old_index + 1;
                    self.patch(Some(prev), &new[index], container, parent, None)?;
                    patched += 1;
                }
                _ => self.unmount(prev, true),
            }
        }

        let stable = if moved {
            longest_increasing_subsequence(&new_to_old)
        } else {
            Vec::new()
        };
        trace!(
            run = to_be_patched,
            patched,
            moved,
            stable = stable.len(),
            "diffing unknown run"
        );

        let mut stable = stable.iter().rev().peekable();
        for offset in (0..to_be_patched).rev() {
            let index = start + offset;
            let child = &new[index];
            let anchor = anchor_after(index + 1);
            if new_to_old[offset] == 0 {
                self.patch(None, child, container, parent, anchor)?;
            } else if moved {
                if stable.peek() == Some(&&offset) {
                    stable.next();
                } else {
                    self.move_vnode(child, container, anchor);
                }
            }
        }

        Ok(())
    }
}
