//! Property-based invariant tests for keyed child reconciliation.
//!
//! These hold for **any** old key list and any new list built from a subset
//! of the old keys (in any order) plus fresh keys:
//!
//! 1. `longest_increasing_subsequence` returns strictly increasing indices
//!    over strictly increasing non-zero values.
//! 2. Its length matches a patience-sort oracle.
//! 3. After the patch, host children are in new-list order.
//! 4. Surviving keys keep their host node: never re-created, never removed.
//! 5. Exactly the fresh keys are created and exactly the dropped keys removed.
//! 6. A pure permutation of `n` children inserts at most `n - 1` times.

#![cfg(feature = "memory-host")]

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use proptest::prelude::*;
use sprout_reactivity::Object;
use sprout_runtime::{
    HostNode, HostOp, MemoryHost, Renderer, VNodeRef, h, longest_increasing_subsequence,
};

// ── Helpers ─────────────────────────────────────────────────────────────

fn item(key: usize) -> VNodeRef {
    h("li", Object::new().with("key", key), format!("{key},"))
}

fn list(keys: &[usize]) -> VNodeRef {
    h("ul", Object::new(), keys.iter().map(|k| item(*k)).collect::<Vec<_>>())
}

fn children_els(vnode: &VNodeRef) -> Vec<HostNode> {
    vnode
        .children()
        .as_nodes()
        .unwrap_or_default()
        .iter()
        .map(|child| child.el().expect("mounted child has a host node"))
        .collect()
}

fn rendered_order(host: &MemoryHost, ul: HostNode) -> String {
    host.text_content(ul)
}

fn expected_order(keys: &[usize]) -> String {
    keys.iter().map(|k| format!("{k},")).collect()
}

/// Length of the longest strictly increasing run of non-zero values.
fn patience_len(nums: &[usize]) -> usize {
    let mut tails: Vec<usize> = Vec::new();
    for &n in nums.iter().filter(|n| **n != 0) {
        match tails.binary_search(&n) {
            Ok(_) => {}
            Err(pos) if pos == tails.len() => tails.push(n),
            Err(pos) => tails[pos] = n,
        }
    }
    tails.len()
}

/// (old length, surviving old keys in new order, number of fresh keys).
fn edits() -> impl Strategy<Value = (usize, Vec<usize>, usize)> {
    (0usize..12).prop_flat_map(|n| {
        (
            Just(n),
            proptest::sample::subsequence((0..n).collect::<Vec<_>>(), 0..=n).prop_shuffle(),
            0usize..4,
        )
    })
}

/// Interleave fresh keys (100, 101, ...) into the survivors.
fn with_fresh(survivors: &[usize], fresh: usize, seed: usize) -> Vec<usize> {
    let mut keys = survivors.to_vec();
    for i in 0..fresh {
        let at = (seed + i * 7) % (keys.len() + 1);
        keys.insert(at, 100 + i);
    }
    keys
}

// ═════════════════════════════════════════════════════════════════════════
// 1-2. LIS shape and length
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn lis_is_increasing_and_maximal(nums in proptest::collection::vec(0usize..20, 0..40)) {
        let lis = longest_increasing_subsequence(&nums);
        for pair in lis.windows(2) {
            prop_assert!(pair[0] < pair[1]);
            prop_assert!(nums[pair[0]] < nums[pair[1]]);
        }
        for &i in &lis {
            prop_assert!(nums[i] != 0);
        }
        prop_assert_eq!(lis.len(), patience_len(&nums));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3-5. Keyed patch: order, identity, exact creations and removals
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn keyed_patch_preserves_identity(
        (n, survivors, fresh) in edits(),
        seed in 0usize..16,
    ) {
        let renderer = Renderer::new(MemoryHost::new());
        let root = renderer.host().create_root();
        let old_keys: Vec<usize> = (0..n).collect();
        let before = list(&old_keys);
        renderer.render(Some(&before), root).unwrap();
        let old_els: HashMap<usize, HostNode> =
            old_keys.iter().copied().zip(children_els(&before)).collect();
        renderer.host().take_ops();

        let new_keys = with_fresh(&survivors, fresh, seed);
        let after = list(&new_keys);
        renderer.render(Some(&after), root).unwrap();
        let ul = after.el().unwrap();

        prop_assert_eq!(rendered_order(renderer.host(), ul), expected_order(&new_keys));

        let new_els: HashMap<usize, HostNode> =
            new_keys.iter().copied().zip(children_els(&after)).collect();
        for key in &survivors {
            prop_assert_eq!(new_els[key], old_els[key]);
        }

        let ops = renderer.host().ops();
        let created = ops.iter().filter(|op| matches!(op, HostOp::CreateElement { .. })).count();
        prop_assert_eq!(created, fresh);

        let removed: HashSet<HostNode> = ops
            .iter()
            .filter_map(|op| match op {
                HostOp::Remove { node } => Some(*node),
                _ => None,
            })
            .collect();
        let kept: HashSet<usize> = survivors.iter().copied().collect();
        let dropped: HashSet<HostNode> = old_keys
            .iter()
            .filter(|k| !kept.contains(k))
            .map(|k| old_els[k])
            .collect();
        prop_assert_eq!(removed, dropped);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Permutations move at most n - 1 children
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn permutation_moves_are_bounded(
        order in (1usize..12).prop_flat_map(|n| Just((0..n).collect::<Vec<_>>()).prop_shuffle()),
    ) {
        let n = order.len();
        let renderer = Renderer::new(MemoryHost::new());
        let root = renderer.host().create_root();
        renderer.render(Some(&list(&(0..n).collect::<Vec<_>>())), root).unwrap();
        renderer.host().take_ops();

        let after = list(&order);
        renderer.render(Some(&after), root).unwrap();
        let ops = renderer.host().ops();
        prop_assert!(ops.iter().all(|op| matches!(op, HostOp::Insert { .. })), "expected only Insert ops");
        prop_assert!(ops.len() < n.max(2));
        prop_assert_eq!(
            rendered_order(renderer.host(), after.el().unwrap()),
            expected_order(&order)
        );
    }
}
