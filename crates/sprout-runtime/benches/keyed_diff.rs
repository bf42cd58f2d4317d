//! Benchmarks for keyed child reconciliation.
//!
//! Run with: cargo bench -p sprout-runtime --bench keyed_diff

use std::hint::black_box;
use std::rc::Rc;

use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use sprout_reactivity::Object;
use sprout_runtime::{
    HostNode, MemoryHost, Renderer, VNodeRef, h, longest_increasing_subsequence,
};

fn list(keys: &[usize]) -> VNodeRef {
    h(
        "ul",
        Object::new(),
        keys.iter()
            .map(|k| h("li", Object::new().with("key", *k), k.to_string()))
            .collect::<Vec<_>>(),
    )
}

fn mounted(keys: &[usize]) -> (Rc<Renderer<MemoryHost>>, HostNode) {
    let renderer = Renderer::new(MemoryHost::new());
    let root = renderer.host().create_root();
    // Mount failures only come from components; plain elements always mount.
    let _ = renderer.render(Some(&list(keys)), root);
    (renderer, root)
}

// =============================================================================
// LIS
// =============================================================================

fn bench_lis(c: &mut Criterion) {
    let mut group = c.benchmark_group("lis");
    for n in [16usize, 64, 256] {
        // Mostly increasing with a reversed block in the middle.
        let mut nums: Vec<usize> = (1..=n).collect();
        nums[n / 4..n / 2].reverse();
        group.bench_with_input(BenchmarkId::from_parameter(n), &nums, |b, nums| {
            b.iter(|| black_box(longest_increasing_subsequence(black_box(nums))))
        });
    }
    group.finish();
}

// =============================================================================
// Keyed diff
// =============================================================================

fn bench_keyed(c: &mut Criterion) {
    let mut group = c.benchmark_group("keyed_diff");
    for n in [16usize, 128] {
        let old: Vec<usize> = (0..n).collect();

        let mut reversed = old.clone();
        reversed.reverse();
        let mut swapped = old.clone();
        swapped.swap(1, n - 2);
        let appended: Vec<usize> = (0..n + n / 4).collect();
        let shifted: Vec<usize> = (n / 2..n).chain(0..n / 2).collect();

        for (name, new) in [
            ("reverse", reversed),
            ("swap", swapped),
            ("append", appended),
            ("rotate", shifted),
        ] {
            group.bench_with_input(BenchmarkId::new(name, n), &new, |b, new| {
                b.iter_batched(
                    || (mounted(&old), list(new)),
                    |((renderer, root), next)| {
                        let _ = renderer.render(Some(&next), root);
                        black_box(renderer.host().node_count())
                    },
                    BatchSize::SmallInput,
                );
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_lis, bench_keyed);
criterion_main!(benches);
