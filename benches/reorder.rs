//! Point moves versus full rebuilds over an in-memory storage.
//!
//! Run with `cargo bench --bench reorder`.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use launchpad::{
    Configuration, Entry, MemoryStorage, Metrics, OrderedCollectionStore, ViewItemProjector,
};
use std::hint::black_box;
use std::sync::Arc;

fn seeded_store(len: usize) -> Arc<OrderedCollectionStore> {
    let storage = Arc::new(MemoryStorage::default());
    storage.set_entries(
        (0..len)
            .map(|i| {
                Entry::new(i.to_string())
                    .with_title(format!("Addon {i}"))
                    .with_description("[b]Bold[/b] text with [i]markup[/i] in it")
            })
            .collect(),
    );
    storage.set_order((0..len).map(|i| i.to_string()).collect());
    for i in 0..len {
        storage.set_configuration(i.to_string(), Configuration::addon(i % 2 == 0));
    }

    OrderedCollectionStore::attach(storage, ViewItemProjector::default(), Arc::new(Metrics::new()))
}

fn bench_reorder(c: &mut Criterion) {
    let mut group = c.benchmark_group("reorder");

    for len in [100usize, 1_000] {
        let store = seeded_store(len);

        group.bench_with_input(BenchmarkId::new("move_item", len), &len, |b, &len| {
            b.iter(|| {
                store.move_item(black_box(0), black_box(len - 1)).unwrap();
                store.move_item(black_box(len - 1), black_box(0)).unwrap();
            })
        });

        group.bench_with_input(BenchmarkId::new("rebuild", len), &len, |b, _| {
            b.iter(|| store.rebuild())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_reorder);
criterion_main!(benches);
