//! Performance benchmarks for the live collection.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use live_collection::{
    ChildEvent, ChildEventSource, JsonMapper, LiveCollection, OrderedCollection, StructuralDelta,
    SubscriptionConfig,
};
use serde_json::json;

/// Build a collection of `size` children appended in order.
fn filled(size: usize) -> OrderedCollection<u64> {
    let mut c = OrderedCollection::new();
    let mut prev: Option<String> = None;
    for i in 0..size {
        let key = format!("k{:06}", i);
        c.apply(ChildEvent::added(key.as_str(), i as u64, prev.as_deref()));
        prev = Some(key);
    }
    c
}

/// Benchmark appending children via anchor chains
fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("append");

    for size in [100, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::new("children", size), &size, |b, &size| {
            b.iter(|| black_box(filled(size)));
        });
    }

    group.finish();
}

/// Benchmark moving the head child to the tail and back
fn bench_move(c: &mut Criterion) {
    let mut group = c.benchmark_group("move");

    for size in [100, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::new("children", size), &size, |b, &size| {
            let mut collection = filled(size);
            let last = format!("k{:06}", size - 1);
            b.iter(|| {
                black_box(collection.apply(ChildEvent::moved("k000000", None, Some(last.as_str()))));
                black_box(collection.apply(ChildEvent::moved("k000000", None, None)));
            });
        });
    }

    group.finish();
}

/// Benchmark key lookups on a large collection
fn bench_lookup(c: &mut Criterion) {
    let collection = filled(10_000);

    c.bench_function("index_for_key", |b| {
        b.iter(|| black_box(collection.index_for_key("k005000")));
    });
}

/// Benchmark the full path: publish, map, apply
fn bench_pipeline(c: &mut Criterion) {
    c.bench_function("publish_and_pump_1000", |b| {
        b.iter(|| {
            let source = ChildEventSource::new();
            let handle = source.subscribe("bench", SubscriptionConfig::default());
            let mut live: LiveCollection<u64, _> = LiveCollection::new(handle, JsonMapper::new());

            for i in 0..1000u64 {
                source.publish("bench", ChildEvent::added(format!("k{}", i), json!(i), None));
            }

            let mut deltas: Vec<StructuralDelta<u64>> = Vec::with_capacity(1000);
            black_box(live.pump(&mut deltas).unwrap());
        });
    });
}

criterion_group!(benches, bench_append, bench_move, bench_lookup, bench_pipeline);
criterion_main!(benches);
