//! Counter benchmarks: vote stepping and flush for both counter kinds.

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use tally_core::config::StorageConfig;
use tally_core::{EventDispatcher, FlushMode, StorageReadyEvent, VotingCounter, VotingStorage};
use tally_counter::{LockBasedVotingCounter, NonBlockingVotingCounter};
use tally_storage::TableVotingStorage;

fn counters() -> Vec<(&'static str, Arc<dyn VotingCounter>)> {
    let mut result: Vec<(&'static str, Arc<dyn VotingCounter>)> = Vec::new();
    for name in ["lock_based", "non_blocking"] {
        let storage: Arc<dyn VotingStorage> =
            Arc::new(TableVotingStorage::open_in_memory(&StorageConfig::default()).unwrap());
        let mut events = EventDispatcher::new();
        let counter: Arc<dyn VotingCounter> = match name {
            "lock_based" => LockBasedVotingCounter::new(storage, &mut events),
            _ => NonBlockingVotingCounter::new(storage, &mut events),
        };
        events.emit_storage_ready(&StorageReadyEvent);
        result.push((name, counter));
    }
    result
}

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("step");
    for (name, counter) in counters() {
        for key in 0..100 {
            counter.increment(key, 1).unwrap();
        }
        group.bench_function(BenchmarkId::from_parameter(name), |b| {
            let mut i = 0i32;
            b.iter(|| {
                i = i.wrapping_add(1);
                let key = i.rem_euclid(100);
                let actor = i.rem_euclid(1000) + 1;
                if i % 2 == 0 {
                    counter.increment(key, actor).unwrap()
                } else {
                    counter.decrement(key, actor).unwrap()
                }
            });
        });
    }
    group.finish();
}

fn bench_flush(c: &mut Criterion) {
    let mut group = c.benchmark_group("flush");
    group.sample_size(20);
    for (name, counter) in counters() {
        for key in 0..200 {
            for actor in 1..=20 {
                counter.increment(key, actor).unwrap();
            }
        }
        counter.flush(FlushMode::Flush).unwrap();
        group.bench_function(BenchmarkId::from_parameter(name), |b| {
            let mut actor = 20;
            b.iter(|| {
                actor += 1;
                counter.decrement(actor % 200, actor).unwrap();
                counter.flush(FlushMode::Flush).unwrap();
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_step, bench_flush);
criterion_main!(benches);
