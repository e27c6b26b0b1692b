//! Benchmarks for the concurrent skip list

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sift_oxide::ordered::SkipList;

/// Benchmark single-threaded inserts
fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("skiplist_insert");
    let sizes = [1_000, 10_000];

    for &size in &sizes {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("sequential_keys", size), &size, |b, &n| {
            b.iter(|| {
                let list: SkipList<u64> = SkipList::new(n as u64).unwrap();
                for key in 0..n as u64 {
                    list.insert(black_box(key));
                }
                list
            })
        });
    }

    group.finish();
}

/// Benchmark lookups against a populated list
fn bench_contains(c: &mut Criterion) {
    let mut group = c.benchmark_group("skiplist_contains");
    let list: SkipList<u64> = SkipList::new(100_000).unwrap();
    for key in 0..100_000u64 {
        list.insert(key);
    }

    group.throughput(Throughput::Elements(10_000));
    group.bench_function("hit_and_miss", |b| {
        b.iter(|| {
            let mut hits = 0usize;
            for key in (0..200_000u64).step_by(20) {
                if list.contains(black_box(&key)) {
                    hits += 1;
                }
            }
            hits
        })
    });

    group.finish();
}

/// Benchmark bottom-level range scans
fn bench_range(c: &mut Criterion) {
    let mut group = c.benchmark_group("skiplist_range");
    let list: SkipList<u64> = SkipList::new(100_000).unwrap();
    for key in 0..100_000u64 {
        list.insert(key);
    }

    for &span in &[100u64, 10_000] {
        group.throughput(Throughput::Elements(span));
        group.bench_with_input(BenchmarkId::new("span", span), &span, |b, &span| {
            b.iter(|| list.range(black_box(&50_000), &(50_000 + span)))
        });
    }

    group.finish();
}

/// Benchmark contended mixed operations across threads
fn bench_contended_mix(c: &mut Criterion) {
    let mut group = c.benchmark_group("skiplist_contended");
    group.sample_size(10);

    group.bench_function("4_threads_mixed", |b| {
        b.iter(|| {
            let list: Arc<SkipList<u64>> = Arc::new(SkipList::new(10_000).unwrap());
            let handles: Vec<_> = (0..4u64)
                .map(|t| {
                    let list = Arc::clone(&list);
                    std::thread::spawn(move || {
                        for i in 0..2_500u64 {
                            let key = (t * 2_500 + i) % 5_000;
                            if i % 4 == 3 {
                                list.remove(&key);
                            } else {
                                list.insert(key);
                            }
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
            list.len()
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_insert,
    bench_contains,
    bench_range,
    bench_contended_mix
);
criterion_main!(benches);
