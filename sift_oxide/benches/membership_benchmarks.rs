//! Benchmarks for the membership filters
//!
//! Compares BloomFilter and CuckooFilter on insert and lookup paths.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sift_oxide::membership::{BloomFilter, CuckooFilter};

/// Generate test keys
fn generate_keys(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("key_{}", i)).collect()
}

/// Benchmark filter insertions
fn bench_insertions(c: &mut Criterion) {
    let mut group = c.benchmark_group("membership_insert");
    let sizes = [1_000, 10_000];
    let keys_10k = generate_keys(10_000);

    for &size in &sizes {
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("BloomFilter", size), &size, |b, &n| {
            b.iter(|| {
                let filter: BloomFilter<str> = BloomFilter::new(n as u64, 0.01).unwrap();
                for key in keys_10k.iter().take(n) {
                    filter.insert(black_box(key));
                }
                filter
            })
        });

        group.bench_with_input(BenchmarkId::new("CuckooFilter", size), &size, |b, &n| {
            b.iter(|| {
                let filter: CuckooFilter<str> = CuckooFilter::new(n as u64 * 2, 2).unwrap();
                for key in keys_10k.iter().take(n) {
                    let _ = filter.insert(black_box(key));
                }
                filter
            })
        });
    }

    group.finish();
}

/// Benchmark filter lookups, half hits and half misses
fn bench_lookups(c: &mut Criterion) {
    let mut group = c.benchmark_group("membership_contains");
    let keys = generate_keys(10_000);
    let probes = {
        let mut probes = generate_keys(5_000);
        probes.extend((0..5_000).map(|i| format!("missing_{}", i)));
        probes
    };

    let bloom: BloomFilter<str> = BloomFilter::new(10_000, 0.01).unwrap();
    let cuckoo: CuckooFilter<str> = CuckooFilter::new(20_000, 2).unwrap();
    for key in &keys {
        bloom.insert(key);
        let _ = cuckoo.insert(key);
    }

    group.throughput(Throughput::Elements(probes.len() as u64));

    group.bench_function("BloomFilter", |b| {
        b.iter(|| {
            let mut hits = 0usize;
            for key in &probes {
                if bloom.contains(black_box(key)) {
                    hits += 1;
                }
            }
            hits
        })
    });

    group.bench_function("CuckooFilter", |b| {
        b.iter(|| {
            let mut hits = 0usize;
            for key in &probes {
                if cuckoo.contains(black_box(key)) {
                    hits += 1;
                }
            }
            hits
        })
    });

    group.finish();
}

criterion_group!(benches, bench_insertions, bench_lookups);
criterion_main!(benches);
