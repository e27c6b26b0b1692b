//! A short tour of the three structures
//!
//! Run with: cargo run --example filters_tour

use std::sync::Arc;
use std::thread;

use sift_oxide::membership::{BloomFilter, CuckooFilter};
use sift_oxide::ordered::SkipList;

fn main() {
    // --- Bloom filter -------------------------------------------------------
    let bloom: BloomFilter<str> = BloomFilter::new(1_000_000, 0.01).unwrap();
    bloom.insert("apple");
    bloom.insert("banana");

    let (n, m, k) = bloom.params();
    println!("bloom: n={} m={} k={}", n, m, k);
    println!("bloom: contains(apple)  = {}", bloom.contains("apple"));
    println!("bloom: contains(cherry) = {}", bloom.contains("cherry"));

    // --- Cuckoo filter ------------------------------------------------------
    let cuckoo: CuckooFilter<String> = CuckooFilter::new(1024, 2).unwrap();
    for i in 0..64 {
        cuckoo.insert(&format!("item{:04}", i));
    }
    println!(
        "cuckoo: {} items at load factor {:.2}",
        cuckoo.len(),
        cuckoo.load_factor()
    );
    cuckoo.remove(&"item0000".to_string());
    println!(
        "cuckoo: contains(item0000) after delete = {}",
        cuckoo.contains(&"item0000".to_string())
    );

    // --- Concurrent skip list ----------------------------------------------
    let list: Arc<SkipList<u64>> = Arc::new(SkipList::new(100_000).unwrap());
    let handles: Vec<_> = (0..4u64)
        .map(|t| {
            let list = Arc::clone(&list);
            thread::spawn(move || {
                for i in 0..1_000 {
                    list.insert(t * 1_000 + i);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    println!("skiplist: len = {}", list.len());
    println!("skiplist: range(10..=15) = {:?}", list.range(&10, &15));
    list.remove(&12);
    println!("skiplist: range(10..=15) after remove(12) = {:?}", list.range(&10, &15));
}
