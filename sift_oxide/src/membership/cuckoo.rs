//! Cuckoo filter: membership with deletions (Fan et al. 2014)
//!
//! Each item is reduced to a short fingerprint with two candidate buckets.
//! Insertion uses cuckoo hashing: when both candidates are full, a random
//! occupant is evicted to its alternate bucket, for a bounded number of
//! kicks.
//!
//! # Algorithm Overview
//!
//! - `i1 = H(x) mod capacity`, `i2 = (i1 XOR H(fp)) mod capacity`
//! - The bucket count is a power of two, so the XOR relation is an
//!   involution: the alternate of the alternate is the original index. Given
//!   any `(fp, i)` pair the other candidate is recoverable from the
//!   fingerprint alone, which is what makes eviction chains possible.
//! - A kick chain relocates fingerprints bucket to bucket; the displaced
//!   fingerprint is always held in a local while in flight.
//!
//! # Concurrency
//!
//! One filter-wide `RwLock`. Mutations take the write side, so a kick chain
//! is atomic with respect to other writers and readers; `contains` shares
//! the read side. Per-bucket locking is deliberately not used: a kick chain
//! spans many buckets and cannot be made atomic bucket by bucket.
//!
//! # Failure Model
//!
//! `insert` returning `false` means capacity pressure after `MAX_KICKS`
//! relocations, not an error. `remove` returning `false` means the
//! fingerprint was absent from both candidate buckets; because of false
//! positives that is not proof the item was never inserted.
//!
//! # Examples
//!
//! ```
//! use sift_oxide::membership::CuckooFilter;
//!
//! let filter: CuckooFilter<str> = CuckooFilter::new(1024, 2).unwrap();
//!
//! assert!(filter.insert("key1"));
//! assert!(filter.contains("key1"));
//!
//! assert!(filter.remove("key1"));
//! assert!(!filter.contains("key1"));
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::RwLock;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::common::decompose::{ByteSink, Decomposer, TextDecomposer};
use crate::common::hash::{FilterHash, XxFilterHash};
use crate::common::validation::{validate_capacity, validate_fingerprint_len};
use crate::common::Result;

/// Number of fingerprint slots per bucket
const BUCKET_SIZE: usize = 4;

/// Maximum number of relocations before an insert reports capacity pressure
const MAX_KICKS: usize = 500;

/// Slot value marking an empty entry; real fingerprints are never zero
const EMPTY: u32 = 0;

/// First 4 digest bytes big-endian, zero-padded for short digests
fn int_reduce(digest: &[u8]) -> u32 {
    let mut word = [0u8; 4];
    let take = digest.len().min(4);
    word[..take].copy_from_slice(&digest[..take]);
    u32::from_be_bytes(word)
}

/// A bucket of up to four fingerprints
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Bucket {
    slots: [u32; BUCKET_SIZE],
}

impl Bucket {
    /// Places `fp` in a free slot; `false` if the bucket is full
    fn insert(&mut self, fp: u32) -> bool {
        for slot in &mut self.slots {
            if *slot == EMPTY {
                *slot = fp;
                return true;
            }
        }
        false
    }

    /// Removes one matching entry if any
    fn remove(&mut self, fp: u32) -> bool {
        for slot in &mut self.slots {
            if *slot == fp {
                *slot = EMPTY;
                return true;
            }
        }
        false
    }

    fn contains(&self, fp: u32) -> bool {
        self.slots.contains(&fp)
    }

    /// Replaces a uniformly random occupant with `fp`, returning the evictee
    fn swap_random(&mut self, fp: u32, rng: &mut SmallRng) -> u32 {
        let idx = rng.random_range(0..BUCKET_SIZE);
        let evicted = self.slots[idx];
        self.slots[idx] = fp;
        evicted
    }
}

/// Mutable interior guarded by the filter-wide lock
#[derive(Debug)]
struct CuckooState {
    buckets: Vec<Bucket>,
    count: usize,
    rng: SmallRng,
}

/// Cuckoo filter over items of type `T`
///
/// `D` converts items to canonical bytes (default: UTF-8 text rendering via
/// `Display`), `H` supplies the byte digests (default: seeded xxHash64).
pub struct CuckooFilter<T: ?Sized, D = TextDecomposer, H = XxFilterHash> {
    state: RwLock<CuckooState>,
    /// Power-of-two bucket count; `mask = num_buckets - 1`
    num_buckets: usize,
    /// Fingerprint length in bytes, 1 to 4
    fingerprint_len: usize,
    decomposer: D,
    hasher: H,
    _item: PhantomData<fn(&T)>,
}

impl<T: ?Sized, D: Default, H: Default> CuckooFilter<T, D, H> {
    /// Creates a filter able to hold roughly `capacity` items with
    /// fingerprints of `fingerprint_len` bytes
    ///
    /// The bucket count is `next_pow2(capacity) / 4`, so the XOR index
    /// relation stays an involution.
    ///
    /// # Errors
    ///
    /// Returns `SiftError::InvalidParameter` if `capacity` is 0 or
    /// `fingerprint_len` is outside `[1, 4]`.
    pub fn new(capacity: u64, fingerprint_len: usize) -> Result<Self> {
        Self::with_parts(capacity, fingerprint_len, D::default(), H::default())
    }

    /// Creates a filter whose eviction choices are deterministic for a seed
    pub fn with_seed(capacity: u64, fingerprint_len: usize, seed: u64) -> Result<Self> {
        Self::build(
            capacity,
            fingerprint_len,
            D::default(),
            H::default(),
            SmallRng::seed_from_u64(seed),
        )
    }
}

impl<T: ?Sized, D, H: Default> CuckooFilter<T, D, H> {
    /// Creates a filter with a custom decomposition policy
    pub fn with_decomposer(capacity: u64, fingerprint_len: usize, decomposer: D) -> Result<Self> {
        Self::with_parts(capacity, fingerprint_len, decomposer, H::default())
    }
}

impl<T: ?Sized, D: Default, H> CuckooFilter<T, D, H> {
    /// Creates a filter with a custom hash implementation
    pub fn with_hasher(capacity: u64, fingerprint_len: usize, hasher: H) -> Result<Self> {
        Self::with_parts(capacity, fingerprint_len, D::default(), hasher)
    }
}

impl<T: ?Sized, D, H> CuckooFilter<T, D, H> {
    /// Creates a filter with explicit decomposer and hasher
    pub fn with_parts(
        capacity: u64,
        fingerprint_len: usize,
        decomposer: D,
        hasher: H,
    ) -> Result<Self> {
        Self::build(
            capacity,
            fingerprint_len,
            decomposer,
            hasher,
            SmallRng::from_os_rng(),
        )
    }

    fn build(
        capacity: u64,
        fingerprint_len: usize,
        decomposer: D,
        hasher: H,
        rng: SmallRng,
    ) -> Result<Self> {
        validate_capacity(capacity)?;
        validate_fingerprint_len(fingerprint_len)?;

        let num_buckets = ((capacity.next_power_of_two() / BUCKET_SIZE as u64).max(1)) as usize;

        Ok(Self {
            state: RwLock::new(CuckooState {
                buckets: vec![Bucket::default(); num_buckets],
                count: 0,
                rng,
            }),
            num_buckets,
            fingerprint_len,
            decomposer,
            hasher,
            _item: PhantomData,
        })
    }

    /// Number of items currently stored
    pub fn len(&self) -> usize {
        self.read_state().count
    }

    /// Returns true if the filter holds no items
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total fingerprint slots (`buckets * 4`)
    pub fn slot_capacity(&self) -> usize {
        self.num_buckets * BUCKET_SIZE
    }

    /// Number of buckets
    pub fn num_buckets(&self) -> usize {
        self.num_buckets
    }

    /// Fingerprint length in bytes
    pub fn fingerprint_len(&self) -> usize {
        self.fingerprint_len
    }

    /// Fraction of slots occupied
    pub fn load_factor(&self) -> f64 {
        self.len() as f64 / self.slot_capacity() as f64
    }

    /// Memory held by the bucket array, in bytes
    pub fn memory_usage(&self) -> usize {
        self.num_buckets * BUCKET_SIZE * std::mem::size_of::<u32>()
    }

    /// Empties the filter
    pub fn clear(&self) {
        let mut state = self.write_state();
        for bucket in &mut state.buckets {
            *bucket = Bucket::default();
        }
        state.count = 0;
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, CuckooState> {
        // Poisoning means a writer panicked mid-mutation; propagate.
        self.state.read().expect("cuckoo filter lock poisoned")
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, CuckooState> {
        self.state.write().expect("cuckoo filter lock poisoned")
    }
}

impl<T: ?Sized, D, H: FilterHash> CuckooFilter<T, D, H> {
    /// Fingerprint and primary index from one digest pass
    ///
    /// The fingerprint is the first `fingerprint_len` digest bytes packed
    /// big-endian; a zero truncation is bumped to 1 so it stays
    /// distinguishable from an empty slot. The primary index reduces the
    /// first 4 digest bytes big-endian, masked to the bucket range.
    fn derive(&self, digest: &[u8]) -> (u32, usize) {
        let mut fp: u32 = 0;
        for &byte in digest.iter().take(self.fingerprint_len) {
            fp = (fp << 8) | u32::from(byte);
        }
        if fp == EMPTY {
            fp = 1;
        }
        (fp, int_reduce(digest) as usize & (self.num_buckets - 1))
    }

    /// Fingerprint of a byte sequence, never zero
    pub fn fingerprint(&self, bytes: &[u8]) -> u32 {
        self.derive(&self.hasher.digest(bytes)).0
    }

    /// The two candidate bucket indices for a byte sequence
    pub fn candidate_indices(&self, bytes: &[u8]) -> (usize, usize) {
        let (fp, i1) = self.derive(&self.hasher.digest(bytes));
        (i1, self.alternate_index(i1, fp))
    }

    /// Alternate bucket of `(fingerprint, index)`
    ///
    /// An involution: `alternate_index(alternate_index(i, fp), fp) == i`.
    pub fn alternate_index(&self, index: usize, fingerprint: u32) -> usize {
        let fp_bytes = fingerprint.to_be_bytes();
        let fp_hash = int_reduce(&self.hasher.digest(&fp_bytes[4 - self.fingerprint_len..]));
        (index ^ fp_hash as usize) & (self.num_buckets - 1)
    }

    /// Inserts a pre-decomposed byte sequence
    ///
    /// Returns `false` when both candidate buckets are full and `MAX_KICKS`
    /// relocations failed to free a slot; the filter is then considered
    /// full. The filter stays valid either way.
    pub fn insert_bytes(&self, bytes: &[u8]) -> bool {
        let (fp, i1) = self.derive(&self.hasher.digest(bytes));
        let i2 = self.alternate_index(i1, fp);

        let mut guard = self.write_state();
        let state = &mut *guard;

        if state.buckets[i1].insert(fp) || state.buckets[i2].insert(fp) {
            state.count += 1;
            return true;
        }

        // Both candidates full: evict along an alternate-index chain. The
        // displaced fingerprint lives in `fp` at every step.
        let mut fp = fp;
        let mut index = if state.rng.random::<bool>() { i1 } else { i2 };
        for _ in 0..MAX_KICKS {
            fp = state.buckets[index].swap_random(fp, &mut state.rng);
            index = self.alternate_index(index, fp);
            if state.buckets[index].insert(fp) {
                state.count += 1;
                return true;
            }
        }
        false
    }

    /// Tests a pre-decomposed byte sequence for membership
    ///
    /// `false` means definitely absent (unless a concurrent kick chain is
    /// relocating the fingerprint); `true` may be a false positive.
    pub fn contains_bytes(&self, bytes: &[u8]) -> bool {
        let (fp, i1) = self.derive(&self.hasher.digest(bytes));
        let i2 = self.alternate_index(i1, fp);

        let state = self.read_state();
        state.buckets[i1].contains(fp) || state.buckets[i2].contains(fp)
    }

    /// Removes a pre-decomposed byte sequence
    ///
    /// Returns `false` if the fingerprint is absent from both candidates.
    /// Removing an item that was never inserted can delete a colliding
    /// entry and introduce a false negative for it.
    pub fn remove_bytes(&self, bytes: &[u8]) -> bool {
        let (fp, i1) = self.derive(&self.hasher.digest(bytes));
        let i2 = self.alternate_index(i1, fp);

        let mut state = self.write_state();
        if state.buckets[i1].remove(fp) || state.buckets[i2].remove(fp) {
            state.count -= 1;
            return true;
        }
        false
    }
}

impl<T: ?Sized, D: Decomposer<T>, H: FilterHash> CuckooFilter<T, D, H> {
    /// Inserts an item, routing it through the decomposition pipeline
    pub fn insert(&self, item: &T) -> bool {
        let mut sink = ByteSink::new();
        self.decomposer.decompose(item, &mut sink);
        self.insert_bytes(&sink.into_bytes())
    }

    /// Tests an item for membership
    pub fn contains(&self, item: &T) -> bool {
        let mut sink = ByteSink::new();
        self.decomposer.decompose(item, &mut sink);
        self.contains_bytes(&sink.into_bytes())
    }

    /// Removes an item
    pub fn remove(&self, item: &T) -> bool {
        let mut sink = ByteSink::new();
        self.decomposer.decompose(item, &mut sink);
        self.remove_bytes(&sink.into_bytes())
    }
}

impl<T: ?Sized, D, H> fmt::Debug for CuckooFilter<T, D, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CuckooFilter")
            .field("num_buckets", &self.num_buckets)
            .field("fingerprint_len", &self.fingerprint_len)
            .field("count", &self.len())
            .finish()
    }
}
