//! Standard Bloom filter
//!
//! A space-efficient probabilistic data structure for set membership
//! queries. Sizing is derived from the expected number of insertions and
//! the target false-positive rate.
//!
//! # Algorithm Overview
//!
//! - **Kirsch-Mitzenmacher double hashing**: one 64-bit digest is split into
//!   two 32-bit halves `h1`/`h2`, and the k probe positions are
//!   `g_i = h1 + i * h2` for `i` in `1..=k`. All arithmetic is unsigned and
//!   wrapping, so no sign fix-ups are needed before the modulo.
//! - The bit array is word-backed with atomic OR, so insertion works through
//!   a shared reference and the filter can be used from many threads with no
//!   outer lock. Racing inserts are harmless: OR is idempotent.
//!
//! # Guarantees
//!
//! - Zero false negatives: after `insert(x)`, `contains(x)` is `true`.
//! - False positives at roughly the configured rate once the filter holds
//!   the expected number of items. Items cannot be removed.
//!
//! # Examples
//! ```
//! use sift_oxide::membership::BloomFilter;
//!
//! let filter: BloomFilter<str> = BloomFilter::new(1000, 0.01).unwrap();
//! filter.insert("apple");
//! filter.insert("banana");
//!
//! assert!(filter.contains("apple"));
//! assert!(filter.contains("banana"));
//! ```

use std::fmt;
use std::marker::PhantomData;

use crate::common::decompose::{ByteSink, Decomposer, TextDecomposer};
use crate::common::hash::{FilterHash, XxFilterHash};
use crate::common::validation::{validate_capacity, validate_probability};
use crate::common::{BitArray, Result, SiftError};

/// Bloom filter over items of type `T`
///
/// `D` converts items to canonical bytes (default: UTF-8 text rendering via
/// `Display`), `H` supplies the digests (default: seeded xxHash64). Both are
/// chosen at construction; dispatch is static.
pub struct BloomFilter<T: ?Sized, D = TextDecomposer, H = XxFilterHash> {
    bits: BitArray,
    /// Number of bits
    m: u64,
    /// Number of derived hash functions
    k: u32,
    /// Expected number of insertions
    n: u64,
    decomposer: D,
    hasher: H,
    _item: PhantomData<fn(&T)>,
}

impl<T: ?Sized, D: Default, H: Default> BloomFilter<T, D, H> {
    /// Creates a filter sized for `expected_items` insertions at the target
    /// false-positive rate
    ///
    /// # Errors
    ///
    /// Returns `SiftError::InvalidParameter` if `expected_items` is 0 or
    /// `false_positive_rate` is outside `(0, 1)`.
    pub fn new(expected_items: u64, false_positive_rate: f64) -> Result<Self> {
        Self::with_parts(
            expected_items,
            false_positive_rate,
            D::default(),
            H::default(),
        )
    }
}

impl<T: ?Sized, D, H: Default> BloomFilter<T, D, H> {
    /// Creates a filter with a custom decomposition policy
    pub fn with_decomposer(
        expected_items: u64,
        false_positive_rate: f64,
        decomposer: D,
    ) -> Result<Self> {
        Self::with_parts(expected_items, false_positive_rate, decomposer, H::default())
    }
}

impl<T: ?Sized, D: Default, H> BloomFilter<T, D, H> {
    /// Creates a filter with a custom hash implementation
    pub fn with_hasher(expected_items: u64, false_positive_rate: f64, hasher: H) -> Result<Self> {
        Self::with_parts(expected_items, false_positive_rate, D::default(), hasher)
    }
}

impl<T: ?Sized, D, H> BloomFilter<T, D, H> {
    /// Creates a filter with explicit decomposer and hasher
    pub fn with_parts(
        expected_items: u64,
        false_positive_rate: f64,
        decomposer: D,
        hasher: H,
    ) -> Result<Self> {
        validate_capacity(expected_items)?;
        validate_probability(false_positive_rate, "false_positive_rate")?;

        // Optimal bit count: m = floor(-n * ln(p) / ln(2)^2)
        let m = ((-(expected_items as f64) * false_positive_rate.ln()
            / std::f64::consts::LN_2.powi(2))
        .floor() as u64)
            .max(1);

        // Optimal hash count: k = round((m / n) * ln(2)), at least one
        let k = (((m as f64 / expected_items as f64) * std::f64::consts::LN_2).round() as u32)
            .max(1);

        Ok(Self {
            bits: BitArray::new(m),
            m,
            k,
            n: expected_items,
            decomposer,
            hasher,
            _item: PhantomData,
        })
    }

    /// Number of bits in the underlying array
    pub fn bit_size(&self) -> u64 {
        self.m
    }

    /// Number of derived hash functions
    pub fn hash_fn_count(&self) -> u32 {
        self.k
    }

    /// Expected number of insertions the filter was sized for
    pub fn expected_items(&self) -> u64 {
        self.n
    }

    /// Returns filter parameters `(n, m, k)`
    pub fn params(&self) -> (u64, u64, u32) {
        (self.n, self.m, self.k)
    }

    /// Number of bits currently set
    pub fn count_bits(&self) -> u64 {
        self.bits.count_ones()
    }

    /// Returns true if no item has been inserted
    pub fn is_empty(&self) -> bool {
        self.count_bits() == 0
    }

    /// Current false-positive probability given the observed fill ratio
    pub fn estimated_fpr(&self) -> f64 {
        let fill = self.count_bits() as f64 / self.m as f64;
        fill.powi(self.k as i32)
    }

    /// Approximate number of distinct items inserted, from the fill ratio
    pub fn approximate_len(&self) -> u64 {
        let fill = self.count_bits() as f64 / self.m as f64;
        if fill >= 1.0 {
            return self.n;
        }
        let estimate = -(self.m as f64) * (1.0 - fill).ln() / f64::from(self.k);
        estimate.round() as u64
    }

    /// Memory held by the bit array, in bytes
    pub fn memory_usage(&self) -> usize {
        self.bits.memory_usage()
    }

    /// Zeroes the filter; exclusive access required
    pub fn clear(&mut self) {
        self.bits.clear();
    }
}

impl<T: ?Sized, D, H: FilterHash> BloomFilter<T, D, H> {
    /// Derives the k probe positions for a digest
    ///
    /// Kirsch-Mitzenmacher: `g_i = h1 + i * h2` over the two unsigned 32-bit
    /// halves of the 64-bit digest, `i` in `1..=k`.
    #[inline]
    fn probe(&self, bytes: &[u8]) -> impl Iterator<Item = u64> + '_ {
        let h = self.hasher.digest64(bytes);
        let h1 = h as u32;
        let h2 = (h >> 32) as u32;
        let m = self.m;
        (1..=self.k).map(move |i| {
            let g = h1.wrapping_add(i.wrapping_mul(h2));
            u64::from(g) % m
        })
    }

    /// Inserts a pre-decomposed byte sequence
    ///
    /// Returns `true` iff any probed bit transitioned from 0 to 1, i.e. the
    /// item was not already (apparently) present.
    pub fn insert_bytes(&self, bytes: &[u8]) -> bool {
        let mut newly_set = false;
        for index in self.probe(bytes) {
            newly_set |= self.bits.set_bit(index);
        }
        newly_set
    }

    /// Tests a pre-decomposed byte sequence for membership
    ///
    /// `false` means definitely absent; `true` may be a false positive.
    pub fn contains_bytes(&self, bytes: &[u8]) -> bool {
        self.probe(bytes).all(|index| self.bits.get_bit(index))
    }

    /// Merges another filter of identical geometry into this one (union)
    ///
    /// Both filters must have been built with the same parameters and hash;
    /// membership of every item inserted into either is preserved.
    ///
    /// # Errors
    ///
    /// Returns `SiftError::IncompatibleFilters` if `(n, m, k)` differ.
    pub fn merge(&self, other: &Self) -> Result<()> {
        if self.params() != other.params() {
            return Err(SiftError::IncompatibleFilters {
                reason: format!(
                    "parameters differ: {:?} vs {:?}",
                    self.params(),
                    other.params()
                ),
            });
        }
        self.bits.union_in_place(&other.bits);
        Ok(())
    }
}

impl<T: ?Sized, D: Decomposer<T>, H: FilterHash> BloomFilter<T, D, H> {
    /// Inserts an item, routing it through the decomposition pipeline
    ///
    /// Returns `true` iff any underlying bit transitioned from 0 to 1.
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

    /// Inserts an optional item; `None` is a no-op returning `false`
    pub fn insert_opt(&self, item: Option<&T>) -> bool {
        item.is_some_and(|item| self.insert(item))
    }

    /// Tests an optional item; `None` returns `false`
    pub fn contains_opt(&self, item: Option<&T>) -> bool {
        item.is_some_and(|item| self.contains(item))
    }
}

impl<T: ?Sized, D, H> fmt::Debug for BloomFilter<T, D, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BloomFilter")
            .field("n", &self.n)
            .field("m", &self.m)
            .field("k", &self.k)
            .field("bits_set", &self.count_bits())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizing_formula() {
        let filter: BloomFilter<str> = BloomFilter::new(1_000_000, 0.01).unwrap();
        let (n, m, k) = filter.params();
        assert_eq!(n, 1_000_000);
        assert_eq!(m, 9_585_058);
        assert_eq!(k, 7);
    }

    #[test]
    fn test_sizing_floors_at_one_bit() {
        // Degenerate parameters still produce a usable filter
        let filter: BloomFilter<str> = BloomFilter::new(1, 0.9).unwrap();
        assert!(filter.bit_size() >= 1);
        assert!(filter.hash_fn_count() >= 1);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(BloomFilter::<str>::new(0, 0.01).is_err());
        assert!(BloomFilter::<str>::new(100, 0.0).is_err());
        assert!(BloomFilter::<str>::new(100, 1.0).is_err());
        assert!(BloomFilter::<str>::new(100, -0.3).is_err());
    }

    #[test]
    fn test_insert_and_contains() {
        let filter: BloomFilter<str> = BloomFilter::new(100, 0.01).unwrap();
        assert!(filter.insert("apple"));
        assert!(filter.insert("banana"));

        assert!(filter.contains("apple"));
        assert!(filter.contains("banana"));
    }

    #[test]
    fn test_insert_reports_new_bits() {
        let filter: BloomFilter<str> = BloomFilter::new(100, 0.01).unwrap();
        assert!(filter.insert("apple"), "first insert sets fresh bits");
        assert!(!filter.insert("apple"), "re-insert sets nothing new");
    }

    #[test]
    fn test_typed_and_byte_forms_agree() {
        // The default decomposer renders text, so the byte form of the same
        // string must hit the same probe positions.
        let filter: BloomFilter<str> = BloomFilter::new(100, 0.01).unwrap();
        filter.insert("apple");
        assert!(filter.contains_bytes(b"apple"));
    }

    #[test]
    fn test_insert_opt_none_is_noop() {
        let filter: BloomFilter<str> = BloomFilter::new(100, 0.01).unwrap();
        assert!(!filter.insert_opt(None));
        assert!(filter.is_empty());
        assert!(!filter.contains_opt(None));
        assert!(filter.insert_opt(Some("apple")));
        assert!(filter.contains_opt(Some("apple")));
    }

    #[test]
    fn test_empty_bytes_are_valid_input() {
        let filter: BloomFilter<str> = BloomFilter::new(100, 0.01).unwrap();
        assert!(filter.insert_bytes(b""));
        assert!(filter.contains_bytes(b""));
    }

    #[test]
    fn test_no_false_negatives() {
        let filter: BloomFilter<String> = BloomFilter::new(1000, 0.01).unwrap();
        let items: Vec<String> = (0..1000).map(|i| format!("item_{}", i)).collect();
        for item in &items {
            filter.insert(item);
        }
        for item in &items {
            assert!(filter.contains(item), "false negative for {}", item);
        }
    }

    #[test]
    fn test_clear() {
        let mut filter: BloomFilter<str> = BloomFilter::new(100, 0.01).unwrap();
        filter.insert("apple");
        assert!(!filter.is_empty());
        filter.clear();
        assert!(filter.is_empty());
        assert!(!filter.contains("apple"));
    }

    #[test]
    fn test_merge() {
        let a: BloomFilter<str> = BloomFilter::new(100, 0.01).unwrap();
        let b: BloomFilter<str> = BloomFilter::new(100, 0.01).unwrap();
        a.insert("left");
        b.insert("right");

        a.merge(&b).unwrap();
        assert!(a.contains("left"));
        assert!(a.contains("right"));
    }

    #[test]
    fn test_merge_incompatible() {
        let a: BloomFilter<str> = BloomFilter::new(100, 0.01).unwrap();
        let b: BloomFilter<str> = BloomFilter::new(200, 0.01).unwrap();
        assert!(matches!(
            a.merge(&b),
            Err(SiftError::IncompatibleFilters { .. })
        ));
    }

    #[test]
    fn test_estimates_move_with_inserts() {
        let filter: BloomFilter<String> = BloomFilter::new(1000, 0.01).unwrap();
        assert_eq!(filter.approximate_len(), 0);
        for i in 0..500 {
            filter.insert(&format!("key_{}", i));
        }
        let approx = filter.approximate_len();
        assert!(
            (350..=650).contains(&approx),
            "approximate_len {} far from 500",
            approx
        );
        assert!(filter.estimated_fpr() < 0.01);
    }

    #[test]
    fn test_custom_hasher() {
        let filter: BloomFilter<str> =
            BloomFilter::with_hasher(100, 0.01, XxFilterHash::with_seed(99)).unwrap();
        filter.insert("apple");
        assert!(filter.contains("apple"));
    }

    #[test]
    fn test_self_decomposing_items() {
        use crate::common::decompose::SelfDecomposer;

        let filter: BloomFilter<u64, SelfDecomposer> =
            BloomFilter::with_decomposer(100, 0.01, SelfDecomposer).unwrap();
        filter.insert(&42);
        assert!(filter.contains(&42));
    }

    #[test]
    fn test_concurrent_inserts_lose_nothing() {
        use std::sync::Arc;

        let filter: Arc<BloomFilter<String>> = Arc::new(BloomFilter::new(10_000, 0.01).unwrap());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let filter = Arc::clone(&filter);
                std::thread::spawn(move || {
                    for i in 0..1000 {
                        filter.insert(&format!("t{}_{}", t, i));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        for t in 0..4 {
            for i in 0..1000 {
                assert!(filter.contains(&format!("t{}_{}", t, i)));
            }
        }
    }
}
