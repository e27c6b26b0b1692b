//! Hash contract for the filter structures
//!
//! The filters never commit to a concrete hash algorithm. They consume
//! digests through [`FilterHash`]: the Bloom filter takes the first 64-bit
//! word, the cuckoo filter takes the digest as raw bytes. The default
//! implementation is [`XxFilterHash`], a seeded xxHash64.

use xxhash_rust::xxh64::xxh64;

/// Contract between the filters and a hash algorithm
///
/// An implementation may be single-valued (one 64-bit word) or multi-valued
/// (several words, e.g. a truncated cryptographic digest); the filters only
/// ever consume the first word or the leading digest bytes.
pub trait FilterHash {
    /// Full digest of `data` as bytes
    ///
    /// Must be at least 8 bytes long and deterministic for equal input.
    fn digest(&self, data: &[u8]) -> Vec<u8>;

    /// First 64-bit word of the digest
    ///
    /// The default reads the leading 8 digest bytes big-endian,
    /// zero-padding shorter digests.
    fn digest64(&self, data: &[u8]) -> u64 {
        let bytes = self.digest(data);
        let mut word = [0u8; 8];
        let take = bytes.len().min(8);
        word[..take].copy_from_slice(&bytes[..take]);
        u64::from_be_bytes(word)
    }

    /// Multi-valued digest form
    ///
    /// Single-valued implementations fall back to one word; the filters pick
    /// the first entry either way.
    fn digest_words(&self, data: &[u8]) -> Vec<u64> {
        vec![self.digest64(data)]
    }
}

/// Default hash: seeded xxHash64
///
/// # Examples
/// ```
/// use sift_oxide::common::hash::{FilterHash, XxFilterHash};
///
/// let hasher = XxFilterHash::default();
/// let word = hasher.digest64(b"hello world");
/// assert_eq!(word, hasher.digest64(b"hello world"));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct XxFilterHash {
    /// Hash seed; distinct seeds yield independent hash functions
    pub seed: u64,
}

impl XxFilterHash {
    /// Creates a hasher with the given seed
    pub fn with_seed(seed: u64) -> Self {
        Self { seed }
    }
}

impl FilterHash for XxFilterHash {
    fn digest(&self, data: &[u8]) -> Vec<u8> {
        xxh64(data, self.seed).to_be_bytes().to_vec()
    }

    fn digest64(&self, data: &[u8]) -> u64 {
        xxh64(data, self.seed)
    }
}
