//! sift_oxide: approximate membership filters and a concurrent ordered index
//!
//! Three in-memory data structures for high-throughput filtering and
//! indexing workloads:
//!
//! - [`BloomFilter`]: double-hashed membership over an atomic bit array,
//!   sized from expected cardinality and a target false-positive rate
//! - [`CuckooFilter`]: fingerprint membership with two candidate buckets,
//!   bounded eviction, and deletions
//! - [`SkipList`]: a lazy optimistic concurrent sorted set with lock-free
//!   lookups and range scans
//!
//! Items reach the filters through a decomposition pipeline (value to
//! canonical bytes) and a pluggable hash contract; see [`common`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod common;
pub mod membership;
pub mod ordered;

// Re-export core types for convenience
pub use common::{
    ByteSink, Decompose, Decomposer, FilterHash, Result, SelfDecomposer, SiftError,
    TextDecomposer, XxFilterHash,
};
pub use membership::{BloomFilter, CuckooFilter};
pub use ordered::SkipList;

/// Error types and result aliases for filter operations
pub mod error {
    pub use crate::common::{Result, SiftError};
}
