//! Ordered-key structures
//!
//! Exact (non-probabilistic) concurrent containers answering ordered
//! lookups and range scans under mutation.

mod skiplist;

pub use skiplist::SkipList;
