//! Approximate membership filters
//!
//! Probabilistic data structures for set membership queries: they can say
//! "definitely not present" or "possibly present", never a false negative.

mod bloom;
mod cuckoo;

pub use bloom::BloomFilter;
pub use cuckoo::CuckooFilter;
