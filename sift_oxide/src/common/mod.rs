//! Common utilities, traits, and errors

pub mod bits;
pub mod decompose;
mod error;
pub mod hash;
pub mod validation;

pub use bits::BitArray;
pub use decompose::{ByteSink, Decompose, Decomposer, SelfDecomposer, TextDecomposer};
pub use error::{Result, SiftError};
pub use hash::{FilterHash, XxFilterHash};
