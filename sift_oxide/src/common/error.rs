//! Error types for filter and index operations

use std::fmt;

/// Errors that can occur during filter construction or maintenance
///
/// Operational outcomes (a full cuckoo filter, a missing key on delete, a
/// duplicate key on insert) are reported as `bool` returns by the structures
/// themselves, never as errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiftError {
    /// Invalid parameter provided to a constructor or operation
    InvalidParameter {
        /// Parameter name
        param: String,
        /// Invalid value provided
        value: String,
        /// Constraint that was violated
        constraint: String,
    },

    /// Attempted to merge filters with differing geometry
    IncompatibleFilters {
        /// Reason for incompatibility
        reason: String,
    },
}

impl fmt::Display for SiftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiftError::InvalidParameter {
                param,
                value,
                constraint,
            } => {
                write!(
                    f,
                    "Invalid parameter '{}': value '{}' {}",
                    param, value, constraint
                )
            }
            SiftError::IncompatibleFilters { reason } => {
                write!(f, "Incompatible filters: {}", reason)
            }
        }
    }
}

impl std::error::Error for SiftError {}

/// Result type alias for filter operations
pub type Result<T> = std::result::Result<T, SiftError>;
