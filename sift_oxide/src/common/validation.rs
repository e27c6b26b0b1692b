//! Parameter validation shared by the structure constructors

use crate::common::{Result, SiftError};

/// Maximum capacity for any structure (2^31 - 1 items)
pub const MAX_CAPACITY: u64 = (1u64 << 31) - 1;

/// Fingerprints are packed into a `u32`, so at most 4 bytes
pub const MAX_FINGERPRINT_LEN: usize = 4;

/// Validate that capacity is positive and within limits
pub fn validate_capacity(capacity: u64) -> Result<()> {
    if capacity == 0 {
        return Err(SiftError::InvalidParameter {
            param: "capacity".to_string(),
            value: capacity.to_string(),
            constraint: "must be greater than 0".to_string(),
        });
    }
    if capacity > MAX_CAPACITY {
        return Err(SiftError::InvalidParameter {
            param: "capacity".to_string(),
            value: capacity.to_string(),
            constraint: format!("must not exceed {}", MAX_CAPACITY),
        });
    }
    Ok(())
}

/// Validate that a value is a valid probability (0.0 < p < 1.0)
pub fn validate_probability(value: f64, param_name: &str) -> Result<()> {
    if !(0.0 < value && value < 1.0) {
        return Err(SiftError::InvalidParameter {
            param: param_name.to_string(),
            value: value.to_string(),
            constraint: "must be in range (0.0, 1.0) (exclusive)".to_string(),
        });
    }
    Ok(())
}

/// Validate a cuckoo fingerprint length in bytes
pub fn validate_fingerprint_len(len: usize) -> Result<()> {
    if len == 0 || len > MAX_FINGERPRINT_LEN {
        return Err(SiftError::InvalidParameter {
            param: "fingerprint_len".to_string(),
            value: len.to_string(),
            constraint: format!("must be in range [1, {}]", MAX_FINGERPRINT_LEN),
        });
    }
    Ok(())
}

/// Validate the element bound used to size skip-list levels
pub fn validate_max_elements(max_elements: u64) -> Result<()> {
    if max_elements == 0 {
        return Err(SiftError::InvalidParameter {
            param: "max_elements".to_string(),
            value: max_elements.to_string(),
            constraint: "must be greater than 0".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_capacity() {
        assert!(validate_capacity(1).is_ok());
        assert!(validate_capacity(MAX_CAPACITY).is_ok());
        assert!(validate_capacity(0).is_err());
        assert!(validate_capacity(MAX_CAPACITY + 1).is_err());
    }

    #[test]
    fn test_validate_probability() {
        assert!(validate_probability(0.01, "p").is_ok());
        assert!(validate_probability(0.999, "p").is_ok());
        assert!(validate_probability(0.0, "p").is_err());
        assert!(validate_probability(1.0, "p").is_err());
        assert!(validate_probability(-0.5, "p").is_err());
        assert!(validate_probability(f64::NAN, "p").is_err());
    }

    #[test]
    fn test_validate_fingerprint_len() {
        for len in 1..=4 {
            assert!(validate_fingerprint_len(len).is_ok());
        }
        assert!(validate_fingerprint_len(0).is_err());
        assert!(validate_fingerprint_len(5).is_err());
    }

    #[test]
    fn test_validate_max_elements() {
        assert!(validate_max_elements(1).is_ok());
        assert!(validate_max_elements(0).is_err());
    }
}
