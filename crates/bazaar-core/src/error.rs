//! # Error Types
//!
//! Validation errors for bazaar-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  bazaar-core errors (this file)                              │
//! │  └── ValidationError  - Input validation failures            │
//! │                                                              │
//! │  bazaar-db errors (separate crate)                           │
//! │  ├── DbError          - Storage failures (NotFound, unique   │
//! │  │                      violations, transaction aborts)     │
//! │  └── CommerceError    - Cart/checkout workflow failures      │
//! │                                                              │
//! │  Flow: ValidationError → DbError/CommerceError → routing     │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Input validation errors.
///
/// These occur when a payload doesn't meet field requirements. They are
/// raised before any storage work happens, so a validation failure never
/// leaves partial state behind.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: &'static str },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    /// Numeric value must not be negative.
    #[error("{field} must be non-negative")]
    Negative { field: &'static str },

    /// Numeric value is outside the accepted range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
    },

    /// Invalid format (e.g. a malformed email address).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat {
        field: &'static str,
        reason: &'static str,
    },

    /// Value is not in the allowed set (e.g. an unknown order status).
    #[error("{field} must be one of: {allowed}")]
    NotAllowed {
        field: &'static str,
        allowed: &'static str,
    },
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ValidationError::Required { field: "email" };
        assert_eq!(err.to_string(), "email is required");

        let err = ValidationError::OutOfRange {
            field: "quantity",
            min: 1,
            max: 999,
        };
        assert_eq!(err.to_string(), "quantity must be between 1 and 999");
    }
}
