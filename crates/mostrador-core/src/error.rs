//! # Error Types
//!
//! Domain-specific error types for mostrador-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  mostrador-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule violations                        │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  mostrador-db errors (separate crate)                                   │
//! │  ├── DbError          - Database operation failures                     │
//! │  └── EngineError      - What the API boundary sees                      │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → caller               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product id, quantities, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message at the boundary

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations. They are rejections,
/// not faults: the ledger is left untouched when one of these is returned.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Committing the operation would drive projected stock below zero.
    ///
    /// `available` is the projected stock at the time the request was
    /// admitted, i.e. the maximum quantity the caller could have asked
    /// for and still succeeded.
    ///
    /// ## When This Occurs
    /// - A manual Exit larger than current stock
    /// - A sale line (or several lines on the same product summed
    ///   together) exceeding current stock
    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        requested: i64,
        available: i64,
    },

    /// Sale not found.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Product is still referenced by ledger movements or sale lines.
    ///
    /// The ledger is a historical record; a product may only be deleted
    /// once nothing references it.
    #[error("Product {0} is referenced by the ledger and cannot be deleted")]
    ProductInUse(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when a request doesn't meet requirements, before any
/// business logic runs. Always recoverable by the caller correcting
/// the input.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Numeric value is below its minimum.
    #[error("{field} must be at least {min}")]
    TooSmall { field: String, min: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustBeNonNegative { field: String },

    /// A collection that must carry at least one element is empty.
    #[error("{field} must contain at least one element")]
    EmptyCollection { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product_id: "p-1".to_string(),
            requested: 70,
            available: 60,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product p-1: available 60, requested 70"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");

        let err = ValidationError::EmptyCollection {
            field: "lines".to_string(),
        };
        assert_eq!(err.to_string(), "lines must contain at least one element");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
