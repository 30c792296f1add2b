//! # Validation Module
//!
//! Input validation for requests entering the engine.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: THIS MODULE (pure, before any I/O)                           │
//! │  ├── Shape checks: required fields, positive quantities,               │
//! │  │   non-empty sale lines                                              │
//! │  └── Fails fast with ValidationError                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Engine (transactional)                                       │
//! │  ├── Product existence, stock sufficiency                              │
//! │  └── Fails with CoreError under the per-product lock                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── Foreign key constraints                                           │
//! │                                                                         │
//! │  Defense in depth: the authoritative check is always server-side.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::{NewMovement, NewProduct, NewSale, UnitTier, UpdateProduct};
use crate::{MAX_LINE_QUANTITY, MAX_SALE_LINES};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty (after trimming)
/// - Must be at most 200 characters
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a strictly positive price in cents (the unit price, and
/// any configured pack price).
pub fn validate_price_cents(cents: i64, field: &str) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a configured pack price for a tier of `per_units` units.
///
/// A pack price must cover at least one cent per unit in the pack.
/// Anything smaller would freeze a per-unit price of zero on a sale
/// line, which the schema rightly refuses.
pub fn validate_pack_price_cents(
    cents: i64,
    per_units: i64,
    field: &str,
) -> ValidationResult<()> {
    validate_price_cents(cents, field)?;

    if cents < per_units {
        return Err(ValidationError::TooSmall {
            field: field.to_string(),
            min: per_units,
        });
    }

    Ok(())
}

/// Validates a stock figure that may legitimately be zero (baseline
/// stock, minimum-stock threshold).
pub fn validate_stock_level(level: i64, field: &str) -> ValidationResult<()> {
    if level < 0 {
        return Err(ValidationError::MustBeNonNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates an entity id.
pub fn validate_id(id: &str, field: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Request Validators
// =============================================================================

/// Validates a product creation request.
pub fn validate_new_product(input: &NewProduct) -> ValidationResult<()> {
    validate_product_name(&input.name)?;
    validate_price_cents(input.unit_price_cents, "unit_price")?;

    if let Some(pack) = input.half_dozen_price_cents {
        validate_pack_price_cents(pack, UnitTier::HalfDozen.units_per_pack(), "half_dozen_price")?;
    }
    if let Some(pack) = input.dozen_price_cents {
        validate_pack_price_cents(pack, UnitTier::Dozen.units_per_pack(), "dozen_price")?;
    }
    if let Some(min) = input.min_stock {
        validate_stock_level(min, "min_stock")?;
    }
    validate_stock_level(input.baseline_stock, "baseline_stock")?;

    Ok(())
}

/// Validates a product update request. Same field rules as creation,
/// minus the baseline stock (which cannot be updated).
pub fn validate_update_product(input: &UpdateProduct) -> ValidationResult<()> {
    validate_product_name(&input.name)?;
    validate_price_cents(input.unit_price_cents, "unit_price")?;

    if let Some(pack) = input.half_dozen_price_cents {
        validate_pack_price_cents(pack, UnitTier::HalfDozen.units_per_pack(), "half_dozen_price")?;
    }
    if let Some(pack) = input.dozen_price_cents {
        validate_pack_price_cents(pack, UnitTier::Dozen.units_per_pack(), "dozen_price")?;
    }
    if let Some(min) = input.min_stock {
        validate_stock_level(min, "min_stock")?;
    }

    Ok(())
}

/// Validates a manual movement request.
pub fn validate_new_movement(input: &NewMovement) -> ValidationResult<()> {
    validate_id(&input.product_id, "product_id")?;
    validate_quantity(input.quantity)?;

    Ok(())
}

/// Validates a sale request before any mutation.
///
/// ## Rules
/// - At least one line, at most MAX_SALE_LINES
/// - Every line has a product id and a positive quantity
///
/// Stock sufficiency and product existence are checked later, under the
/// per-product lock; this validator is purely shape.
pub fn validate_new_sale(input: &NewSale) -> ValidationResult<()> {
    if input.lines.is_empty() {
        return Err(ValidationError::EmptyCollection {
            field: "lines".to_string(),
        });
    }

    if input.lines.len() > MAX_SALE_LINES {
        return Err(ValidationError::OutOfRange {
            field: "lines".to_string(),
            min: 1,
            max: MAX_SALE_LINES as i64,
        });
    }

    for line in &input.lines {
        validate_id(&line.product_id, "product_id")?;
        validate_quantity(line.quantity)?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
