//! # Pricing Resolver
//!
//! Converts a requested unit tier (unit / half dozen / dozen) into a
//! per-unit price for a product.
//!
//! ## Resolution Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  resolve_unit_price(product, tier)                                      │
//! │                                                                         │
//! │  tier = Unit       ──► unit price                                       │
//! │  tier = HalfDozen  ──► half-dozen pack price ÷ 6   (if configured)     │
//! │                    └─► else fall back to unit price, undivided         │
//! │  tier = Dozen      ──► dozen pack price ÷ 12       (if configured)     │
//! │                    └─► else fall back to unit price, undivided         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The fallback is deliberate: a product without a dozen price sold at
//! dozen tier is priced at the plain unit price per unit. It is never
//! `unit_price / 12`: the caller asked for a granularity the product
//! doesn't discount, so they pay the undiscounted price.
//!
//! ## Precision
//! A pack price divided by its unit count is rarely whole cents. The
//! resolved price is kept as an exact rational (`UnitPrice`) and only
//! rounded (half away from zero) when a persisted value is produced:
//! the line's frozen per-unit price and the line total.

use crate::money::{round_div_half_away, Money};
use crate::types::{Product, UnitTier};

// =============================================================================
// Unit Price
// =============================================================================

/// A resolved per-unit price with full precision: exactly
/// `pack_cents / per_units` cents per unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitPrice {
    pack_cents: i64,
    per_units: i64,
}

impl UnitPrice {
    /// A price already expressed in whole cents per unit.
    #[inline]
    pub const fn exact(cents: i64) -> Self {
        UnitPrice {
            pack_cents: cents,
            per_units: 1,
        }
    }

    /// A pack price split evenly across `per_units` units.
    #[inline]
    pub const fn of_pack(pack_cents: i64, per_units: i64) -> Self {
        UnitPrice {
            pack_cents,
            per_units,
        }
    }

    /// The per-unit price rounded to whole cents (half away from zero).
    ///
    /// This is what gets frozen onto a sale line.
    #[inline]
    pub fn rounded_cents(&self) -> i64 {
        round_div_half_away(self.pack_cents, self.per_units)
    }

    /// Line total for `quantity` units, computed at full precision and
    /// rounded once at the end: `round(quantity × pack_cents / per_units)`.
    ///
    /// Rounding the product rather than the factor keeps a six-unit
    /// half-dozen line at exactly the pack price.
    pub fn line_total(&self, quantity: i64) -> Money {
        Money::from_cents(round_div_half_away(
            self.pack_cents.saturating_mul(quantity),
            self.per_units,
        ))
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// Resolves the per-unit price for `product` at the requested tier.
///
/// Pure function: same product and tier always yield the same price.
///
/// ## Example
/// ```rust
/// use mostrador_core::pricing::resolve_unit_price;
/// use mostrador_core::types::UnitTier;
/// # use mostrador_core::types::Product;
/// # use chrono::Utc;
/// # let product = Product {
/// #     id: "p".into(), name: "Galleta".into(), category: None,
/// #     unit_price_cents: 1700, half_dozen_price_cents: None,
/// #     dozen_price_cents: Some(20400), min_stock: None,
/// #     baseline_stock: 0, stock_cached: 0,
/// #     created_at: Utc::now(), updated_at: Utc::now(),
/// # };
/// let price = resolve_unit_price(&product, UnitTier::Dozen);
/// assert_eq!(price.rounded_cents(), 1700); // 204.00 / 12 = 17.00 exactly
/// ```
pub fn resolve_unit_price(product: &Product, tier: UnitTier) -> UnitPrice {
    match tier {
        UnitTier::Unit => UnitPrice::exact(product.unit_price_cents),
        UnitTier::HalfDozen => match product.half_dozen_price_cents {
            Some(pack) => UnitPrice::of_pack(pack, 6),
            None => UnitPrice::exact(product.unit_price_cents),
        },
        UnitTier::Dozen => match product.dozen_price_cents {
            Some(pack) => UnitPrice::of_pack(pack, 12),
            None => UnitPrice::exact(product.unit_price_cents),
        },
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(
        unit: i64,
        half_dozen: Option<i64>,
        dozen: Option<i64>,
    ) -> Product {
        Product {
            id: "p-1".to_string(),
            name: "Galleta chocolate".to_string(),
            category: Some("Galleta".to_string()),
            unit_price_cents: unit,
            half_dozen_price_cents: half_dozen,
            dozen_price_cents: dozen,
            min_stock: None,
            baseline_stock: 0,
            stock_cached: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_unit_tier_uses_unit_price() {
        let p = product(1700, Some(10200), Some(20400));
        let price = resolve_unit_price(&p, UnitTier::Unit);
        assert_eq!(price.rounded_cents(), 1700);
    }

    #[test]
    fn test_dozen_tier_divides_pack_price_exactly() {
        // Bs. 204.00 dozen pack → Bs. 17.00 per unit, exactly
        let p = product(1700, None, Some(20400));
        let price = resolve_unit_price(&p, UnitTier::Dozen);
        assert_eq!(price.rounded_cents(), 1700);
        assert_eq!(price.line_total(12).cents(), 20400);
    }

    #[test]
    fn test_half_dozen_tier_divides_pack_price() {
        // Bs. 102.00 half-dozen pack → Bs. 17.00 per unit
        let p = product(1700, Some(10200), None);
        let price = resolve_unit_price(&p, UnitTier::HalfDozen);
        assert_eq!(price.rounded_cents(), 1700);
        assert_eq!(price.line_total(6).cents(), 10200);
    }

    #[test]
    fn test_missing_tier_price_falls_back_to_unit_price() {
        // No dozen price configured: dozen tier pays the plain unit
        // price per unit, NOT unit_price / 12.
        let p = product(1700, None, None);
        let price = resolve_unit_price(&p, UnitTier::Dozen);
        assert_eq!(price.rounded_cents(), 1700);
        assert_eq!(price.line_total(1).cents(), 1700);

        let price = resolve_unit_price(&p, UnitTier::HalfDozen);
        assert_eq!(price.rounded_cents(), 1700);
    }

    #[test]
    fn test_fractional_pack_price_rounds_only_at_the_end() {
        // Bs. 1.01 half-dozen pack: 101/6 = 16.8333.. cents per unit
        let p = product(20, Some(101), None);
        let price = resolve_unit_price(&p, UnitTier::HalfDozen);

        // Frozen unit price rounds to 17 cents
        assert_eq!(price.rounded_cents(), 17);

        // But a six-unit line totals the exact pack price (101), not
        // 6 × 17 = 102: precision is kept until the single rounding.
        assert_eq!(price.line_total(6).cents(), 101);
    }

    #[test]
    fn test_line_total_scales_with_quantity() {
        let p = product(1700, None, Some(20400));
        let price = resolve_unit_price(&p, UnitTier::Dozen);
        assert_eq!(price.line_total(3).cents(), 5100);
    }
}
