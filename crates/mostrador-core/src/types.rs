//! # Domain Types
//!
//! Core domain types used throughout Mostrador.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    Movement     │   │      Sale       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  unit price     │   │  seq (ledger)   │   │  payment method │       │
//! │  │  tier prices    │   │  kind, quantity │   │  total_cents    │       │
//! │  │  baseline stock │   │  sale_id (FK?)  │   │  lines (1..n)   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    UnitTier     │   │  MovementKind   │   │ PaymentMethod   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  Unit           │   │  Entry          │   │  Cash           │       │
//! │  │  HalfDozen      │   │  Exit           │   │  Card           │       │
//! │  │  Dozen          │   └─────────────────┘   │  Transfer       │       │
//! │  └─────────────────┘                         └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## The Ledger Rule
//! `Movement` rows are append-only and totally ordered by `seq`. A
//! product's stock is never stored authoritatively; it is always
//! `baseline_stock + Σ entries − Σ exits` (see [`crate::projection`]).
//! `Product::stock_cached` is a derived convenience value maintained in
//! the same transaction that appends a movement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Unit Tier
// =============================================================================

/// The unit-of-sale granularity a sale line is priced at.
///
/// Tier prices are per pack (a half-dozen price buys six units); the
/// pricing resolver divides them back down to a per-unit price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum UnitTier {
    /// A single unit at the plain unit price.
    Unit,
    /// Six units, priced by the half-dozen pack price when present.
    HalfDozen,
    /// Twelve units, priced by the dozen pack price when present.
    Dozen,
}

impl UnitTier {
    /// Number of sellable units one pack of this tier contains.
    #[inline]
    pub const fn units_per_pack(&self) -> i64 {
        match self {
            UnitTier::Unit => 1,
            UnitTier::HalfDozen => 6,
            UnitTier::Dozen => 12,
        }
    }
}

impl Default for UnitTier {
    fn default() -> Self {
        UnitTier::Unit
    }
}

// =============================================================================
// Movement Kind
// =============================================================================

/// The direction of a stock movement. Exactly two variants, by design
/// of the ledger: everything that changes stock is an entry or an exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Stock added (purchase, production, correction upward).
    Entry,
    /// Stock removed (sale, loss, correction downward).
    Exit,
}

// =============================================================================
// Payment Method
// =============================================================================

/// Closed set of accepted payment methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Card payment on an external terminal.
    Card,
    /// Bank transfer / QR payment.
    Transfer,
}

// =============================================================================
// Product
// =============================================================================

/// A sellable catalog item with its price tiers and stock baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Free-text category, if any.
    pub category: Option<String>,

    /// Price of a single unit in cents. Always > 0.
    pub unit_price_cents: i64,

    /// Pack price for six units, if the product sells by the half dozen.
    pub half_dozen_price_cents: Option<i64>,

    /// Pack price for twelve units, if the product sells by the dozen.
    pub dozen_price_cents: Option<i64>,

    /// Low-stock threshold. Absent means the product is never flagged low.
    pub min_stock: Option<i64>,

    /// Stock at creation time. Immutable; the ledger folds on top of it.
    pub baseline_stock: i64,

    /// Cached projection of current stock. Maintained by delta in the
    /// same transaction that appends a movement; never consulted for
    /// admission checks, always re-derivable from the ledger.
    pub stock_cached: i64,

    /// When the product was created.
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the single-unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Pack price for the given tier, if one is configured.
    pub fn pack_price_cents(&self, tier: UnitTier) -> Option<i64> {
        match tier {
            UnitTier::Unit => Some(self.unit_price_cents),
            UnitTier::HalfDozen => self.half_dozen_price_cents,
            UnitTier::Dozen => self.dozen_price_cents,
        }
    }
}

// =============================================================================
// Movement
// =============================================================================

/// An immutable ledger entry recording a stock Entry or Exit for one
/// product. Never updated or deleted once committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Movement {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Commit sequence assigned by the ledger. Movements for a product
    /// are totally ordered by `seq`, not by wall-clock time, so clock
    /// skew can never reorder history.
    pub seq: i64,

    /// The product this movement affects.
    pub product_id: String,

    /// Entry or Exit.
    pub kind: MovementKind,

    /// Units moved. Always > 0; direction comes from `kind`.
    pub quantity: i64,

    /// Optional free-text motive ("compra", "merma", ...).
    pub motive: Option<String>,

    /// Originating sale, when this exit was emitted by the sale
    /// processor. Null for manual movements.
    pub sale_id: Option<String>,

    /// Identity of the user who recorded it. Always explicit, never
    /// read from ambient state.
    pub actor: String,

    /// Creation instant, immutable.
    pub created_at: DateTime<Utc>,
}

impl Movement {
    /// Signed stock delta this movement applies.
    #[inline]
    pub fn signed_quantity(&self) -> i64 {
        match self.kind {
            MovementKind::Entry => self.quantity,
            MovementKind::Exit => -self.quantity,
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A committed multi-line sale transaction.
///
/// Every committed sale has one Exit movement per line, same quantity,
/// referencing it. Sales are committed atomically: there is no draft
/// state and no partial sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    pub payment_method: PaymentMethod,
    /// Sum of line totals, in cents.
    pub total_cents: i64,
    pub actor: String,
    pub created_at: DateTime<Utc>,
}

impl Sale {
    /// Returns the sale total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Sale Line
// =============================================================================

/// One product/quantity/tier entry within a sale.
///
/// Uses the snapshot pattern for pricing: the resolved unit price is
/// frozen on the line at commit time so later catalog price changes
/// never rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleLine {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Units sold. Always > 0.
    pub quantity: i64,
    /// Tier the price was resolved at.
    pub tier: UnitTier,
    /// Resolved per-unit price, rounded to whole cents at persistence.
    pub unit_price_cents: i64,
    /// quantity × exact unit price, rounded to whole cents at persistence.
    pub line_total_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl SaleLine {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the line total as Money.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Request Types
// =============================================================================

/// Input for creating a catalog product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub category: Option<String>,
    pub unit_price_cents: i64,
    pub half_dozen_price_cents: Option<i64>,
    pub dozen_price_cents: Option<i64>,
    pub min_stock: Option<i64>,
    /// Starting stock. Immutable after creation.
    pub baseline_stock: i64,
}

/// Input for updating a catalog product.
///
/// Metadata and prices only. `baseline_stock` is immutable after
/// creation (the ledger folds on top of it) and is deliberately absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateProduct {
    pub name: String,
    pub category: Option<String>,
    pub unit_price_cents: i64,
    pub half_dozen_price_cents: Option<i64>,
    pub dozen_price_cents: Option<i64>,
    pub min_stock: Option<i64>,
}

/// Input for recording a manual ledger movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMovement {
    pub product_id: String,
    pub kind: MovementKind,
    pub quantity: i64,
    pub motive: Option<String>,
}

/// One requested line of a sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSaleLine {
    pub product_id: String,
    pub quantity: i64,
    pub tier: UnitTier,
}

/// Input for committing a sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSale {
    pub lines: Vec<NewSaleLine>,
    pub payment_method: PaymentMethod,
}

/// A committed sale with its resolved lines, as returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleReceipt {
    pub sale: Sale,
    pub lines: Vec<SaleLine>,
}

impl SaleReceipt {
    /// Sum of line totals. Equal to `sale.total_cents` by construction.
    pub fn lines_total(&self) -> Money {
        self.lines
            .iter()
            .fold(Money::zero(), |acc, l| acc + l.line_total())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_per_pack() {
        assert_eq!(UnitTier::Unit.units_per_pack(), 1);
        assert_eq!(UnitTier::HalfDozen.units_per_pack(), 6);
        assert_eq!(UnitTier::Dozen.units_per_pack(), 12);
    }

    #[test]
    fn test_movement_signed_quantity() {
        let mut movement = Movement {
            id: "m-1".to_string(),
            seq: 1,
            product_id: "p-1".to_string(),
            kind: MovementKind::Entry,
            quantity: 20,
            motive: None,
            sale_id: None,
            actor: "vendedor".to_string(),
            created_at: Utc::now(),
        };
        assert_eq!(movement.signed_quantity(), 20);

        movement.kind = MovementKind::Exit;
        assert_eq!(movement.signed_quantity(), -20);
    }

    #[test]
    fn test_pack_price_lookup() {
        let product = Product {
            id: "p-1".to_string(),
            name: "Galleta chocolate".to_string(),
            category: Some("Galleta".to_string()),
            unit_price_cents: 1700,
            half_dozen_price_cents: Some(10200),
            dozen_price_cents: None,
            min_stock: Some(50),
            baseline_stock: 100,
            stock_cached: 100,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert_eq!(product.pack_price_cents(UnitTier::Unit), Some(1700));
        assert_eq!(product.pack_price_cents(UnitTier::HalfDozen), Some(10200));
        assert_eq!(product.pack_price_cents(UnitTier::Dozen), None);
    }

    #[test]
    fn test_tier_serde_names() {
        assert_eq!(
            serde_json::to_string(&UnitTier::HalfDozen).unwrap(),
            "\"half_dozen\""
        );
        assert_eq!(
            serde_json::to_string(&MovementKind::Exit).unwrap(),
            "\"exit\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentMethod::Transfer).unwrap(),
            "\"transfer\""
        );
    }
}
