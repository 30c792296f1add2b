//! # mostrador-core: Pure Business Logic for Mostrador
//!
//! This crate is the **heart** of Mostrador, a storefront inventory
//! ledger and sale engine. It contains all business rules as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Mostrador Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   API Boundary (external)                       │   │
//! │  │    authenticated requests in, typed results out                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              mostrador-db (engine + repositories)               │   │
//! │  │    per-product locking, atomic sale commit, ledger append       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ mostrador-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  pricing   │  │projection │  │   │
//! │  │   │  Product  │  │   Money   │  │ UnitPrice  │  │stock fold │  │   │
//! │  │   │ Movement  │  │  rounding │  │ tier rules │  │  is_low   │  │   │
//! │  │   │   Sale    │  └───────────┘  └────────────┘  └───────────┘  │   │
//! │  │   └───────────┘                                                 │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Movement, Sale, tiers, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`pricing`] - Tier price resolution with explicit fallback rules
//! - [`projection`] - Stock as a pure fold over the movement ledger
//! - [`error`] - Domain error types
//! - [`validation`] - Request shape validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All persisted amounts are whole cents (i64)
//! 4. **Ledger First**: Stock is derived from movements, never stored
//!    authoritatively
//! 5. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod pricing;
pub mod projection;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use mostrador_core::Money` instead of
// `use mostrador_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pricing::{resolve_unit_price, UnitPrice};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single sale.
///
/// ## Business Reason
/// Prevents runaway requests and keeps a sale a human-scale counter
/// transaction.
pub const MAX_SALE_LINES: usize = 50;

/// Maximum quantity of a single sale line or manual movement.
///
/// ## Business Reason
/// Prevents accidental over-entry (e.g., typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Bounded retry budget for transient commit conflicts before the
/// engine surfaces `ConcurrentConflict` to the caller.
pub const MAX_COMMIT_ATTEMPTS: u32 = 3;
