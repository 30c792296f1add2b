//! # Repository Modules
//!
//! Data access layer with one repository per aggregate.
//!
//! ## Pattern
//! Each repository:
//! - Owns a clone of the pool for standalone reads
//! - Exposes `*_with(conn, ...)` associated functions for writes that must
//!   participate in a caller-owned transaction (the engine's commit path)
//! - Returns `DbResult<T>` for error handling
//! - Contains all SQL for its aggregate (no SQL elsewhere)

pub mod movement;
pub mod product;
pub mod reports;
pub mod sale;

pub use movement::MovementRepository;
pub use product::ProductRepository;
pub use reports::ReportsRepository;
pub use sale::SaleRepository;
