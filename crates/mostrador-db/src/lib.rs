//! # mostrador-db: Persistence and Transactional Engine
//!
//! SQLite-backed storage for Mostrador, plus the engine that owns every
//! stock mutation.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        mostrador-db Crate                               │
//! │                                                                         │
//! │  ┌───────────────────────────────────────────────────────────────┐     │
//! │  │                    engine (write path)                        │     │
//! │  │   per-product locks · atomic sale commit · bounded retry     │     │
//! │  └───────────────────────────────┬───────────────────────────────┘     │
//! │                                  │                                      │
//! │  ┌───────────────────────────────▼───────────────────────────────┐     │
//! │  │                       repository                              │     │
//! │  │   product  │  movement (ledger)  │  sale  │  reports          │     │
//! │  └───────────────────────────────┬───────────────────────────────┘     │
//! │                                  │                                      │
//! │  ┌───────────────────────────────▼───────────────────────────────┐     │
//! │  │              pool (SqlitePool, WAL) + migrations              │     │
//! │  └───────────────────────────────────────────────────────────────┘     │
//! │                                                                         │
//! │  Business rules live in mostrador-core; this crate wires them to       │
//! │  SQLite and adds the concurrency discipline around them.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use mostrador_db::{Database, DbConfig, Engine};
//!
//! let db = Database::new(DbConfig::new("mostrador.db")).await?;
//! let engine = Engine::new(db);
//!
//! let receipt = engine.create_sale(request, "vendedor").await?;
//! ```

pub mod engine;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use engine::{Engine, EngineError, EngineResult, ProductLocks};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::movement::MovementFilter;
pub use repository::reports::{DashboardSummary, TopProduct};
pub use repository::{MovementRepository, ProductRepository, ReportsRepository, SaleRepository};
