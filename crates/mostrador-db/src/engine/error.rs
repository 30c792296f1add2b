//! # Engine Error Types
//!
//! The error surface the API boundary sees. Everything below (core
//! validation, database) folds into these variants.

use thiserror::Error;

use mostrador_core::{CoreError, ValidationError};

use crate::error::DbError;

/// Errors surfaced by the transactional engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Request shape was invalid (empty sale, non-positive quantity...).
    /// Rejected before any I/O.
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// An exit or sale line asked for more units than the ledger
    /// projects as available. `available` is the projected stock at the
    /// moment of admission, i.e. the maximum satisfiable quantity.
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: String,
        requested: i64,
        available: i64,
    },

    /// Referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A transient write conflict persisted through the retry budget.
    /// The operation was NOT applied; the caller may retry.
    #[error("Concurrent conflict: gave up after {attempts} attempts")]
    ConcurrentConflict { attempts: u32 },

    /// Product deletion rejected because the ledger or a sale line
    /// still references it.
    #[error("Product {0} has recorded history and cannot be deleted")]
    ProductInUse(String),

    /// Underlying storage failure.
    #[error("Storage error: {0}")]
    Storage(DbError),
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(id) => EngineError::NotFound {
                entity: "Product".to_string(),
                id,
            },
            CoreError::SaleNotFound(id) => EngineError::NotFound {
                entity: "Sale".to_string(),
                id,
            },
            CoreError::InsufficientStock {
                product_id,
                requested,
                available,
            } => EngineError::InsufficientStock {
                product_id,
                requested,
                available,
            },
            CoreError::ProductInUse(id) => EngineError::ProductInUse(id),
            CoreError::Validation(inner) => EngineError::Validation(inner),
        }
    }
}

/// `NotFound` keeps its shape crossing the boundary; everything else a
/// repository reports is a storage concern. The delete path overrides
/// this for foreign-key rejections (see `Engine::delete_product`).
impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            other => EngineError::Storage(other),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
