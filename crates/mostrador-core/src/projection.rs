//! # Stock Projection
//!
//! Derives current stock for a product from its baseline and ledger
//! history. Pure functions of history: re-running a projection over the
//! same snapshot always yields the same value.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  current_stock = baseline + Σ Entry.quantity − Σ Exit.quantity          │
//! │                                                                         │
//! │  baseline: 100                                                          │
//! │  m1 Entry  20  ──►  120                                                 │
//! │  m2 Exit   30  ──►   90                                                 │
//! │  m3 Exit   90  ──►    0                                                 │
//! │                                                                         │
//! │  The invariant holds after EVERY commit, never only eventually:         │
//! │  no committed movement may take the projection below zero.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The database layer evaluates the same fold as a SQL SUM inside the
//! transaction that appends a movement; this module is the in-memory
//! counterpart used for request-local checks and tests.

use crate::error::{CoreError, CoreResult};
use crate::types::{Movement, MovementKind};

/// Applies a single movement to a stock value.
#[inline]
pub const fn apply(stock: i64, kind: MovementKind, quantity: i64) -> i64 {
    match kind {
        MovementKind::Entry => stock + quantity,
        MovementKind::Exit => stock - quantity,
    }
}

/// Folds a product's baseline with its movement history, ordered by
/// commit sequence. Movements must all belong to the same product;
/// callers filter before folding.
pub fn project(baseline: i64, movements: &[Movement]) -> i64 {
    movements
        .iter()
        .fold(baseline, |stock, m| apply(stock, m.kind, m.quantity))
}

/// Admits or rejects removing `requested` units from a product whose
/// projected stock is `available`.
///
/// This is THE zero-floor rule: a rejection carries the projected stock
/// at admission time, which is also the maximum satisfiable quantity.
pub fn admit_exit(product_id: &str, available: i64, requested: i64) -> CoreResult<()> {
    if available < requested {
        return Err(CoreError::InsufficientStock {
            product_id: product_id.to_string(),
            requested,
            available,
        });
    }
    Ok(())
}

/// True iff a low-stock threshold is set and the projected stock is at
/// or below it. No threshold means never flagged low.
#[inline]
pub fn is_low(stock: i64, min_stock: Option<i64>) -> bool {
    match min_stock {
        Some(threshold) => stock <= threshold,
        None => false,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn movement(seq: i64, kind: MovementKind, quantity: i64) -> Movement {
        Movement {
            id: format!("m-{seq}"),
            seq,
            product_id: "p-1".to_string(),
            kind,
            quantity,
            motive: None,
            sale_id: None,
            actor: "vendedor".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_projection_folds_entries_and_exits() {
        let history = vec![
            movement(1, MovementKind::Entry, 20),
            movement(2, MovementKind::Exit, 30),
            movement(3, MovementKind::Exit, 90),
        ];
        assert_eq!(project(100, &history), 0);
    }

    #[test]
    fn test_projection_of_empty_history_is_baseline() {
        assert_eq!(project(40, &[]), 40);
    }

    #[test]
    fn test_projection_is_idempotent() {
        // Pure function of history: same snapshot, same answer.
        let history = vec![
            movement(1, MovementKind::Entry, 5),
            movement(2, MovementKind::Exit, 2),
        ];
        let first = project(10, &history);
        let second = project(10, &history);
        assert_eq!(first, second);
        assert_eq!(first, 13);
    }

    #[test]
    fn test_admit_exit_floor_is_zero() {
        assert!(admit_exit("p-1", 60, 60).is_ok());
        assert!(admit_exit("p-1", 60, 1).is_ok());

        let err = admit_exit("p-1", 60, 70).unwrap_err();
        match err {
            CoreError::InsufficientStock {
                requested,
                available,
                ..
            } => {
                assert_eq!(requested, 70);
                assert_eq!(available, 60);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_is_low_requires_threshold() {
        assert!(is_low(5, Some(10)));
        assert!(is_low(10, Some(10)));
        assert!(!is_low(11, Some(10)));
        // No threshold: never low, even at zero
        assert!(!is_low(0, None));
    }
}
