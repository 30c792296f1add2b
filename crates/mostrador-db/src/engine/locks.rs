//! # Per-Product Lock Registry
//!
//! One async mutex per product id, created lazily. The engine holds a
//! product's lock across the whole check-then-append of a write, so two
//! sales racing for the same product serialize instead of both reading
//! the same stock figure.
//!
//! ## Deadlock Rule
//! A multi-product sale acquires its locks in ascending product-id
//! order. Two sales touching products {A, B} both lock A first, so the
//! circular wait a deadlock needs can never form. `lock_all` expects
//! its input already sorted and deduplicated (the engine hands it
//! `BTreeMap` keys, which are both).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Lazily-populated registry of per-product async locks.
///
/// Shared via `Arc` so every clone of the engine serializes against the
/// same registry. A split registry would silently stop serializing.
#[derive(Debug, Default)]
pub struct ProductLocks {
    inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ProductLocks {
    /// Creates an empty registry.
    pub fn new() -> Self {
        ProductLocks::default()
    }

    /// Returns the lock handle for a product, creating it on first use.
    fn handle(&self, product_id: &str) -> Arc<AsyncMutex<()>> {
        let mut map = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        map.entry(product_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Acquires the lock for a single product.
    pub async fn lock_one(&self, product_id: &str) -> OwnedMutexGuard<()> {
        self.handle(product_id).lock_owned().await
    }

    /// Acquires locks for several products, in the order given.
    ///
    /// Callers MUST pass ids sorted ascending and deduplicated; see the
    /// module docs for why the order matters.
    pub async fn lock_all<'a, I>(&self, product_ids: I) -> Vec<OwnedMutexGuard<()>>
    where
        I: IntoIterator<Item = &'a String>,
    {
        // Resolve handles first so the registry mutex is never held
        // across an await point.
        let handles: Vec<Arc<AsyncMutex<()>>> = product_ids
            .into_iter()
            .map(|id| self.handle(id))
            .collect();

        let mut guards = Vec::with_capacity(handles.len());
        for handle in handles {
            guards.push(handle.lock_owned().await);
        }
        guards
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_product_serializes() {
        let locks = Arc::new(ProductLocks::new());

        let guard = locks.lock_one("p-1").await;

        let locks2 = locks.clone();
        let contender = tokio::spawn(async move {
            let _g = locks2.lock_one("p-1").await;
        });

        // The contender cannot finish while we hold the lock
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_ordered_multi_lock_does_not_deadlock() {
        let locks = Arc::new(ProductLocks::new());
        let ids = vec!["a".to_string(), "b".to_string()];

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let locks = locks.clone();
            let ids = ids.clone();
            tasks.push(tokio::spawn(async move {
                for _ in 0..50 {
                    let _guards = locks.lock_all(ids.iter()).await;
                }
            }));
        }

        for task in tasks {
            tokio::time::timeout(Duration::from_secs(5), task)
                .await
                .expect("deadlocked")
                .unwrap();
        }
    }
}
