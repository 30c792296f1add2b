//! # Transactional Engine
//!
//! The write path of Mostrador. Every stock mutation, manual or
//! sale-driven, goes through here and nowhere else.
//!
//! ## The Commit Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         create_sale(request)                            │
//! │                                                                         │
//! │  1. Validate shape (pure, no I/O)        ── ValidationError            │
//! │  2. Sum quantities per product (BTreeMap: ascending id order)          │
//! │  3. Acquire per-product locks, id order  ── serializes racing sales    │
//! │  4. BEGIN TRANSACTION                                                   │
//! │     ├─ project stock per product from the ledger                       │
//! │     ├─ reject if any line oversells     ── InsufficientStock           │
//! │     ├─ resolve tier prices (full precision, round at freeze)           │
//! │     ├─ INSERT sale + lines                                             │
//! │     ├─ INSERT one Exit movement per line (sale_id set)                 │
//! │     └─ apply cache deltas to products                                  │
//! │  5. COMMIT  ── all-or-nothing                                          │
//! │                                                                         │
//! │  SQLITE_BUSY anywhere in 4-5: retry with fresh state, bounded,         │
//! │  then ConcurrentConflict.                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Why Locks AND Transactions
//! The transaction gives atomicity; the per-product lock gives
//! admission-check isolation. Without the lock, two sales could both
//! project stock 10, both pass the check for 6 units, and both commit.
//! With it, the second sale projects stock 4 and is rejected.

pub mod error;
pub mod locks;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use mostrador_core::pricing::resolve_unit_price;
use mostrador_core::types::{
    Movement, MovementKind, NewMovement, NewProduct, NewSale, Product, SaleReceipt, UpdateProduct,
};
use mostrador_core::{projection, validation, Money, MAX_COMMIT_ATTEMPTS};

use crate::error::DbError;
use crate::pool::Database;
use crate::repository::movement::{MovementFilter, MovementRepository};
use crate::repository::product::ProductRepository;
use crate::repository::reports::{DashboardSummary, TopProduct};
use crate::repository::sale::SaleRepository;

pub use error::{EngineError, EngineResult};
pub use locks::ProductLocks;

// =============================================================================
// Engine
// =============================================================================

/// The transactional engine: catalog, ledger, and sale operations.
///
/// Cheap to clone; clones share the pool AND the lock registry, so
/// every handle serializes writes against the same locks.
#[derive(Debug, Clone)]
pub struct Engine {
    db: Database,
    locks: Arc<ProductLocks>,
}

impl Engine {
    /// Creates an engine over an open database.
    pub fn new(db: Database) -> Self {
        Engine {
            db,
            locks: Arc::new(ProductLocks::new()),
        }
    }

    /// The underlying database handle (read-side repositories).
    pub fn database(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Sales
    // =========================================================================

    /// Commits a multi-line sale atomically.
    ///
    /// Validates the request, locks every touched product in ascending
    /// id order, and inside one transaction checks projected stock,
    /// freezes resolved prices onto the lines, and appends one Exit
    /// movement per line. Any failure leaves the database untouched.
    ///
    /// `actor` is recorded on the sale and its movements; it is always
    /// an explicit parameter, never ambient state.
    pub async fn create_sale(&self, input: NewSale, actor: &str) -> EngineResult<SaleReceipt> {
        validation::validate_new_sale(&input)?;

        // Total units requested per product, across all lines. BTreeMap
        // keys come out sorted ascending, which is the lock order.
        let mut per_product: BTreeMap<String, i64> = BTreeMap::new();
        for line in &input.lines {
            *per_product.entry(line.product_id.clone()).or_insert(0) += line.quantity;
        }

        let _guards = self.locks.lock_all(per_product.keys()).await;

        let mut attempt = 1;
        loop {
            match self.commit_sale(&input, &per_product, actor).await {
                Err(EngineError::Storage(DbError::Busy)) if attempt < MAX_COMMIT_ATTEMPTS => {
                    warn!(attempt, "Sale commit hit write contention, retrying");
                    tokio::time::sleep(Duration::from_millis(25 * attempt as u64)).await;
                    attempt += 1;
                }
                Err(EngineError::Storage(DbError::Busy)) => {
                    warn!(attempts = attempt, "Sale commit gave up after retries");
                    return Err(EngineError::ConcurrentConflict { attempts: attempt });
                }
                other => return other,
            }
        }
    }

    /// One attempt at the transactional sale commit. Runs with the
    /// per-product locks already held.
    async fn commit_sale(
        &self,
        input: &NewSale,
        per_product: &BTreeMap<String, i64>,
        actor: &str,
    ) -> EngineResult<SaleReceipt> {
        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

        // Admission: every product must exist and cover its TOTAL
        // requested quantity (summed across lines), projected from the
        // ledger inside this transaction.
        let mut products: BTreeMap<String, Product> = BTreeMap::new();
        for (product_id, &requested) in per_product {
            let product = ProductRepository::get_with(&mut tx, product_id).await?;
            let available = MovementRepository::projected_stock_with(&mut tx, product_id)
                .await?
                .unwrap_or(product.baseline_stock);

            if let Err(err) = projection::admit_exit(product_id, available, requested) {
                debug!(
                    product_id = %product_id,
                    requested, available,
                    "Sale rejected: insufficient stock"
                );
                return Err(err.into());
            }
            products.insert(product_id.clone(), product);
        }

        // Resolve prices at full precision; round once per frozen value.
        let mut total = Money::zero();
        let mut resolved = Vec::with_capacity(input.lines.len());
        for line in &input.lines {
            let product = products.get(&line.product_id).ok_or_else(|| {
                EngineError::NotFound {
                    entity: "Product".to_string(),
                    id: line.product_id.clone(),
                }
            })?;

            let price = resolve_unit_price(product, line.tier);
            let line_total = price.line_total(line.quantity);
            total += line_total;
            resolved.push((line, price.rounded_cents(), line_total.cents()));
        }

        let sale =
            SaleRepository::insert_with(&mut tx, input.payment_method, total.cents(), actor)
                .await?;

        let mut lines = Vec::with_capacity(resolved.len());
        for (line, unit_price_cents, line_total_cents) in resolved {
            let stored = SaleRepository::insert_line_with(
                &mut tx,
                &sale.id,
                &line.product_id,
                line.quantity,
                line.tier,
                unit_price_cents,
                line_total_cents,
            )
            .await?;

            // The ledger twin of the line: same quantity, references
            // the sale.
            MovementRepository::append_with(
                &mut tx,
                &line.product_id,
                MovementKind::Exit,
                line.quantity,
                None,
                Some(sale.id.clone()),
                actor,
            )
            .await?;

            lines.push(stored);
        }

        for (product_id, &quantity) in per_product {
            ProductRepository::apply_stock_delta_with(&mut tx, product_id, -quantity).await?;
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(
            sale_id = %sale.id,
            lines = lines.len(),
            total_cents = sale.total_cents,
            actor = %actor,
            "Sale committed"
        );

        Ok(SaleReceipt { sale, lines })
    }

    /// Gets a committed sale with its lines.
    pub async fn get_sale(&self, id: &str) -> EngineResult<SaleReceipt> {
        Ok(self.db.sales().get_receipt(id).await?)
    }

    // =========================================================================
    // Manual Movements
    // =========================================================================

    /// Records a manual Entry or Exit on the ledger.
    ///
    /// Entries have no ceiling; an Exit that would take projected stock
    /// negative is rejected with `InsufficientStock` and the maximum
    /// satisfiable quantity.
    pub async fn record_movement(&self, input: NewMovement, actor: &str) -> EngineResult<Movement> {
        validation::validate_new_movement(&input)?;

        let _guard = self.locks.lock_one(&input.product_id).await;

        let mut attempt = 1;
        loop {
            match self.commit_movement(&input, actor).await {
                Err(EngineError::Storage(DbError::Busy)) if attempt < MAX_COMMIT_ATTEMPTS => {
                    warn!(attempt, "Movement commit hit write contention, retrying");
                    tokio::time::sleep(Duration::from_millis(25 * attempt as u64)).await;
                    attempt += 1;
                }
                Err(EngineError::Storage(DbError::Busy)) => {
                    return Err(EngineError::ConcurrentConflict { attempts: attempt });
                }
                other => return other,
            }
        }
    }

    async fn commit_movement(&self, input: &NewMovement, actor: &str) -> EngineResult<Movement> {
        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

        let product = ProductRepository::get_with(&mut tx, &input.product_id).await?;
        let available = MovementRepository::projected_stock_with(&mut tx, &input.product_id)
            .await?
            .unwrap_or(product.baseline_stock);

        if input.kind == MovementKind::Exit {
            projection::admit_exit(&input.product_id, available, input.quantity)?;
        }

        let movement = MovementRepository::append_with(
            &mut tx,
            &input.product_id,
            input.kind,
            input.quantity,
            input.motive.clone(),
            None,
            actor,
        )
        .await?;

        let delta = movement.signed_quantity();
        ProductRepository::apply_stock_delta_with(&mut tx, &input.product_id, delta).await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            movement_id = %movement.id,
            seq = movement.seq,
            product_id = %movement.product_id,
            delta,
            actor = %actor,
            "Movement recorded"
        );

        Ok(movement)
    }

    // =========================================================================
    // Projector Reads
    // =========================================================================

    /// Current stock projected from the ledger.
    pub async fn current_stock(&self, product_id: &str) -> EngineResult<i64> {
        self.db
            .movements()
            .projected_stock(product_id)
            .await?
            .ok_or_else(|| EngineError::NotFound {
                entity: "Product".to_string(),
                id: product_id.to_string(),
            })
    }

    /// Whether the product sits at or below its low-stock threshold.
    /// Products with no threshold are never low.
    pub async fn is_low(&self, product_id: &str) -> EngineResult<bool> {
        let product = self.db.products().get_by_id(product_id).await?;
        let stock = self.current_stock(product_id).await?;
        Ok(projection::is_low(stock, product.min_stock))
    }

    /// Movement history, ascending by commit sequence.
    pub async fn movement_history(&self, filter: &MovementFilter) -> EngineResult<Vec<Movement>> {
        Ok(self.db.movements().history(filter).await?)
    }

    /// Movements matching `filter`, newest first.
    pub async fn recent_movements(
        &self,
        filter: &MovementFilter,
        limit: i64,
    ) -> EngineResult<Vec<Movement>> {
        let filter = MovementFilter {
            limit: Some(limit),
            ..filter.clone()
        };
        Ok(self.db.movements().recent(&filter).await?)
    }

    // =========================================================================
    // Reports
    // =========================================================================

    /// Dashboard headline figures; sale numbers cover `since` onward.
    pub async fn dashboard_summary(
        &self,
        since: DateTime<Utc>,
    ) -> EngineResult<DashboardSummary> {
        Ok(self.db.reports().dashboard_summary(since).await?)
    }

    /// Best sellers by units sold.
    pub async fn top_products(&self, limit: i64) -> EngineResult<Vec<TopProduct>> {
        Ok(self.db.reports().top_products(limit).await?)
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Creates a catalog product.
    pub async fn create_product(&self, input: NewProduct) -> EngineResult<Product> {
        validation::validate_new_product(&input)?;
        Ok(self.db.products().create(input).await?)
    }

    /// Gets a product by id.
    pub async fn get_product(&self, id: &str) -> EngineResult<Product> {
        Ok(self.db.products().get_by_id(id).await?)
    }

    /// Lists products with optional name search and category filter.
    pub async fn list_products(
        &self,
        search: Option<&str>,
        category: Option<&str>,
    ) -> EngineResult<Vec<Product>> {
        Ok(self.db.products().list(search, category).await?)
    }

    /// Updates a product's metadata and prices.
    pub async fn update_product(&self, id: &str, input: UpdateProduct) -> EngineResult<Product> {
        validation::validate_update_product(&input)?;
        Ok(self.db.products().update(id, input).await?)
    }

    /// Deletes a product with no recorded history.
    ///
    /// The lock prevents a movement landing between the check and the
    /// delete; FK RESTRICT backs the rule up at the database level.
    pub async fn delete_product(&self, id: &str) -> EngineResult<()> {
        let _guard = self.locks.lock_one(id).await;

        match self.db.products().delete(id).await {
            Ok(()) => Ok(()),
            Err(DbError::ForeignKeyViolation { .. }) => {
                Err(EngineError::ProductInUse(id.to_string()))
            }
            Err(other) => Err(other.into()),
        }
    }
}

// =============================================================================
// Integration Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;
    use mostrador_core::types::{NewSaleLine, PaymentMethod, UnitTier};

    async fn mem_engine() -> Engine {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        Engine::new(db)
    }

    /// File-backed engine for tests that need real connection-level
    /// concurrency (in-memory pools are capped at one connection).
    async fn file_engine() -> (Engine, std::path::PathBuf) {
        let path = std::env::temp_dir().join(format!("mostrador-test-{}.db", uuid::Uuid::new_v4()));
        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        (Engine::new(db), path)
    }

    fn galleta(name: &str, unit: i64, half_dozen: i64, dozen: i64, baseline: i64) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            category: Some("Galleta".to_string()),
            unit_price_cents: unit,
            half_dozen_price_cents: Some(half_dozen),
            dozen_price_cents: Some(dozen),
            min_stock: Some(10),
            baseline_stock: baseline,
        }
    }

    fn line(product_id: &str, quantity: i64, tier: UnitTier) -> NewSaleLine {
        NewSaleLine {
            product_id: product_id.to_string(),
            quantity,
            tier,
        }
    }

    // -------------------------------------------------------------------------
    // Manual movements
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_entry_then_exit_projects_correctly() {
        let engine = mem_engine().await;
        let product = engine
            .create_product(galleta("Galleta chocolate", 1700, 10200, 20400, 40))
            .await
            .unwrap();

        assert_eq!(engine.current_stock(&product.id).await.unwrap(), 40);

        engine
            .record_movement(
                NewMovement {
                    product_id: product.id.clone(),
                    kind: MovementKind::Entry,
                    quantity: 20,
                    motive: Some("Ingreso por compra".to_string()),
                },
                "admin",
            )
            .await
            .unwrap();

        assert_eq!(engine.current_stock(&product.id).await.unwrap(), 60);

        // Exit that would go negative is rejected, stock untouched
        let err = engine
            .record_movement(
                NewMovement {
                    product_id: product.id.clone(),
                    kind: MovementKind::Exit,
                    quantity: 70,
                    motive: None,
                },
                "admin",
            )
            .await
            .unwrap_err();

        match err {
            EngineError::InsufficientStock {
                requested,
                available,
                ..
            } => {
                assert_eq!(requested, 70);
                assert_eq!(available, 60);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        assert_eq!(engine.current_stock(&product.id).await.unwrap(), 60);

        // Cache agrees with the projection
        let fetched = engine.get_product(&product.id).await.unwrap();
        assert_eq!(fetched.stock_cached, 60);
    }

    #[tokio::test]
    async fn test_movement_history_orders_by_seq() {
        let engine = mem_engine().await;
        let product = engine
            .create_product(galleta("Galleta vainilla", 1500, 9000, 18000, 100))
            .await
            .unwrap();

        for qty in [5, 7, 3] {
            engine
                .record_movement(
                    NewMovement {
                        product_id: product.id.clone(),
                        kind: MovementKind::Exit,
                        quantity: qty,
                        motive: None,
                    },
                    "vendedor",
                )
                .await
                .unwrap();
        }

        let filter = MovementFilter {
            product_id: Some(product.id.clone()),
            ..Default::default()
        };
        let history = engine.movement_history(&filter).await.unwrap();
        assert_eq!(history.len(), 3);
        assert!(history.windows(2).all(|w| w[0].seq < w[1].seq));
        assert_eq!(
            history.iter().map(|m| m.quantity).collect::<Vec<_>>(),
            vec![5, 7, 3]
        );

        let recent = engine
            .recent_movements(&MovementFilter::default(), 2)
            .await
            .unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].quantity, 3); // newest first

        // Date range excludes everything recorded so far
        let future_only = MovementFilter {
            from: Some(Utc::now() + chrono::Duration::hours(1)),
            ..Default::default()
        };
        assert!(engine.movement_history(&future_only).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_movement_validation_rejects_zero_quantity() {
        let engine = mem_engine().await;
        let err = engine
            .record_movement(
                NewMovement {
                    product_id: "p-1".to_string(),
                    kind: MovementKind::Entry,
                    quantity: 0,
                    motive: None,
                },
                "admin",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    // -------------------------------------------------------------------------
    // Sales
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_sale_commits_lines_movements_and_total() {
        let engine = mem_engine().await;
        let choc = engine
            .create_product(galleta("Galleta chocolate", 1700, 10200, 20400, 100))
            .await
            .unwrap();
        let vain = engine
            .create_product(galleta("Galleta vainilla", 1500, 9000, 18000, 50))
            .await
            .unwrap();

        let receipt = engine
            .create_sale(
                NewSale {
                    lines: vec![
                        line(&choc.id, 12, UnitTier::Dozen),
                        line(&vain.id, 2, UnitTier::Unit),
                    ],
                    payment_method: PaymentMethod::Cash,
                },
                "vendedor",
            )
            .await
            .unwrap();

        // Dozen pack 204.00 + 2 × 15.00 = 234.00
        assert_eq!(receipt.sale.total_cents, 20400 + 3000);
        assert_eq!(receipt.lines.len(), 2);
        assert_eq!(receipt.lines_total().cents(), receipt.sale.total_cents);

        // Frozen snapshot: dozen tier unit price is 204.00 / 12
        assert_eq!(receipt.lines[0].unit_price_cents, 1700);
        assert_eq!(receipt.lines[0].line_total_cents, 20400);

        // Stock moved for both products
        assert_eq!(engine.current_stock(&choc.id).await.unwrap(), 88);
        assert_eq!(engine.current_stock(&vain.id).await.unwrap(), 48);

        // One Exit movement per line, referencing the sale
        let filter = MovementFilter::default();
        let movements = engine.movement_history(&filter).await.unwrap();
        assert_eq!(movements.len(), 2);
        assert!(movements
            .iter()
            .all(|m| m.sale_id.as_deref() == Some(receipt.sale.id.as_str())
                && m.kind == MovementKind::Exit));

        // Receipt is readable back
        let fetched = engine.get_sale(&receipt.sale.id).await.unwrap();
        assert_eq!(fetched.sale.total_cents, receipt.sale.total_cents);
        assert_eq!(fetched.lines.len(), 2);
    }

    #[tokio::test]
    async fn test_receipt_reads_lines_in_request_order() {
        let engine = mem_engine().await;
        let a = engine
            .create_product(galleta("Galleta chocolate", 1700, 10200, 20400, 50))
            .await
            .unwrap();
        let b = engine
            .create_product(galleta("Galleta vainilla", 1500, 9000, 18000, 50))
            .await
            .unwrap();
        let c = engine
            .create_product(galleta("Alfajor", 2000, 11000, 21000, 50))
            .await
            .unwrap();

        let receipt = engine
            .create_sale(
                NewSale {
                    lines: vec![
                        line(&c.id, 1, UnitTier::Unit),
                        line(&a.id, 1, UnitTier::Unit),
                        line(&b.id, 1, UnitTier::Unit),
                    ],
                    payment_method: PaymentMethod::Cash,
                },
                "vendedor",
            )
            .await
            .unwrap();

        let requested: Vec<&str> = vec![&c.id, &a.id, &b.id];
        let committed: Vec<&str> =
            receipt.lines.iter().map(|l| l.product_id.as_str()).collect();
        assert_eq!(committed, requested);

        // Re-read through the repository comes back in the same order
        let fetched = engine.get_sale(&receipt.sale.id).await.unwrap();
        let reread: Vec<&str> =
            fetched.lines.iter().map(|l| l.product_id.as_str()).collect();
        assert_eq!(reread, requested);
    }

    #[tokio::test]
    async fn test_sale_aggregates_quantity_across_lines_of_same_product() {
        let engine = mem_engine().await;
        let product = engine
            .create_product(galleta("Galleta chocolate", 1700, 10200, 20400, 10))
            .await
            .unwrap();

        // 6 + 6 = 12 requested against stock 10: rejected even though
        // each line alone would pass.
        let err = engine
            .create_sale(
                NewSale {
                    lines: vec![
                        line(&product.id, 6, UnitTier::HalfDozen),
                        line(&product.id, 6, UnitTier::HalfDozen),
                    ],
                    payment_method: PaymentMethod::Cash,
                },
                "vendedor",
            )
            .await
            .unwrap_err();

        match err {
            EngineError::InsufficientStock {
                requested,
                available,
                ..
            } => {
                assert_eq!(requested, 12);
                assert_eq!(available, 10);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_sale_atomicity_on_mid_sale_failure() {
        let engine = mem_engine().await;
        let a = engine
            .create_product(galleta("Galleta chocolate", 1700, 10200, 20400, 100))
            .await
            .unwrap();
        let b = engine
            .create_product(galleta("Galleta vainilla", 1500, 9000, 18000, 3))
            .await
            .unwrap();
        let c = engine
            .create_product(galleta("Alfajor", 2000, 11000, 21000, 100))
            .await
            .unwrap();

        // Middle line oversells product b
        let err = engine
            .create_sale(
                NewSale {
                    lines: vec![
                        line(&a.id, 5, UnitTier::Unit),
                        line(&b.id, 10, UnitTier::Unit),
                        line(&c.id, 5, UnitTier::Unit),
                    ],
                    payment_method: PaymentMethod::Card,
                },
                "vendedor",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientStock { .. }));

        // Nothing was written: no movements, no sales, stocks untouched
        let movements = engine.movement_history(&MovementFilter::default()).await.unwrap();
        assert!(movements.is_empty());

        let sales = engine.database().sales().list_recent(10).await.unwrap();
        assert!(sales.is_empty());

        assert_eq!(engine.current_stock(&a.id).await.unwrap(), 100);
        assert_eq!(engine.current_stock(&b.id).await.unwrap(), 3);
        assert_eq!(engine.current_stock(&c.id).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn test_sale_rejects_empty_lines() {
        let engine = mem_engine().await;
        let err = engine
            .create_sale(
                NewSale {
                    lines: vec![],
                    payment_method: PaymentMethod::Cash,
                },
                "vendedor",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_sale_unknown_product_not_found() {
        let engine = mem_engine().await;
        let err = engine
            .create_sale(
                NewSale {
                    lines: vec![line("no-such-product", 1, UnitTier::Unit)],
                    payment_method: PaymentMethod::Cash,
                },
                "vendedor",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sales_exactly_one_wins() {
        let (engine, _path) = file_engine().await;
        let product = engine
            .create_product(galleta("Galleta chocolate", 1700, 10200, 20400, 10))
            .await
            .unwrap();

        let mut tasks = Vec::new();
        for _ in 0..2 {
            let engine = engine.clone();
            let product_id = product.id.clone();
            tasks.push(tokio::spawn(async move {
                engine
                    .create_sale(
                        NewSale {
                            lines: vec![line(&product_id, 6, UnitTier::HalfDozen)],
                            payment_method: PaymentMethod::Cash,
                        },
                        "vendedor",
                    )
                    .await
            }));
        }

        let mut ok = 0;
        let mut insufficient = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => ok += 1,
                Err(EngineError::InsufficientStock { available, .. }) => {
                    // The loser saw the winner's commit
                    assert_eq!(available, 4);
                    insufficient += 1;
                }
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(ok, 1);
        assert_eq!(insufficient, 1);
        assert_eq!(engine.current_stock(&product.id).await.unwrap(), 4);
    }

    // -------------------------------------------------------------------------
    // Catalog
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_delete_product_with_history_rejected() {
        let engine = mem_engine().await;
        let product = engine
            .create_product(galleta("Galleta chocolate", 1700, 10200, 20400, 40))
            .await
            .unwrap();

        engine
            .record_movement(
                NewMovement {
                    product_id: product.id.clone(),
                    kind: MovementKind::Entry,
                    quantity: 5,
                    motive: None,
                },
                "admin",
            )
            .await
            .unwrap();

        let err = engine.delete_product(&product.id).await.unwrap_err();
        assert!(matches!(err, EngineError::ProductInUse(_)));

        // Still there
        assert!(engine.get_product(&product.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_untouched_product_succeeds() {
        let engine = mem_engine().await;
        let product = engine
            .create_product(galleta("Galleta vainilla", 1500, 9000, 18000, 0))
            .await
            .unwrap();

        engine.delete_product(&product.id).await.unwrap();

        let err = engine.get_product(&product.id).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_keeps_baseline_and_cache() {
        let engine = mem_engine().await;
        let product = engine
            .create_product(galleta("Galleta chocolate", 1700, 10200, 20400, 40))
            .await
            .unwrap();

        let updated = engine
            .update_product(
                &product.id,
                UpdateProduct {
                    name: "Galleta chocolate premium".to_string(),
                    category: Some("Galleta".to_string()),
                    unit_price_cents: 1800,
                    half_dozen_price_cents: Some(10800),
                    dozen_price_cents: None,
                    min_stock: Some(20),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Galleta chocolate premium");
        assert_eq!(updated.unit_price_cents, 1800);
        assert_eq!(updated.dozen_price_cents, None);
        assert_eq!(updated.baseline_stock, 40);
        assert_eq!(updated.stock_cached, 40);
    }

    #[tokio::test]
    async fn test_create_product_rejects_sub_pack_size_price() {
        // 5 cents for a six-unit pack would round the frozen per-unit
        // price to zero; rejected at validation, never reaching SQL.
        let engine = mem_engine().await;
        let err = engine
            .create_product(NewProduct {
                name: "Galleta chocolate".to_string(),
                category: None,
                unit_price_cents: 1700,
                half_dozen_price_cents: Some(5),
                dozen_price_cents: None,
                min_stock: None,
                baseline_stock: 10,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_list_products_filters() {
        let engine = mem_engine().await;
        engine
            .create_product(galleta("Galleta chocolate", 1700, 10200, 20400, 10))
            .await
            .unwrap();
        engine
            .create_product(galleta("Galleta vainilla", 1500, 9000, 18000, 10))
            .await
            .unwrap();
        engine
            .create_product(NewProduct {
                name: "Pan integral".to_string(),
                category: Some("Pan".to_string()),
                unit_price_cents: 800,
                half_dozen_price_cents: None,
                dozen_price_cents: None,
                min_stock: None,
                baseline_stock: 30,
            })
            .await
            .unwrap();

        let all = engine.list_products(None, None).await.unwrap();
        assert_eq!(all.len(), 3);

        let galletas = engine.list_products(None, Some("Galleta")).await.unwrap();
        assert_eq!(galletas.len(), 2);

        let choc = engine.list_products(Some("chocolate"), None).await.unwrap();
        assert_eq!(choc.len(), 1);
        assert_eq!(choc[0].name, "Galleta chocolate");
    }

    // -------------------------------------------------------------------------
    // Reports
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_dashboard_summary_and_low_stock() {
        let engine = mem_engine().await;
        let low = engine
            .create_product(galleta("Galleta chocolate", 1700, 10200, 20400, 5))
            .await
            .unwrap();
        engine
            .create_product(galleta("Galleta vainilla", 1500, 9000, 18000, 100))
            .await
            .unwrap();

        // min_stock is 10, baseline 5: low from the start
        assert!(engine.is_low(&low.id).await.unwrap());

        let since = Utc::now() - chrono::Duration::hours(1);
        let summary = engine.dashboard_summary(since).await.unwrap();
        assert_eq!(summary.total_products, 2);
        assert_eq!(summary.low_stock_products, 1);
        assert_eq!(summary.sales_count, 0);
        assert_eq!(summary.revenue_cents, 0);

        engine
            .create_sale(
                NewSale {
                    lines: vec![line(&low.id, 2, UnitTier::Unit)],
                    payment_method: PaymentMethod::Transfer,
                },
                "vendedor",
            )
            .await
            .unwrap();

        let summary = engine.dashboard_summary(since).await.unwrap();
        assert_eq!(summary.sales_count, 1);
        assert_eq!(summary.revenue_cents, 3400);
    }

    #[tokio::test]
    async fn test_top_products_ranking() {
        let engine = mem_engine().await;
        let choc = engine
            .create_product(galleta("Galleta chocolate", 1700, 10200, 20400, 100))
            .await
            .unwrap();
        let vain = engine
            .create_product(galleta("Galleta vainilla", 1500, 9000, 18000, 100))
            .await
            .unwrap();

        engine
            .create_sale(
                NewSale {
                    lines: vec![
                        line(&choc.id, 12, UnitTier::Dozen),
                        line(&vain.id, 3, UnitTier::Unit),
                    ],
                    payment_method: PaymentMethod::Cash,
                },
                "vendedor",
            )
            .await
            .unwrap();
        engine
            .create_sale(
                NewSale {
                    lines: vec![line(&vain.id, 6, UnitTier::HalfDozen)],
                    payment_method: PaymentMethod::Cash,
                },
                "vendedor",
            )
            .await
            .unwrap();

        let top = engine.top_products(10).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].product_id, choc.id);
        assert_eq!(top[0].units_sold, 12);
        assert_eq!(top[0].revenue_cents, 20400);
        assert_eq!(top[1].units_sold, 9);
        assert_eq!(top[1].revenue_cents, 3 * 1500 + 9000);
    }
}
