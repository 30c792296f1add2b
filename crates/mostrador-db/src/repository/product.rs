//! # Product Repository
//!
//! Catalog data access: the products a storefront sells, their price
//! tiers, and the stock baseline the ledger folds on top of.
//!
//! ## Stock Columns
//! ```text
//! baseline_stock   immutable, set at creation
//! stock_cached     derived cache, written ONLY by apply_stock_delta_with
//!                  inside the same transaction that appends a movement
//! ```
//! Neither column is consulted for admission checks; those always
//! re-project from the ledger (see `MovementRepository::projected_stock_with`).

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use mostrador_core::types::{NewProduct, Product, UpdateProduct};

use crate::error::{DbError, DbResult};

/// Repository for product catalog operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new product repository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Creates a new catalog product.
    ///
    /// `stock_cached` starts equal to `baseline_stock`: with an empty
    /// ledger the projection is the baseline itself.
    ///
    /// Input shape is assumed validated by the caller (the engine runs
    /// `validate_new_product` first).
    pub async fn create(&self, input: NewProduct) -> DbResult<Product> {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            category: input.category,
            unit_price_cents: input.unit_price_cents,
            half_dozen_price_cents: input.half_dozen_price_cents,
            dozen_price_cents: input.dozen_price_cents,
            min_stock: input.min_stock,
            baseline_stock: input.baseline_stock,
            stock_cached: input.baseline_stock,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, category,
                unit_price_cents, half_dozen_price_cents, dozen_price_cents,
                min_stock, baseline_stock, stock_cached,
                created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.unit_price_cents)
        .bind(product.half_dozen_price_cents)
        .bind(product.dozen_price_cents)
        .bind(product.min_stock)
        .bind(product.baseline_stock)
        .bind(product.stock_cached)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        debug!(product_id = %product.id, name = %product.name, "Product created");

        Ok(product)
    }

    // =========================================================================
    // Read
    // =========================================================================

    /// Gets a product by ID, or `DbError::NotFound`.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Product> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Gets a product by ID, returning None when absent.
    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists products with optional name search and category filter,
    /// ordered by name.
    ///
    /// ## Filters
    /// - `search`: case-insensitive substring match on the name
    /// - `category`: exact category match
    pub async fn list(
        &self,
        search: Option<&str>,
        category: Option<&str>,
    ) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE (?1 IS NULL OR name LIKE '%' || ?1 || '%')
              AND (?2 IS NULL OR category = ?2)
            ORDER BY name ASC
            "#,
        )
        .bind(search)
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Counts all products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Updates a product's metadata and prices.
    ///
    /// `baseline_stock` and `stock_cached` are NOT touched here: the
    /// baseline is immutable and the cache belongs to the ledger's
    /// transaction.
    pub async fn update(&self, id: &str, input: UpdateProduct) -> DbResult<Product> {
        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                category = ?3,
                unit_price_cents = ?4,
                half_dozen_price_cents = ?5,
                dozen_price_cents = ?6,
                min_stock = ?7,
                updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(input.name.trim())
        .bind(&input.category)
        .bind(input.unit_price_cents)
        .bind(input.half_dozen_price_cents)
        .bind(input.dozen_price_cents)
        .bind(input.min_stock)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        debug!(product_id = %id, "Product updated");

        self.get_by_id(id).await
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Hard-deletes a product.
    ///
    /// Fails with `ForeignKeyViolation` while any movement or sale line
    /// still references it (FK RESTRICT): ledger history is permanent,
    /// so a product with history cannot disappear.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        debug!(product_id = %id, "Product deleted");

        Ok(())
    }

    // =========================================================================
    // Transactional helpers (caller-owned connection)
    // =========================================================================

    /// Fetches a product inside a caller-owned transaction.
    pub async fn get_with(conn: &mut SqliteConnection, id: &str) -> DbResult<Product> {
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Applies a signed delta to `stock_cached`.
    ///
    /// Must only be called in the same transaction that appends the
    /// movement the delta corresponds to; that pairing is what keeps
    /// the cache consistent with the ledger.
    pub async fn apply_stock_delta_with(
        conn: &mut SqliteConnection,
        id: &str,
        delta: i64,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE products SET stock_cached = stock_cached + ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(delta)
        .bind(Utc::now())
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }
}
