//! # Sale Repository
//!
//! Committed sale transactions and their lines.
//!
//! Sales only ever appear fully formed: the engine inserts the sale,
//! its lines, and the matching Exit movements in one transaction. There
//! is no draft state in the database, so this repository has inserts
//! (transactional) and reads, nothing else.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use mostrador_core::types::{PaymentMethod, Sale, SaleLine, SaleReceipt, UnitTier};

use crate::error::{DbError, DbResult};

/// Repository for sale reads and transactional inserts.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new sale repository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    // =========================================================================
    // Read
    // =========================================================================

    /// Gets a committed sale with its lines, or `DbError::NotFound`.
    pub async fn get_receipt(&self, id: &str) -> DbResult<SaleReceipt> {
        let sale = sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", id))?;

        // rowid is insertion order; the lines of one sale share a
        // commit timestamp, so created_at cannot order them
        let lines = sqlx::query_as::<_, SaleLine>(
            "SELECT * FROM sale_lines WHERE sale_id = ?1 ORDER BY rowid ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(SaleReceipt { sale, lines })
    }

    /// Lists sales newest first.
    pub async fn list_recent(&self, limit: i64) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(
            "SELECT * FROM sales ORDER BY created_at DESC, id DESC LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Counts sales committed at or after `since`.
    pub async fn count_since(&self, since: DateTime<Utc>) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE created_at >= ?1")
                .bind(since)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Revenue in cents for sales committed at or after `since`.
    pub async fn revenue_since(&self, since: DateTime<Utc>) -> DbResult<i64> {
        let revenue: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(total_cents), 0) FROM sales WHERE created_at >= ?1",
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(revenue)
    }

    // =========================================================================
    // Transactional helpers (caller-owned connection)
    // =========================================================================

    /// Inserts the sale header inside a caller-owned transaction.
    pub async fn insert_with(
        conn: &mut SqliteConnection,
        payment_method: PaymentMethod,
        total_cents: i64,
        actor: &str,
    ) -> DbResult<Sale> {
        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            payment_method,
            total_cents,
            actor: actor.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO sales (id, payment_method, total_cents, actor, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&sale.id)
        .bind(sale.payment_method)
        .bind(sale.total_cents)
        .bind(&sale.actor)
        .bind(sale.created_at)
        .execute(conn)
        .await?;

        Ok(sale)
    }

    /// Inserts one sale line inside a caller-owned transaction.
    ///
    /// `unit_price_cents` and `line_total_cents` are the resolved,
    /// rounded snapshot values; they are frozen here and never
    /// recomputed from the catalog.
    #[allow(clippy::too_many_arguments)]
    pub async fn insert_line_with(
        conn: &mut SqliteConnection,
        sale_id: &str,
        product_id: &str,
        quantity: i64,
        tier: UnitTier,
        unit_price_cents: i64,
        line_total_cents: i64,
    ) -> DbResult<SaleLine> {
        let line = SaleLine {
            id: Uuid::new_v4().to_string(),
            sale_id: sale_id.to_string(),
            product_id: product_id.to_string(),
            quantity,
            tier,
            unit_price_cents,
            line_total_cents,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO sale_lines (
                id, sale_id, product_id, quantity, tier,
                unit_price_cents, line_total_cents, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&line.id)
        .bind(&line.sale_id)
        .bind(&line.product_id)
        .bind(line.quantity)
        .bind(line.tier)
        .bind(line.unit_price_cents)
        .bind(line.line_total_cents)
        .bind(line.created_at)
        .execute(conn)
        .await?;

        Ok(line)
    }
}
