//! # Reports Repository
//!
//! Read-only projections for the dashboard: product and low-stock
//! counts, today's sale figures, and the best-seller ranking.
//!
//! Nothing here is materialised. Every figure is computed on demand
//! from the same relations the engine writes, so reports can never
//! drift from the ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::DbResult;

/// Headline figures for the dashboard home page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    /// Total catalog products.
    pub total_products: i64,
    /// Products at or below their low-stock threshold. Products with no
    /// threshold configured are never counted.
    pub low_stock_products: i64,
    /// Sales committed since `since`.
    pub sales_count: i64,
    /// Revenue in cents since `since`.
    pub revenue_cents: i64,
    /// Start of the reporting window the sale figures cover.
    pub since: DateTime<Utc>,
}

/// One row of the best-seller ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopProduct {
    pub product_id: String,
    pub name: String,
    /// Total units sold across all sale lines.
    pub units_sold: i64,
    /// Total revenue in cents across all sale lines.
    pub revenue_cents: i64,
}

/// Read-only repository for dashboard projections.
#[derive(Debug, Clone)]
pub struct ReportsRepository {
    pool: SqlitePool,
}

impl ReportsRepository {
    /// Creates a new reports repository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportsRepository { pool }
    }

    /// Computes the dashboard summary with sale figures from `since`
    /// onward (the boundary passes the start of the local day).
    pub async fn dashboard_summary(&self, since: DateTime<Utc>) -> DbResult<DashboardSummary> {
        let total_products: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        // min_stock IS NOT NULL: no threshold means never low
        let low_stock_products: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE min_stock IS NOT NULL AND stock_cached <= min_stock",
        )
        .fetch_one(&self.pool)
        .await?;

        let (sales_count, revenue_cents): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(total_cents), 0)
            FROM sales
            WHERE created_at >= ?1
            "#,
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(DashboardSummary {
            total_products,
            low_stock_products,
            sales_count,
            revenue_cents,
            since,
        })
    }

    /// Best sellers by units sold, aggregated from sale lines.
    pub async fn top_products(&self, limit: i64) -> DbResult<Vec<TopProduct>> {
        let rows: Vec<(String, String, i64, i64)> = sqlx::query_as(
            r#"
            SELECT p.id, p.name,
                   SUM(l.quantity) AS units_sold,
                   SUM(l.line_total_cents) AS revenue_cents
            FROM sale_lines l
            JOIN products p ON p.id = l.product_id
            GROUP BY p.id, p.name
            ORDER BY units_sold DESC, revenue_cents DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(product_id, name, units_sold, revenue_cents)| TopProduct {
                product_id,
                name,
                units_sold,
                revenue_cents,
            })
            .collect())
    }
}
