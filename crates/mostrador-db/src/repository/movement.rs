//! # Movement Repository
//!
//! The stock ledger. Append-only: this repository exposes inserts and
//! reads, never an update or a delete.
//!
//! ## Ordering
//! Movements are totally ordered by `seq`, an AUTOINCREMENT integer
//! SQLite assigns at insert. History queries order by `seq`, never by
//! `created_at`: wall clocks skew, commit sequences don't.
//!
//! ## The Projection Query
//! ```sql
//! SELECT p.baseline_stock
//!      + COALESCE(SUM(CASE WHEN m.kind = 'entry'
//!                          THEN m.quantity ELSE -m.quantity END), 0)
//! FROM products p LEFT JOIN movements m ON m.product_id = p.id
//! WHERE p.id = ?
//! ```
//! This is the SQL twin of `mostrador_core::projection::project` and is
//! the ONLY stock figure admission checks trust. It runs inside the
//! writing transaction so the check and the append see the same ledger.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use mostrador_core::types::{Movement, MovementKind};

use crate::error::DbResult;

/// Filter for movement history queries. All fields optional; an empty
/// filter returns the whole ledger.
#[derive(Debug, Clone, Default)]
pub struct MovementFilter {
    /// Restrict to one product's movements.
    pub product_id: Option<String>,
    /// Restrict to entries or exits.
    pub kind: Option<MovementKind>,
    /// Only movements recorded at or after this instant.
    pub from: Option<DateTime<Utc>>,
    /// Only movements recorded at or before this instant.
    pub to: Option<DateTime<Utc>>,
    /// Cap the number of rows returned.
    pub limit: Option<i64>,
}

/// Repository for the append-only movement ledger.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

impl MovementRepository {
    /// Creates a new movement repository.
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    // =========================================================================
    // Read
    // =========================================================================

    /// Movement history matching `filter`, ascending by commit sequence
    /// (oldest first). This is the replayable ledger order.
    pub async fn history(&self, filter: &MovementFilter) -> DbResult<Vec<Movement>> {
        self.query_filtered(filter, "ASC").await
    }

    /// Movements matching `filter`, newest first, for listings at the
    /// boundary.
    pub async fn recent(&self, filter: &MovementFilter) -> DbResult<Vec<Movement>> {
        self.query_filtered(filter, "DESC").await
    }

    async fn query_filtered(
        &self,
        filter: &MovementFilter,
        order: &str,
    ) -> DbResult<Vec<Movement>> {
        let kind = filter.kind.map(|k| match k {
            MovementKind::Entry => "entry",
            MovementKind::Exit => "exit",
        });

        // `order` is a fixed ASC/DESC literal from this module, never
        // caller input.
        let sql = format!(
            r#"
            SELECT seq, id, product_id, kind, quantity, motive, sale_id, actor, created_at
            FROM movements
            WHERE (?1 IS NULL OR product_id = ?1)
              AND (?2 IS NULL OR kind = ?2)
              AND (?3 IS NULL OR created_at >= ?3)
              AND (?4 IS NULL OR created_at <= ?4)
            ORDER BY seq {order}
            LIMIT ?5
            "#
        );

        let movements = sqlx::query_as::<_, Movement>(&sql)
            .bind(filter.product_id.as_deref())
            .bind(kind)
            .bind(filter.from)
            .bind(filter.to)
            .bind(filter.limit.unwrap_or(-1)) // SQLite: negative LIMIT = no limit
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Projects a product's current stock from the ledger (standalone
    /// read, own connection). Returns None for an unknown product.
    pub async fn projected_stock(&self, product_id: &str) -> DbResult<Option<i64>> {
        let mut conn = self.pool.acquire().await?;
        Self::projected_stock_with(&mut conn, product_id).await
    }

    // =========================================================================
    // Transactional helpers (caller-owned connection)
    // =========================================================================

    /// Projects current stock inside a caller-owned transaction.
    ///
    /// Returns None for an unknown product. Called by the engine right
    /// before it appends an Exit, so the admission check and the append
    /// are covered by the same transaction.
    pub async fn projected_stock_with(
        conn: &mut SqliteConnection,
        product_id: &str,
    ) -> DbResult<Option<i64>> {
        let stock: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT p.baseline_stock
                 + COALESCE(SUM(CASE WHEN m.kind = 'entry'
                                     THEN m.quantity ELSE -m.quantity END), 0)
            FROM products p
            LEFT JOIN movements m ON m.product_id = p.id
            WHERE p.id = ?1
            GROUP BY p.id
            "#,
        )
        .bind(product_id)
        .fetch_optional(conn)
        .await?;

        Ok(stock)
    }

    /// Appends a movement to the ledger inside a caller-owned
    /// transaction and returns it with its assigned commit sequence.
    ///
    /// The cache delta on the product row is the caller's job (same
    /// transaction, `ProductRepository::apply_stock_delta_with`).
    pub async fn append_with(
        conn: &mut SqliteConnection,
        product_id: &str,
        kind: MovementKind,
        quantity: i64,
        motive: Option<String>,
        sale_id: Option<String>,
        actor: &str,
    ) -> DbResult<Movement> {
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO movements (id, product_id, kind, quantity, motive, sale_id, actor, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&id)
        .bind(product_id)
        .bind(kind)
        .bind(quantity)
        .bind(&motive)
        .bind(&sale_id)
        .bind(actor)
        .bind(created_at)
        .execute(&mut *conn)
        .await?;

        // AUTOINCREMENT pk: the rowid IS the commit sequence
        let seq = result.last_insert_rowid();

        debug!(movement_id = %id, seq, product_id = %product_id, "Ledger append");

        Ok(Movement {
            id,
            seq,
            product_id: product_id.to_string(),
            kind,
            quantity,
            motive,
            sale_id,
            actor: actor.to_string(),
            created_at,
        })
    }
}
