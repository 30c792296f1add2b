//! Seeds a development database with the demo catalog.
//!
//! ## Usage
//! ```bash
//! MOSTRADOR_DB=./mostrador.db cargo run --bin seed
//! ```
//!
//! Idempotent-ish: refuses to seed a database that already has
//! products, so re-running against a live file is harmless.

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mostrador_core::types::{NewProduct, NewSale, NewSaleLine, PaymentMethod, UnitTier};
use mostrador_db::{Database, DbConfig, Engine, EngineError};

fn demo_catalog() -> Vec<NewProduct> {
    vec![
        NewProduct {
            name: "Galleta chocolate".to_string(),
            category: Some("Galleta".to_string()),
            unit_price_cents: 1700,              // Bs. 17.00
            half_dozen_price_cents: Some(10200), // Bs. 102.00
            dozen_price_cents: Some(20400),      // Bs. 204.00
            min_stock: Some(24),
            baseline_stock: 120,
        },
        NewProduct {
            name: "Galleta vainilla".to_string(),
            category: Some("Galleta".to_string()),
            unit_price_cents: 1500,             // Bs. 15.00
            half_dozen_price_cents: Some(9000), // Bs. 90.00
            dozen_price_cents: Some(18000),     // Bs. 180.00
            min_stock: Some(24),
            baseline_stock: 96,
        },
        NewProduct {
            name: "Alfajor de maicena".to_string(),
            category: Some("Alfajor".to_string()),
            unit_price_cents: 2000,
            half_dozen_price_cents: Some(11400),
            dozen_price_cents: None,
            min_stock: Some(12),
            baseline_stock: 48,
        },
    ]
}

#[tokio::main]
async fn main() -> Result<(), EngineError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let path = std::env::var("MOSTRADOR_DB").unwrap_or_else(|_| "mostrador.db".to_string());
    info!(path = %path, "Seeding development database");

    let db = Database::new(DbConfig::new(&path)).await?;
    let engine = Engine::new(db);

    let existing = engine.list_products(None, None).await?;
    if !existing.is_empty() {
        warn!(
            products = existing.len(),
            "Database already has products, refusing to seed"
        );
        return Ok(());
    }

    let mut ids = Vec::new();
    for input in demo_catalog() {
        let product = engine.create_product(input).await?;
        info!(product_id = %product.id, name = %product.name, "Seeded product");
        ids.push(product.id);
    }

    // One demo sale so the dashboard and ledger have something to show
    let receipt = engine
        .create_sale(
            NewSale {
                lines: vec![
                    NewSaleLine {
                        product_id: ids[0].clone(),
                        quantity: 12,
                        tier: UnitTier::Dozen,
                    },
                    NewSaleLine {
                        product_id: ids[1].clone(),
                        quantity: 2,
                        tier: UnitTier::Unit,
                    },
                ],
                payment_method: PaymentMethod::Cash,
            },
            "seed",
        )
        .await?;

    info!(
        sale_id = %receipt.sale.id,
        total = %receipt.sale.total(),
        "Seeded demo sale"
    );
    info!("Done");

    Ok(())
}
