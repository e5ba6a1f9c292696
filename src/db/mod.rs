//! Database Module
//!
//! Embedded SurrealDB connection and schema bootstrap.

pub mod models;
pub mod repository;

use std::path::Path;

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem, RocksDb};

use crate::utils::AppError;

const NAMESPACE: &str = "tillbook";
const DATABASE: &str = "tillbook";

/// Open the RocksDB-backed embedded database and apply the schema.
pub async fn connect_rocksdb(path: &Path) -> Result<Surreal<Db>, AppError> {
    let db = Surreal::new::<RocksDb>(path)
        .await
        .map_err(|e| AppError::database(format!("Failed to open database: {e}")))?;

    init(&db).await?;
    tracing::info!(path = %path.display(), "Database connection established");
    Ok(db)
}

/// Open an in-memory database, for tests.
pub async fn connect_memory() -> Result<Surreal<Db>, AppError> {
    let db = Surreal::new::<Mem>(())
        .await
        .map_err(|e| AppError::database(format!("Failed to open in-memory database: {e}")))?;

    init(&db).await?;
    Ok(db)
}

async fn init(db: &Surreal<Db>) -> Result<(), AppError> {
    db.use_ns(NAMESPACE)
        .use_db(DATABASE)
        .await
        .map_err(|e| AppError::database(format!("Failed to select namespace: {e}")))?;

    define_schema(db).await
}

/// Schema bootstrap: tables plus the indexes the sale engine relies on.
///
/// The unique `(owner, sku)` index backs the per-owner SKU uniqueness rule;
/// the `(owner, sale_date)` index backs date-ordered sale listings.
async fn define_schema(db: &Surreal<Db>) -> Result<(), AppError> {
    db.query(
        "DEFINE TABLE IF NOT EXISTS product SCHEMALESS;
         DEFINE INDEX IF NOT EXISTS product_owner_sku ON TABLE product FIELDS owner, sku UNIQUE;
         DEFINE TABLE IF NOT EXISTS sale SCHEMALESS;
         DEFINE INDEX IF NOT EXISTS sale_owner_date ON TABLE sale FIELDS owner, sale_date;",
    )
    .await
    .map_err(|e| AppError::database(format!("Failed to define schema: {e}")))?
    .check()
    .map_err(|e| AppError::database(format!("Failed to define schema: {e}")))?;

    Ok(())
}
