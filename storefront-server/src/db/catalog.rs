//! Catalog and customer lookups
//!
//! Read-only boundary to data owned by external collaborators (store
//! administration, catalog management, customer registration). The order
//! engine only ever reads these tables.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use super::money_from_db;
use crate::error::AppError;

/// Store enablement state, administered externally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreStatus {
    Enabled,
    Disabled,
}

/// Look up a store's enablement state. `None` when the store does not exist.
pub async fn store_status(pool: &SqlitePool, store_id: i64) -> Result<Option<StoreStatus>, AppError> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT store_status FROM stores WHERE store_id = ?1")
            .bind(store_id)
            .fetch_optional(pool)
            .await?;

    match row {
        None => Ok(None),
        Some((s,)) if s == "enabled" => Ok(Some(StoreStatus::Enabled)),
        Some((s,)) if s == "disabled" => Ok(Some(StoreStatus::Disabled)),
        Some((s,)) => Err(AppError::database(format!("Unknown store status {s:?}"))),
    }
}

/// Resolve the authoritative unit price of a product within a store's catalog.
///
/// Scoped by `(product_id, store_id)`: a product that exists but belongs to
/// another store resolves to `None` exactly like a missing product, so
/// cross-store item injection is refused without leaking catalog contents.
pub async fn product_price(
    pool: &SqlitePool,
    product_id: i64,
    store_id: i64,
) -> Result<Option<Decimal>, AppError> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT price FROM products WHERE product_id = ?1 AND store_id = ?2")
            .bind(product_id)
            .bind(store_id)
            .fetch_optional(pool)
            .await?;

    row.map(|(raw,)| money_from_db(&raw)).transpose()
}

/// Check that a customer is affiliated with the given store.
pub async fn customer_belongs_to_store(
    pool: &SqlitePool,
    customer_id: i64,
    store_id: i64,
) -> Result<bool, AppError> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM customers WHERE customer_id = ?1 AND store_id = ?2)",
    )
    .bind(customer_id)
    .bind(store_id)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}
