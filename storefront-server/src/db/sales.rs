//! Sales ledger writer
//!
//! Derives the append-only sales batch from a delivered order's items.
//! Only ever invoked from inside the status-transition transaction, on
//! the same connection, so the existence check and the inserts are
//! covered by the write lock that transaction already holds.

use rust_decimal::Decimal;
use sqlx::SqliteConnection;

use super::money_from_db;
use crate::error::{AppError, AppResult};

const SALE_TYPE_ONLINE: &str = "online";

#[derive(sqlx::FromRow)]
struct OrderHeader {
    // raw TEXT, copied verbatim into sale_date so the ledger carries the
    // order's own timestamp, not the fulfillment time
    date_ordered: String,
    store_id: i64,
    customer_id: Option<i64>,
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    product_id: i64,
    quantity: i64,
    unit_price: String,
}

/// Write one sales record per order item, exactly once per order.
///
/// Returns the number of records written; `0` means the batch already
/// exists and nothing was touched. Any insert failure aborts the whole
/// batch with the enclosing transaction.
pub async fn record_sale(conn: &mut SqliteConnection, order_id: i64) -> AppResult<u64> {
    let already_recorded: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM sales WHERE order_id = ?1)")
            .bind(order_id)
            .fetch_one(&mut *conn)
            .await?;
    if already_recorded {
        return Ok(0);
    }

    let header: OrderHeader = sqlx::query_as(
        "SELECT date_ordered, store_id, customer_id FROM orders WHERE order_id = ?1",
    )
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::database(format!("Order {order_id} vanished mid-transaction")))?;

    let items: Vec<ItemRow> = sqlx::query_as(
        "SELECT product_id, quantity, unit_price FROM order_items WHERE order_id = ?1 ORDER BY item_id",
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    // Orders are created atomically with their items; an empty set here
    // means the store is corrupt, not that there is nothing to record.
    if items.is_empty() {
        return Err(AppError::database(format!("Order {order_id} has no items")));
    }

    for item in &items {
        let unit_price = money_from_db(&item.unit_price)?;
        let total_sale_amount = unit_price * Decimal::from(item.quantity);

        sqlx::query(
            r#"
            INSERT INTO sales (
                order_id, sale_date, sale_type, product_id,
                quantity_sold, unit_price_at_sale, total_sale_amount,
                store_id, customer_id
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(order_id)
        .bind(&header.date_ordered)
        .bind(SALE_TYPE_ONLINE)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(&item.unit_price)
        .bind(total_sale_amount.to_string())
        .bind(header.store_id)
        .bind(header.customer_id)
        .execute(&mut *conn)
        .await?;
    }

    Ok(items.len() as u64)
}
