//! Order repository and status transition machine
//!
//! All order mutations live here. Two operations write:
//! - [`create_order`]: inserts an order and its items in one transaction,
//!   with every unit price resolved from the store's own catalog.
//! - [`transition_status`]: applies a status change under the acting
//!   store's scope and, on entering `Delivered`, derives the sales batch
//!   in the same transaction (see [`crate::db::sales`]).
//!
//! The status write doubles as the authorization guard: one conditional
//! UPDATE scoped by `store_id`, never a lookup followed by a separate
//! permission check.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use super::{catalog, money_from_db, sales};
use crate::error::{AppError, AppResult};

/// Order lifecycle status. Stored and serialized as the capitalized
/// strings the ledger schema has always used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Pending" => Some(Self::Pending),
            "Processing" => Some(Self::Processing),
            "Shipped" => Some(Self::Shipped),
            "Delivered" => Some(Self::Delivered),
            "Cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// `Delivered` and `Cancelled` accept no further transitions
    /// (the idempotent `Delivered` re-signal is not a state change).
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// States a transition *into* `self` may start from.
    ///
    /// Forward-only: an order can be delivered or cancelled from any
    /// non-terminal state, never rewound to `Pending`, and never moved
    /// out of a terminal state. `Delivered -> Delivered` is accepted as
    /// the re-delivery signal so that retried fulfillment callbacks
    /// resolve idempotently instead of erroring.
    pub fn allowed_from(self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Pending => &[],
            Processing => &[Pending],
            Shipped => &[Pending, Processing],
            Delivered => &[Pending, Processing, Shipped, Delivered],
            Cancelled => &[Pending, Processing, Shipped],
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a status transition request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionOutcome {
    /// Non-delivery status applied
    StatusUpdated,
    /// Order delivered and its sales batch written
    DeliveredAndRecorded,
    /// Repeat delivery signal; the ledger already has this order's batch
    DeliveredAlreadyRecorded,
}

/// One requested order line: quantity of a product, price comes from the catalog
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrderItem {
    pub product_id: i64,
    pub quantity: i64,
}

/// Input for [`create_order`]
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub store_id: i64,
    /// `None` is a guest order
    pub customer_id: Option<i64>,
    pub status: OrderStatus,
    pub items: Vec<NewOrderItem>,
}

/// Result of [`create_order`]
#[derive(Debug, Clone, Serialize)]
pub struct CreatedOrder {
    pub order_id: i64,
    pub total_amount: Decimal,
}

/// Order listing row for a store
#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
    pub order_id: i64,
    pub date_ordered: chrono::DateTime<Utc>,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub customer_name: String,
}

/// Create an order together with all of its line items in one transaction.
///
/// Unit prices are resolved from the catalog scoped by the order's store;
/// the caller cannot supply a price or a total. Either the order row and
/// every item row are committed, or nothing is.
pub async fn create_order(pool: &SqlitePool, order: NewOrder) -> AppResult<CreatedOrder> {
    if order.items.is_empty() {
        return Err(AppError::validation("Order must contain at least one item"));
    }
    for item in &order.items {
        if item.quantity <= 0 {
            return Err(AppError::validation(format!(
                "Quantity for product {} must be positive",
                item.product_id
            )));
        }
    }

    match catalog::store_status(pool, order.store_id).await? {
        Some(catalog::StoreStatus::Enabled) => {}
        Some(catalog::StoreStatus::Disabled) => {
            return Err(AppError::validation("Store is not accepting orders"));
        }
        None => return Err(AppError::validation("Store not found")),
    }

    if let Some(customer_id) = order.customer_id
        && !catalog::customer_belongs_to_store(pool, customer_id, order.store_id).await?
    {
        return Err(AppError::validation(format!(
            "Customer {customer_id} does not belong to store {}",
            order.store_id
        )));
    }

    // Snapshot catalog prices before opening the write transaction; the
    // catalog is read-only from this engine's point of view.
    let mut priced = Vec::with_capacity(order.items.len());
    let mut total = Decimal::ZERO;
    for item in &order.items {
        let unit_price = catalog::product_price(pool, item.product_id, order.store_id)
            .await?
            .ok_or_else(|| {
                AppError::validation(format!(
                    "Product {} not found in store {}",
                    item.product_id, order.store_id
                ))
            })?;
        total += unit_price * Decimal::from(item.quantity);
        priced.push((item.product_id, item.quantity, unit_price));
    }

    let date_ordered = Utc::now();

    // Write-first transaction: the order INSERT is the first statement.
    let mut tx = pool.begin().await?;

    let order_id = sqlx::query(
        r#"
        INSERT INTO orders (customer_id, store_id, date_ordered, total_amount, status)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(order.customer_id)
    .bind(order.store_id)
    .bind(date_ordered)
    .bind(total.to_string())
    .bind(order.status.as_str())
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    for (product_id, quantity, unit_price) in &priced {
        sqlx::query(
            r#"
            INSERT INTO order_items (order_id, product_id, quantity, unit_price)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(order_id)
        .bind(product_id)
        .bind(quantity)
        .bind(unit_price.to_string())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::info!(
        order_id,
        store_id = order.store_id,
        items = priced.len(),
        total = %total,
        "Order created"
    );

    Ok(CreatedOrder {
        order_id,
        total_amount: total,
    })
}

/// List a store's orders, newest first. Orders without a customer are
/// shown as guest orders.
pub async fn list_orders(pool: &SqlitePool, store_id: i64) -> AppResult<Vec<OrderSummary>> {
    let rows: Vec<(i64, chrono::DateTime<Utc>, String, String, String)> = sqlx::query_as(
        r#"
        SELECT o.order_id, o.date_ordered, o.total_amount, o.status,
               COALESCE(c.customer_name, 'Guest') AS customer_name
        FROM orders o
        LEFT JOIN customers c ON o.customer_id = c.customer_id
        WHERE o.store_id = ?1
        ORDER BY o.order_id DESC
        "#,
    )
    .bind(store_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(order_id, date_ordered, total_amount, status, customer_name)| {
            Ok(OrderSummary {
                order_id,
                date_ordered,
                total_amount: money_from_db(&total_amount)?,
                status: OrderStatus::parse(&status)
                    .ok_or_else(|| AppError::database(format!("Unknown order status {status:?}")))?,
                customer_name,
            })
        })
        .collect()
}

/// Apply a status transition under the acting store's scope.
///
/// The scoped conditional UPDATE is the first statement of the
/// transaction: it is simultaneously the authorization check (zero rows
/// affected means wrong store or no such order, indistinguishably) and
/// the point where SQLite's write lock is taken, which serializes
/// concurrent transitions on the same order. When the new status is
/// `Delivered`, the sales batch is derived inside the same transaction;
/// exactly one of any number of concurrent delivery signals writes it.
pub async fn transition_status(
    pool: &SqlitePool,
    order_id: i64,
    new_status: OrderStatus,
    acting_store_id: i64,
) -> AppResult<TransitionOutcome> {
    let allowed = new_status.allowed_from();

    let mut tx = pool.begin().await?;

    let affected = if allowed.is_empty() {
        0
    } else {
        // status IN (...) enforces the transition table in the same
        // statement as the store-scope check
        let placeholders = (0..allowed.len())
            .map(|i| format!("?{}", i + 4))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE orders SET status = ?1 \
             WHERE order_id = ?2 AND store_id = ?3 AND status IN ({placeholders})"
        );

        let mut query = sqlx::query(&sql)
            .bind(new_status.as_str())
            .bind(order_id)
            .bind(acting_store_id);
        for from in allowed {
            query = query.bind(from.as_str());
        }

        query.execute(&mut *tx).await?.rows_affected()
    };

    if affected == 0 {
        // Disambiguate inside the same transaction, still store-scoped:
        // an order belonging to another store stays invisible.
        let current: Option<(String,)> =
            sqlx::query_as("SELECT status FROM orders WHERE order_id = ?1 AND store_id = ?2")
                .bind(order_id)
                .bind(acting_store_id)
                .fetch_optional(&mut *tx)
                .await?;

        return match current {
            None => Err(AppError::Unauthorized),
            Some((from,)) => Err(AppError::InvalidTransition {
                from,
                to: new_status.as_str().to_string(),
            }),
        };
    }

    if new_status != OrderStatus::Delivered {
        tx.commit().await?;
        tracing::info!(order_id, status = %new_status, "Order status updated");
        return Ok(TransitionOutcome::StatusUpdated);
    }

    let written = sales::record_sale(&mut tx, order_id).await?;
    tx.commit().await?;

    if written == 0 {
        tracing::info!(order_id, "Repeat delivery signal, sales batch already recorded");
        Ok(TransitionOutcome::DeliveredAlreadyRecorded)
    } else {
        tracing::info!(order_id, records = written, "Order delivered, sales batch recorded");
        Ok(TransitionOutcome::DeliveredAndRecorded)
    }
}
