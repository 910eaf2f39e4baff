//! Engine-level tests for order creation, status transitions and the
//! sales ledger derivation, run against a real on-disk SQLite database.

use rust_decimal::Decimal;
use sqlx::SqlitePool;
use tempfile::TempDir;

use storefront_server::db::orders::{
    self, NewOrder, NewOrderItem, OrderStatus, TransitionOutcome,
};
use storefront_server::{AppError, db};

const STORE_MAIN: i64 = 1;
const STORE_RIVAL: i64 = 2;
const STORE_CLOSED: i64 = 3;
const CUSTOMER_ADA: i64 = 7;
const CUSTOMER_BERT: i64 = 8;
const PRODUCT_MUG: i64 = 10; // 5.00, store 1
const PRODUCT_TEA: i64 = 11; // 3.00, store 1
const PRODUCT_RIVAL: i64 = 20; // 9.99, store 2

/// Fresh migrated database with a small fixture catalog.
/// The TempDir must stay alive for the duration of the test.
async fn test_pool() -> (TempDir, SqlitePool) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("test.db");
    let pool = db::connect(path.to_str().expect("utf-8 temp path"))
        .await
        .expect("open test database");

    sqlx::raw_sql(
        r#"
        INSERT INTO stores (store_id, store_name, store_status) VALUES
            (1, 'Main Street', 'enabled'),
            (2, 'Rival Corner', 'enabled'),
            (3, 'Shuttered', 'disabled');
        INSERT INTO customers (customer_id, customer_name, store_id) VALUES
            (7, 'Ada', 1),
            (8, 'Bert', 2);
        INSERT INTO products (product_id, product_name, price, store_id) VALUES
            (10, 'Mug', '5.00', 1),
            (11, 'Tea', '3.00', 1),
            (20, 'Rival Mug', '9.99', 2);
        "#,
    )
    .execute(&pool)
    .await
    .expect("seed fixtures");

    (dir, pool)
}

fn two_line_order(store_id: i64, customer_id: Option<i64>) -> NewOrder {
    NewOrder {
        store_id,
        customer_id,
        status: OrderStatus::Pending,
        items: vec![
            NewOrderItem {
                product_id: PRODUCT_MUG,
                quantity: 2,
            },
            NewOrderItem {
                product_id: PRODUCT_TEA,
                quantity: 1,
            },
        ],
    }
}

async fn order_status(pool: &SqlitePool, order_id: i64) -> String {
    sqlx::query_scalar("SELECT status FROM orders WHERE order_id = ?1")
        .bind(order_id)
        .fetch_one(pool)
        .await
        .expect("order exists")
}

async fn sales_count(pool: &SqlitePool, order_id: i64) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE order_id = ?1")
        .bind(order_id)
        .fetch_one(pool)
        .await
        .expect("count sales")
}

async fn table_count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .expect("count rows")
}

#[tokio::test]
async fn create_order_snapshots_prices_and_computes_total() {
    let (_dir, pool) = test_pool().await;

    let created = orders::create_order(&pool, two_line_order(STORE_MAIN, Some(CUSTOMER_ADA)))
        .await
        .expect("create order");

    // 2 x 5.00 + 1 x 3.00
    assert_eq!(created.total_amount, Decimal::new(1300, 2));

    let items: Vec<(i64, i64, String)> = sqlx::query_as(
        "SELECT product_id, quantity, unit_price FROM order_items \
         WHERE order_id = ?1 ORDER BY item_id",
    )
    .bind(created.order_id)
    .fetch_all(&pool)
    .await
    .expect("load items");

    assert_eq!(
        items,
        vec![
            (PRODUCT_MUG, 2, "5.00".to_string()),
            (PRODUCT_TEA, 1, "3.00".to_string()),
        ]
    );
    assert_eq!(order_status(&pool, created.order_id).await, "Pending");
}

#[tokio::test]
async fn create_order_rejects_bad_input_without_writing() {
    let (_dir, pool) = test_pool().await;

    let cases: Vec<NewOrder> = vec![
        // no items
        NewOrder {
            items: vec![],
            ..two_line_order(STORE_MAIN, Some(CUSTOMER_ADA))
        },
        // zero quantity
        NewOrder {
            items: vec![NewOrderItem {
                product_id: PRODUCT_MUG,
                quantity: 0,
            }],
            ..two_line_order(STORE_MAIN, Some(CUSTOMER_ADA))
        },
        // another store's product
        NewOrder {
            items: vec![NewOrderItem {
                product_id: PRODUCT_RIVAL,
                quantity: 1,
            }],
            ..two_line_order(STORE_MAIN, Some(CUSTOMER_ADA))
        },
        // unknown product
        NewOrder {
            items: vec![NewOrderItem {
                product_id: 999,
                quantity: 1,
            }],
            ..two_line_order(STORE_MAIN, Some(CUSTOMER_ADA))
        },
        // disabled store
        two_line_order(STORE_CLOSED, None),
        // unknown store
        two_line_order(99, None),
        // customer affiliated with a different store
        two_line_order(STORE_MAIN, Some(CUSTOMER_BERT)),
    ];

    for order in cases {
        let err = orders::create_order(&pool, order.clone())
            .await
            .expect_err("must be rejected");
        assert!(
            matches!(err, AppError::Validation(_)),
            "expected validation error for {order:?}, got {err:?}"
        );
    }

    assert_eq!(table_count(&pool, "orders").await, 0);
    assert_eq!(table_count(&pool, "order_items").await, 0);
}

#[tokio::test]
async fn guest_orders_list_without_a_customer() {
    let (_dir, pool) = test_pool().await;

    let named = orders::create_order(&pool, two_line_order(STORE_MAIN, Some(CUSTOMER_ADA)))
        .await
        .expect("create named order");
    let guest = orders::create_order(&pool, two_line_order(STORE_MAIN, None))
        .await
        .expect("create guest order");

    let listed = orders::list_orders(&pool, STORE_MAIN)
        .await
        .expect("list orders");

    // newest first
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].order_id, guest.order_id);
    assert_eq!(listed[0].customer_name, "Guest");
    assert_eq!(listed[1].order_id, named.order_id);
    assert_eq!(listed[1].customer_name, "Ada");
    assert_eq!(listed[1].total_amount, Decimal::new(1300, 2));

    // other stores do not see them
    let rival = orders::list_orders(&pool, STORE_RIVAL)
        .await
        .expect("list rival orders");
    assert!(rival.is_empty());
}

#[tokio::test]
async fn delivery_writes_one_sales_record_per_item() {
    let (_dir, pool) = test_pool().await;

    let created = orders::create_order(&pool, two_line_order(STORE_MAIN, Some(CUSTOMER_ADA)))
        .await
        .expect("create order");

    let outcome = orders::transition_status(
        &pool,
        created.order_id,
        OrderStatus::Delivered,
        STORE_MAIN,
    )
    .await
    .expect("deliver order");
    assert_eq!(outcome, TransitionOutcome::DeliveredAndRecorded);
    assert_eq!(order_status(&pool, created.order_id).await, "Delivered");

    let rows: Vec<(String, String, i64, i64, String, String, i64, Option<i64>)> = sqlx::query_as(
        "SELECT sale_date, sale_type, product_id, quantity_sold, unit_price_at_sale, \
                total_sale_amount, store_id, customer_id \
         FROM sales WHERE order_id = ?1 ORDER BY sale_id",
    )
    .bind(created.order_id)
    .fetch_all(&pool)
    .await
    .expect("load sales");

    let date_ordered: String =
        sqlx::query_scalar("SELECT date_ordered FROM orders WHERE order_id = ?1")
            .bind(created.order_id)
            .fetch_one(&pool)
            .await
            .expect("order date");

    assert_eq!(rows.len(), 2);
    for row in &rows {
        // the ledger carries the order's own timestamp
        assert_eq!(row.0, date_ordered);
        assert_eq!(row.1, "online");
        assert_eq!(row.6, STORE_MAIN);
        assert_eq!(row.7, Some(CUSTOMER_ADA));
    }
    assert_eq!(
        (rows[0].2, rows[0].3, rows[0].4.as_str(), rows[0].5.as_str()),
        (PRODUCT_MUG, 2, "5.00", "10.00")
    );
    assert_eq!(
        (rows[1].2, rows[1].3, rows[1].4.as_str(), rows[1].5.as_str()),
        (PRODUCT_TEA, 1, "3.00", "3.00")
    );
}

#[tokio::test]
async fn repeat_delivery_signal_is_idempotent() {
    let (_dir, pool) = test_pool().await;

    let created = orders::create_order(&pool, two_line_order(STORE_MAIN, Some(CUSTOMER_ADA)))
        .await
        .expect("create order");

    let first = orders::transition_status(
        &pool,
        created.order_id,
        OrderStatus::Delivered,
        STORE_MAIN,
    )
    .await
    .expect("first delivery");
    assert_eq!(first, TransitionOutcome::DeliveredAndRecorded);

    let second = orders::transition_status(
        &pool,
        created.order_id,
        OrderStatus::Delivered,
        STORE_MAIN,
    )
    .await
    .expect("repeat delivery");
    assert_eq!(second, TransitionOutcome::DeliveredAlreadyRecorded);

    assert_eq!(sales_count(&pool, created.order_id).await, 2);
}

#[tokio::test]
async fn foreign_store_cannot_see_or_move_the_order() {
    let (_dir, pool) = test_pool().await;

    let created = orders::create_order(&pool, two_line_order(STORE_MAIN, Some(CUSTOMER_ADA)))
        .await
        .expect("create order");

    let err = orders::transition_status(
        &pool,
        created.order_id,
        OrderStatus::Delivered,
        STORE_RIVAL,
    )
    .await
    .expect_err("must be denied");
    // same error as a missing order: no cross-store existence leak
    assert!(matches!(err, AppError::Unauthorized), "got {err:?}");

    let missing = orders::transition_status(&pool, 404, OrderStatus::Delivered, STORE_MAIN)
        .await
        .expect_err("must be denied");
    assert!(matches!(missing, AppError::Unauthorized), "got {missing:?}");

    assert_eq!(order_status(&pool, created.order_id).await, "Pending");
    assert_eq!(sales_count(&pool, created.order_id).await, 0);
}

#[tokio::test]
async fn illegal_transitions_are_rejected_with_both_states() {
    let (_dir, pool) = test_pool().await;

    let created = orders::create_order(&pool, two_line_order(STORE_MAIN, Some(CUSTOMER_ADA)))
        .await
        .expect("create order");

    orders::transition_status(&pool, created.order_id, OrderStatus::Shipped, STORE_MAIN)
        .await
        .expect("ship order");

    // backward move
    let err = orders::transition_status(
        &pool,
        created.order_id,
        OrderStatus::Processing,
        STORE_MAIN,
    )
    .await
    .expect_err("backward move must fail");
    match err {
        AppError::InvalidTransition { from, to } => {
            assert_eq!(from, "Shipped");
            assert_eq!(to, "Processing");
        }
        other => panic!("expected InvalidTransition, got {other:?}"),
    }
    assert_eq!(order_status(&pool, created.order_id).await, "Shipped");
}

#[tokio::test]
async fn cancelled_orders_are_frozen_and_never_reach_the_ledger() {
    let (_dir, pool) = test_pool().await;

    let created = orders::create_order(&pool, two_line_order(STORE_MAIN, Some(CUSTOMER_ADA)))
        .await
        .expect("create order");

    let outcome = orders::transition_status(
        &pool,
        created.order_id,
        OrderStatus::Cancelled,
        STORE_MAIN,
    )
    .await
    .expect("cancel order");
    assert_eq!(outcome, TransitionOutcome::StatusUpdated);

    for target in [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ] {
        let err = orders::transition_status(&pool, created.order_id, target, STORE_MAIN)
            .await
            .expect_err("terminal state must be frozen");
        assert!(
            matches!(err, AppError::InvalidTransition { .. }),
            "Cancelled -> {target}: got {err:?}"
        );
    }

    assert_eq!(order_status(&pool, created.order_id).await, "Cancelled");
    assert_eq!(sales_count(&pool, created.order_id).await, 0);
}

#[tokio::test]
async fn concurrent_delivery_signals_record_the_batch_exactly_once() {
    let (_dir, pool) = test_pool().await;

    let created = orders::create_order(&pool, two_line_order(STORE_MAIN, Some(CUSTOMER_ADA)))
        .await
        .expect("create order");

    let a = {
        let pool = pool.clone();
        let order_id = created.order_id;
        tokio::spawn(async move {
            orders::transition_status(&pool, order_id, OrderStatus::Delivered, STORE_MAIN).await
        })
    };
    let b = {
        let pool = pool.clone();
        let order_id = created.order_id;
        tokio::spawn(async move {
            orders::transition_status(&pool, order_id, OrderStatus::Delivered, STORE_MAIN).await
        })
    };

    let outcomes = [
        a.await.expect("task a").expect("delivery a"),
        b.await.expect("task b").expect("delivery b"),
    ];

    let recorded = outcomes
        .iter()
        .filter(|o| **o == TransitionOutcome::DeliveredAndRecorded)
        .count();
    let repeats = outcomes
        .iter()
        .filter(|o| **o == TransitionOutcome::DeliveredAlreadyRecorded)
        .count();
    assert_eq!(
        (recorded, repeats),
        (1, 1),
        "exactly one signal must write the batch, got {outcomes:?}"
    );

    assert_eq!(sales_count(&pool, created.order_id).await, 2);
    assert_eq!(order_status(&pool, created.order_id).await, "Delivered");
}
