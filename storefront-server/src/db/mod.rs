//! Database Module
//!
//! Handles the SQLite connection pool and migrations.
//!
//! Transaction discipline: every multi-statement write transaction in this
//! crate issues a write as its *first* statement. Under WAL a deferred
//! transaction that reads before writing can hit a busy failure when it
//! tries to upgrade to the write lock; writing first takes the lock up
//! front, so concurrent writers queue on busy_timeout instead.

pub mod catalog;
pub mod orders;
pub mod sales;

use crate::error::AppError;
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::str::FromStr;

/// Open the database, apply pragmas and run migrations.
pub async fn connect(db_path: &str) -> Result<SqlitePool, AppError> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))
        .map_err(|e| AppError::database(format!("Invalid database path: {e}")))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .pragma("foreign_keys", "ON");

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .map_err(|e| AppError::database(format!("Failed to open database: {e}")))?;

    // busy_timeout: 写冲突时等待 5s 而非立即失败
    sqlx::query("PRAGMA busy_timeout = 5000;")
        .execute(&pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to set busy_timeout: {e}")))?;

    sqlx::migrate!("./migrations")
        .set_ignore_missing(true)
        .run(&pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to apply migrations: {e}")))?;

    tracing::info!("Database ready (SQLite WAL, busy_timeout=5000ms)");

    Ok(pool)
}

/// Parse a stored monetary TEXT column back into a `Decimal`.
///
/// Amounts are written by this crate as canonical decimal strings; a parse
/// failure here means the row was tampered with or corrupted.
pub(crate) fn money_from_db(raw: &str) -> Result<Decimal, AppError> {
    Decimal::from_str(raw)
        .map_err(|e| AppError::database(format!("Corrupt monetary value {raw:?}: {e}")))
}
