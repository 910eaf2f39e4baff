//! Storefront Server - retail order lifecycle and sales ledger service
//!
//! # Module structure
//!
//! ```text
//! storefront-server/src/
//! ├── config.rs      # environment configuration
//! ├── state.rs       # shared application state
//! ├── error.rs       # unified error type and response envelope
//! ├── auth/          # store-owner JWT verification
//! ├── api/           # HTTP routes and handlers
//! └── db/            # pool bootstrap, catalog lookups, order engine, ledger
//! ```
//!
//! The core lives in `db::orders` (atomic order creation and the status
//! transition machine) and `db::sales` (write-once sales derivation on
//! delivery); everything else is the plumbing around it.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod state;

pub use auth::{StoreIdentity, create_token};
pub use config::Config;
pub use db::orders::{OrderStatus, TransitionOutcome};
pub use error::{AppError, AppResult};
pub use state::AppState;
