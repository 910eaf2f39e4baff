//! storefront-server — retail order and sales ledger service
//!
//! Long-running HTTP service that:
//! - Accepts store-scoped order creation and status transitions (JWT)
//! - Accepts customer checkout (public)
//! - Derives the sales ledger exactly once per delivered order

use storefront_server::{AppState, Config, api};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storefront_server=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting storefront-server (env: {})", config.environment);

    let state = AppState::new(&config).await?;
    let app = api::create_router(state);

    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("storefront-server listening on {addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
