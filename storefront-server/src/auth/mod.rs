//! Store-owner JWT authentication
//!
//! Token issuance lives with the identity provider; this module only
//! verifies bearer tokens and exposes the resulting [`StoreIdentity`]
//! (actor, store scope, role) to handlers as a request extension.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// JWT claims for a store-scoped actor
#[derive(Debug, Serialize, Deserialize)]
pub struct StoreClaims {
    /// Actor ID
    pub sub: String,
    /// Store the actor is scoped to
    pub store_id: i64,
    /// Actor role (e.g. "shop_owner")
    pub role: String,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
    /// Issued at (Unix timestamp seconds)
    pub iat: usize,
}

/// Verified identity extracted from the bearer token
#[derive(Debug, Clone)]
pub struct StoreIdentity {
    pub actor_id: String,
    pub store_id: i64,
    pub role: String,
}

const JWT_EXPIRY_HOURS: i64 = 24;

/// Create a token for a store-scoped actor (test and tooling use; the
/// production issuer is external).
pub fn create_token(
    actor_id: &str,
    store_id: i64,
    role: &str,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let claims = StoreClaims {
        sub: actor_id.to_string(),
        store_id,
        role: role.to_string(),
        exp: (now + chrono::Duration::hours(JWT_EXPIRY_HOURS)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Middleware that verifies the bearer token and inserts a [`StoreIdentity`]
pub async fn store_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| error_response(401, "Missing Authorization header"))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| error_response(401, "Invalid Authorization format"))?;

    let validation = Validation::default();
    let token_data = jsonwebtoken::decode::<StoreClaims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!("JWT validation failed: {e}");
        error_response(401, "Invalid or expired token")
    })?;

    let identity = StoreIdentity {
        actor_id: token_data.claims.sub,
        store_id: token_data.claims.store_id,
        role: token_data.claims.role,
    };

    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

fn error_response(status: u16, message: &str) -> Response {
    let body = serde_json::json!({ "error": message });
    let status =
        http::StatusCode::from_u16(status).unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);
    (status, axum::Json(body)).into_response()
}
