use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    http::{HeaderMap, header::AUTHORIZATION},
    response::IntoResponse,
};
use chrono::{Duration, Utc};

use crate::auth::{extract_basic_credentials, issue_token, verify_credentials};
use crate::server::AppState;
use crate::server::dto::{LoginParams, LoginResponse};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::server::validation::query_params;

/// POST /admin/login
///
/// Exchanges `Authorization: Basic base64(username:password)` for a bearer token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<LoginParams>, QueryRejection>,
) -> impl IntoResponse {
    let params = query_params(query)?;

    let header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    let (username, password) = extract_basic_credentials(header)
        .ok_or_else(|| ApiError::unauthorized("Invalid authorization header"))?;

    let user = verify_credentials(state.store.as_ref(), &username, &password)
        .api_err("Failed to verify credentials")?
        .ok_or_else(|| {
            tracing::warn!("Failed login for '{username}'");
            ApiError::unauthorized("Invalid username or password")
        })?;

    if !user.is_admin() {
        return Err(ApiError::forbidden("Admin access required"));
    }

    let expires_at = match params.expires_in_seconds {
        Some(seconds) if seconds <= 0 => {
            return Err(ApiError::bad_request("expires_in_seconds must be positive"));
        }
        Some(seconds) => Some(Utc::now() + Duration::seconds(seconds)),
        None => None,
    };

    let (token, raw_token) = issue_token(state.store.as_ref(), user.id, expires_at)
        .api_err("Failed to create token")?;

    tracing::info!("Admin '{}' logged in", user.username);

    Ok::<_, ApiError>(Json(ApiResponse::success(LoginResponse {
        token: raw_token,
        username: user.username,
        expires_at: token.expires_at.map(|dt| dt.to_rfc3339()),
    })))
}
