use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::{RequireAdmin, TokenGenerator};
use crate::server::AppState;
use crate::server::dto::CreateUserRequest;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::{validate_password, validate_username};
use crate::types::ROLE_ADMIN;

pub async fn list_users(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let users = state.store.list_users().api_err("Failed to list users")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(users)))
}

pub async fn create_user(
    admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> impl IntoResponse {
    validate_username(&req.username)?;
    validate_password(&req.password)?;

    let role = req.role.as_deref().unwrap_or(ROLE_ADMIN);
    if role.is_empty() || !role.chars().all(|c| c.is_ascii_lowercase()) {
        return Err(ApiError::bad_request("role can only contain lowercase letters"));
    }

    if state
        .store
        .get_user_by_username(&req.username)
        .api_err("Failed to check username")?
        .is_some()
    {
        return Err(ApiError::conflict("Username already exists"));
    }

    let password_hash = TokenGenerator::new()
        .hash(&req.password)
        .api_err("Failed to hash password")?;

    let user = state
        .store
        .create_user(&req.username, &password_hash, role)
        .conflict_or("Username already exists", "Failed to create user")?;

    tracing::info!("{} created user {}", admin.user.username, user.username);

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

pub async fn get_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let user = state
        .store
        .get_user(id)
        .api_err("Failed to get user")?
        .or_not_found("User not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(user)))
}

/// Users are never deleted, whoever asks.
pub async fn delete_user() -> ApiError {
    ApiError::method_not_allowed("Users cannot be deleted")
}
