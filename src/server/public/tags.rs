use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};

use crate::server::AppState;
use crate::server::response::{ApiError, StoreResultExt};

/// GET /tags
pub async fn list_tags(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let tags = state.store.list_tags().api_err("Failed to list tags")?;

    Ok::<_, ApiError>(Json(tags))
}
