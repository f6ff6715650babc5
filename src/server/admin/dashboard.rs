use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};

use crate::auth::RequireAdmin;
use crate::format::photo_summary;
use crate::query::PageRequest;
use crate::server::AppState;
use crate::server::dto::DashboardResponse;
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};

const DASHBOARD_LIST_LEN: i64 = 5;

/// GET /admin/dashboard
pub async fn dashboard(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let stats = store.gallery_stats().api_err("Failed to load stats")?;
    let top = store
        .most_downloaded_photos(DASHBOARD_LIST_LEN)
        .api_err("Failed to load top downloads")?;
    let recent = store
        .find_photos(None, PageRequest::new(1, DASHBOARD_LIST_LEN))
        .api_err("Failed to load recent photos")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(DashboardResponse {
        stats,
        top_downloads: top.iter().map(|p| photo_summary(p, &state.urls)).collect(),
        recent_photos: recent
            .items
            .iter()
            .map(|p| photo_summary(p, &state.urls))
            .collect(),
    })))
}
