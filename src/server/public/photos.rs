use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    response::IntoResponse,
};

use crate::format::{ImageSize, download_link, photo_detail, photo_summary};
use crate::query::PhotoFilter;
use crate::server::AppState;
use crate::server::dto::{DownloadRecordedResponse, PhotoListParams};
use crate::server::response::{ApiError, StoreOptionExt, StoreResultExt};
use crate::server::validation::{DEFAULT_PHOTO_LIMIT, MAX_PHOTO_LIMIT, page_request, query_params};

/// GET /photos
pub async fn list_photos(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PhotoListParams>, QueryRejection>,
) -> impl IntoResponse {
    let params = query_params(query)?;
    let page = page_request(params.page, params.limit, DEFAULT_PHOTO_LIMIT, MAX_PHOTO_LIMIT)?;
    let filter = PhotoFilter::new(params.search_text(), params.tags.as_deref());

    let photos = state
        .store
        .list_photos(&filter, page)
        .api_err("Failed to list photos")?;

    let urls = &state.urls;
    Ok::<_, ApiError>(Json(photos.map(|p| photo_summary(&p, urls))))
}

/// GET /photos/{public_id}
pub async fn get_photo(
    State(state): State<Arc<AppState>>,
    Path(public_id): Path<String>,
) -> impl IntoResponse {
    let photo = state
        .store
        .get_photo_by_public_id(&public_id)
        .api_err("Failed to get photo")?
        .or_not_found("Photo not found")?;

    Ok::<_, ApiError>(Json(photo_detail(
        &photo,
        &state.urls,
        &state.config.license,
    )))
}

/// GET /photos/{public_id}/download/{size}
pub async fn get_download_url(
    State(state): State<Arc<AppState>>,
    Path((public_id, size)): Path<(String, String)>,
) -> impl IntoResponse {
    let size: ImageSize = size
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid size. Must be 'small', 'large', or 'original'"))?;

    let photo = state
        .store
        .get_photo_by_public_id(&public_id)
        .api_err("Failed to get photo")?
        .or_not_found("Photo not found")?;

    Ok::<_, ApiError>(Json(download_link(&photo, &state.urls, size)))
}

/// POST /photos/{public_id}/download
pub async fn record_download(
    State(state): State<Arc<AppState>>,
    Path(public_id): Path<String>,
) -> impl IntoResponse {
    let download_count = state
        .store
        .record_download(&public_id)
        .api_err("Failed to record download")?
        .or_not_found("Photo not found")?;

    tracing::debug!("Download recorded for {public_id} ({download_count})");

    Ok::<_, ApiError>(Json(DownloadRecordedResponse {
        message: "Download recorded",
        download_count,
    }))
}
