use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tokio_util::io::ReaderStream;

use crate::server::AppState;
use crate::server::response::ApiError;
use crate::storage::{StorageError, content_type_for_key};

pub fn media_router() -> Router<Arc<AppState>> {
    Router::new().route("/{*key}", get(get_object))
}

/// GET /media/{*key}
///
/// Streams a stored object when no external CDN fronts the store.
pub async fn get_object(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    let (reader, size) = match state.objects.get(&key).await {
        Ok(found) => found,
        Err(StorageError::NotFound | StorageError::InvalidKey(_)) => {
            return Err(ApiError::not_found("Object not found"));
        }
        Err(e) => {
            tracing::error!("Failed to open object {key}: {e}");
            return Err(ApiError::internal("Failed to read object"));
        }
    };

    let body = Body::from_stream(ReaderStream::new(reader));

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type_for_key(&key))
        .header(header::CONTENT_LENGTH, size)
        .header(header::CACHE_CONTROL, "public, max-age=86400")
        .header("X-Content-Type-Options", "nosniff")
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()))
}
