pub(crate) mod collections;
mod photos;
mod tags;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::server::AppState;

pub fn public_router() -> Router<Arc<AppState>> {
    Router::new()
        // Photos
        .route("/photos", get(photos::list_photos))
        .route("/photos/{public_id}", get(photos::get_photo))
        .route("/photos/{public_id}/download", post(photos::record_download))
        .route(
            "/photos/{public_id}/download/{size}",
            get(photos::get_download_url),
        )
        // Collections; `{key}` is the slug for detail, the id for photos
        .route("/collections", get(collections::list_collections))
        .route("/collections/{key}", get(collections::get_collection))
        .route(
            "/collections/{key}/photos",
            get(collections::list_collection_photos),
        )
        // Tags
        .route("/tags", get(tags::list_tags))
}
