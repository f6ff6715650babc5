use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    response::IntoResponse,
};

use crate::format::{PhotoSummary, collection_detail, collection_summary, parse_flag, photo_summary};
use crate::server::AppState;
use crate::server::dto::{CollectionListParams, CollectionListResponse};
use crate::server::response::{ApiError, StoreOptionExt, StoreResultExt};
use crate::server::validation::{
    DEFAULT_COLLECTION_LIMIT, MAX_COLLECTION_LIMIT, page_request, query_params,
};
use crate::types::{Collection, Photo};

/// Loads the cover photo. A dangling cover reference shows as no cover.
pub(crate) fn load_cover(state: &AppState, collection: &Collection) -> Result<Option<Photo>, ApiError> {
    match &collection.cover_photo_id {
        Some(id) => state.store.get_photo(id).api_err("Failed to get cover photo"),
        None => Ok(None),
    }
}

fn load_published(collection: Option<Collection>) -> Result<Collection, ApiError> {
    collection
        .filter(|c| parse_flag(&c.is_published))
        .or_not_found("Collection not found")
}

/// GET /collections
pub async fn list_collections(
    State(state): State<Arc<AppState>>,
    query: Result<Query<CollectionListParams>, QueryRejection>,
) -> impl IntoResponse {
    let params = query_params(query)?;
    let page = page_request(
        params.page,
        params.limit,
        DEFAULT_COLLECTION_LIMIT,
        MAX_COLLECTION_LIMIT,
    )?;
    let published_only = params.published_only.unwrap_or(true);

    let collections = state
        .store
        .list_collections(published_only, page)
        .api_err("Failed to list collections")?;

    let mut items = Vec::with_capacity(collections.items.len());
    for entry in &collections.items {
        let cover = load_cover(&state, &entry.collection)?;
        items.push(collection_summary(entry, cover.as_ref(), &state.urls));
    }

    Ok::<_, ApiError>(Json(CollectionListResponse {
        items,
        total: collections.total,
        page: collections.page,
        pages: collections.pages,
    }))
}

/// GET /collections/{slug}
///
/// Every successful fetch counts as one view.
pub async fn get_collection(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> impl IntoResponse {
    let found = state
        .store
        .get_collection_by_slug(&slug)
        .api_err("Failed to get collection")?;
    let mut collection = load_published(found)?;

    collection.view_count = state
        .store
        .record_collection_view(&collection.id)
        .api_err("Failed to record view")?
        .or_not_found("Collection not found")?;

    let photos = state
        .store
        .list_collection_photos(&collection.id)
        .api_err("Failed to list collection photos")?;
    let cover = load_cover(&state, &collection)?;

    Ok::<_, ApiError>(Json(collection_detail(
        &collection,
        cover.as_ref(),
        &photos,
        &state.urls,
    )))
}

/// GET /collections/{collection_id}/photos
pub async fn list_collection_photos(
    State(state): State<Arc<AppState>>,
    Path(collection_id): Path<String>,
) -> impl IntoResponse {
    let found = state
        .store
        .get_collection(&collection_id)
        .api_err("Failed to get collection")?;
    let collection = load_published(found)?;

    let photos = state
        .store
        .list_collection_photos(&collection.id)
        .api_err("Failed to list collection photos")?;

    let summaries: Vec<PhotoSummary> = photos
        .iter()
        .map(|p| photo_summary(p, &state.urls))
        .collect();

    Ok::<_, ApiError>(Json(summaries))
}
