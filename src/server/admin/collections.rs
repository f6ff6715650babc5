use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::RequireAdmin;
use crate::format::{CollectionDetail, collection_detail, collection_summary, flag_str};
use crate::query::Page;
use crate::server::AppState;
use crate::server::dto::{
    AddCollectionPhotoRequest, AdminListParams, CreateCollectionRequest, MembershipResponse,
    SetCollectionPhotosRequest, UpdateCollectionRequest,
};
use crate::server::public::collections::load_cover;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::{
    DEFAULT_COLLECTION_LIMIT, MAX_COLLECTION_LIMIT, page_request, query_params, validate_slug,
    validate_title,
};
use crate::types::{Collection, Membership};

const SLUG_CONFLICT: &str = "A collection with this slug already exists";

fn load_collection(state: &AppState, id: &str) -> Result<Collection, ApiError> {
    state
        .store
        .get_collection(id)
        .api_err("Failed to get collection")?
        .or_not_found("Collection not found")
}

fn require_photo(state: &AppState, photo_id: &str) -> Result<(), ApiError> {
    state
        .store
        .get_photo(photo_id)
        .api_err("Failed to get photo")?
        .ok_or_else(|| ApiError::bad_request(format!("Photo {photo_id} does not exist")))
        .map(|_| ())
}

/// Checks that every id names a photo and drops repeats, keeping order.
fn resolve_photo_ids(state: &AppState, photo_ids: Vec<String>) -> Result<Vec<String>, ApiError> {
    let mut unique: Vec<String> = Vec::with_capacity(photo_ids.len());
    for id in photo_ids {
        if unique.contains(&id) {
            continue;
        }
        require_photo(state, &id)?;
        unique.push(id);
    }
    Ok(unique)
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn detail_response(
    state: &AppState,
    collection: &Collection,
) -> Result<Json<ApiResponse<CollectionDetail>>, ApiError> {
    let photos = state
        .store
        .list_collection_photos(&collection.id)
        .api_err("Failed to list collection photos")?;
    let cover = load_cover(state, collection)?;

    Ok(Json(ApiResponse::success(collection_detail(
        collection,
        cover.as_ref(),
        &photos,
        &state.urls,
    ))))
}

fn membership_response(
    state: &AppState,
    collection_id: &str,
) -> Result<Vec<MembershipResponse>, ApiError> {
    let memberships = state
        .store
        .list_memberships(collection_id)
        .api_err("Failed to list memberships")?;
    let photos: HashMap<String, String> = state
        .store
        .list_collection_photos(collection_id)
        .api_err("Failed to list collection photos")?
        .into_iter()
        .map(|p| (p.id, p.public_id))
        .collect();

    Ok(memberships
        .into_iter()
        .map(|m| MembershipResponse {
            public_id: photos.get(&m.photo_id).cloned().unwrap_or_default(),
            photo_id: m.photo_id,
            order_index: m.order_index,
        })
        .collect())
}

/// GET /admin/collections
///
/// Lists published and unpublished collections alike.
pub async fn list_collections(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    query: Result<Query<AdminListParams>, QueryRejection>,
) -> impl IntoResponse {
    let params = query_params(query)?;
    let page = page_request(
        params.page,
        params.limit,
        DEFAULT_COLLECTION_LIMIT,
        MAX_COLLECTION_LIMIT,
    )?;

    let collections = state
        .store
        .list_collections(false, page)
        .api_err("Failed to list collections")?;

    let mut items = Vec::with_capacity(collections.items.len());
    for entry in &collections.items {
        let cover = load_cover(&state, &entry.collection)?;
        items.push(collection_summary(entry, cover.as_ref(), &state.urls));
    }

    Ok::<_, ApiError>(Json(ApiResponse::success(Page::new(
        items,
        collections.total,
        page,
    ))))
}

/// POST /admin/collections
pub async fn create_collection(
    admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCollectionRequest>,
) -> impl IntoResponse {
    validate_title(&req.title)?;
    validate_slug(&req.slug)?;

    let cover_photo_id = clean_optional(req.cover_photo_id);
    if let Some(cover) = &cover_photo_id {
        require_photo(&state, cover)?;
    }
    let photo_ids = resolve_photo_ids(&state, req.photo_ids)?;

    let now = Utc::now();
    let collection = Collection {
        id: Uuid::new_v4().to_string(),
        title: req.title.trim().to_string(),
        description: clean_optional(req.description),
        slug: req.slug,
        cover_photo_id,
        is_published: flag_str(req.is_published).to_string(),
        view_count: 0,
        created_at: now,
        updated_at: now,
    };

    state
        .store
        .create_collection(&collection)
        .conflict_or(SLUG_CONFLICT, "Failed to create collection")?;

    if !photo_ids.is_empty() {
        state
            .store
            .set_collection_photos(&collection.id, &photo_ids)
            .api_err("Failed to set collection photos")?;
    }

    tracing::info!("{} created collection {}", admin.user.username, collection.slug);

    let response = detail_response(&state, &collection)?;
    Ok::<_, ApiError>((StatusCode::CREATED, response))
}

/// GET /admin/collections/{id}
///
/// Unlike the public detail route this does not count a view.
pub async fn get_collection(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let collection = load_collection(&state, &id)?;
    detail_response(&state, &collection)
}

/// PATCH /admin/collections/{id}
pub async fn update_collection(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateCollectionRequest>,
) -> impl IntoResponse {
    let mut collection = load_collection(&state, &id)?;

    if let Some(title) = req.title {
        validate_title(&title)?;
        collection.title = title.trim().to_string();
    }
    if let Some(slug) = req.slug {
        validate_slug(&slug)?;
        if slug != collection.slug
            && state
                .store
                .get_collection_by_slug(&slug)
                .api_err("Failed to check slug")?
                .is_some()
        {
            return Err(ApiError::conflict(SLUG_CONFLICT));
        }
        collection.slug = slug;
    }
    if req.description.is_some() {
        collection.description = clean_optional(req.description);
    }
    if req.cover_photo_id.is_some() {
        let cover = clean_optional(req.cover_photo_id);
        if let Some(cover) = &cover {
            require_photo(&state, cover)?;
        }
        collection.cover_photo_id = cover;
    }
    if let Some(published) = req.is_published {
        collection.is_published = flag_str(published).to_string();
    }
    collection.updated_at = Utc::now();

    state
        .store
        .update_collection(&collection)
        .conflict_or(SLUG_CONFLICT, "Failed to update collection")?;

    detail_response(&state, &collection)
}

/// DELETE /admin/collections/{id}
///
/// Removes the collection and its memberships; photos are untouched.
pub async fn delete_collection(
    admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let deleted = state
        .store
        .delete_collection(&id)
        .api_err("Failed to delete collection")?;

    if !deleted {
        return Err(ApiError::not_found("Collection not found"));
    }

    tracing::info!("{} deleted collection {id}", admin.user.username);

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

/// GET /admin/collections/{id}/photos
pub async fn list_collection_photos(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let collection = load_collection(&state, &id)?;
    let memberships = membership_response(&state, &collection.id)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(memberships)))
}

/// PUT /admin/collections/{id}/photos
///
/// Replaces the membership; each photo's position becomes its `order_index`.
pub async fn set_collection_photos(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SetCollectionPhotosRequest>,
) -> impl IntoResponse {
    let collection = load_collection(&state, &id)?;
    let photo_ids = resolve_photo_ids(&state, req.photo_ids)?;

    state
        .store
        .set_collection_photos(&collection.id, &photo_ids)
        .api_err("Failed to set collection photos")?;

    let memberships = membership_response(&state, &collection.id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(memberships)))
}

/// POST /admin/collections/{id}/photos
///
/// Adds one photo, or moves it when it is already a member.
pub async fn add_collection_photo(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<AddCollectionPhotoRequest>,
) -> impl IntoResponse {
    let collection = load_collection(&state, &id)?;
    require_photo(&state, &req.photo_id)?;

    let order_index = match req.order_index {
        Some(index) => index,
        None => state
            .store
            .list_memberships(&collection.id)
            .api_err("Failed to list memberships")?
            .iter()
            .map(|m| m.order_index + 1)
            .max()
            .unwrap_or(0),
    };

    state
        .store
        .upsert_membership(&Membership {
            collection_id: collection.id.clone(),
            photo_id: req.photo_id,
            order_index,
        })
        .api_err("Failed to add photo to collection")?;

    let memberships = membership_response(&state, &collection.id)?;
    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(memberships))))
}

/// DELETE /admin/collections/{id}/photos/{photo_id}
pub async fn remove_collection_photo(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path((id, photo_id)): Path<(String, String)>,
) -> impl IntoResponse {
    let collection = load_collection(&state, &id)?;

    let removed = state
        .store
        .remove_membership(&collection.id, &photo_id)
        .api_err("Failed to remove photo from collection")?;

    if !removed {
        return Err(ApiError::not_found("Photo is not in this collection"));
    }

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_optional() {
        assert_eq!(clean_optional(Some("  x ".to_string())), Some("x".to_string()));
        assert_eq!(clean_optional(Some("   ".to_string())), None);
        assert_eq!(clean_optional(None), None);
    }
}
