use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::{CreateTagRequest, DeleteParams, UpdateTagRequest};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::validate_tag_name;
use crate::types::TagWithCount;

fn clean_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

pub async fn list_tags(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let tags = state.store.list_tags().api_err("Failed to list tags")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(tags)))
}

pub async fn create_tag(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTagRequest>,
) -> impl IntoResponse {
    validate_tag_name(&req.name)?;
    let name = req.name.trim();

    if state
        .store
        .get_tag_by_name(name)
        .api_err("Failed to check tag")?
        .is_some()
    {
        return Err(ApiError::conflict("Tag already exists"));
    }

    let description = clean_description(req.description);
    let tag = state
        .store
        .create_tag(name, description.as_deref())
        .conflict_or("Tag already exists", "Failed to create tag")?;

    let tag = TagWithCount {
        tag,
        photo_count: 0,
    };

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(tag))))
}

pub async fn get_tag(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let tag = state
        .store
        .get_tag(id)
        .api_err("Failed to get tag")?
        .or_not_found("Tag not found")?;

    let photo_count = state
        .store
        .count_tag_photos(id)
        .api_err("Failed to count tag photos")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(TagWithCount { tag, photo_count })))
}

/// Renaming a tag rewrites it inside every tagged photo.
pub async fn update_tag(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateTagRequest>,
) -> impl IntoResponse {
    let mut tag = state
        .store
        .get_tag(id)
        .api_err("Failed to get tag")?
        .or_not_found("Tag not found")?;

    if let Some(name) = req.name {
        validate_tag_name(&name)?;
        let name = name.trim().to_string();

        if name != tag.name
            && state
                .store
                .get_tag_by_name(&name)
                .api_err("Failed to check tag name")?
                .is_some()
        {
            return Err(ApiError::conflict("Tag name already exists"));
        }
        tag.name = name;
    }
    if req.description.is_some() {
        tag.description = clean_description(req.description);
    }

    state
        .store
        .update_tag(&tag)
        .conflict_or("Tag name already exists", "Failed to update tag")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(tag)))
}

/// Deleting a tag that is in use requires `?force=true`; it is then
/// removed from every photo that carries it.
pub async fn delete_tag(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(params): Query<DeleteParams>,
) -> impl IntoResponse {
    let tag = state
        .store
        .get_tag(id)
        .api_err("Failed to get tag")?
        .or_not_found("Tag not found")?;

    let photo_count = state
        .store
        .count_tag_photos(tag.id)
        .api_err("Failed to count tag photos")?;

    if photo_count > 0 && !params.force {
        return Err(ApiError::conflict(
            "Tag has photos associated. Use ?force=true to delete anyway",
        ));
    }

    state.store.delete_tag(tag.id).api_err("Failed to delete tag")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
