use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::RequireAdmin;
use crate::format::{MediaUrls, flag_str, parse_flag};
use crate::query::Page;
use crate::server::AppState;
use crate::server::dto::{AdminListParams, AdminPhotoResponse, CreatePhotoRequest, UpdatePhotoRequest};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::{
    DEFAULT_PHOTO_LIMIT, MAX_PHOTO_LIMIT, page_request, query_params, validate_aspect_ratio,
    validate_public_id, validate_tag_names, validate_title,
};
use crate::storage::{extension_for_content_type, is_valid_key};
use crate::types::{Photo, normalize_tags};

pub const MAX_UPLOAD_SIZE: usize = 50 * 1024 * 1024;

const PHOTO_CONFLICT: &str = "A photo with this public_id or object_key already exists";

fn to_response(photo: Photo, urls: &MediaUrls) -> AdminPhotoResponse {
    let thumbnail_url = urls.thumbnail_url(&photo.object_key);
    AdminPhotoResponse {
        photo,
        thumbnail_url,
    }
}

fn new_photo(
    public_id: String,
    title: String,
    tags: Vec<String>,
    object_key: String,
    aspect_ratio: f64,
    is_featured: bool,
) -> Result<Photo, ApiError> {
    validate_public_id(&public_id)?;
    validate_title(&title)?;
    validate_aspect_ratio(aspect_ratio)?;
    validate_tag_names(&tags)?;

    Ok(Photo {
        id: Uuid::new_v4().to_string(),
        public_id,
        title: title.trim().to_string(),
        tags: normalize_tags(&tags),
        object_key,
        aspect_ratio,
        download_count: 0,
        is_featured: flag_str(is_featured).to_string(),
        created_at: Utc::now(),
    })
}

/// GET /admin/photos
pub async fn list_photos(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    query: Result<Query<AdminListParams>, QueryRejection>,
) -> impl IntoResponse {
    let params = query_params(query)?;
    let page = page_request(params.page, params.limit, DEFAULT_PHOTO_LIMIT, MAX_PHOTO_LIMIT)?;

    let photos = state
        .store
        .find_photos(params.q.as_deref(), page)
        .api_err("Failed to list photos")?;

    let urls = &state.urls;
    let photos: Page<AdminPhotoResponse> = photos.map(|p| to_response(p, urls));

    Ok::<_, ApiError>(Json(ApiResponse::success(photos)))
}

/// GET /admin/photos/{id}
pub async fn get_photo(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let photo = state
        .store
        .get_photo(&id)
        .api_err("Failed to get photo")?
        .or_not_found("Photo not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(to_response(photo, &state.urls))))
}

/// POST /admin/photos
///
/// Registers a photo whose object is already in the store or on the CDN.
pub async fn create_photo(
    admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePhotoRequest>,
) -> impl IntoResponse {
    if !is_valid_key(&req.object_key) {
        return Err(ApiError::bad_request("Invalid object_key"));
    }

    let photo = new_photo(
        req.public_id,
        req.title,
        req.tags,
        req.object_key,
        req.aspect_ratio,
        req.is_featured,
    )?;

    state
        .store
        .create_photo(&photo)
        .conflict_or(PHOTO_CONFLICT, "Failed to create photo")?;

    tracing::info!("{} created photo {}", admin.user.username, photo.public_id);

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(to_response(photo, &state.urls))),
    ))
}

/// PATCH /admin/photos/{id}
///
/// `public_id` and `download_count` cannot be changed.
pub async fn update_photo(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdatePhotoRequest>,
) -> impl IntoResponse {
    let mut photo = state
        .store
        .get_photo(&id)
        .api_err("Failed to get photo")?
        .or_not_found("Photo not found")?;

    if let Some(title) = req.title {
        validate_title(&title)?;
        photo.title = title.trim().to_string();
    }
    if let Some(tags) = req.tags {
        validate_tag_names(&tags)?;
        photo.tags = normalize_tags(&tags);
    }
    if let Some(object_key) = req.object_key {
        if !is_valid_key(&object_key) {
            return Err(ApiError::bad_request("Invalid object_key"));
        }
        photo.object_key = object_key;
    }
    if let Some(ratio) = req.aspect_ratio {
        validate_aspect_ratio(ratio)?;
        photo.aspect_ratio = ratio;
    }
    if let Some(featured) = req.is_featured {
        photo.is_featured = flag_str(featured).to_string();
    }

    state
        .store
        .update_photo(&photo)
        .conflict_or(PHOTO_CONFLICT, "Failed to update photo")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(to_response(photo, &state.urls))))
}

struct UploadForm {
    content: Vec<u8>,
    content_type: String,
    public_id: String,
    title: String,
    tags: Vec<String>,
    aspect_ratio: f64,
    is_featured: bool,
}

async fn field_text(field: axum::extract::multipart::Field<'_>, name: &str) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read {name}: {e}")))
}

async fn parse_upload_form(multipart: &mut Multipart) -> Result<UploadForm, ApiError> {
    let mut content: Option<(Vec<u8>, String)> = None;
    let mut public_id: Option<String> = None;
    let mut title: Option<String> = None;
    let mut tags: Vec<String> = Vec::new();
    let mut aspect_ratio: Option<f64> = None;
    let mut is_featured = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read multipart: {e}")))?
    {
        match field.name() {
            Some("file") => {
                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .ok_or_else(|| ApiError::bad_request("File content type is required"))?;
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?;
                if data.len() > MAX_UPLOAD_SIZE {
                    return Err(ApiError::payload_too_large(format!(
                        "File size ({} bytes) exceeds maximum allowed size ({MAX_UPLOAD_SIZE} bytes)",
                        data.len()
                    )));
                }
                content = Some((data.to_vec(), content_type));
            }
            Some("public_id") => public_id = Some(field_text(field, "public_id").await?),
            Some("title") => title = Some(field_text(field, "title").await?),
            Some("tags") => {
                let raw = field_text(field, "tags").await?;
                tags = raw.split(',').map(str::to_string).collect();
            }
            Some("aspect_ratio") => {
                let raw = field_text(field, "aspect_ratio").await?;
                aspect_ratio = Some(
                    raw.trim()
                        .parse()
                        .map_err(|_| ApiError::bad_request("aspect_ratio must be a number"))?,
                );
            }
            Some("is_featured") => {
                is_featured = parse_flag(field_text(field, "is_featured").await?.trim());
            }
            _ => {}
        }
    }

    let (content, content_type) = content.ok_or_else(|| ApiError::bad_request("File field is required"))?;

    Ok(UploadForm {
        content,
        content_type,
        public_id: public_id.ok_or_else(|| ApiError::bad_request("public_id is required"))?,
        title: title.ok_or_else(|| ApiError::bad_request("title is required"))?,
        tags: tags.into_iter().filter(|t| !t.trim().is_empty()).collect(),
        aspect_ratio: aspect_ratio
            .ok_or_else(|| ApiError::bad_request("aspect_ratio is required"))?,
        is_featured,
    })
}

/// POST /admin/photos/upload
///
/// Multipart form with `file`, `public_id`, `title`, `aspect_ratio` and
/// optional comma-separated `tags` and `is_featured`. The file is stored at
/// `images/original/<public_id>.<ext>` before the row is inserted; a key
/// that is already taken is refused before anything is written.
pub async fn upload_photo(
    admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let form = parse_upload_form(&mut multipart).await?;

    let extension = extension_for_content_type(&form.content_type).ok_or_else(|| {
        ApiError::bad_request(format!("Unsupported image type: {}", form.content_type))
    })?;

    let object_key = format!("images/original/{}.{extension}", form.public_id);
    let photo = new_photo(
        form.public_id,
        form.title,
        form.tags,
        object_key,
        form.aspect_ratio,
        form.is_featured,
    )?;

    if state
        .store
        .get_photo_by_public_id(&photo.public_id)
        .api_err("Failed to check photo")?
        .is_some()
    {
        return Err(ApiError::conflict(PHOTO_CONFLICT));
    }

    // The key may belong to a photo registered by hand, or hold bytes with no row yet.
    let key_in_use = state
        .store
        .get_photo_by_object_key(&photo.object_key)
        .api_err("Failed to check photo")?
        .is_some();
    let object_exists = state.objects.exists(&photo.object_key).await.map_err(|e| {
        tracing::error!("Failed to check {}: {e}", photo.object_key);
        ApiError::internal("Failed to store file")
    })?;
    if key_in_use || object_exists {
        return Err(ApiError::conflict(PHOTO_CONFLICT));
    }

    state
        .objects
        .put(&photo.object_key, &form.content, &form.content_type)
        .await
        .map_err(|e| {
            tracing::error!("Failed to store {}: {e}", photo.object_key);
            ApiError::internal("Failed to store file")
        })?;

    // The object was written by this request, so it is ours to remove.
    let created = state.store.create_photo(&photo);
    if created.is_err() {
        if let Err(e) = state.objects.delete(&photo.object_key).await {
            tracing::warn!("Failed to remove orphaned object {}: {e}", photo.object_key);
        }
    }
    created.conflict_or(PHOTO_CONFLICT, "Failed to create photo")?;

    tracing::info!(
        "{} uploaded photo {} ({} bytes)",
        admin.user.username,
        photo.public_id,
        form.content.len()
    );

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(to_response(photo, &state.urls))),
    ))
}
