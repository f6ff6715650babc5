use serde::{Deserialize, Serialize};

use crate::format::{CollectionSummary, PhotoSummary};
use crate::types::{GalleryStats, Photo};

// Query parameters

#[derive(Debug, Default, Deserialize)]
pub struct PhotoListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub q: Option<String>,
    pub search: Option<String>,
    pub tags: Option<String>,
}

impl PhotoListParams {
    /// `q` wins over `search` unless it is blank.
    #[must_use]
    pub fn search_text(&self) -> Option<&str> {
        self.q
            .as_deref()
            .filter(|q| !q.trim().is_empty())
            .or(self.search.as_deref())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CollectionListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub published_only: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteParams {
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginParams {
    pub expires_in_seconds: Option<i64>,
}

// Request bodies

#[derive(Debug, Deserialize)]
pub struct CreatePhotoRequest {
    pub public_id: String,
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub object_key: String,
    pub aspect_ratio: f64,
    #[serde(default)]
    pub is_featured: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePhotoRequest {
    pub title: Option<String>,
    pub tags: Option<Vec<String>>,
    pub object_key: Option<String>,
    pub aspect_ratio: Option<f64>,
    pub is_featured: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// An empty `description` clears it.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTagRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCollectionRequest {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cover_photo_id: Option<String>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub photo_ids: Vec<String>,
}

/// An empty `description` or `cover_photo_id` clears the field.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCollectionRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub cover_photo_id: Option<String>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SetCollectionPhotosRequest {
    pub photo_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddCollectionPhotoRequest {
    pub photo_id: String,
    /// Defaults to the end of the collection.
    #[serde(default)]
    pub order_index: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
}

// Responses

#[derive(Debug, Serialize)]
pub struct WelcomeResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DownloadRecordedResponse {
    pub message: &'static str,
    pub download_count: i64,
}

#[derive(Debug, Serialize)]
pub struct CollectionListResponse {
    pub items: Vec<CollectionSummary>,
    pub total: i64,
    pub page: i64,
    pub pages: i64,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

/// A photo row as the admin API shows it.
#[derive(Debug, Serialize)]
pub struct AdminPhotoResponse {
    #[serde(flatten)]
    pub photo: Photo,
    pub thumbnail_url: String,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub stats: GalleryStats,
    pub top_downloads: Vec<PhotoSummary>,
    pub recent_photos: Vec<PhotoSummary>,
}

#[derive(Debug, Serialize)]
pub struct MembershipResponse {
    pub photo_id: String,
    pub public_id: String,
    pub order_index: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(q: Option<&str>, search: Option<&str>) -> PhotoListParams {
        PhotoListParams {
            q: q.map(str::to_string),
            search: search.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_search_text_prefers_q_unless_blank() {
        assert_eq!(params(Some("wind"), Some("solar")).search_text(), Some("wind"));
        assert_eq!(params(Some(""), Some("solar")).search_text(), Some("solar"));
        assert_eq!(params(Some("  "), Some("solar")).search_text(), Some("solar"));
        assert_eq!(params(None, Some("solar")).search_text(), Some("solar"));
        assert_eq!(params(None, None).search_text(), None);
    }
}
