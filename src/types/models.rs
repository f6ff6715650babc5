use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored photo row.
///
/// `is_featured` keeps the database's text flag; use
/// [`crate::format::parse_flag`] to read it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Photo {
    pub id: String,
    pub public_id: String,
    pub title: String,
    pub tags: Vec<String>,
    pub object_key: String,
    pub aspect_ratio: f64,
    pub download_count: i64,
    pub is_featured: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagWithCount {
    #[serde(flatten)]
    pub tag: Tag,
    pub photo_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_photo_id: Option<String>,
    pub is_published: String,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CollectionWithCount {
    pub collection: Collection,
    pub photo_count: i64,
}

/// A photo's position inside a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub collection_id: String,
    pub photo_id: String,
    pub order_index: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip)]
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

pub const ROLE_ADMIN: &str = "admin";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    #[serde(skip)]
    pub token_hash: String,
    #[serde(skip)]
    pub token_lookup: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Aggregate numbers for the admin dashboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GalleryStats {
    pub total_photos: i64,
    pub total_downloads: i64,
    pub featured_photos: i64,
    pub total_users: i64,
    pub total_tags: i64,
    pub total_collections: i64,
    pub published_collections: i64,
    pub total_views: i64,
}
