use serde::Serialize;

use super::parse_flag;
use super::urls::{ImageSize, MediaUrls};
use crate::types::{Collection, CollectionWithCount, Photo};

#[derive(Debug, Clone, Serialize)]
pub struct PhotoSummary {
    pub id: String,
    pub public_id: String,
    pub title: String,
    pub tags: Vec<String>,
    pub thumbnail_url: String,
    pub aspect_ratio: f64,
    pub download_count: i64,
    pub is_featured: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhotoDetail {
    pub public_id: String,
    pub title: String,
    pub tags: Vec<String>,
    pub download_url: String,
    pub aspect_ratio: f64,
    pub license: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadLink {
    pub download_url: String,
    pub size: ImageSize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionSummary {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub slug: String,
    pub cover_photo_id: Option<String>,
    pub cover_photo: Option<PhotoSummary>,
    pub is_published: bool,
    pub view_count: i64,
    pub photo_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionDetail {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub slug: String,
    pub cover_photo_id: Option<String>,
    pub cover_photo: Option<PhotoSummary>,
    pub is_published: bool,
    pub view_count: i64,
    pub photos: Vec<PhotoSummary>,
    pub created_at: String,
    pub updated_at: String,
}

#[must_use]
pub fn photo_summary(photo: &Photo, urls: &MediaUrls) -> PhotoSummary {
    PhotoSummary {
        id: photo.id.clone(),
        public_id: photo.public_id.clone(),
        title: photo.title.clone(),
        tags: photo.tags.clone(),
        thumbnail_url: urls.thumbnail_url(&photo.object_key),
        aspect_ratio: photo.aspect_ratio,
        download_count: photo.download_count,
        is_featured: parse_flag(&photo.is_featured),
    }
}

#[must_use]
pub fn photo_detail(photo: &Photo, urls: &MediaUrls, license: &str) -> PhotoDetail {
    PhotoDetail {
        public_id: photo.public_id.clone(),
        title: photo.title.clone(),
        tags: photo.tags.clone(),
        download_url: urls.download_url(&photo.object_key, ImageSize::Original),
        aspect_ratio: photo.aspect_ratio,
        license: license.to_string(),
    }
}

#[must_use]
pub fn download_link(photo: &Photo, urls: &MediaUrls, size: ImageSize) -> DownloadLink {
    DownloadLink {
        download_url: urls.download_url(&photo.object_key, size),
        size,
    }
}

#[must_use]
pub fn collection_summary(
    entry: &CollectionWithCount,
    cover: Option<&Photo>,
    urls: &MediaUrls,
) -> CollectionSummary {
    let c = &entry.collection;
    CollectionSummary {
        id: c.id.clone(),
        title: c.title.clone(),
        description: c.description.clone(),
        slug: c.slug.clone(),
        cover_photo_id: c.cover_photo_id.clone(),
        cover_photo: cover.map(|p| photo_summary(p, urls)),
        is_published: parse_flag(&c.is_published),
        view_count: c.view_count,
        photo_count: entry.photo_count,
        created_at: c.created_at.to_rfc3339(),
        updated_at: c.updated_at.to_rfc3339(),
    }
}

#[must_use]
pub fn collection_detail(
    collection: &Collection,
    cover: Option<&Photo>,
    photos: &[Photo],
    urls: &MediaUrls,
) -> CollectionDetail {
    CollectionDetail {
        id: collection.id.clone(),
        title: collection.title.clone(),
        description: collection.description.clone(),
        slug: collection.slug.clone(),
        cover_photo_id: collection.cover_photo_id.clone(),
        cover_photo: cover.map(|p| photo_summary(p, urls)),
        is_published: parse_flag(&collection.is_published),
        view_count: collection.view_count,
        photos: photos.iter().map(|p| photo_summary(p, urls)).collect(),
        created_at: collection.created_at.to_rfc3339(),
        updated_at: collection.updated_at.to_rfc3339(),
    }
}
