mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::query::{Page, PageRequest, PhotoFilter};
use crate::types::*;

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Photo operations
    fn create_photo(&self, photo: &Photo) -> Result<()>;
    fn get_photo(&self, id: &str) -> Result<Option<Photo>>;
    fn get_photo_by_public_id(&self, public_id: &str) -> Result<Option<Photo>>;
    fn get_photo_by_object_key(&self, object_key: &str) -> Result<Option<Photo>>;
    /// Newest first, filtered by search text and tag substrings.
    fn list_photos(&self, filter: &PhotoFilter, page: PageRequest) -> Result<Page<Photo>>;
    /// Newest first, optionally narrowed to titles or public ids containing `needle`.
    fn find_photos(&self, needle: Option<&str>, page: PageRequest) -> Result<Page<Photo>>;
    /// Updates everything except `public_id`, `download_count` and `created_at`.
    fn update_photo(&self, photo: &Photo) -> Result<()>;
    /// Atomically adds one download; `None` if no photo has this public id.
    fn record_download(&self, public_id: &str) -> Result<Option<i64>>;
    fn most_downloaded_photos(&self, limit: i64) -> Result<Vec<Photo>>;

    // Tag operations (many-to-many with photos)
    fn create_tag(&self, name: &str, description: Option<&str>) -> Result<Tag>;
    fn get_tag(&self, id: i64) -> Result<Option<Tag>>;
    fn get_tag_by_name(&self, name: &str) -> Result<Option<Tag>>;
    fn list_tags(&self) -> Result<Vec<TagWithCount>>;
    /// Renaming a tag also renames it in every tagged photo's list.
    fn update_tag(&self, tag: &Tag) -> Result<()>;
    /// Deleting a tag also removes it from every tagged photo's list.
    fn delete_tag(&self, id: i64) -> Result<bool>;
    fn count_tag_photos(&self, id: i64) -> Result<i64>;

    // Collection operations
    fn create_collection(&self, collection: &Collection) -> Result<()>;
    fn get_collection(&self, id: &str) -> Result<Option<Collection>>;
    fn get_collection_by_slug(&self, slug: &str) -> Result<Option<Collection>>;
    fn list_collections(
        &self,
        published_only: bool,
        page: PageRequest,
    ) -> Result<Page<CollectionWithCount>>;
    fn update_collection(&self, collection: &Collection) -> Result<()>;
    fn delete_collection(&self, id: &str) -> Result<bool>;
    /// Atomically adds one view; `None` if the collection does not exist.
    fn record_collection_view(&self, id: &str) -> Result<Option<i64>>;

    // Collection-Photo M2M operations
    fn upsert_membership(&self, membership: &Membership) -> Result<()>;
    fn remove_membership(&self, collection_id: &str, photo_id: &str) -> Result<bool>;
    fn list_memberships(&self, collection_id: &str) -> Result<Vec<Membership>>;
    /// Replaces the membership; `order_index` is each photo's position.
    fn set_collection_photos(&self, collection_id: &str, photo_ids: &[String]) -> Result<()>;
    /// Photos ordered by `order_index` ascending.
    fn list_collection_photos(&self, collection_id: &str) -> Result<Vec<Photo>>;

    // User operations
    fn create_user(&self, username: &str, password_hash: &str, role: &str) -> Result<User>;
    fn get_user(&self, id: i64) -> Result<Option<User>>;
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    fn list_users(&self) -> Result<Vec<User>>;
    fn has_admin_user(&self) -> Result<bool>;

    // Token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;

    fn gallery_stats(&self) -> Result<GalleryStats>;
}
