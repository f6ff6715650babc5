mod collections;
mod dashboard;
mod login;
mod photos;
mod tags;
mod users;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post, put},
};

use crate::server::AppState;

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login::login))
        .route("/dashboard", get(dashboard::dashboard))
        // Photo routes
        .route("/photos", get(photos::list_photos))
        .route("/photos", post(photos::create_photo))
        .route(
            "/photos/upload",
            post(photos::upload_photo).layer(DefaultBodyLimit::max(photos::MAX_UPLOAD_SIZE)),
        )
        .route("/photos/{id}", get(photos::get_photo))
        .route("/photos/{id}", patch(photos::update_photo))
        // Tag routes
        .route("/tags", get(tags::list_tags))
        .route("/tags", post(tags::create_tag))
        .route("/tags/{id}", get(tags::get_tag))
        .route("/tags/{id}", patch(tags::update_tag))
        .route("/tags/{id}", delete(tags::delete_tag))
        // Collection routes
        .route("/collections", get(collections::list_collections))
        .route("/collections", post(collections::create_collection))
        .route("/collections/{id}", get(collections::get_collection))
        .route("/collections/{id}", patch(collections::update_collection))
        .route("/collections/{id}", delete(collections::delete_collection))
        // Collection membership (ordered many-to-many)
        .route(
            "/collections/{id}/photos",
            get(collections::list_collection_photos),
        )
        .route(
            "/collections/{id}/photos",
            put(collections::set_collection_photos),
        )
        .route(
            "/collections/{id}/photos",
            post(collections::add_collection_photo),
        )
        .route(
            "/collections/{id}/photos/{photo_id}",
            delete(collections::remove_collection_photo),
        )
        // User routes
        .route("/users", get(users::list_users))
        .route("/users", post(users::create_user))
        .route("/users/{id}", get(users::get_user))
        .route("/users/{id}", delete(users::delete_user))
}
