use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Json, Router, routing::get};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use super::admin::admin_router;
use super::dto::WelcomeResponse;
use super::media::media_router;
use super::public::public_router;
use crate::config::ServerConfig;
use crate::format::MediaUrls;
use crate::storage::LocalObjectStore;
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub objects: LocalObjectStore,
    pub urls: MediaUrls,
    pub config: ServerConfig,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ServerConfig) -> Self {
        Self {
            store,
            objects: LocalObjectStore::new(&config.objects_dir()),
            urls: MediaUrls::new(config.media_base_url()),
            config,
        }
    }
}

async fn welcome() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Welcome to Solarpunk Hub API",
    })
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring invalid CORS origin '{origin}': {e}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/", get(welcome))
        .route("/health", get(health))
        .nest("/api/v1/admin", admin_router())
        .nest("/api/v1", public_router())
        .nest("/media", media_router())
        .layer(middleware::from_fn(log_request))
        .layer(cors)
        .with_state(state)
}
