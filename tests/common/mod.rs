#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{Duration, Utc};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use solarhub::auth::{TokenGenerator, issue_token};
use solarhub::config::ServerConfig;
use solarhub::server::{AppState, create_router};
use solarhub::store::{SqliteStore, Store};
use solarhub::types::{Photo, ROLE_ADMIN};

pub const ADMIN_PASSWORD: &str = "correct-horse";
pub const MEDIA_BASE: &str = "http://cdn.test/media";

pub struct TestApp {
    pub temp_dir: TempDir,
    pub state: Arc<AppState>,
    pub router: Router,
    pub admin_token: String,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response is JSON")
    }
}

impl TestApp {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let config = ServerConfig {
            data_dir: temp_dir.path().to_path_buf(),
            public_base_url: Some(MEDIA_BASE.to_string()),
            ..ServerConfig::default()
        };
        std::fs::create_dir_all(config.objects_dir()).expect("create objects dir");

        let store = SqliteStore::new(config.db_path()).expect("open store");
        store.initialize().expect("initialize store");

        let hash = TokenGenerator::new()
            .hash(ADMIN_PASSWORD)
            .expect("hash password");
        let admin = store
            .create_user("admin", &hash, ROLE_ADMIN)
            .expect("create admin");
        let (_, admin_token) = issue_token(&store, admin.id, None).expect("issue token");

        let state = Arc::new(AppState::new(Arc::new(store), config));
        let router = create_router(state.clone());

        Self {
            temp_dir,
            state,
            router,
            admin_token,
        }
    }

    pub fn store(&self) -> &dyn Store {
        self.state.store.as_ref()
    }

    /// Inserts a photo whose `created_at` is `age_minutes` in the past.
    pub fn seed_photo(&self, public_id: &str, tags: &[&str], age_minutes: i64) -> Photo {
        let photo = Photo {
            id: Uuid::new_v4().to_string(),
            public_id: public_id.to_string(),
            title: format!("Photo {public_id}"),
            tags: tags.iter().map(ToString::to_string).collect(),
            object_key: format!("images/original/{public_id}.webp"),
            aspect_ratio: 1.5,
            download_count: 0,
            is_featured: "false".to_string(),
            created_at: Utc::now() - Duration::minutes(age_minutes),
        };
        self.store().create_photo(&photo).expect("create photo");
        photo
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body")
            .to_vec();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(request(Method::GET, uri, None, None)).await
    }

    pub async fn post(&self, uri: &str) -> TestResponse {
        self.send(request(Method::POST, uri, None, None)).await
    }

    pub async fn admin(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let auth = format!("Bearer {}", self.admin_token);
        self.send(request(method, uri, Some(&auth), body)).await
    }

    /// Posts a photo upload form; `file` is `(content_type, bytes)`.
    pub async fn upload(&self, fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> TestResponse {
        const BOUNDARY: &str = "solarhub-test-boundary";

        let mut body: Vec<u8> = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((content_type, data)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"upload\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/admin/photos/upload")
            .header(header::AUTHORIZATION, format!("Bearer {}", self.admin_token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("build upload request");
        self.send(request).await
    }

    pub async fn login(&self, username: &str, password: &str) -> TestResponse {
        let auth = format!("Basic {}", STANDARD.encode(format!("{username}:{password}")));
        self.send(request(
            Method::POST,
            "/api/v1/admin/login",
            Some(&auth),
            None,
        ))
        .await
    }
}

pub fn request(
    method: Method,
    uri: &str,
    authorization: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = authorization {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).expect("build request")
}
