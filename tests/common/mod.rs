//! Shared fixtures: an in-memory SQLite store, a temp upload dir and helpers
//! for driving the router.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, Response, header},
    Router,
};
use garden_booking::{
    auth::{hash_password, issue_session},
    build_router,
    models::{AppState, NewAppointment, NewUser},
    store::{SqliteStore, Store},
    uploads::UploadDir,
};
use chrono::{NaiveDate, NaiveTime};
use serde_json::Value;
use tower::ServiceExt; // for `oneshot`

pub struct TestApp {
    pub store: Arc<SqliteStore>,
    pub state: AppState,
    pub upload_dir: tempfile::TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let store = Arc::new(SqliteStore::connect("sqlite::memory:").await.unwrap());
        store.migrate().await.unwrap();

        let upload_dir = tempfile::tempdir().unwrap();
        let state = AppState {
            store: store.clone(),
            uploads: UploadDir::new(upload_dir.path()),
            session_ttl_hours: 24,
        };

        Self {
            store,
            state,
            upload_dir,
        }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.router().oneshot(req).await.unwrap()
    }

    /// Insert a user directly and return `(id, bearer token)`.
    pub async fn user(&self, username: &str, is_admin: bool) -> (i32, String) {
        let id = self
            .store
            .create_user(&NewUser {
                username: username.to_string(),
                password_hash: hash_password("secret123").unwrap(),
                email: format!("{username}@example.com"),
                phone: "5551234567".into(),
                full_name: format!("{username} Full"),
                address: None,
                is_admin,
            })
            .await
            .unwrap();
        let token = issue_session(self.store.as_ref(), id, 24).await.unwrap();
        (id, token)
    }

    pub async fn appointment(
        &self,
        user_id: i32,
        date: &str,
        time: &str,
        services: &[&str],
        images: &[&str],
    ) -> i32 {
        self.store
            .create_appointment(&NewAppointment {
                user_id,
                appointment_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
                appointment_time: NaiveTime::parse_from_str(time, "%H:%M").unwrap(),
                notes: None,
                services: services.iter().map(|s| s.to_string()).collect(),
                images: images.iter().map(|s| s.to_string()).collect(),
            })
            .await
            .unwrap()
    }

    pub async fn count(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(self.store.pool())
            .await
            .unwrap()
    }
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut b = Request::builder().method("GET").uri(uri);
    if let Some(t) = token {
        b = b.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    b.body(Body::empty()).unwrap()
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut b = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(t) = token {
        b = b.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    b.body(Body::from(body.to_string())).unwrap()
}

pub fn delete(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

pub const BOUNDARY: &str = "----gardenboundary7MA4YWxkTrZu0gW";

/// Hand-built multipart/form-data body.
pub fn multipart_body(fields: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (file_name, content_type, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"images\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_request(uri: &str, token: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn body_json(resp: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn files_in(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}
