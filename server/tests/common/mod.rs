//! Shared fixtures for the HTTP tests: the real router over in-memory
//! repositories, a fixed clock and a temporary upload directory.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use rentcar_auth::{AuthConfig, InMemoryBlocklist};
use rentcar_server::auth::setup::ensure_admin;
use rentcar_server::config::{BootstrapAdmin, ServerConfig, StorageConfig};
use rentcar_server::images::LocalImageStore;
use rentcar_server::{build_router, AppState, Repositories};
use rentcar_testing::{FixedClock, InMemoryDatabase};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "admin@rentcar.test";
pub const ADMIN_PASSWORD: &str = "admin-password";
const BOUNDARY: &str = "rentcar-test-boundary";

/// A file part of a multipart body.
pub struct FilePart<'a> {
    pub field: &'a str,
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub bytes: &'a [u8],
}

impl<'a> FilePart<'a> {
    pub const fn png(field: &'a str) -> Self {
        Self {
            field,
            file_name: "photo.png",
            content_type: "image/png",
            bytes: b"\x89PNG\r\n\x1a\nfake",
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub db: InMemoryDatabase,
    pub uploads: TempDir,
}

impl TestApp {
    /// App whose clock is stopped at midnight on 2025-01-01.
    pub async fn new() -> Self {
        Self::on(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()).await
    }

    pub async fn on(today: NaiveDate) -> Self {
        Self::configured(today, |state| state).await
    }

    /// App whose state is adjusted by `configure` before routing.
    pub async fn configured(today: NaiveDate, configure: impl FnOnce(AppState) -> AppState) -> Self {
        let clock = FixedClock::on_date(today);
        let db = InMemoryDatabase::with_clock(clock.clone());
        let uploads = tempfile::tempdir().unwrap();

        let auth = AuthConfig::new(b"test-secret-test-secret-test-secret".to_vec())
            .with_token_ttl(Duration::from_secs(900))
            .with_hash_iterations(1_000);
        let state = AppState::new(
            Repositories::from_shared(Arc::new(db.clone())),
            &auth,
            Arc::new(InMemoryBlocklist::new()),
            Arc::new(LocalImageStore::new(uploads.path(), "/uploads")),
            Arc::new(clock),
        );

        let admin = BootstrapAdmin {
            email: ADMIN_EMAIL.to_string(),
            password: ADMIN_PASSWORD.to_string(),
            name: "Admin".to_string(),
        };
        ensure_admin(state.users.as_ref(), state.hasher, &admin).await.unwrap();

        let server = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            shutdown_timeout: 1,
            cors_origins: Vec::new(),
            body_limit: 1024 * 1024,
            metrics_enabled: false,
            metrics_host: "127.0.0.1".to_string(),
            metrics_port: 0,
        };
        let storage = StorageConfig {
            upload_dir: uploads.path().to_path_buf(),
            public_path: "/uploads".to_string(),
        };

        Self {
            router: build_router(configure(state), &server, &storage),
            db,
            uploads,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    pub async fn json(&self, method: Method, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let request = builder(method, uri, token)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(builder(Method::GET, uri, token).body(Body::empty()).unwrap()).await
    }

    pub async fn put_empty(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(builder(Method::PUT, uri, token).body(Body::empty()).unwrap()).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(builder(Method::DELETE, uri, token).body(Body::empty()).unwrap()).await
    }

    pub async fn multipart(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        fields: &[(&str, &str)],
        files: &[FilePart<'_>],
    ) -> (StatusCode, Value) {
        let request = builder(method, uri, token)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(fields, files)))
            .unwrap();
        self.send(request).await
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .json(Method::POST, "/login", None, json!({"email": email, "password": password}))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["access_token"].as_str().unwrap().to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    /// Register a customer and log them in.
    pub async fn customer_token(&self, email: &str, phone: &str) -> String {
        let (status, body) = self
            .json(
                Method::POST,
                "/register",
                None,
                json!({
                    "name": "Ayu Lestari",
                    "email": email,
                    "password": "customer-password",
                    "address": "Jl. Merdeka 1, Bandung",
                    "phone_number": phone
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        self.login(email, "customer-password").await
    }

    /// Create the (brand, type) category and a car in it. Returns the car.
    pub async fn seed_car(&self, admin: &str, name: &str, plate: &str, registration: &str, price: &str) -> Value {
        let (status, _) = self
            .json(
                Method::POST,
                "/car-categories",
                Some(admin),
                json!({"car_brand": "Toyota", "type": "MPV"}),
            )
            .await;
        assert!(status == StatusCode::CREATED || status == StatusCode::CONFLICT);

        let (status, body) = self
            .multipart(
                Method::POST,
                "/cars",
                Some(admin),
                &[
                    ("car_brand", "Toyota"),
                    ("type", "MPV"),
                    ("name", name),
                    ("transmission", "AT"),
                    ("fuel", "Petrol"),
                    ("color", "Silver"),
                    ("plate_number", plate),
                    ("capacity", "7"),
                    ("registration_number", registration),
                    ("price", price),
                ],
                &[FilePart::png("image")],
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"].clone()
    }

    pub async fn seed_driver(&self, admin: &str, name: &str, phone: &str, license: &str) -> Value {
        let (status, body) = self
            .json(
                Method::POST,
                "/drivers",
                Some(admin),
                json!({
                    "name": name,
                    "gender": "Male",
                    "dob": "1985-06-15",
                    "address": "Jl. Braga 10, Bandung",
                    "phone_number": phone,
                    "license_number": license
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"].clone()
    }

    /// Whether an image URL under `/uploads` has its file on disk.
    pub fn image_exists(&self, url: &str) -> bool {
        url.strip_prefix("/uploads/")
            .is_some_and(|name| self.uploads.path().join(name).is_file())
    }

    /// Number of files in the upload directory.
    pub fn stored_images(&self) -> usize {
        std::fs::read_dir(self.uploads.path()).map_or(0, Iterator::count)
    }
}

fn builder(method: Method, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}

fn multipart_body(fields: &[(&str, &str)], files: &[FilePart<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes(),
        );
    }
    for file in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                file.field, file.file_name, file.content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(file.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}
