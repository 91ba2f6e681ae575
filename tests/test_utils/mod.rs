//! Test utilities for the hotel API integration suites.
//!
//! Builds the full router over an in-memory SQLite database with all
//! migrations applied and an in-memory image store, plus helpers for
//! creating staff accounts and driving JSON and multipart requests.

#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use hotel::{
    config::AppConfig,
    crypto::hash_password,
    models::user::{Model as UserModel, Role},
    repositories::{UserRepository, user::NewUser},
    server::{AppState, create_app},
    storage::MemoryImageStore,
};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::{Value, json};
use tower::ServiceExt;

pub const TEST_JWT_SECRET: &str = "integration-test-secret-at-least-32-bytes";
pub const PASSWORD: &str = "front-desk-pass";

/// Sets up an in-memory SQLite database with all migrations applied.
///
/// The pool holds a single connection; a second one would open a
/// different, empty in-memory database.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

pub fn test_config() -> AppConfig {
    AppConfig {
        profile: "test".to_string(),
        jwt_secret: Some(TEST_JWT_SECRET.to_string()),
        password_hash_cost: 4,
        ..Default::default()
    }
}

/// The router plus handles on its state for assertions.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub images: Arc<MemoryImageStore>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_upload_limit(1024 * 1024).await
    }

    /// Images larger than `max_bytes` are refused by the store.
    pub async fn with_upload_limit(max_bytes: usize) -> Self {
        let db = setup_test_db().await.expect("test database");
        let images = Arc::new(MemoryImageStore::new(max_bytes));
        let state = AppState::new(Arc::new(test_config()), db, images.clone())
            .expect("test app state");
        Self {
            router: create_app(state.clone()),
            state,
            images,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.state.db
    }

    pub async fn create_user(&self, username: &str, role: Role, discount_limit: i32) -> UserModel {
        let password_hash = hash_password(PASSWORD, 4).await.expect("hash");
        UserRepository::new(self.db())
            .create(
                NewUser {
                    username: username.to_string(),
                    password_hash,
                    full_name: None,
                    role,
                    discount_limit_percent: discount_limit,
                },
                None,
            )
            .await
            .expect("create user")
    }

    /// Logs in through the API and returns the whole login body.
    pub async fn login_body(&self, username: &str) -> Value {
        let (status, body) = self
            .json(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "username": username, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body
    }

    /// Logs in through the API and returns the access token.
    pub async fn login(&self, username: &str) -> String {
        self.login_body(username).await["access_token"]
            .as_str()
            .expect("access_token")
            .to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.create_user("admin", Role::Admin, 100).await;
        self.login("admin").await
    }

    pub async fn receptionist_token(&self, discount_limit: i32) -> String {
        self.create_user("frontdesk", Role::Receptionist, discount_limit)
            .await;
        self.login("frontdesk").await
    }

    /// Sends a JSON request and returns the status and parsed body
    /// (`Value::Null` for empty bodies).
    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.json(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.json(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.json(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.json(Method::DELETE, uri, Some(token), None).await
    }

    /// Sends a multipart form. Each part is `(field, Some((file_name,
    /// content_type)), value)`, or `(field, None, value)` for text fields.
    pub async fn multipart(
        &self,
        uri: &str,
        token: &str,
        parts: &[(&str, Option<(&str, &str)>, &[u8])],
    ) -> (StatusCode, Value) {
        const BOUNDARY: &str = "hotel-test-boundary";
        let mut body = Vec::new();
        for (name, file, value) in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            let disposition = match file {
                Some((file_name, content_type)) => format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                ),
                None => format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"),
            };
            body.extend_from_slice(disposition.as_bytes());
            body.extend_from_slice(value);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    pub async fn create_rate(&self, token: &str, room_type: &str, price_cents: i64) -> Value {
        let (status, body) = self
            .post(
                "/admin/rates",
                token,
                json!({ "room_type": room_type, "price_cents": price_cents }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create rate: {body}");
        body
    }

    pub async fn create_room(&self, token: &str, number: &str, rate_id: &Value) -> Value {
        let (status, body) = self
            .post(
                "/admin/rooms",
                token,
                json!({ "number": number, "floor": 1, "capacity": 2, "rate_id": rate_id }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create room: {body}");
        body
    }

    pub async fn create_customer(&self, token: &str, first_name: &str) -> Value {
        let (status, body) = self
            .post(
                "/admin/customers",
                token,
                json!({
                    "first_name": first_name,
                    "last_name": "Guest",
                    "phone": "+44 20 7946 0000",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create customer: {body}");
        body
    }

    pub async fn book(
        &self,
        token: &str,
        customer_id: &Value,
        room_id: &Value,
        check_in: &str,
        check_out: &str,
    ) -> (StatusCode, Value) {
        self.post(
            "/admin/reservations",
            token,
            json!({
                "customer_id": customer_id,
                "room_id": room_id,
                "check_in": check_in,
                "check_out": check_out,
                "guests": 1,
            }),
        )
        .await
    }
}
