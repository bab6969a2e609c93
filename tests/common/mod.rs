//! Common test utilities

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use order_backend::{build_router, db, AppState, Config};
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::util::ServiceExt;

pub const SECRET: &str = "integration-test-secret-0123456789abcdef";

/// Skip the current test when no database is configured
#[allow(unused_macros)]
macro_rules! require_database {
    () => {
        match common::setup_test_db().await {
            Some(pool) => pool,
            None => {
                eprintln!("Skipping test: DATABASE_URL not set");
                return;
            }
        }
    };
}

pub fn config() -> Config {
    Config::development(SECRET)
}

/// Router over a fresh in-memory store
pub fn memory_app() -> Router {
    let config = config();
    let state = AppState::memory(&config).expect("Failed to build state");
    build_router(state, &config)
}

/// Connect, migrate and truncate. `None` when `DATABASE_URL` is unset.
pub async fn setup_test_db() -> Option<PgPool> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").ok()?;

    let pool = db::connect(&database_url, 5, std::time::Duration::from_secs(5))
        .await
        .expect("Failed to connect to DB");
    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    sqlx::query("TRUNCATE TABLE orders_content, orders, products, users CASCADE")
        .execute(&pool)
        .await
        .expect("Failed to clean up DB");

    Some(pool)
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, json)
}

/// Sign up a user and return its access and refresh tokens
pub async fn signup(app: &Router, email: &str) -> (String, String) {
    let (status, body) = send(
        app,
        "POST",
        "/signup",
        None,
        Some(json!({
            "firstname": "Test",
            "lastname": "User",
            "email": email,
            "password": "password123",
            "repeat_password": "password123",
            "age": 30,
            "is_married": false
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "signup failed: {body}");

    (
        body["access_token"].as_str().unwrap().to_string(),
        body["refresh_token"].as_str().unwrap().to_string(),
    )
}

/// Create a product and return its id
pub async fn create_product(app: &Router, token: &str, price: i64, quantity: i64) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/products",
        Some(token),
        Some(json!({
            "price": price,
            "quantity": quantity,
            "description": "test product",
            "tags": ["test"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "product creation failed: {body}");
    body["id"].as_str().unwrap().to_string()
}

pub async fn create_order(app: &Router, token: &str) -> String {
    let (status, body) = send(app, "POST", "/orders", Some(token), None).await;
    assert_eq!(status, StatusCode::CREATED, "order creation failed: {body}");
    body["id"].as_str().unwrap().to_string()
}
