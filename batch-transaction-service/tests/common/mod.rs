//! Common test utilities for batch-transaction-service integration tests.
#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use axum::Router;
use batch_transaction_service::config::BatchConfig;
use batch_transaction_service::models::Role;
use batch_transaction_service::services::InMemoryTransactionStore;
use batch_transaction_service::startup::{build_router, AppState};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use service_core::config::Config as CommonConfig;
use std::collections::HashMap;
use std::sync::{Arc, Once};

pub const JWT_SECRET: &str = "integration-test-secret";
const BOUNDARY: &str = "batch-upload-boundary";

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,batch_transaction_service=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn test_config(extra: &[(&str, &str)]) -> BatchConfig {
    config_on(CommonConfig::default(), extra)
}

/// Configuration for a real listener on an ephemeral loopback port.
pub fn listening_config() -> BatchConfig {
    let common = CommonConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
    };
    config_on(common, &[])
}

fn config_on(common: CommonConfig, extra: &[(&str, &str)]) -> BatchConfig {
    let mut vars: HashMap<String, String> = HashMap::from([
        ("JWT_SECRET".to_string(), JWT_SECRET.to_string()),
        ("STORE_BACKEND".to_string(), "memory".to_string()),
    ]);
    for (key, value) in extra {
        vars.insert(key.to_string(), value.to_string());
    }

    BatchConfig::from_lookup(common, |key| vars.get(key).cloned())
        .expect("test configuration should be valid")
}

/// Router over a fresh in-memory store, plus the store for assertions.
pub fn spawn_app() -> (Router, Arc<InMemoryTransactionStore>) {
    spawn_app_with(&[])
}

pub fn spawn_app_with(extra: &[(&str, &str)]) -> (Router, Arc<InMemoryTransactionStore>) {
    init_tracing();

    let store = Arc::new(InMemoryTransactionStore::new());
    let state = AppState::new(test_config(extra), store.clone());
    (build_router(state), store)
}

pub fn token_for(user_id: &str, role: Role) -> String {
    let claims = serde_json::json!({
        "userid": user_id,
        "role": role.as_str(),
        "exp": (Utc::now() + Duration::hours(1)).timestamp(),
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to sign test token")
}

pub fn maker_token() -> String {
    token_for("maker-1", Role::Maker)
}

pub fn approver_token() -> String {
    token_for("approver-1", Role::Approver)
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn patch_status(uri: &str, token: &str, status: &str) -> Request<Body> {
    Request::builder()
        .method(Method::PATCH)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::json!({ "status": status }).to_string()))
        .unwrap()
}

/// Multipart upload to `/api/transactions/create`.
pub fn upload(token: &str, csv: &str, fields: &[(&str, &str)]) -> Request<Body> {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"batch.csv\"\r\n\
         Content-Type: text/csv\r\n\r\n{csv}\r\n"
    ));
    body.push_str(&format!("--{BOUNDARY}--\r\n"));

    Request::builder()
        .method(Method::POST)
        .uri("/api/transactions/create")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn standard_fields() -> Vec<(&'static str, &'static str)> {
    vec![
        ("total_amount", "300.5"),
        ("total_record", "2"),
        ("from_account", "999"),
    ]
}

pub const TWO_ROW_CSV: &str =
    "bank_dest,account_id_dest,account_name_dest,amount\nBCA,1001,Alice,100.50\nBNI,1002,Bob,200\n";

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
