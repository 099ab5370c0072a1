//! HTTP test harness: the full router over an in-memory engine, driven with
//! `tower::ServiceExt::oneshot` so no server or database is needed.

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use habita_api::config::ServerConfig;
use habita_api::routes;
use habita_api::state::AppState;
use habita_notify::delivery::InAppSender;
use habita_notify::memory::{MemoryPreferenceStore, MemoryStore};
use habita_notify::NotificationEngine;

/// Router plus the engine behind it (for driving the dispatcher directly).
pub fn test_app() -> (Router, Arc<NotificationEngine>) {
    let engine = Arc::new(
        NotificationEngine::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryPreferenceStore::new()),
        )
        .with_sender(Arc::new(InAppSender)),
    );

    let state = AppState {
        engine: Arc::clone(&engine),
        config: Arc::new(ServerConfig::default()),
        pool: None,
    };

    let app = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .with_state(state);

    (app, engine)
}

/// Fire one request and decode the JSON body (Null for empty bodies).
pub async fn request(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("Failed to build request");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("Request did not complete");

    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Body was not valid JSON")
    };
    (status, json)
}
