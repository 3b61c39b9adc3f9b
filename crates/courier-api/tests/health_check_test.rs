//! Health check endpoint tests.
//!
//! Tests `GET /api/health` against a fixed clock, plus the middleware that
//! every route shares.

mod common;

use std::{sync::Arc, time::Duration};

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::TestApp;
use courier_api::{create_router, AppState};
use courier_testing::{MockEmailForwarder, MockQueuePublisher};
use tower::ServiceExt;

/// Health check reports the service as running.
#[tokio::test]
async fn health_check_reports_running() {
    let app = TestApp::new();

    let (status, body) = app.get("/api/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "API Service is running");
    assert_eq!(body["data"]["version"], env!("CARGO_PKG_VERSION"));
}

/// Timestamp comes from the injected clock.
#[tokio::test]
async fn health_check_uses_injected_clock() {
    let app = TestApp::new();

    let (_, body) = app.get("/api/health").await;
    assert_eq!(body["data"]["timestamp"], "2023-11-14T22:13:20Z");

    app.clock.advance(Duration::from_secs(60));

    let (_, body) = app.get("/api/health").await;
    assert_eq!(body["data"]["timestamp"], "2023-11-14T22:14:20Z");
}

/// Health check does not touch downstream collaborators.
#[tokio::test]
async fn health_check_has_no_dependencies() {
    let app = TestApp::with(MockEmailForwarder::panicking(), MockQueuePublisher::panicking());

    let (status, _) = app.get("/api/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.forwarder.call_count().await, 0);
    assert_eq!(app.publisher.publish_count().await, 0);
}

/// Every response carries a generated request id.
#[tokio::test]
async fn responses_carry_request_id() {
    let state = AppState::new(
        Arc::new(MockEmailForwarder::delivering()),
        Arc::new(MockQueuePublisher::accepting()),
    );
    let app = create_router(state);

    let request = Request::builder().uri("/api/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.expect("failed to make request");

    let request_id = response
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .expect("response should carry X-Request-Id");
    assert!(uuid_like(request_id), "unexpected request id: {request_id}");
}

/// Unknown routes are not served.
#[tokio::test]
async fn unknown_route_returns_not_found() {
    let state = AppState::new(
        Arc::new(MockEmailForwarder::delivering()),
        Arc::new(MockQueuePublisher::accepting()),
    );
    let app = create_router(state);

    let request = Request::builder().uri("/api/unknown").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

fn uuid_like(value: &str) -> bool {
    value.len() == 36 && value.chars().filter(|c| *c == '-').count() == 4
}
