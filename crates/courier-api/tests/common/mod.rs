//! Shared harness for router-level tests.

#![allow(dead_code)]

use std::{
    sync::Arc,
    time::{Duration, UNIX_EPOCH},
};

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use courier_api::{create_router, AppState};
use courier_core::TestClock;
use courier_testing::{MockEmailForwarder, MockQueuePublisher};
use serde_json::Value;
use tower::ServiceExt;

/// Seconds since the epoch the test clock starts at (2023-11-14T22:13:20Z).
pub const FIXED_EPOCH_SECS: u64 = 1_700_000_000;

/// Router wired to recording doubles and a fixed clock.
pub struct TestApp {
    pub forwarder: MockEmailForwarder,
    pub publisher: MockQueuePublisher,
    pub clock: TestClock,
    router: Router,
}

impl TestApp {
    /// Doubles that deliver and accept.
    pub fn new() -> Self {
        Self::with(MockEmailForwarder::delivering(), MockQueuePublisher::accepting())
    }

    pub fn with(forwarder: MockEmailForwarder, publisher: MockQueuePublisher) -> Self {
        let clock = TestClock::with_start_time(UNIX_EPOCH + Duration::from_secs(FIXED_EPOCH_SECS));
        let state = AppState::new(Arc::new(forwarder.clone()), Arc::new(publisher.clone()))
            .with_clock(Arc::new(clock.clone()));

        Self { forwarder, publisher, clock, router: create_router(state) }
    }

    /// Sends a JSON body and returns status plus parsed envelope.
    pub async fn post_json(&self, uri: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap();

        self.send(request).await
    }

    /// Sends a POST with no body and no content type.
    pub async fn post_empty(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().method("POST").uri(uri).body(Body::empty()).unwrap();

        self.send(request).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap();

        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response =
            self.router.clone().oneshot(request).await.expect("router should not fail");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("failed to read response body");
        let body = serde_json::from_slice(&bytes).expect("response should be valid JSON");

        (status, body)
    }
}
