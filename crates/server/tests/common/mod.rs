//! Common test utilities for in-process API testing.
//!
//! This module provides a test fixture that builds the router around an
//! orchestrator with mock dependencies injected, so no network access is
//! needed.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use degreeaudit_core::{
    testing::MockMatchingEngine, AuditOrchestrator, CatalogSource, Config, FetchPipeline,
    MatchingEngine, ServerConfig,
};

/// Re-export fixtures for test convenience
pub use degreeaudit_core::testing::fixtures;

/// Test fixture for API testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_audit() {
///     let fixture = TestFixture::new();
///
///     let response = fixture.post("/api/v1/audit", json!({
///         "program_titles": ["History Minor"],
///         "courses": []
///     })).await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock matching engine - script results, inspect requests
    pub engine: Arc<MockMatchingEngine>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Fixture whose engine falls back to heuristic matching.
    pub fn new() -> Self {
        Self::with_engine(MockMatchingEngine::new())
    }

    /// Fixture around a specific mock engine.
    pub fn with_engine(engine: MockMatchingEngine) -> Self {
        let engine = Arc::new(engine);

        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            ..Default::default()
        };

        let source = Arc::new(CatalogSource::new(Arc::new(fixtures::catalog())));
        let pipeline = FetchPipeline::new(source, &config.fetch);
        let orchestrator = AuditOrchestrator::new(
            pipeline,
            Arc::clone(&engine) as Arc<dyn MatchingEngine>,
            config.matching.max_retries,
        );

        let state = Arc::new(degreeaudit_server::state::AppState::new(config, orchestrator));
        let router = degreeaudit_server::api::create_router(state);

        Self { router, engine }
    }

    /// Send a GET request.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}
