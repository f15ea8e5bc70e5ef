//! Mock matching engine for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::matching::{HeuristicMatchingEngine, MatchRequest, MatchingEngine, MatchingError};
use crate::report::BlockReport;

/// Mock implementation of the MatchingEngine trait.
///
/// Scripted results are returned first, in order. After that the mock either
/// fails every call or answers with the [`HeuristicMatchingEngine`].
///
/// # Example
///
/// ```rust,ignore
/// use degreeaudit_core::testing::MockMatchingEngine;
///
/// let engine = MockMatchingEngine::new();
/// engine.push_result(Err(MatchingError::Call("overloaded".into()))).await;
///
/// // First call fails, the second falls through to the heuristic engine.
/// let requests = engine.recorded_requests().await;
/// ```
#[derive(Debug)]
pub struct MockMatchingEngine {
    scripted: Arc<RwLock<VecDeque<Result<BlockReport, MatchingError>>>>,
    requests: Arc<RwLock<Vec<MatchRequest>>>,
    calls: AtomicUsize,
    always_fail: bool,
    fallback: HeuristicMatchingEngine,
}

impl Default for MockMatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMatchingEngine {
    /// Mock that answers with the heuristic engine once scripts run out.
    pub fn new() -> Self {
        Self {
            scripted: Arc::new(RwLock::new(VecDeque::new())),
            requests: Arc::new(RwLock::new(Vec::new())),
            calls: AtomicUsize::new(0),
            always_fail: false,
            fallback: HeuristicMatchingEngine::new(),
        }
    }

    /// Mock whose unscripted calls all fail.
    pub fn always_failing() -> Self {
        Self {
            always_fail: true,
            ..Self::new()
        }
    }

    /// Queue the result of the next call.
    pub async fn push_result(&self, result: Result<BlockReport, MatchingError>) {
        self.scripted.write().await.push_back(result);
    }

    /// Every request received, in call order.
    pub async fn recorded_requests(&self) -> Vec<MatchRequest> {
        self.requests.read().await.clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MatchingEngine for MockMatchingEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn invoke(&self, request: &MatchRequest) -> Result<BlockReport, MatchingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.write().await.push(request.clone());

        if let Some(result) = self.scripted.write().await.pop_front() {
            return result;
        }

        if self.always_fail {
            return Err(MatchingError::Call("mock engine failure".to_string()));
        }
        self.fallback.invoke(request).await
    }
}
