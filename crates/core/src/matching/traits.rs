//! The matching engine seam.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::program::RequirementBlock;
use crate::report::BlockReport;
use crate::transcript::CandidateCourse;

/// Errors from one matching call.
#[derive(Debug, Clone, Error)]
pub enum MatchingError {
    #[error("Matching call failed: {0}")]
    Call(String),

    #[error("Matching call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed matching response: {0}")]
    MalformedResponse(String),

    #[error("Matching engine not configured: {0}")]
    NotConfigured(String),
}

/// The request document handed to a matching engine for one program.
#[derive(Debug, Clone, Serialize)]
pub struct MatchRequest {
    /// The full requirement tree of the program being audited.
    pub program_details: RequirementBlock,
    /// Usable courses no earlier report has claimed.
    pub transcript: Vec<CandidateCourse>,
    /// Reports already produced in this run, in order.
    pub reports: Vec<BlockReport>,
}

impl MatchRequest {
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Assigns transcript courses to one program's requirement blocks.
///
/// Each call is independent; the processor owns retries.
#[async_trait]
pub trait MatchingEngine: Send + Sync {
    /// Engine name for logging.
    fn name(&self) -> &str;

    async fn invoke(&self, request: &MatchRequest) -> Result<BlockReport, MatchingError>;
}
