//! Types for the audit orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fetcher::FetchError;
use crate::processor::ProcessorError;
use crate::report::BlockReport;

/// Errors that end an audit run.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The transcript names no program.
    #[error("no program titles to audit")]
    NoPrograms,

    /// The fetch batch could not run at all.
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Some programs could not be resolved to a requirement tree.
    #[error("programs unavailable: {}; {details}", .failed.join(", "))]
    ProgramsUnavailable { failed: Vec<String>, details: String },

    /// A program exhausted its matching attempts.
    #[error("audit of '{title}' failed: {source}")]
    Program {
        title: String,
        #[source]
        source: ProcessorError,
    },

    /// The orchestrator could not be built from configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result of a successful audit run: one report per program, in request order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditResponse {
    pub reports: Vec<BlockReport>,
}
