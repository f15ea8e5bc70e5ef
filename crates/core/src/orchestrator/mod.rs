//! Audit orchestrator.
//!
//! Drives one audit run end to end:
//! - **Fetch**: concurrent, one worker per program title (bounded)
//! - **Match**: sequential, one program at a time, each seeing every earlier report

mod runner;
mod types;

pub use runner::AuditOrchestrator;
pub use types::{AuditError, AuditResponse};
