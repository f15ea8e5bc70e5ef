//! Program processor: one program, one matching call at a time.
//!
//! A [`ProgramProcessor`] moves through
//!
//! ```text
//! IDLE -> ACTIVE -> COMPLETED | FAILED
//! ```
//!
//! Each attempt builds a fresh request from the program tree, the transcript
//! courses the [`AuditLedger`] has not claimed yet, and every earlier report.
//! A report only reaches the ledger after it passes validation.

mod program;
mod types;

pub use program::{ProcessorError, ProgramProcessor};
pub use types::{AuditLedger, ProcessorState};
