//! Processor implementation.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::matching::{MatchRequest, MatchingEngine, MatchingError};
use crate::program::RequirementBlock;
use crate::report::{validate_report, BlockReport, ReportValidationError};
use crate::transcript::Transcript;

use super::types::{AuditLedger, ProcessorState};

/// Error type for processor operations.
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    /// The engine call itself failed.
    #[error("Matching call failed: {0}")]
    MatchingCall(#[from] MatchingError),

    /// The engine answered with a report that does not fit the program.
    #[error("Report failed validation: {0}")]
    SchemaValidation(#[from] ReportValidationError),

    /// Every attempt failed.
    #[error("Program '{program}' failed after {attempts} attempt(s): {last_error}")]
    Exhausted {
        program: String,
        attempts: u32,
        last_error: String,
    },

    /// `process` was called on a processor that already ran.
    #[error("Processor is {0}, expected idle")]
    NotIdle(ProcessorState),
}

/// Runs one program through the matching engine.
pub struct ProgramProcessor {
    engine: Arc<dyn MatchingEngine>,
    max_retries: u32,
    state: ProcessorState,
    attempts: u32,
}

impl ProgramProcessor {
    /// `max_retries` is the total number of matching calls allowed; at least one
    /// call is always made.
    pub fn new(engine: Arc<dyn MatchingEngine>, max_retries: u32) -> Self {
        Self {
            engine,
            max_retries: max_retries.max(1),
            state: ProcessorState::Idle,
            attempts: 0,
        }
    }

    pub fn state(&self) -> ProcessorState {
        self.state
    }

    /// Matching calls made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Produce the report for `program` and record it in `ledger`.
    ///
    /// On failure the ledger is left untouched.
    pub async fn process(
        &mut self,
        program: &RequirementBlock,
        transcript: &Transcript,
        ledger: &mut AuditLedger,
    ) -> Result<BlockReport, ProcessorError> {
        if self.state != ProcessorState::Idle {
            return Err(ProcessorError::NotIdle(self.state));
        }
        self.state = ProcessorState::Active;

        let title = program.name();
        let started = Instant::now();
        let mut last_error = None;

        while self.attempts < self.max_retries {
            self.attempts += 1;
            let attempt = self.attempts;

            match self.attempt(program, transcript, ledger).await {
                Ok(report) => {
                    let claimed = ledger.record(title, report.clone());
                    self.state = ProcessorState::Completed;
                    info!(
                        program = %title,
                        attempts = attempt,
                        status = ?report.status,
                        courses_claimed = claimed,
                        duration_ms = started.elapsed().as_millis() as u64,
                        "Program processed"
                    );
                    return Ok(report);
                }
                Err(e) => {
                    warn!(
                        program = %title,
                        attempt,
                        max_retries = self.max_retries,
                        engine = self.engine.name(),
                        error = %e,
                        "Matching attempt failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        self.state = ProcessorState::Failed;
        let last_error = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempt made".to_string());
        error!(
            program = %title,
            attempts = self.attempts,
            error = %last_error,
            "Program processing failed"
        );
        Err(ProcessorError::Exhausted {
            program: title.to_string(),
            attempts: self.attempts,
            last_error,
        })
    }

    async fn attempt(
        &self,
        program: &RequirementBlock,
        transcript: &Transcript,
        ledger: &AuditLedger,
    ) -> Result<BlockReport, ProcessorError> {
        let request = MatchRequest {
            program_details: program.clone(),
            transcript: transcript.candidates(ledger.claimed()),
            reports: ledger.reports().to_vec(),
        };
        debug!(
            program = %program.name(),
            candidates = request.transcript.len(),
            prior_reports = request.reports.len(),
            "Invoking matching engine"
        );

        let report = self.engine.invoke(&request).await?;
        validate_report(&report, program, &request.transcript)?;
        Ok(report)
    }
}
