//! Types for the processor module.

use serde::Serialize;
use std::fmt;

use crate::report::BlockReport;
use crate::transcript::ClaimedCourses;

/// Lifecycle of a [`ProgramProcessor`](super::ProgramProcessor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorState {
    Idle,
    Active,
    Completed,
    Failed,
}

impl ProcessorState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessorState::Completed | ProcessorState::Failed)
    }
}

impl fmt::Display for ProcessorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessorState::Idle => "idle",
            ProcessorState::Active => "active",
            ProcessorState::Completed => "completed",
            ProcessorState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Everything one audit run has produced so far: the ordered reports and the
/// courses they claimed.
///
/// Owned by the orchestrator and lent to one processor at a time.
#[derive(Debug, Clone, Default)]
pub struct AuditLedger {
    reports: Vec<BlockReport>,
    claimed: ClaimedCourses,
}

impl AuditLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a report and claim its courses for `program_title`.
    ///
    /// Returns the number of newly claimed courses.
    pub fn record(&mut self, program_title: &str, report: BlockReport) -> usize {
        let claimed = self.claimed.record_report(program_title, &report);
        self.reports.push(report);
        claimed
    }

    pub fn reports(&self) -> &[BlockReport] {
        &self.reports
    }

    pub fn claimed(&self) -> &ClaimedCourses {
        &self.claimed
    }

    pub fn into_reports(self) -> Vec<BlockReport> {
        self.reports
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}
