//! Fetch pipeline data types.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::program::{normalize_title, RequirementBlock};

use super::FetchError;

/// State reported by the extraction task service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Queued,
    Running,
    Active,
    Completed,
    Failed,
    Unknown(String),
}

impl TaskState {
    /// States from which a freshly created task may still produce a result.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            TaskState::Queued | TaskState::Running | TaskState::Active | TaskState::Completed
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            TaskState::Queued => "queued",
            TaskState::Running => "running",
            TaskState::Active => "active",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
            TaskState::Unknown(s) => s,
        }
    }
}

impl From<&str> for TaskState {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "queued" => TaskState::Queued,
            "running" => TaskState::Running,
            "active" => TaskState::Active,
            "completed" => TaskState::Completed,
            "failed" => TaskState::Failed,
            _ => TaskState::Unknown(s.to_string()),
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a task returned by a status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStatus {
    pub state: TaskState,
    /// Free-text answer, present once the task has completed.
    pub answer: Option<String>,
}

/// Request to create one extraction task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub program_title: String,
    pub source_url: String,
    pub prompt: String,
    pub step_limit: u32,
}

/// Result of resolving one title, including all of its retries.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub program_title: String,
    pub outcome: Result<RequirementBlock, FetchError>,
    pub attempts: u32,
    pub duration: Duration,
}

impl FetchResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// A successfully fetched program.
#[derive(Debug, Clone)]
pub struct FetchedProgram {
    pub title: String,
    pub tree: RequirementBlock,
    pub attempts: u32,
    pub duration: Duration,
}

/// A title that could not be fetched.
#[derive(Debug, Clone)]
pub struct FailedFetch {
    pub title: String,
    pub error: FetchError,
    pub attempts: u32,
}

/// Aggregate of a whole fetch batch, partitioned by result.
///
/// Entries appear in completion order.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub succeeded: Vec<FetchedProgram>,
    pub failed: Vec<FailedFetch>,
}

impl FetchOutcome {
    pub fn record(&mut self, result: FetchResult) {
        match result.outcome {
            Ok(tree) => self.succeeded.push(FetchedProgram {
                title: result.program_title,
                tree,
                attempts: result.attempts,
                duration: result.duration,
            }),
            Err(error) => self.failed.push(FailedFetch {
                title: result.program_title,
                error,
                attempts: result.attempts,
            }),
        }
    }

    /// Tree fetched for the requested title, matched the way sources match titles.
    pub fn tree_for(&self, title: &str) -> Option<&RequirementBlock> {
        let wanted = normalize_title(title);
        self.succeeded
            .iter()
            .find(|p| normalize_title(&p.title) == wanted)
            .map(|p| &p.tree)
    }

    pub fn failed_titles(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.title.as_str()).collect()
    }

    /// Whether the title reached a terminal state, successful or not.
    pub fn contains(&self, title: &str) -> bool {
        let wanted = normalize_title(title);
        self.succeeded
            .iter()
            .any(|p| normalize_title(&p.title) == wanted)
            || self
                .failed
                .iter()
                .any(|f| normalize_title(&f.title) == wanted)
    }

    pub fn len(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Invoked exactly once per batch, after every title is terminal.
pub type FetchCompleteCallback = Arc<dyn Fn(&FetchOutcome) + Send + Sync>;
