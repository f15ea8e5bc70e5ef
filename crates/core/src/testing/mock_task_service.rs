//! Mock extraction task service for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::fetcher::{TaskRequest, TaskService, TaskServiceError, TaskState, TaskStatus};

/// The sequence of states one mock task reports, one per status query.
///
/// The last state repeats once the script runs out.
#[derive(Debug, Clone)]
pub struct TaskScript {
    states: Vec<TaskState>,
    answer: Option<String>,
}

impl TaskScript {
    /// `running` queries report `running`, then the task completes with `answer`.
    ///
    /// The first query is the verification step, so `completing_after(0, ..)`
    /// completes before any polling happens.
    pub fn completing_after(running: usize, answer: impl Into<String>) -> Self {
        let mut states = vec![TaskState::Running; running];
        states.push(TaskState::Completed);
        Self {
            states,
            answer: Some(answer.into()),
        }
    }

    /// Report exactly these states, with no answer.
    pub fn with_states(states: Vec<TaskState>) -> Self {
        Self {
            states,
            answer: None,
        }
    }

    fn status_at(&self, step: usize) -> TaskStatus {
        let state = self
            .states
            .get(step)
            .or_else(|| self.states.last())
            .cloned()
            .unwrap_or(TaskState::Failed);
        let answer = match state {
            TaskState::Completed => self.answer.clone(),
            _ => None,
        };
        TaskStatus { state, answer }
    }
}

#[derive(Debug)]
struct MockTask {
    script: TaskScript,
    queries: usize,
}

/// Mock implementation of the TaskService trait.
///
/// Each created task takes the next pushed [`TaskScript`]; when none are queued
/// the task fails on its first query.
///
/// # Example
///
/// ```rust,ignore
/// use degreeaudit_core::testing::{MockTaskService, TaskScript};
///
/// let service = MockTaskService::new();
/// service.push_script(TaskScript::completing_after(2, r#"{"name": ...}"#)).await;
///
/// let task_id = service.create_task(&request).await?;
/// assert_eq!(service.create_count(), 1);
/// ```
#[derive(Debug)]
pub struct MockTaskService {
    scripts: Arc<RwLock<VecDeque<TaskScript>>>,
    tasks: Arc<RwLock<HashMap<String, MockTask>>>,
    requests: Arc<RwLock<Vec<TaskRequest>>>,
    creates: AtomicUsize,
    fail_creation: AtomicBool,
}

impl Default for MockTaskService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTaskService {
    pub fn new() -> Self {
        Self {
            scripts: Arc::new(RwLock::new(VecDeque::new())),
            tasks: Arc::new(RwLock::new(HashMap::new())),
            requests: Arc::new(RwLock::new(Vec::new())),
            creates: AtomicUsize::new(0),
            fail_creation: AtomicBool::new(false),
        }
    }

    /// Queue the script for the next created task.
    pub async fn push_script(&self, script: TaskScript) {
        self.scripts.write().await.push_back(script);
    }

    /// Requests of every successfully created task.
    pub async fn recorded_requests(&self) -> Vec<TaskRequest> {
        self.requests.read().await.clone()
    }

    /// Number of create calls, including rejected ones.
    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    /// Make every create call fail with an HTTP 500.
    pub fn set_fail_creation(&self, fail: bool) {
        self.fail_creation.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TaskService for MockTaskService {
    fn name(&self) -> &str {
        "mock"
    }

    async fn create_task(&self, request: &TaskRequest) -> Result<String, TaskServiceError> {
        let n = self.creates.fetch_add(1, Ordering::SeqCst);

        if self.fail_creation.load(Ordering::SeqCst) {
            return Err(TaskServiceError::Http {
                status: 500,
                body: "mock creation failure".to_string(),
            });
        }

        let script = self
            .scripts
            .write()
            .await
            .pop_front()
            .unwrap_or_else(|| TaskScript::with_states(vec![TaskState::Failed]));

        let task_id = format!("mock-task-{}", n + 1);
        self.tasks.write().await.insert(
            task_id.clone(),
            MockTask { script, queries: 0 },
        );
        self.requests.write().await.push(request.clone());
        Ok(task_id)
    }

    async fn get_task(&self, task_id: &str) -> Result<TaskStatus, TaskServiceError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks.get_mut(task_id).ok_or_else(|| TaskServiceError::Http {
            status: 404,
            body: format!("unknown task {task_id}"),
        })?;

        let status = task.script.status_at(task.queries);
        task.queries += 1;
        Ok(status)
    }
}
