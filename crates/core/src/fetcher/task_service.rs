//! Client for the remote extraction task service.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::config::TaskServiceConfig;
use super::types::{TaskRequest, TaskState, TaskStatus};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskServiceError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("No taskId in response")]
    MissingTaskId,

    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

impl From<reqwest::Error> for TaskServiceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TaskServiceError::Timeout
        } else if e.is_connect() {
            TaskServiceError::ConnectionFailed(e.to_string())
        } else if e.is_decode() {
            TaskServiceError::InvalidResponse(e.to_string())
        } else {
            TaskServiceError::ConnectionFailed(e.to_string())
        }
    }
}

/// Long-running extraction tasks: create one, then query it until it finishes.
#[async_trait]
pub trait TaskService: Send + Sync {
    /// Name of this service for logging.
    fn name(&self) -> &str;

    /// Submit a task and return its identifier.
    async fn create_task(&self, request: &TaskRequest) -> Result<String, TaskServiceError>;

    /// Query the current state of a task.
    async fn get_task(&self, task_id: &str) -> Result<TaskStatus, TaskServiceError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateTaskBody<'a> {
    agent: &'a str,
    prompt: &'a str,
    mode: &'static str,
    step_limit: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTaskResponse {
    #[serde(default)]
    task_id: Option<String>,
}

#[derive(Deserialize)]
struct TaskResponse {
    #[serde(default)]
    state: String,
    #[serde(default)]
    result: Option<TaskResult>,
}

#[derive(Deserialize)]
struct TaskResult {
    #[serde(default)]
    answer: Option<String>,
}

/// HTTP implementation of [`TaskService`].
pub struct HttpTaskService {
    client: Client,
    config: TaskServiceConfig,
}

impl HttpTaskService {
    pub fn new(config: TaskServiceConfig) -> Result<Self, TaskServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs as u64))
            .build()
            .map_err(|e| TaskServiceError::Client(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, TaskServiceError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(TaskServiceError::Http {
            status,
            body: body.chars().take(200).collect(),
        })
    }
}

#[async_trait]
impl TaskService for HttpTaskService {
    fn name(&self) -> &str {
        "http"
    }

    async fn create_task(&self, request: &TaskRequest) -> Result<String, TaskServiceError> {
        let body = CreateTaskBody {
            agent: &self.config.agent,
            prompt: &request.prompt,
            mode: "text",
            step_limit: request.step_limit,
        };

        debug!(program = %request.program_title, "Creating extraction task");

        let response = self
            .client
            .post(self.url("/v1/task/create"))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let created: CreateTaskResponse = Self::check(response).await?.json().await?;
        created
            .task_id
            .filter(|id| !id.is_empty())
            .ok_or(TaskServiceError::MissingTaskId)
    }

    async fn get_task(&self, task_id: &str) -> Result<TaskStatus, TaskServiceError> {
        let path = format!("/v1/task/{}", urlencoding::encode(task_id));
        let response = self
            .client
            .get(self.url(&path))
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;

        let task: TaskResponse = Self::check(response).await?.json().await?;
        Ok(TaskStatus {
            state: TaskState::from(task.state.as_str()),
            answer: task.result.and_then(|r| r.answer),
        })
    }
}
