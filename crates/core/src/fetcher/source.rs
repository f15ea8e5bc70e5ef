//! Program sources: one attempt at turning a title into a requirement tree.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::program::{normalize_title, ProgramCatalog, RequirementBlock};

use super::task_service::TaskService;
use super::types::{TaskRequest, TaskState, TaskStatus};
use super::{FetchConfig, FetchError};

/// Resolves a program title to its requirement tree.
///
/// Each call is a single attempt; retries belong to the pipeline.
#[async_trait]
pub trait ProgramSource: Send + Sync {
    /// Name of this source for logging.
    fn name(&self) -> &str;

    /// Titles this source can resolve.
    fn titles(&self) -> Vec<String>;

    async fn fetch(&self, title: &str) -> Result<RequirementBlock, FetchError>;
}

/// Offline source backed by a [`ProgramCatalog`].
pub struct CatalogSource {
    catalog: Arc<dyn ProgramCatalog>,
}

impl CatalogSource {
    pub fn new(catalog: Arc<dyn ProgramCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl ProgramSource for CatalogSource {
    fn name(&self) -> &str {
        "catalog"
    }

    fn titles(&self) -> Vec<String> {
        self.catalog.titles()
    }

    async fn fetch(&self, title: &str) -> Result<RequirementBlock, FetchError> {
        self.catalog
            .lookup(title)
            .ok_or_else(|| FetchError::NotInCatalog(title.to_string()))
    }
}

/// Source that runs a remote extraction task against the program's catalogue page.
///
/// One attempt walks CREATE_TASK, VERIFY_ACTIVE, POLL and PARSE.
pub struct ExtractionSource {
    service: Arc<dyn TaskService>,
    sources: BTreeMap<String, String>,
    step_limit: u32,
    task_timeout: Duration,
    poll_interval: Duration,
}

impl ExtractionSource {
    pub fn new(service: Arc<dyn TaskService>, config: &FetchConfig) -> Self {
        Self {
            service,
            sources: config.sources.clone(),
            step_limit: config.step_limit,
            task_timeout: config.task_timeout(),
            poll_interval: config.poll_interval(),
        }
    }

    fn source_url(&self, title: &str) -> Option<&str> {
        let wanted = normalize_title(title);
        self.sources
            .iter()
            .find(|(known, _)| normalize_title(known) == wanted)
            .map(|(_, url)| url.as_str())
    }

    async fn create(&self, title: &str, url: &str) -> Result<String, FetchError> {
        let request = TaskRequest {
            program_title: title.to_string(),
            source_url: url.to_string(),
            prompt: extraction_prompt(url),
            step_limit: self.step_limit,
        };

        let task_id = self
            .service
            .create_task(&request)
            .await
            .map_err(|e| FetchError::TaskCreation(e.to_string()))?;

        info!(program = %title, task_id = %task_id, "Created extraction task");
        Ok(task_id)
    }

    async fn verify_active(&self, task_id: &str) -> Result<TaskStatus, FetchError> {
        let status = self.service.get_task(task_id).await?;
        if !status.state.is_live() {
            return Err(FetchError::TaskNotActive {
                task_id: task_id.to_string(),
                state: status.state.to_string(),
            });
        }
        debug!(task_id = %task_id, state = %status.state, "Task is active");
        Ok(status)
    }

    /// Query until the task is terminal or the wall-clock limit passes. Failed
    /// status queries are logged and polling continues.
    async fn poll(&self, task_id: &str) -> Result<TaskStatus, FetchError> {
        let started = Instant::now();

        loop {
            if started.elapsed() >= self.task_timeout {
                warn!(task_id = %task_id, timeout_ms = self.task_timeout.as_millis() as u64, "Task timed out");
                return Err(FetchError::TaskTimeout {
                    task_id: task_id.to_string(),
                    timeout: self.task_timeout,
                });
            }

            match self.service.get_task(task_id).await {
                Ok(status) => match status.state {
                    TaskState::Completed => {
                        info!(task_id = %task_id, "Task completed");
                        return Ok(status);
                    }
                    TaskState::Failed => {
                        warn!(task_id = %task_id, "Task failed");
                        return Err(FetchError::TaskFailed(task_id.to_string()));
                    }
                    ref state => debug!(task_id = %task_id, state = %state, "Task still running"),
                },
                Err(e) => warn!(task_id = %task_id, error = %e, "Error polling task"),
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl ProgramSource for ExtractionSource {
    fn name(&self) -> &str {
        "extraction"
    }

    fn titles(&self) -> Vec<String> {
        self.sources.keys().cloned().collect()
    }

    async fn fetch(&self, title: &str) -> Result<RequirementBlock, FetchError> {
        let url = self
            .source_url(title)
            .ok_or_else(|| FetchError::NotInCatalog(title.to_string()))?
            .to_string();

        let task_id = self.create(title, &url).await?;

        let status = match self.verify_active(&task_id).await? {
            status if status.state == TaskState::Completed => status,
            _ => self.poll(&task_id).await?,
        };

        parse_answer(status.answer.as_deref())
    }
}

/// Instructions for the extraction agent.
pub fn extraction_prompt(source_url: &str) -> String {
    let schema = serde_json::to_string_pretty(&RequirementBlock::json_schema()).unwrap_or_default();
    format!(
        "You are part of a larger degree audit system. Go to the program page at {source_url} \
         and extract the information the audit needs in structured form. Do not change the \
         wording of the program; copy requirement text as it appears on the page.\n\n\
         Your output is JSON with the following schema:\n\n{schema}\n\n\
         Extract all relevant information and return ONLY valid JSON matching this schema."
    )
}

/// The span from the first `{` to the last `}` of a free-text answer.
pub(crate) fn extract_json_object(answer: &str) -> Option<&str> {
    let start = answer.find('{')?;
    let end = answer.rfind('}')?;
    (end > start).then(|| &answer[start..=end])
}

fn parse_answer(answer: Option<&str>) -> Result<RequirementBlock, FetchError> {
    let answer =
        answer.ok_or_else(|| FetchError::Parse("completed task has no answer".to_string()))?;
    let json = extract_json_object(answer)
        .ok_or_else(|| FetchError::Parse("no JSON object found in answer".to_string()))?;
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| FetchError::Parse(e.to_string()))?;
    RequirementBlock::parse_program(value).map_err(|e| FetchError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{BlockType, StaticCatalog};
    use crate::testing::{MockTaskService, TaskScript};

    const ANSWER: &str = r#"Here is the program:
{"name": "History Minor", "block_type": "PROGRAM", "minimum_credit": 18,
 "blocks": [{"name": "Required Courses", "block_type": "REQUIRED", "minimum_credit": 6,
             "courses": [["HIST", "200", "3"], ["HIST", "201", "3"]]}]}
Let me know if you need anything else."#;

    fn config() -> FetchConfig {
        FetchConfig {
            poll_interval_ms: 1,
            task_timeout_ms: 200,
            sources: BTreeMap::from([(
                "History Minor".to_string(),
                "https://example.com/history-minor".to_string(),
            )]),
            ..Default::default()
        }
    }

    #[test]
    fn test_extract_json_object() {
        assert_eq!(extract_json_object("x {\"a\": {}} y"), Some("{\"a\": {}}"));
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }

    #[test]
    fn test_prompt_embeds_url_and_schema() {
        let prompt = extraction_prompt("https://example.com/history-minor");
        assert!(prompt.contains("https://example.com/history-minor"));
        assert!(prompt.contains("COMPLEMENTARY"));
        assert!(prompt.contains("ONLY valid JSON"));
    }

    #[tokio::test]
    async fn test_catalog_source() {
        let source = CatalogSource::new(Arc::new(StaticCatalog::builtin()));
        let tree = source
            .fetch("Economics Major Concentration (B.A.)")
            .await
            .unwrap();
        assert_eq!(tree.block_type(), BlockType::Program);

        let err = source.fetch("Underwater Basket Weaving").await.unwrap_err();
        assert!(matches!(err, FetchError::NotInCatalog(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_extraction_happy_path() {
        let service = Arc::new(MockTaskService::new());
        service
            .push_script(TaskScript::completing_after(2, ANSWER))
            .await;
        let source = ExtractionSource::new(service.clone(), &config());

        let tree = source.fetch("History Minor").await.unwrap();
        assert_eq!(tree.name(), "History Minor");
        assert_eq!(tree.children()[0].courses().len(), 2);

        let requests = service.recorded_requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].source_url, "https://example.com/history-minor");
        assert_eq!(requests[0].step_limit, 5);
    }

    #[tokio::test]
    async fn test_extraction_unknown_title() {
        let service = Arc::new(MockTaskService::new());
        let source = ExtractionSource::new(service.clone(), &config());

        let err = source.fetch("Art Minor").await.unwrap_err();
        assert!(matches!(err, FetchError::NotInCatalog(_)));
        assert_eq!(service.create_count(), 0);
    }

    #[tokio::test]
    async fn test_extraction_creation_failure() {
        let service = Arc::new(MockTaskService::new());
        service.set_fail_creation(true);
        let source = ExtractionSource::new(service, &config());

        let err = source.fetch("History Minor").await.unwrap_err();
        assert!(matches!(err, FetchError::TaskCreation(_)));
    }

    #[tokio::test]
    async fn test_extraction_task_not_active() {
        let service = Arc::new(MockTaskService::new());
        service
            .push_script(TaskScript::with_states(vec![TaskState::Unknown(
                "cancelled".into(),
            )]))
            .await;
        let source = ExtractionSource::new(service, &config());

        let err = source.fetch("History Minor").await.unwrap_err();
        assert!(matches!(err, FetchError::TaskNotActive { .. }));
    }

    #[tokio::test]
    async fn test_extraction_task_failed() {
        let service = Arc::new(MockTaskService::new());
        service
            .push_script(TaskScript::with_states(vec![
                TaskState::Queued,
                TaskState::Running,
                TaskState::Failed,
            ]))
            .await;
        let source = ExtractionSource::new(service, &config());

        let err = source.fetch("History Minor").await.unwrap_err();
        assert!(matches!(err, FetchError::TaskFailed(_)));
    }

    #[tokio::test]
    async fn test_extraction_times_out() {
        let service = Arc::new(MockTaskService::new());
        service
            .push_script(TaskScript::with_states(vec![TaskState::Running]))
            .await;
        let source = ExtractionSource::new(service, &config());

        let err = source.fetch("History Minor").await.unwrap_err();
        assert!(matches!(err, FetchError::TaskTimeout { .. }));
    }

    #[tokio::test]
    async fn test_extraction_unparseable_answer() {
        let service = Arc::new(MockTaskService::new());
        service
            .push_script(TaskScript::completing_after(0, "I could not find the page."))
            .await;
        let source = ExtractionSource::new(service, &config());

        let err = source.fetch("History Minor").await.unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[tokio::test]
    async fn test_extraction_rejects_invalid_tree() {
        let service = Arc::new(MockTaskService::new());
        service
            .push_script(TaskScript::completing_after(
                0,
                r#"{"name": "History Minor", "block_type": "MAJOR"}"#,
            ))
            .await;
        let source = ExtractionSource::new(service, &config());

        let err = source.fetch("History Minor").await.unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }
}
