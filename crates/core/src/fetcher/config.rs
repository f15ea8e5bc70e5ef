//! Fetch pipeline configuration types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Where program requirement trees come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    /// Offline lookup in the program catalog.
    #[default]
    Catalog,
    /// Remote extraction tasks against each program's catalogue page.
    Extraction,
}

/// Extraction task service connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskServiceConfig {
    /// Base URL, e.g. "https://api.example.com".
    pub api_base: String,
    /// Bearer token.
    pub api_key: String,
    /// Agent that runs the extraction.
    #[serde(default = "default_agent")]
    pub agent: String,
    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u32,
}

fn default_agent() -> String {
    "glitter".to_string()
}

fn default_request_timeout() -> u32 {
    30
}

/// Fetch pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default)]
    pub mode: FetchMode,
    /// Retries after the first attempt (so up to `max_retries + 1` attempts per title).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Titles fetched concurrently.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// Wall-clock limit for one extraction task to reach a terminal state.
    #[serde(default = "default_task_timeout_ms")]
    pub task_timeout_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Delay before the first retry; doubles per attempt.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_retry_backoff_max_ms")]
    pub retry_backoff_max_ms: u64,
    /// Step budget handed to the extraction agent.
    #[serde(default = "default_step_limit")]
    pub step_limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_service: Option<TaskServiceConfig>,
    /// Program title -> catalogue page URL.
    #[serde(default = "default_sources")]
    pub sources: BTreeMap<String, String>,
}

fn default_max_retries() -> u32 {
    1
}

fn default_max_workers() -> usize {
    5
}

fn default_task_timeout_ms() -> u64 {
    300_000
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

fn default_retry_backoff_ms() -> u64 {
    1_000
}

fn default_retry_backoff_max_ms() -> u64 {
    30_000
}

fn default_step_limit() -> u32 {
    5
}

fn default_sources() -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            "Computer Science Major Concentration (B.A.)".to_string(),
            "https://coursecatalogue.mcgill.ca/en/undergraduate/arts/programs/computer-science/computer-science-major-concentration-ba/".to_string(),
        ),
        (
            "Economics Major Concentration (B.A.)".to_string(),
            "https://coursecatalogue.mcgill.ca/en/undergraduate/arts/programs/economics/economics-major-concentration-ba/".to_string(),
        ),
    ])
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            mode: FetchMode::default(),
            max_retries: default_max_retries(),
            max_workers: default_max_workers(),
            task_timeout_ms: default_task_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            retry_backoff_ms: default_retry_backoff_ms(),
            retry_backoff_max_ms: default_retry_backoff_max_ms(),
            step_limit: default_step_limit(),
            task_service: None,
            sources: default_sources(),
        }
    }
}

impl FetchConfig {
    pub fn task_timeout(&self) -> Duration {
        Duration::from_millis(self.task_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_workers == 0 {
            return Err("max_workers must be at least 1".to_string());
        }
        if self.poll_interval_ms == 0 {
            return Err("poll_interval_ms must be greater than 0".to_string());
        }
        if self.retry_backoff_max_ms < self.retry_backoff_ms {
            return Err(format!(
                "retry_backoff_max_ms ({}) is below retry_backoff_ms ({})",
                self.retry_backoff_max_ms, self.retry_backoff_ms
            ));
        }

        if self.mode == FetchMode::Extraction {
            let Some(service) = &self.task_service else {
                return Err("extraction mode requires a [fetch.task_service] section".to_string());
            };
            if service.api_base.trim().is_empty() {
                return Err("task_service.api_base cannot be empty".to_string());
            }
            if service.api_key.trim().is_empty() {
                return Err("task_service.api_key cannot be empty".to_string());
            }
            if self.sources.is_empty() {
                return Err("extraction mode requires at least one entry in [fetch.sources]".to_string());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sources() {
        let config = FetchConfig::default();
        assert!(config
            .sources
            .get("Computer Science Major Concentration (B.A.)")
            .unwrap()
            .ends_with("computer-science-major-concentration-ba/"));
    }

    #[test]
    fn test_durations() {
        let config = FetchConfig::default();
        assert_eq!(config.task_timeout(), Duration::from_secs(300));
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_backoff_cap_below_base_rejected() {
        let config = FetchConfig {
            retry_backoff_ms: 5_000,
            retry_backoff_max_ms: 1_000,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("retry_backoff_max_ms"));
    }

    #[test]
    fn test_extraction_requires_sources() {
        let config = FetchConfig {
            mode: FetchMode::Extraction,
            task_service: Some(TaskServiceConfig {
                api_base: "https://tasks.example.com".to_string(),
                api_key: "key".to_string(),
                agent: default_agent(),
                request_timeout_secs: 30,
            }),
            sources: BTreeMap::new(),
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("sources"));
    }
}
