//! Bounded, retrying fan-out of program fetches.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::program::{normalize_title, ProgramCatalog};

use super::source::{CatalogSource, ExtractionSource, ProgramSource};
use super::task_service::HttpTaskService;
use super::types::{FailedFetch, FetchCompleteCallback, FetchOutcome, FetchResult};
use super::{FetchConfig, FetchError, FetchMode};

/// How many times a title is retried, and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
    pub backoff_max: Duration,
}

impl RetryPolicy {
    /// Delay after failed attempt `attempt` (1-based): `backoff * 2^(attempt-1)`, capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.backoff
            .checked_mul(factor)
            .unwrap_or(self.backoff_max)
            .min(self.backoff_max)
    }
}

impl From<&FetchConfig> for RetryPolicy {
    fn from(config: &FetchConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff: Duration::from_millis(config.retry_backoff_ms),
            backoff_max: Duration::from_millis(config.retry_backoff_max_ms),
        }
    }
}

/// Handle to a running fetch batch.
pub struct FetchHandle {
    handle: JoinHandle<FetchOutcome>,
}

impl FetchHandle {
    /// Wait for every title to reach a terminal state.
    pub async fn join(self) -> Result<FetchOutcome, FetchError> {
        self.handle
            .await
            .map_err(|e| FetchError::Worker(e.to_string()))
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Fetches program trees from a [`ProgramSource`] with retries and bounded concurrency.
#[derive(Clone)]
pub struct FetchPipeline {
    source: Arc<dyn ProgramSource>,
    policy: RetryPolicy,
    max_workers: usize,
}

impl FetchPipeline {
    pub fn new(source: Arc<dyn ProgramSource>, config: &FetchConfig) -> Self {
        Self {
            source,
            policy: RetryPolicy::from(config),
            max_workers: config.max_workers.max(1),
        }
    }

    /// Build the pipeline for the configured fetch mode.
    pub fn from_config(
        config: &FetchConfig,
        catalog: Arc<dyn ProgramCatalog>,
    ) -> Result<Self, FetchError> {
        let source: Arc<dyn ProgramSource> = match config.mode {
            FetchMode::Catalog => Arc::new(CatalogSource::new(catalog)),
            FetchMode::Extraction => {
                let service_config = config.task_service.clone().ok_or_else(|| {
                    FetchError::TaskCreation("extraction mode requires a task service".into())
                })?;
                let service = HttpTaskService::new(service_config)?;
                Arc::new(ExtractionSource::new(Arc::new(service), config))
            }
        };
        info!(source = source.name(), "Fetch pipeline configured");
        Ok(Self::new(source, config))
    }

    pub fn source(&self) -> &Arc<dyn ProgramSource> {
        &self.source
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Resolve one title, retrying on retryable failures.
    pub async fn fetch_one(&self, title: &str) -> FetchResult {
        fetch_with_retries(Arc::clone(&self.source), self.policy, title.to_string()).await
    }

    /// Start fetching `titles` in the background.
    ///
    /// Returns immediately. `on_complete` runs once, after every title has
    /// succeeded or failed; [`FetchHandle::join`] yields the same outcome.
    /// Titles that differ only in case or surrounding whitespace are fetched
    /// once, under their first spelling.
    pub fn spawn(
        &self,
        titles: Vec<String>,
        on_complete: Option<FetchCompleteCallback>,
    ) -> Result<FetchHandle, FetchError> {
        let mut seen = HashSet::new();
        let titles: Vec<String> = titles
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty() && seen.insert(normalize_title(t)))
            .collect();

        if titles.is_empty() {
            return Err(FetchError::NoTitles);
        }

        info!(
            titles = titles.len(),
            workers = self.max_workers,
            source = self.source.name(),
            "Starting fetch batch"
        );

        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let outcome = Arc::new(Mutex::new(FetchOutcome::default()));
        let mut workers = JoinSet::new();

        for title in titles.iter().cloned() {
            let source = Arc::clone(&self.source);
            let semaphore = Arc::clone(&semaphore);
            let outcome = Arc::clone(&outcome);
            let policy = self.policy;

            workers.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                let result = fetch_with_retries(source, policy, title).await;
                outcome.lock().await.record(result);
            });
        }

        let handle = tokio::spawn(async move {
            while let Some(joined) = workers.join_next().await {
                if let Err(e) = joined {
                    error!(error = %e, "Fetch worker terminated abnormally");
                }
            }

            let mut outcome = std::mem::take(&mut *outcome.lock().await);

            // A worker that panicked never recorded its title.
            for title in &titles {
                if !outcome.contains(title) {
                    outcome.failed.push(FailedFetch {
                        title: title.clone(),
                        error: FetchError::Worker("worker terminated before finishing".into()),
                        attempts: 0,
                    });
                }
            }

            info!(
                succeeded = outcome.succeeded.len(),
                failed = outcome.failed.len(),
                "Fetch complete"
            );

            if let Some(callback) = on_complete {
                callback(&outcome);
            }
            outcome
        });

        Ok(FetchHandle { handle })
    }

    /// Fetch every title and wait for the aggregate result.
    pub async fn fetch_all(&self, titles: Vec<String>) -> Result<FetchOutcome, FetchError> {
        self.spawn(titles, None)?.join().await
    }
}

async fn fetch_with_retries(
    source: Arc<dyn ProgramSource>,
    policy: RetryPolicy,
    title: String,
) -> FetchResult {
    let started = Instant::now();
    let mut attempt = 1;

    loop {
        debug!(program = %title, attempt, "Fetch attempt");

        match source.fetch(&title).await {
            Ok(tree) => {
                info!(
                    program = %title,
                    attempts = attempt,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Fetched program"
                );
                return FetchResult {
                    program_title: title,
                    outcome: Ok(tree),
                    attempts: attempt,
                    duration: started.elapsed(),
                };
            }
            Err(e) if e.is_retryable() && attempt <= policy.max_retries => {
                let delay = policy.delay_for(attempt);
                warn!(
                    program = %title,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Fetch attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                error!(program = %title, attempts = attempt, error = %e, "Fetch failed");
                return FetchResult {
                    program_title: title,
                    outcome: Err(e),
                    attempts: attempt,
                    duration: started.elapsed(),
                };
            }
        }
    }
}
