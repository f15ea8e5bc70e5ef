use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::PathBuf;

use crate::fetcher::{FetchConfig, FetchMode};
use crate::matching::{LlmProvider, MatchingConfig, MatchingMode};

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Program catalog configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// JSON file of program documents replacing the built-in catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub fetch: SanitizedFetchConfig,
    pub matching: SanitizedMatchingConfig,
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedFetchConfig {
    pub mode: FetchMode,
    pub max_retries: u32,
    pub max_workers: usize,
    pub task_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub retry_backoff_ms: u64,
    pub retry_backoff_max_ms: u64,
    pub step_limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_service: Option<SanitizedTaskServiceConfig>,
    pub sources: BTreeMap<String, String>,
}

/// Sanitized task service config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTaskServiceConfig {
    pub api_base: String,
    pub api_key_configured: bool,
    pub agent: String,
    pub request_timeout_secs: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedMatchingConfig {
    pub mode: MatchingMode,
    pub max_retries: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm: Option<SanitizedLlmConfig>,
}

/// Sanitized LLM config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedLlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    pub api_key_configured: bool,
    pub timeout_secs: u32,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let fetch = &config.fetch;
        let matching = &config.matching;
        Self {
            server: config.server.clone(),
            fetch: SanitizedFetchConfig {
                mode: fetch.mode,
                max_retries: fetch.max_retries,
                max_workers: fetch.max_workers,
                task_timeout_ms: fetch.task_timeout_ms,
                poll_interval_ms: fetch.poll_interval_ms,
                retry_backoff_ms: fetch.retry_backoff_ms,
                retry_backoff_max_ms: fetch.retry_backoff_max_ms,
                step_limit: fetch.step_limit,
                task_service: fetch
                    .task_service
                    .as_ref()
                    .map(|ts| SanitizedTaskServiceConfig {
                        api_base: ts.api_base.clone(),
                        api_key_configured: !ts.api_key.is_empty(),
                        agent: ts.agent.clone(),
                        request_timeout_secs: ts.request_timeout_secs,
                    }),
                sources: fetch.sources.clone(),
            },
            matching: SanitizedMatchingConfig {
                mode: matching.mode,
                max_retries: matching.max_retries,
                llm: matching.llm.as_ref().map(|llm| SanitizedLlmConfig {
                    provider: llm.provider.clone(),
                    model: llm.model.clone(),
                    api_base: llm.api_base.clone(),
                    api_key_configured: llm.api_key.as_ref().is_some_and(|k| !k.is_empty()),
                    timeout_secs: llm.timeout_secs,
                    max_tokens: llm.max_tokens,
                    temperature: llm.temperature,
                }),
            },
            catalog: config.catalog.clone(),
        }
    }
}
