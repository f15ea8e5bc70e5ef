//! Matching engine configuration types.

use serde::{Deserialize, Serialize};

/// Which engine produces program reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingMode {
    /// Reasoning model behind an LLM API.
    Llm,
    /// Deterministic offline assignment. Works without network access.
    #[default]
    Heuristic,
}

/// LLM provider type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    /// Anthropic Claude API.
    Anthropic,
    /// OpenAI-compatible chat completions API (OpenAI, xAI, ...).
    OpenAi,
    /// Local Ollama instance.
    Ollama,
}

/// LLM client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// LLM provider.
    pub provider: LlmProvider,
    /// Model name/identifier.
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Custom API base URL (for proxies or self-hosted).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Request timeout in seconds. Reasoning models can take a long time.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Maximum tokens for completions.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: f32,
}

fn default_timeout() -> u32 {
    3600
}

fn default_max_tokens() -> u32 {
    10_000
}

/// Matching configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    #[serde(default)]
    pub mode: MatchingMode,
    /// Total attempts per program before the audit run fails.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// LLM configuration (required when mode = "llm").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmConfig>,
}

fn default_max_retries() -> u32 {
    3
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            mode: MatchingMode::default(),
            max_retries: default_max_retries(),
            llm: None,
        }
    }
}

impl MatchingConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_retries == 0 {
            return Err("max_retries must be at least 1".to_string());
        }

        if self.mode == MatchingMode::Llm && self.llm.is_none() {
            return Err("mode \"llm\" requires a [matching.llm] section".to_string());
        }

        if let Some(llm) = &self.llm {
            if llm.model.is_empty() {
                return Err("LLM model name cannot be empty".to_string());
            }
            // Local Ollama needs no key; a proxy base URL may not either.
            if llm.provider != LlmProvider::Ollama
                && llm.api_key.is_none()
                && llm.api_base.is_none()
            {
                return Err(format!(
                    "LLM provider {:?} requires api_key or api_base",
                    llm.provider
                ));
            }
            if !(0.0..=2.0).contains(&llm.temperature) {
                return Err(format!(
                    "temperature must be between 0.0 and 2.0, got {}",
                    llm.temperature
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn llm(provider: LlmProvider) -> LlmConfig {
        LlmConfig {
            provider,
            model: "model".to_string(),
            api_key: None,
            api_base: None,
            timeout_secs: default_timeout(),
            max_tokens: default_max_tokens(),
            temperature: 0.0,
        }
    }

    #[test]
    fn test_default_is_valid() {
        assert!(MatchingConfig::default().validate().is_ok());
    }

    #[test]
    fn test_anthropic_requires_key() {
        let config = MatchingConfig {
            mode: MatchingMode::Llm,
            llm: Some(llm(LlmProvider::Anthropic)),
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("api_key"));
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let config = MatchingConfig {
            mode: MatchingMode::Llm,
            llm: Some(llm(LlmProvider::Ollama)),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_model_rejected() {
        let mut settings = llm(LlmProvider::Ollama);
        settings.model.clear();
        let config = MatchingConfig {
            llm: Some(settings),
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("model"));
    }
}
