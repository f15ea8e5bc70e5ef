//! Matching engines: assign transcript courses to one program's requirement blocks.
//!
//! The processor only sees the [`MatchingEngine`] trait. Two implementations ship:
//! [`LlmMatchingEngine`] hands the request document to a reasoning model, and
//! [`HeuristicMatchingEngine`] assigns courses deterministically without any
//! network access.

mod config;
mod heuristic;
mod llm;
mod llm_engine;
mod traits;

pub use config::{LlmConfig, LlmProvider, MatchingConfig, MatchingMode};
pub use heuristic::HeuristicMatchingEngine;
pub use llm::{
    parse_report, AnthropicClient, LlmClient, OllamaClient, OpenAiClient, ReportPrompt,
};
pub use llm_engine::{LlmMatchingEngine, AUDIT_INSTRUCTIONS};
pub use traits::{MatchRequest, MatchingEngine, MatchingError};

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Build the matching engine selected by `config`.
pub fn create_matching_engine(
    config: &MatchingConfig,
) -> Result<Arc<dyn MatchingEngine>, MatchingError> {
    let llm = match config.mode {
        MatchingMode::Heuristic => {
            info!("Using heuristic matching engine");
            return Ok(Arc::new(HeuristicMatchingEngine::new()));
        }
        MatchingMode::Llm => config
            .llm
            .as_ref()
            .ok_or_else(|| MatchingError::NotConfigured("mode \"llm\" needs [matching.llm]".into()))?,
    };

    let timeout = Duration::from_secs(u64::from(llm.timeout_secs));

    let engine: Arc<dyn MatchingEngine> = match llm.provider {
        LlmProvider::Anthropic => {
            let api_key = llm.api_key.clone().ok_or_else(|| {
                MatchingError::NotConfigured("Anthropic requires an api_key".into())
            })?;
            let mut client = AnthropicClient::new(api_key, &llm.model).with_timeout(timeout);
            if let Some(base) = &llm.api_base {
                client = client.with_api_base(base);
            }
            Arc::new(
                LlmMatchingEngine::new(client)
                    .with_max_tokens(llm.max_tokens)
                    .with_temperature(llm.temperature),
            )
        }
        LlmProvider::OpenAi => {
            let mut client = OpenAiClient::new(&llm.model).with_timeout(timeout);
            if let Some(key) = &llm.api_key {
                client = client.with_api_key(key);
            }
            if let Some(base) = &llm.api_base {
                client = client.with_api_base(base);
            }
            Arc::new(
                LlmMatchingEngine::new(client)
                    .with_max_tokens(llm.max_tokens)
                    .with_temperature(llm.temperature),
            )
        }
        LlmProvider::Ollama => {
            let mut client = OllamaClient::new(&llm.model).with_timeout(timeout);
            if let Some(base) = &llm.api_base {
                client = client.with_api_base(base);
            }
            Arc::new(
                LlmMatchingEngine::new(client)
                    .with_max_tokens(llm.max_tokens)
                    .with_temperature(llm.temperature),
            )
        }
    };

    info!(
        provider = ?llm.provider,
        model = %llm.model,
        timeout_secs = llm.timeout_secs,
        "Using LLM matching engine"
    );
    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn llm_config(provider: LlmProvider, api_key: Option<&str>) -> MatchingConfig {
        MatchingConfig {
            mode: MatchingMode::Llm,
            max_retries: 3,
            llm: Some(LlmConfig {
                provider,
                model: "grok-4-fast-reasoning".into(),
                api_key: api_key.map(String::from),
                api_base: Some("https://api.x.ai/v1".into()),
                timeout_secs: 3600,
                max_tokens: 10_000,
                temperature: 0.0,
            }),
        }
    }

    #[test]
    fn test_default_engine_is_heuristic() {
        let engine = create_matching_engine(&MatchingConfig::default()).unwrap();
        assert_eq!(engine.name(), "heuristic");
    }

    #[test]
    fn test_openai_compatible_engine() {
        let engine =
            create_matching_engine(&llm_config(LlmProvider::OpenAi, Some("xai-key"))).unwrap();
        assert_eq!(engine.name(), "openai");
    }

    #[test]
    fn test_anthropic_without_key_fails() {
        let result = create_matching_engine(&llm_config(LlmProvider::Anthropic, None));
        assert!(matches!(result, Err(MatchingError::NotConfigured(_))));
    }

    #[test]
    fn test_llm_mode_without_section_fails() {
        let config = MatchingConfig {
            mode: MatchingMode::Llm,
            ..Default::default()
        };
        assert!(create_matching_engine(&config).is_err());
    }
}
