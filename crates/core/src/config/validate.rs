use super::{types::Config, ConfigError};

/// Validate configuration
///
/// Checks the server port, then delegates to the fetch and matching sections.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    config
        .fetch
        .validate()
        .map_err(|e| ConfigError::ValidationError(format!("fetch: {}", e)))?;

    config
        .matching
        .validate()
        .map_err(|e| ConfigError::ValidationError(format!("matching: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::{FetchMode, TaskServiceConfig};
    use crate::matching::{LlmConfig, LlmProvider, MatchingMode};

    fn assert_invalid(config: &Config, needle: &str) {
        match validate_config(config) {
            Err(ConfigError::ValidationError(msg)) => {
                assert!(msg.contains(needle), "'{}' does not mention '{}'", msg, needle)
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = Config::default();
        config.server.port = 0;
        assert_invalid(&config, "server.port");
    }

    #[test]
    fn test_validate_zero_workers_fails() {
        let mut config = Config::default();
        config.fetch.max_workers = 0;
        assert_invalid(&config, "max_workers");
    }

    #[test]
    fn test_validate_zero_poll_interval_fails() {
        let mut config = Config::default();
        config.fetch.poll_interval_ms = 0;
        assert_invalid(&config, "poll_interval_ms");
    }

    #[test]
    fn test_validate_zero_matching_retries_fails() {
        let mut config = Config::default();
        config.matching.max_retries = 0;
        assert_invalid(&config, "max_retries");
    }

    #[test]
    fn test_validate_extraction_requires_task_service() {
        let mut config = Config::default();
        config.fetch.mode = FetchMode::Extraction;
        assert_invalid(&config, "task_service");

        config.fetch.task_service = Some(TaskServiceConfig {
            api_base: "https://tasks.example.com".to_string(),
            api_key: String::new(),
            agent: "glitter".to_string(),
            request_timeout_secs: 30,
        });
        assert_invalid(&config, "api_key");

        if let Some(ts) = config.fetch.task_service.as_mut() {
            ts.api_key = "secret".to_string();
        }
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_llm_mode_requires_llm_section() {
        let mut config = Config::default();
        config.matching.mode = MatchingMode::Llm;
        assert_invalid(&config, "llm");

        config.matching.llm = Some(LlmConfig {
            provider: LlmProvider::Ollama,
            model: "llama3".to_string(),
            api_key: None,
            api_base: None,
            timeout_secs: 3600,
            max_tokens: 10_000,
            temperature: 0.0,
        });
        assert!(validate_config(&config).is_ok());
    }
}
