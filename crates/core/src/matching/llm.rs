//! Provider clients that answer an audit prompt with a JSON report.
//!
//! Each provider is asked for JSON output in its own way: OpenAI-compatible APIs
//! through `response_format`, Ollama through `format`, and Anthropic by prefilling
//! the assistant turn with the opening brace. Transport and provider failures are
//! reported as [`MatchingError`] so the processor can retry them uniformly.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::fetcher::extract_json_object;
use crate::report::BlockReport;

use super::traits::MatchingError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3600);

/// One audit question: fixed instructions plus the serialized request document.
#[derive(Debug, Clone)]
pub struct ReportPrompt {
    pub instructions: String,
    pub document: String,
    pub max_tokens: u32,
    /// 0.0 keeps repeated audits of the same transcript stable.
    pub temperature: f32,
}

impl ReportPrompt {
    pub fn new(instructions: impl Into<String>, document: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
            document: document.into(),
            max_tokens: 10_000,
            temperature: 0.0,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// A model provider able to answer a [`ReportPrompt`].
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Provider name, used as the engine name in logs.
    fn provider(&self) -> &str;

    fn model(&self) -> &str;

    /// The raw JSON text the model produced.
    async fn complete_json(&self, prompt: &ReportPrompt) -> Result<String, MatchingError>;

    /// Complete `prompt` and decode the answer as a report.
    async fn complete_report(&self, prompt: &ReportPrompt) -> Result<BlockReport, MatchingError> {
        let text = self.complete_json(prompt).await?;
        parse_report(&text)
    }
}

/// Decode the report object embedded in a model answer.
///
/// Tolerates code fences and prose around the object.
pub fn parse_report(text: &str) -> Result<BlockReport, MatchingError> {
    let json = extract_json_object(text)
        .ok_or_else(|| MatchingError::MalformedResponse("no JSON object in response".into()))?;
    serde_json::from_str(json).map_err(|e| MatchingError::MalformedResponse(e.to_string()))
}

/// Base URL, HTTP client and per-request timeout shared by every provider.
struct Endpoint {
    http: reqwest::Client,
    api_base: String,
    timeout: Duration,
}

impl Endpoint {
    fn new(api_base: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base.trim_end_matches('/'), path)
    }

    /// POST `body` and decode the provider's reply envelope.
    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        provider: &str,
        request: reqwest::RequestBuilder,
        body: &B,
    ) -> Result<R, MatchingError> {
        let response = request
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MatchingError::Timeout(self.timeout)
                } else {
                    MatchingError::Call(format!("{provider}: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MatchingError::Call(format!(
                "{provider} returned {}: {}",
                status.as_u16(),
                provider_message(&body)
            )));
        }

        response
            .json()
            .await
            .map_err(|e| MatchingError::MalformedResponse(format!("{provider} reply: {e}")))
    }
}

/// Pull the human-readable message out of a provider error body.
///
/// Anthropic and OpenAI nest it under `error.message`, Ollama sends `error` as a string.
fn provider_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            let error = value.get("error")?;
            error
                .get("message")
                .and_then(Value::as_str)
                .or_else(|| error.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[derive(Debug, Serialize)]
struct Turn<'a> {
    role: &'static str,
    content: &'a str,
}

// ============================================================================
// Anthropic
// ============================================================================

/// Anthropic Messages API client.
pub struct AnthropicClient {
    endpoint: Endpoint,
    api_key: String,
    model: String,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: Endpoint::new("https://api.anthropic.com"),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.endpoint.api_base = api_base.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.endpoint.timeout = timeout;
        self
    }
}

/// The assistant turn starts with this, so the model continues inside the object.
const ANTHROPIC_PREFILL: &str = "{";

#[derive(Debug, Serialize)]
struct MessagesBody<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [Turn<'a>; 2],
    temperature: f32,
}

impl<'a> MessagesBody<'a> {
    fn new(model: &'a str, prompt: &'a ReportPrompt) -> Self {
        Self {
            model,
            max_tokens: prompt.max_tokens,
            system: &prompt.instructions,
            messages: [
                Turn {
                    role: "user",
                    content: &prompt.document,
                },
                Turn {
                    role: "assistant",
                    content: ANTHROPIC_PREFILL,
                },
            ],
            temperature: prompt.temperature,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessagesReply {
    content: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

impl MessagesReply {
    /// Text parts joined back onto the prefilled brace.
    fn into_json_text(self) -> String {
        let mut text = ANTHROPIC_PREFILL.to_string();
        for part in self.content.into_iter().filter(|p| p.kind == "text") {
            text.push_str(&part.text);
        }
        text
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    fn provider(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete_json(&self, prompt: &ReportPrompt) -> Result<String, MatchingError> {
        let request = self
            .endpoint
            .http
            .post(self.endpoint.url("/v1/messages"))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01");

        let reply: MessagesReply = self
            .endpoint
            .post(self.provider(), request, &MessagesBody::new(&self.model, prompt))
            .await?;
        Ok(reply.into_json_text())
    }
}

// ============================================================================
// OpenAI-compatible
// ============================================================================

/// Client for OpenAI-compatible chat completion APIs (OpenAI, xAI, vLLM, ...).
pub struct OpenAiClient {
    endpoint: Endpoint,
    api_key: Option<String>,
    model: String,
}

impl OpenAiClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            endpoint: Endpoint::new("https://api.openai.com/v1"),
            api_key: None,
            model: model.into(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Base URL up to and including the version segment, e.g. "https://api.x.ai/v1".
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.endpoint.api_base = api_base.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.endpoint.timeout = timeout;
        self
    }
}

#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: [Turn<'a>; 2],
    max_tokens: u32,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

impl<'a> ChatBody<'a> {
    fn new(model: &'a str, prompt: &'a ReportPrompt) -> Self {
        Self {
            model,
            messages: [
                Turn {
                    role: "system",
                    content: &prompt.instructions,
                },
                Turn {
                    role: "user",
                    content: &prompt.document,
                },
            ],
            max_tokens: prompt.max_tokens,
            temperature: prompt.temperature,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn provider(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete_json(&self, prompt: &ReportPrompt) -> Result<String, MatchingError> {
        let mut request = self
            .endpoint
            .http
            .post(self.endpoint.url("/chat/completions"));
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let reply: ChatReply = self
            .endpoint
            .post(self.provider(), request, &ChatBody::new(&self.model, prompt))
            .await?;

        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| MatchingError::MalformedResponse("reply has no message content".into()))
    }
}

// ============================================================================
// Ollama
// ============================================================================

/// Client for a local Ollama server (default http://localhost:11434). No API key.
pub struct OllamaClient {
    endpoint: Endpoint,
    model: String,
}

impl OllamaClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            endpoint: Endpoint::new("http://localhost:11434"),
            model: model.into(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.endpoint.api_base = api_base.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.endpoint.timeout = timeout;
        self
    }
}

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'static str,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

impl<'a> GenerateBody<'a> {
    fn new(model: &'a str, prompt: &'a ReportPrompt) -> Self {
        Self {
            model,
            system: &prompt.instructions,
            prompt: &prompt.document,
            stream: false,
            format: "json",
            options: GenerateOptions {
                temperature: prompt.temperature,
                num_predict: prompt.max_tokens,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateReply {
    response: String,
}

#[async_trait]
impl LlmClient for OllamaClient {
    fn provider(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete_json(&self, prompt: &ReportPrompt) -> Result<String, MatchingError> {
        let request = self.endpoint.http.post(self.endpoint.url("/api/generate"));
        let reply: GenerateReply = self
            .endpoint
            .post(self.provider(), request, &GenerateBody::new(&self.model, prompt))
            .await?;
        Ok(reply.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportStatus;

    fn prompt() -> ReportPrompt {
        ReportPrompt::new("audit rules", r#"{"program_details": {}}"#)
            .with_max_tokens(2048)
            .with_temperature(0.2)
    }

    #[test]
    fn test_anthropic_body_prefills_json() {
        let prompt = prompt();
        let json = serde_json::to_value(MessagesBody::new("claude-sonnet", &prompt)).unwrap();

        assert_eq!(json["system"], "audit rules");
        assert_eq!(json["max_tokens"], 2048);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][1]["role"], "assistant");
        assert_eq!(json["messages"][1]["content"], "{");
    }

    #[test]
    fn test_anthropic_reply_rejoins_prefill() {
        let reply: MessagesReply = serde_json::from_str(
            r#"{"content": [
                {"type": "text", "text": "\"name\": \"History Minor\", "},
                {"type": "tool_use", "id": "x"},
                {"type": "text", "text": "\"block_type\": \"PROGRAM\", \"status\": \"FULFILLED\"}"}
            ]}"#,
        )
        .unwrap();

        let report = parse_report(&reply.into_json_text()).unwrap();
        assert_eq!(report.name, "History Minor");
        assert_eq!(report.status, ReportStatus::Fulfilled);
    }

    #[test]
    fn test_openai_body_requests_json_object() {
        let prompt = prompt();
        let json = serde_json::to_value(ChatBody::new("grok-4-fast-reasoning", &prompt)).unwrap();

        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], r#"{"program_details": {}}"#);
        assert_eq!(json["max_tokens"], 2048);
    }

    #[test]
    fn test_ollama_body_uses_json_format() {
        let prompt = prompt();
        let json = serde_json::to_value(GenerateBody::new("llama3", &prompt)).unwrap();

        assert_eq!(json["format"], "json");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 2048);
    }

    #[test]
    fn test_provider_message_shapes() {
        let anthropic = r#"{"type": "error", "error": {"type": "overloaded_error", "message": "Overloaded"}}"#;
        assert_eq!(provider_message(anthropic), "Overloaded");
        assert_eq!(
            provider_message(r#"{"error": "model 'llama9' not found"}"#),
            "model 'llama9' not found"
        );
        assert_eq!(provider_message("  bad gateway \n"), "bad gateway");
    }

    #[test]
    fn test_client_identity() {
        assert_eq!(OllamaClient::new("llama3").provider(), "ollama");
        assert_eq!(AnthropicClient::new("key", "claude").model(), "claude");
        assert_eq!(OpenAiClient::new("grok-4").provider(), "openai");
    }

    #[test]
    fn test_custom_base_url() {
        let client = OpenAiClient::new("grok-4").with_api_base("https://api.x.ai/v1/");
        assert_eq!(
            client.endpoint.url("/chat/completions"),
            "https://api.x.ai/v1/chat/completions"
        );
    }

    #[test]
    fn test_parse_report_rejects_prose() {
        assert!(matches!(
            parse_report("I cannot help with that."),
            Err(MatchingError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_call_error() {
        let client = OllamaClient::new("llama3")
            .with_api_base("http://127.0.0.1:1")
            .with_timeout(Duration::from_secs(5));
        let err = client.complete_json(&prompt()).await.unwrap_err();
        assert!(matches!(err, MatchingError::Call(_) | MatchingError::Timeout(_)));
    }
}
