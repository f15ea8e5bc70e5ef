//! Matching engine backed by a reasoning model.

use async_trait::async_trait;
use std::time::Instant;
use tracing::{debug, info};

use crate::report::BlockReport;

use super::llm::{LlmClient, ReportPrompt};
use super::traits::{MatchRequest, MatchingEngine, MatchingError};

/// Instructions given to the model for every program.
pub const AUDIT_INSTRUCTIONS: &str = r#"You are a degree audit assistant. You receive a JSON document with three fields:
- "program_details": the requirement tree of one academic program. Blocks are PROGRAM, REQUIRED, COMPLEMENTARY or CUSTOM, each with optional "minimum_credit", "details" and "courses" given as [subject_code, course_code, credit].
- "transcript": the student's courses that are still available, each with subject_code, course_code, credit and grade.
- "reports": reports already produced for other programs of the same student.

Assign transcript courses to the blocks of the program and report the result.

Rules:
1. A course may be used at most once, across this program and every program in "reports". Never use a course that already appears in a previous report.
2. Only use courses that appear in "transcript".
3. Process REQUIRED blocks first, then COMPLEMENTARY blocks and their CUSTOM groups.
4. Try to satisfy each block's minimum credits. When several courses fit, prefer lower-level courses and courses from the same department.
5. Do not assume exemptions, substitutions or prerequisites waived unless the block details state them.
6. Write short, clear notes on what is missing, for example "need 3 more credits". For the program itself use "overall need N more credits".

Respond with a single JSON object mirroring the program tree. Every block has:
"name", "block_type", "minimum_credit" (when the block has one), "received_credit", "status" ("FULFILLED" or "UNFULFILLED"), "notes" (list of strings), "courses" (list of [subject_code, course_code, credit]) and "blocks" (nested block reports).
Return ONLY the JSON object."#;

/// Sends the request document to an [`LlmClient`] and decodes the report.
pub struct LlmMatchingEngine<C: LlmClient> {
    client: C,
    max_tokens: u32,
    temperature: f32,
}

impl<C: LlmClient> LlmMatchingEngine<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
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

    pub fn client(&self) -> &C {
        &self.client
    }

    fn prompt_for(&self, request: &MatchRequest) -> ReportPrompt {
        ReportPrompt::new(AUDIT_INSTRUCTIONS, request.to_pretty_json())
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature)
    }
}

#[async_trait]
impl<C: LlmClient> MatchingEngine for LlmMatchingEngine<C> {
    fn name(&self) -> &str {
        self.client.provider()
    }

    async fn invoke(&self, request: &MatchRequest) -> Result<BlockReport, MatchingError> {
        let prompt = self.prompt_for(request);
        debug!(
            program = %request.program_details.name(),
            candidates = request.transcript.len(),
            prompt_len = prompt.document.len(),
            "Sending matching request"
        );

        let started = Instant::now();
        let report = self.client.complete_report(&prompt).await?;

        info!(
            program = %request.program_details.name(),
            model = %self.client.model(),
            status = ?report.status,
            duration_ms = started.elapsed().as_millis() as u64,
            "Matching response received"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{BlockType, RequirementBlock};
    use crate::report::ReportStatus;
    use std::sync::Mutex;

    struct CannedClient {
        answer: Result<String, MatchingError>,
        seen: Mutex<Vec<ReportPrompt>>,
    }

    impl CannedClient {
        fn answering(answer: &str) -> Self {
            Self {
                answer: Ok(answer.to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                answer: Err(MatchingError::Call("canned returned 503: unavailable".into())),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmClient for CannedClient {
        fn provider(&self) -> &str {
            "canned"
        }

        fn model(&self) -> &str {
            "canned-1"
        }

        async fn complete_json(&self, prompt: &ReportPrompt) -> Result<String, MatchingError> {
            self.seen.lock().unwrap().push(prompt.clone());
            self.answer.clone()
        }
    }

    fn request() -> MatchRequest {
        MatchRequest {
            program_details: RequirementBlock::builder("History Minor", BlockType::Program)
                .minimum_credit(18)
                .build()
                .unwrap(),
            transcript: vec![],
            reports: vec![],
        }
    }

    #[tokio::test]
    async fn test_decodes_wrapped_report() {
        let engine = LlmMatchingEngine::new(CannedClient::answering(
            "```json\n{\"name\": \"History Minor\", \"block_type\": \"PROGRAM\", \
             \"minimum_credit\": 18, \"received_credit\": 0, \"status\": \"UNFULFILLED\", \
             \"notes\": [\"overall need 18 more credits\"]}\n```",
        ));

        let report = engine.invoke(&request()).await.unwrap();
        assert_eq!(report.status, ReportStatus::Unfulfilled);
        assert_eq!(report.received_credit, Some(0));

        let seen = engine.client().seen.lock().unwrap();
        assert_eq!(seen[0].instructions, AUDIT_INSTRUCTIONS);
        assert!(seen[0].document.contains("\"program_details\""));
        assert_eq!(seen[0].temperature, 0.0);
    }

    #[tokio::test]
    async fn test_non_json_answer_is_malformed() {
        let engine = LlmMatchingEngine::new(CannedClient::answering("I cannot help with that."));
        let err = engine.invoke(&request()).await.unwrap_err();
        assert!(matches!(err, MatchingError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_api_error_is_call_error() {
        let engine = LlmMatchingEngine::new(CannedClient::failing());
        let err = engine.invoke(&request()).await.unwrap_err();
        assert!(matches!(err, MatchingError::Call(_)));
    }

    #[test]
    fn test_instructions_cover_audit_rules() {
        assert!(AUDIT_INSTRUCTIONS.contains("at most once"));
        assert!(AUDIT_INSTRUCTIONS.contains("REQUIRED blocks first"));
        assert!(AUDIT_INSTRUCTIONS.contains("lower-level"));
    }
}
