//! Audit orchestrator implementation.

use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::config::Config;
use crate::fetcher::{FetchOutcome, FetchPipeline};
use crate::matching::{create_matching_engine, MatchingEngine};
use crate::processor::{AuditLedger, ProgramProcessor};
use crate::program::ProgramCatalog;
use crate::transcript::Transcript;

use super::types::{AuditError, AuditResponse};

/// Runs a whole audit: fetch every program, then process them one by one.
///
/// Fetching is concurrent; processing is strictly sequential because every
/// matching call must see the reports and claimed courses of the programs
/// before it.
#[derive(Clone)]
pub struct AuditOrchestrator {
    pipeline: FetchPipeline,
    engine: Arc<dyn MatchingEngine>,
    max_retries: u32,
}

impl AuditOrchestrator {
    pub fn new(pipeline: FetchPipeline, engine: Arc<dyn MatchingEngine>, max_retries: u32) -> Self {
        Self {
            pipeline,
            engine,
            max_retries,
        }
    }

    /// Build the fetch pipeline and matching engine selected by `config`.
    pub fn from_config(
        config: &Config,
        catalog: Arc<dyn ProgramCatalog>,
    ) -> Result<Self, AuditError> {
        let pipeline = FetchPipeline::from_config(&config.fetch, catalog)
            .map_err(|e| AuditError::Config(e.to_string()))?;
        let engine = create_matching_engine(&config.matching)
            .map_err(|e| AuditError::Config(e.to_string()))?;
        Ok(Self::new(pipeline, engine, config.matching.max_retries))
    }

    /// Program titles the configured fetch source can resolve.
    pub fn known_titles(&self) -> Vec<String> {
        self.pipeline.source().titles()
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Audit `transcript` against each of its programs.
    ///
    /// Returns every report, or the first error. Nothing partial is returned.
    pub async fn run(&self, transcript: &Transcript) -> Result<AuditResponse, AuditError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("audit", run_id = %run_id);
        self.run_inner(transcript).instrument(span).await
    }

    async fn run_inner(&self, transcript: &Transcript) -> Result<AuditResponse, AuditError> {
        let titles = transcript.program_titles();
        if titles.is_empty() {
            return Err(AuditError::NoPrograms);
        }

        let started = Instant::now();
        info!(
            programs = titles.len(),
            courses = transcript.courses().len(),
            engine = self.engine.name(),
            "Starting audit"
        );

        let outcome = self.pipeline.fetch_all(titles.to_vec()).await?;
        ensure_all_fetched(&outcome)?;

        let mut ledger = AuditLedger::new();
        for title in titles {
            let tree = outcome
                .tree_for(title)
                .ok_or_else(|| AuditError::ProgramsUnavailable {
                    failed: vec![title.clone()],
                    details: "missing from fetch outcome".to_string(),
                })?;

            let mut processor = ProgramProcessor::new(Arc::clone(&self.engine), self.max_retries);
            processor
                .process(tree, transcript, &mut ledger)
                .await
                .map_err(|source| {
                    error!(program = %title, error = %source, "Aborting audit");
                    AuditError::Program {
                        title: title.clone(),
                        source,
                    }
                })?;
        }

        info!(
            reports = ledger.len(),
            courses_claimed = ledger.claimed().len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Audit complete"
        );

        Ok(AuditResponse {
            reports: ledger.into_reports(),
        })
    }
}

fn ensure_all_fetched(outcome: &FetchOutcome) -> Result<(), AuditError> {
    if outcome.failed.is_empty() {
        return Ok(());
    }

    let failed = outcome
        .failed_titles()
        .into_iter()
        .map(String::from)
        .collect();
    let details = outcome
        .failed
        .iter()
        .map(|f| format!("{}: {} ({} attempt(s))", f.title, f.error, f.attempts))
        .collect::<Vec<_>>()
        .join("; ");
    error!(details = %details, "Programs could not be fetched");

    Err(AuditError::ProgramsUnavailable { failed, details })
}
