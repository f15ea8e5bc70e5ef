//! Degree audit core.
//!
//! Resolves program titles into requirement trees, then walks the programs one at a
//! time through an external matching engine, threading the growing report list and
//! the set of already-claimed courses from one program to the next.

pub mod config;
pub mod fetcher;
pub mod matching;
pub mod orchestrator;
pub mod processor;
pub mod program;
pub mod report;
pub mod testing;
pub mod transcript;

pub use config::{
    load_config, load_config_from_str, validate_config, CatalogConfig, Config, ConfigError,
    SanitizedConfig, ServerConfig,
};
pub use fetcher::{
    CatalogSource, ExtractionSource, FailedFetch, FetchCompleteCallback, FetchConfig, FetchError,
    FetchHandle, FetchMode, FetchOutcome, FetchPipeline, FetchResult, FetchedProgram,
    HttpTaskService, ProgramSource, RetryPolicy, TaskRequest, TaskService, TaskServiceConfig,
    TaskServiceError, TaskState, TaskStatus,
};
pub use matching::{
    create_matching_engine, HeuristicMatchingEngine, LlmClient, LlmConfig, LlmMatchingEngine,
    LlmProvider, MatchRequest, MatchingConfig, MatchingEngine, MatchingError, MatchingMode,
};
pub use orchestrator::{AuditError, AuditOrchestrator, AuditResponse};
pub use processor::{AuditLedger, ProcessorError, ProcessorState, ProgramProcessor};
pub use program::{
    BlockType, CatalogError, CourseRef, ProgramCatalog, RequirementBlock, SchemaError,
    StaticCatalog,
};
pub use report::{validate_report, BlockReport, ReportStatus, ReportValidationError};
pub use transcript::{
    AuditRequest, CandidateCourse, ClaimedCourses, Course, CourseClaim, CourseInput, CourseKey,
    Transcript, TranscriptError,
};
