//! Question answering over the MTO driver's handbook.
//!
//! [`QueryOrchestrator`] is the single entry point: it dispatches each question to an
//! [`backend::AnswerBackend`], enforces the per-query deadline, classifies the outcome, records
//! statistics and hands successful results to the query history.

/// Answering backends (external process, keyword mock).
pub mod backend;
/// Best-effort query history sinks.
pub mod history;
mod orchestrator;
/// Marker-delimited result protocol.
pub mod protocol;
mod types;

pub use orchestrator::{
    CorpusInfo, OrchestratorSettings, QueryOrchestrator, RagService, ServiceStats, SystemHealth,
};
pub use types::{
    ELLIPSIS, EXCERPT_MAX_CHARS, MAX_QUESTION_CHARS, MAX_SOURCES_RANGE, QueryError, QueryMetadata,
    QueryOptions, QueryResult, SourceExcerpt, ValidationError, truncate_excerpt, validate_question,
};
