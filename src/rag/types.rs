//! Domain types and error definitions for the query pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum question length accepted at the service boundary.
pub const MAX_QUESTION_CHARS: usize = 1000;
/// Inclusive bounds for [`QueryOptions::max_sources`].
pub const MAX_SOURCES_RANGE: std::ops::RangeInclusive<usize> = 1..=10;
/// Excerpts longer than this many characters are truncated.
pub const EXCERPT_MAX_CHARS: usize = 500;
/// Marker appended to truncated excerpts.
pub const ELLIPSIS: &str = "...";

/// Per-query options forwarded to the answering backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryOptions {
    /// Upper bound on returned sources.
    pub max_sources: usize,
    /// Whether callers want the metadata block in responses.
    pub include_metadata: bool,
    /// Sampling temperature passed through to the backend.
    pub temperature: f32,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            max_sources: 5,
            include_metadata: true,
            temperature: 0.1,
        }
    }
}

impl QueryOptions {
    /// Check the options against the accepted ranges.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !MAX_SOURCES_RANGE.contains(&self.max_sources) {
            return Err(ValidationError::MaxSourcesOutOfRange(self.max_sources));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(ValidationError::TemperatureOutOfRange);
        }
        Ok(())
    }
}

/// Rejections raised before a question reaches the orchestrator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Question was empty after trimming.
    #[error("Question is required")]
    EmptyQuestion,
    /// Question exceeded [`MAX_QUESTION_CHARS`].
    #[error("Question must be at most 1000 characters")]
    QuestionTooLong,
    /// `maxSources` fell outside [`MAX_SOURCES_RANGE`].
    #[error("maxSources must be between 1 and 10 (got {0})")]
    MaxSourcesOutOfRange(usize),
    /// `temperature` fell outside `0..=1`.
    #[error("temperature must be between 0 and 1")]
    TemperatureOutOfRange,
}

/// Check that `question` is non-blank and, once trimmed, within [`MAX_QUESTION_CHARS`].
///
/// The question itself is left untouched; callers forward it as submitted.
pub fn validate_question(question: &str) -> Result<(), ValidationError> {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyQuestion);
    }
    if trimmed.chars().count() > MAX_QUESTION_CHARS {
        return Err(ValidationError::QuestionTooLong);
    }
    Ok(())
}

/// A supporting excerpt returned alongside an answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceExcerpt {
    /// Excerpt text, truncated to [`EXCERPT_MAX_CHARS`] plus [`ELLIPSIS`].
    pub content: String,
    /// Handbook page the excerpt came from.
    pub page: i64,
    /// Backend relevance score, preserved as reported.
    pub score: f64,
    /// Optional topical category of the excerpt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Classification and timing data attached to a result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryMetadata {
    /// Topical category detected for the question.
    pub category: String,
    /// Retrieval methods the backend used.
    pub methods: Vec<String>,
    /// Wall time measured by the orchestrator.
    pub query_time_ms: f64,
    /// Number of chunks the backend considered.
    pub chunks_processed: u64,
}

/// Normalized answer returned to the HTTP layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    /// Generated answer text.
    pub answer: String,
    /// Supporting excerpts in backend order.
    pub sources: Vec<SourceExcerpt>,
    /// Classification and timing data.
    pub metadata: QueryMetadata,
}

/// Caller-visible failures of a query.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// The startup probe failed; no backend is dispatched.
    #[error("RAG service is not initialized")]
    ServiceNotInitialized,
    /// The backend did not finish before the deadline and was terminated.
    #[error("Query timed out after {timeout_ms} ms")]
    QueryTimeout {
        /// Deadline that elapsed.
        timeout_ms: u64,
    },
    /// The backend output held no well-formed result or error region.
    #[error("Backend output violated the result protocol: {0}")]
    ProtocolViolation(String),
    /// The backend reported its own failure.
    #[error("Backend reported {kind}: {message}")]
    ExternalBackendError {
        /// Message reported by the backend.
        message: String,
        /// Backend error classification.
        kind: String,
    },
}

impl QueryError {
    /// Stable code surfaced to clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ServiceNotInitialized => "SERVICE_NOT_INITIALIZED",
            Self::QueryTimeout { .. } => "QUERY_TIMEOUT",
            Self::ProtocolViolation(_) => "PROTOCOL_VIOLATION",
            Self::ExternalBackendError { .. } => "BACKEND_ERROR",
        }
    }
}

/// Truncate excerpt content to [`EXCERPT_MAX_CHARS`] characters, appending [`ELLIPSIS`].
pub fn truncate_excerpt(content: &str) -> String {
    match content.char_indices().nth(EXCERPT_MAX_CHARS) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &content[..cut]),
        None => content.to_string(),
    }
}
