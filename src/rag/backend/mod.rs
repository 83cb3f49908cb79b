//! Answer backend abstraction and its two implementations.
//!
//! The orchestrator only sees [`AnswerBackend`]: a request goes in, a decoded
//! [`ParsedOutcome`](crate::rag::protocol::ParsedOutcome) comes out. How the
//! backend is reached (a spawned interpreter speaking the marker protocol, or an
//! in-process keyword table) stays behind the trait.

mod mock;
mod process;

use crate::rag::protocol::ParsedOutcome;
use async_trait::async_trait;
use thiserror::Error;
use tokio::time::Instant;

pub use mock::MockKeywordBackend;
pub use process::{BackendCommand, ExternalProcessBackend};

/// Everything a backend needs to answer one question.
#[derive(Debug, Clone)]
pub struct BackendRequest {
    /// Question text exactly as submitted.
    pub question: String,
    /// Maximum number of sources the backend should produce.
    pub max_sources: usize,
    /// Sampling temperature.
    pub temperature: f32,
    /// Instant after which the backend must give up.
    pub deadline: Instant,
}

/// Transport-level failures of a backend call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    /// The deadline elapsed; any spawned process has been terminated.
    #[error("backend did not finish before the deadline")]
    Timeout,
    /// Output could not be decoded as a marker region.
    #[error("{0}")]
    Protocol(String),
    /// The backend could not be reached at all.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Capability that turns a question into a protocol outcome.
#[async_trait]
pub trait AnswerBackend: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    /// Verify the backend's execution environment is reachable.
    async fn probe(&self) -> Result<(), BackendError> {
        Ok(())
    }

    /// Dispatch one question and return the decoded outcome.
    async fn answer(&self, request: BackendRequest) -> Result<ParsedOutcome, BackendError>;
}
