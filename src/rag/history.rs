//! Best-effort query history sinks.
//!
//! The orchestrator hands every successful query to a [`QueryLog`] on a detached task. Failures
//! surface as [`HistoryError`] to that task only, where they are logged and dropped.

use crate::config::Config;
use crate::rag::types::QueryResult;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Errors raised while persisting query history.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Local file could not be written.
    #[error("failed to write query log: {0}")]
    Io(#[from] std::io::Error),
    /// Entry could not be serialized.
    #[error("failed to encode query log entry: {0}")]
    Encode(#[from] serde_json::Error),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// History endpoint responded with an unexpected status code.
    #[error("Unexpected history response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the endpoint.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

/// One persisted query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryLogEntry {
    /// Random identifier of the record.
    pub id: String,
    /// RFC 3339 time the record was created.
    pub timestamp: String,
    /// Question as submitted.
    pub question: String,
    /// Answer returned to the caller.
    pub answer: String,
    /// Detected category.
    pub category: String,
    /// Number of sources returned.
    pub source_count: usize,
    /// Orchestrator-measured duration.
    pub duration_ms: f64,
}

impl QueryLogEntry {
    /// Build a record for a completed query.
    pub fn new(question: &str, result: &QueryResult, duration_ms: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: current_timestamp_rfc3339(),
            question: question.to_string(),
            answer: result.answer.clone(),
            category: result.metadata.category.clone(),
            source_count: result.sources.len(),
            duration_ms,
        }
    }
}

fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Write-only durable log of past queries.
#[async_trait]
pub trait QueryLog: Send + Sync {
    /// Persist one entry.
    async fn record(&self, entry: &QueryLogEntry) -> Result<(), HistoryError>;
}

/// Sink that discards every entry.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopQueryLog;

#[async_trait]
impl QueryLog for NoopQueryLog {
    async fn record(&self, _entry: &QueryLogEntry) -> Result<(), HistoryError> {
        Ok(())
    }
}

/// Appends one JSON object per line to a local file.
pub struct JsonlQueryLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlQueryLog {
    /// Log into `path`, creating it on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl QueryLog for JsonlQueryLog {
    async fn record(&self, entry: &QueryLogEntry) -> Result<(), HistoryError> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Posts each entry as JSON to an HTTP endpoint.
pub struct HttpQueryLog {
    client: Client,
    url: String,
}

impl HttpQueryLog {
    /// Post entries to `url`.
    pub fn new(url: impl Into<String>) -> Result<Self, HistoryError> {
        let client = Client::builder().user_agent("mto-rag/0.1").build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl QueryLog for HttpQueryLog {
    async fn record(&self, entry: &QueryLogEntry) -> Result<(), HistoryError> {
        let response = self.client.post(&self.url).json(entry).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(HistoryError::UnexpectedStatus { status, body })
    }
}

/// Forwards each entry to several sinks, attempting all of them.
pub struct FanoutQueryLog {
    sinks: Vec<Box<dyn QueryLog>>,
}

#[async_trait]
impl QueryLog for FanoutQueryLog {
    async fn record(&self, entry: &QueryLogEntry) -> Result<(), HistoryError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(err) = sink.record(entry).await {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Build the history sink described by the configuration.
pub fn query_log_from_config(config: &Config) -> Arc<dyn QueryLog> {
    let mut sinks: Vec<Box<dyn QueryLog>> = Vec::new();
    if let Some(path) = &config.query_log_file {
        tracing::info!(path = %path.display(), "Recording query history to file");
        sinks.push(Box::new(JsonlQueryLog::new(path.clone())));
    }
    if let Some(url) = &config.query_log_url {
        match HttpQueryLog::new(url.clone()) {
            Ok(sink) => {
                tracing::info!(url = %url, "Recording query history over HTTP");
                sinks.push(Box::new(sink));
            }
            Err(err) => tracing::warn!(error = %err, "Query history endpoint disabled"),
        }
    }
    match sinks.len() {
        0 => Arc::new(NoopQueryLog),
        1 => Arc::from(sinks.remove(0)),
        _ => Arc::new(FanoutQueryLog { sinks }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::types::{QueryMetadata, SourceExcerpt};
    use httpmock::{Method::POST, MockServer};

    fn sample_entry(question: &str) -> QueryLogEntry {
        let result = QueryResult {
            answer: "Stop for flashing red lights.".into(),
            sources: vec![SourceExcerpt {
                content: "excerpt".into(),
                page: 70,
                score: 0.8,
                category: None,
            }],
            metadata: QueryMetadata {
                category: "traffic_rules".into(),
                methods: vec!["keyword_match".into()],
                query_time_ms: 12.5,
                chunks_processed: 5,
            },
        };
        QueryLogEntry::new(question, &result, 12.5)
    }

    #[test]
    fn entry_copies_result_fields() {
        let entry = sample_entry("school bus?");
        assert_eq!(entry.category, "traffic_rules");
        assert_eq!(entry.source_count, 1);
        assert!(entry.timestamp.contains('T') && entry.timestamp.ends_with('Z'));
        assert!(Uuid::parse_str(&entry.id).is_ok());
    }

    #[tokio::test]
    async fn jsonl_log_appends_one_line_per_entry() {
        let path = std::env::temp_dir()
            .join(format!("mto-rag-history-{}", Uuid::new_v4()))
            .join("queries.jsonl");
        let log = JsonlQueryLog::new(&path);
        log.record(&sample_entry("first")).await.expect("first write");
        log.record(&sample_entry("second")).await.expect("second write");

        let contents = tokio::fs::read_to_string(&path).await.expect("read log");
        let _ = tokio::fs::remove_dir_all(path.parent().expect("parent")).await;
        let questions: Vec<String> = contents
            .lines()
            .map(|line| {
                let value: serde_json::Value = serde_json::from_str(line).expect("json line");
                value["question"].as_str().unwrap_or_default().to_string()
            })
            .collect();
        assert_eq!(questions, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn http_log_posts_entry() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/history")
                    .body_contains("\"question\":\"school bus?\"");
                then.status(201);
            })
            .await;

        let log = HttpQueryLog::new(server.url("/history")).expect("client");
        log.record(&sample_entry("school bus?"))
            .await
            .expect("history accepted");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn http_log_surfaces_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/history");
                then.status(503).body("down");
            })
            .await;

        let log = HttpQueryLog::new(server.url("/history")).expect("client");
        let err = log
            .record(&sample_entry("q"))
            .await
            .expect_err("unavailable endpoint");
        assert!(matches!(
            err,
            HistoryError::UnexpectedStatus { status, .. } if status == StatusCode::SERVICE_UNAVAILABLE
        ));
    }
}
