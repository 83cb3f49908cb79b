//! Query orchestration: dispatch, deadline, outcome classification, statistics and history.

use crate::{
    config::{BackendKind, Config},
    rag::{
        backend::{
            AnswerBackend, BackendCommand, BackendError, BackendRequest, ExternalProcessBackend,
            MockKeywordBackend,
        },
        history::{QueryLog, QueryLogEntry, query_log_from_config},
        protocol::{ParsedOutcome, ResultPayload},
        types::{QueryError, QueryMetadata, QueryOptions, QueryResult, SourceExcerpt, truncate_excerpt},
    },
    stats::RunningStatistics,
};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;

/// Extra time granted to a backend past the deadline before the orchestrator abandons it.
/// Backends that enforce the deadline themselves always resolve first.
const DEADLINE_GRACE: Duration = Duration::from_millis(250);

/// Horizon used when a configured timeout does not fit in an [`Instant`].
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

const DEFAULT_CATEGORY: &str = "general";

/// Static description of the knowledge corpus behind the backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorpusInfo {
    /// Number of chunks in the corpus.
    pub total_chunks: u64,
    /// Categories the corpus is organised into.
    pub categories: Vec<String>,
}

/// Tunables for a [`QueryOrchestrator`].
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Hard deadline per query, measured from dispatch start.
    pub query_timeout: Duration,
    /// Optional cap on concurrently dispatched queries; `None` admits everything.
    pub max_concurrent_queries: Option<usize>,
    /// Corpus description reported by stats.
    pub corpus: CorpusInfo,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_secs(60),
            max_concurrent_queries: None,
            corpus: CorpusInfo::default(),
        }
    }
}

impl From<&Config> for OrchestratorSettings {
    fn from(config: &Config) -> Self {
        Self {
            query_timeout: config.query_timeout(),
            max_concurrent_queries: config.max_concurrent_queries,
            corpus: CorpusInfo {
                total_chunks: config.total_chunks,
                categories: config.categories.clone(),
            },
        }
    }
}

/// Health derived from the startup probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemHealth {
    /// The backend runtime answered the probe.
    Healthy,
    /// The probe failed; queries are refused.
    Unhealthy,
}

/// Statistics view exposed to the HTTP layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStats {
    /// Number of chunks in the corpus.
    pub total_chunks: u64,
    /// Corpus categories.
    pub categories: Vec<String>,
    /// Mean query time in milliseconds; zero before the first query.
    #[serde(rename = "averageQueryTime")]
    pub average_query_time_ms: f64,
    /// Number of recorded query attempts.
    pub total_queries: u64,
    /// Initialization state of the orchestrator.
    pub system_health: SystemHealth,
}

/// Abstraction over the orchestrator used by external surfaces (HTTP, MCP, CLI).
#[async_trait]
pub trait RagService: Send + Sync {
    /// Answer a question.
    async fn query(&self, question: &str, options: QueryOptions)
    -> Result<QueryResult, QueryError>;

    /// Report running statistics.
    fn stats(&self) -> ServiceStats;
}

/// Single entry point that turns questions into [`QueryResult`]s.
///
/// Construct once near process start with [`QueryOrchestrator::initialize`] and share it through
/// an `Arc`. The startup probe decides, once, whether queries are served at all.
pub struct QueryOrchestrator {
    backend: Arc<dyn AnswerBackend>,
    history: Arc<dyn QueryLog>,
    stats: Arc<RunningStatistics>,
    settings: OrchestratorSettings,
    admission: Option<Arc<Semaphore>>,
    initialized: bool,
}

impl QueryOrchestrator {
    /// Probe the backend and build the orchestrator.
    ///
    /// A failed probe does not fail construction: the orchestrator comes up in the
    /// not-initialized state and refuses every query without dispatching.
    pub async fn initialize(
        backend: Arc<dyn AnswerBackend>,
        history: Arc<dyn QueryLog>,
        stats: Arc<RunningStatistics>,
        settings: OrchestratorSettings,
    ) -> Self {
        let initialized = match backend.probe().await {
            Ok(()) => {
                tracing::info!(backend = backend.name(), "Answer backend probe succeeded");
                true
            }
            Err(err) => {
                tracing::error!(
                    backend = backend.name(),
                    error = %err,
                    "Answer backend probe failed; queries will be refused"
                );
                false
            }
        };
        let admission = settings
            .max_concurrent_queries
            .map(|limit| Arc::new(Semaphore::new(limit)));

        Self {
            backend,
            history,
            stats,
            settings,
            admission,
            initialized,
        }
    }

    /// Build the backend, history sink and statistics described by the configuration.
    pub async fn from_config(config: &Config) -> Self {
        let backend: Arc<dyn AnswerBackend> = match config.backend {
            BackendKind::Process => Arc::new(ExternalProcessBackend::new(
                BackendCommand::python_engine(config.runtime.clone(), config.engine_dir.clone())
                    .with_probe_timeout(config.probe_timeout()),
            )),
            BackendKind::Mock => Arc::new(MockKeywordBackend::new()),
        };
        Self::initialize(
            backend,
            query_log_from_config(config),
            Arc::new(RunningStatistics::new()),
            OrchestratorSettings::from(config),
        )
        .await
    }

    /// Whether the startup probe succeeded.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Answer `question`, or fail with exactly one [`QueryError`].
    pub async fn query(
        &self,
        question: &str,
        options: QueryOptions,
    ) -> Result<QueryResult, QueryError> {
        if !self.initialized {
            tracing::warn!("Query refused: service not initialized");
            return Err(QueryError::ServiceNotInitialized);
        }

        let started = Instant::now();
        tracing::debug!(
            backend = self.backend.name(),
            max_sources = options.max_sources,
            "Dispatching query"
        );
        let outcome = self.dispatch(question, &options, started).await;
        let elapsed_ms = elapsed_ms(started);

        match &outcome {
            Ok(result) => {
                self.stats.record_query(result.metadata.query_time_ms);
                tracing::info!(
                    elapsed_ms = result.metadata.query_time_ms,
                    sources = result.sources.len(),
                    category = %result.metadata.category,
                    "Query completed"
                );
                self.persist(question, result);
            }
            Err(err) => {
                self.stats.record_query(elapsed_ms);
                tracing::warn!(code = err.code(), elapsed_ms, error = %err, "Query failed");
            }
        }
        outcome
    }

    /// Report corpus information alongside running statistics.
    pub fn stats(&self) -> ServiceStats {
        let snapshot = self.stats.snapshot();
        ServiceStats {
            total_chunks: self.settings.corpus.total_chunks,
            categories: self.settings.corpus.categories.clone(),
            average_query_time_ms: snapshot.average_query_time_ms(),
            total_queries: snapshot.query_count,
            system_health: if self.initialized {
                SystemHealth::Healthy
            } else {
                SystemHealth::Unhealthy
            },
        }
    }

    async fn dispatch(
        &self,
        question: &str,
        options: &QueryOptions,
        started: Instant,
    ) -> Result<QueryResult, QueryError> {
        let deadline = deadline_after(started, self.settings.query_timeout);
        let timeout = QueryError::QueryTimeout {
            timeout_ms: self.settings.query_timeout.as_millis() as u64,
        };

        let _permit = match &self.admission {
            Some(semaphore) => Some(
                tokio::time::timeout_at(deadline, Arc::clone(semaphore).acquire_owned())
                    .await
                    .map_err(|_| timeout.clone())?
                    .map_err(|_| QueryError::ExternalBackendError {
                        message: "admission queue closed".into(),
                        kind: "BackendUnavailable".into(),
                    })?,
            ),
            None => None,
        };

        let request = BackendRequest {
            question: question.to_string(),
            max_sources: options.max_sources,
            temperature: options.temperature,
            deadline,
        };
        let outcome =
            match tokio::time::timeout_at(deadline_after(deadline, DEADLINE_GRACE), self.backend.answer(request))
                .await
            {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(BackendError::Timeout)) | Err(_) => return Err(timeout),
                Ok(Err(BackendError::Protocol(message))) => {
                    return Err(QueryError::ProtocolViolation(message));
                }
                Ok(Err(BackendError::Unavailable(message))) => {
                    return Err(QueryError::ExternalBackendError {
                        message,
                        kind: "BackendUnavailable".into(),
                    });
                }
            };

        match outcome {
            ParsedOutcome::Error(payload) => Err(QueryError::ExternalBackendError {
                message: payload.error,
                kind: payload.kind,
            }),
            ParsedOutcome::NotFound => Err(QueryError::ProtocolViolation(
                "backend output contained no result or error region".into(),
            )),
            ParsedOutcome::Result(payload) if !payload.success => {
                Err(QueryError::ExternalBackendError {
                    message: payload
                        .error
                        .unwrap_or_else(|| "backend reported failure".into()),
                    kind: payload.error_type.unwrap_or_else(|| "UnknownError".into()),
                })
            }
            ParsedOutcome::Result(payload) => Ok(build_result(
                payload,
                options.max_sources,
                elapsed_ms(started),
            )),
        }
    }

    fn persist(&self, question: &str, result: &QueryResult) {
        let entry = QueryLogEntry::new(question, result, result.metadata.query_time_ms);
        let history = Arc::clone(&self.history);
        tokio::spawn(async move {
            if let Err(err) = history.record(&entry).await {
                tracing::warn!(id = %entry.id, error = %err, "Failed to persist query history");
            }
        });
    }
}

#[async_trait]
impl RagService for QueryOrchestrator {
    async fn query(
        &self,
        question: &str,
        options: QueryOptions,
    ) -> Result<QueryResult, QueryError> {
        QueryOrchestrator::query(self, question, options).await
    }

    fn stats(&self) -> ServiceStats {
        QueryOrchestrator::stats(self)
    }
}

fn build_result(payload: ResultPayload, max_sources: usize, query_time_ms: f64) -> QueryResult {
    let sources = payload
        .sources
        .into_iter()
        .take(max_sources)
        .map(|source| SourceExcerpt {
            content: truncate_excerpt(&source.content),
            page: source.page,
            score: source.score,
            category: source.category,
        })
        .collect();
    let category = payload
        .category
        .filter(|category| !category.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

    QueryResult {
        answer: payload.answer,
        sources,
        metadata: QueryMetadata {
            category,
            methods: payload.methods,
            query_time_ms,
            chunks_processed: payload.chunks_processed,
        },
    }
}

/// `start + budget`, saturating to a far-future instant instead of overflowing.
fn deadline_after(start: Instant, budget: Duration) -> Instant {
    start
        .checked_add(budget)
        .or_else(|| start.checked_add(FAR_FUTURE))
        .unwrap_or(start)
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::history::{HistoryError, NoopQueryLog};
    use crate::rag::protocol::{ErrorPayload, SourcePayload};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    struct ScriptedBackend {
        probe: Result<(), BackendError>,
        outcome: Result<ParsedOutcome, BackendError>,
        delay: Duration,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ScriptedBackend {
        fn returning(outcome: Result<ParsedOutcome, BackendError>) -> Self {
            Self {
                probe: Ok(()),
                outcome,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn with_failed_probe(mut self) -> Self {
            self.probe = Err(BackendError::Unavailable("python3 not found".into()));
            self
        }
    }

    #[async_trait]
    impl AnswerBackend for ScriptedBackend {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn probe(&self) -> Result<(), BackendError> {
            self.probe.clone()
        }

        async fn answer(&self, _request: BackendRequest) -> Result<ParsedOutcome, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    struct ChannelLog(mpsc::UnboundedSender<QueryLogEntry>);

    #[async_trait]
    impl QueryLog for ChannelLog {
        async fn record(&self, entry: &QueryLogEntry) -> Result<(), HistoryError> {
            let _ = self.0.send(entry.clone());
            Ok(())
        }
    }

    struct FailingLog;

    #[async_trait]
    impl QueryLog for FailingLog {
        async fn record(&self, _entry: &QueryLogEntry) -> Result<(), HistoryError> {
            Err(HistoryError::Io(std::io::Error::other("disk full")))
        }
    }

    fn success_payload(source_count: usize) -> ResultPayload {
        ResultPayload {
            success: true,
            answer: "100 km/h".into(),
            sources: (0..source_count)
                .map(|index| SourcePayload {
                    content: format!("excerpt {index}"),
                    page: index as i64,
                    score: 1.0 - index as f64 / 10.0,
                    category: Some("speed_limits".into()),
                })
                .collect(),
            category: Some("speed_limits".into()),
            methods: vec!["optimized_bm25".into()],
            query_time: 1.2,
            chunks_processed: 40,
            error: None,
            error_type: None,
        }
    }

    async fn orchestrator_with(
        backend: Arc<ScriptedBackend>,
        history: Arc<dyn QueryLog>,
        settings: OrchestratorSettings,
    ) -> QueryOrchestrator {
        QueryOrchestrator::initialize(
            backend,
            history,
            Arc::new(RunningStatistics::new()),
            settings,
        )
        .await
    }

    async fn orchestrator(backend: Arc<ScriptedBackend>) -> QueryOrchestrator {
        orchestrator_with(backend, Arc::new(NoopQueryLog), OrchestratorSettings::default()).await
    }

    #[tokio::test]
    async fn failed_probe_refuses_queries_without_dispatch() {
        let backend = Arc::new(
            ScriptedBackend::returning(Ok(ParsedOutcome::Result(success_payload(1))))
                .with_failed_probe(),
        );
        let orchestrator = orchestrator(Arc::clone(&backend)).await;

        let err = orchestrator
            .query("speed?", QueryOptions::default())
            .await
            .expect_err("not initialized");
        assert_eq!(err, QueryError::ServiceNotInitialized);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);

        let stats = orchestrator.stats();
        assert_eq!(stats.system_health, SystemHealth::Unhealthy);
        assert_eq!(stats.total_queries, 0);
        assert_eq!(stats.average_query_time_ms, 0.0);
    }

    #[tokio::test]
    async fn sources_are_capped_and_order_preserved() {
        let backend = Arc::new(ScriptedBackend::returning(Ok(ParsedOutcome::Result(
            success_payload(8),
        ))));
        let orchestrator = orchestrator(backend).await;
        let options = QueryOptions {
            max_sources: 3,
            ..QueryOptions::default()
        };

        let result = orchestrator.query("speed?", options).await.expect("result");
        let pages: Vec<i64> = result.sources.iter().map(|source| source.page).collect();
        assert_eq!(pages, vec![0, 1, 2]);
        assert_eq!(result.sources[1].score, 0.9);
        assert_eq!(result.metadata.category, "speed_limits");
        assert_eq!(result.metadata.chunks_processed, 40);
    }

    #[tokio::test]
    async fn long_excerpts_are_truncated() {
        let mut payload = success_payload(1);
        payload.sources[0].content = "x".repeat(600);
        let backend = Arc::new(ScriptedBackend::returning(Ok(ParsedOutcome::Result(payload))));
        let orchestrator = orchestrator(backend).await;

        let result = orchestrator
            .query("speed?", QueryOptions::default())
            .await
            .expect("result");
        assert_eq!(result.sources[0].content.chars().count(), 503);
        assert!(result.sources[0].content.ends_with("..."));
    }

    #[tokio::test]
    async fn missing_category_defaults_to_general() {
        let mut payload = success_payload(0);
        payload.category = None;
        let backend = Arc::new(ScriptedBackend::returning(Ok(ParsedOutcome::Result(payload))));
        let orchestrator = orchestrator(backend).await;

        let result = orchestrator
            .query("anything", QueryOptions::default())
            .await
            .expect("result");
        assert_eq!(result.metadata.category, "general");
    }

    #[tokio::test]
    async fn error_region_becomes_backend_error() {
        let backend = Arc::new(ScriptedBackend::returning(Ok(ParsedOutcome::Error(
            ErrorPayload {
                success: false,
                error: "boom".into(),
                kind: "ValueError".into(),
            },
        ))));
        let orchestrator = orchestrator(backend).await;

        let err = orchestrator
            .query("q", QueryOptions::default())
            .await
            .expect_err("backend error");
        assert_eq!(
            err,
            QueryError::ExternalBackendError {
                message: "boom".into(),
                kind: "ValueError".into(),
            }
        );
    }

    #[tokio::test]
    async fn unsuccessful_result_becomes_backend_error() {
        let mut payload = success_payload(0);
        payload.success = false;
        payload.error = Some("index missing".into());
        let backend = Arc::new(ScriptedBackend::returning(Ok(ParsedOutcome::Result(payload))));
        let orchestrator = orchestrator(backend).await;

        let err = orchestrator
            .query("q", QueryOptions::default())
            .await
            .expect_err("backend error");
        assert!(matches!(
            err,
            QueryError::ExternalBackendError { ref message, ref kind }
                if message == "index missing" && kind == "UnknownError"
        ));
    }

    #[tokio::test]
    async fn missing_region_is_protocol_violation() {
        let backend = Arc::new(ScriptedBackend::returning(Ok(ParsedOutcome::NotFound)));
        let orchestrator = orchestrator(backend).await;

        let err = orchestrator
            .query("q", QueryOptions::default())
            .await
            .expect_err("protocol violation");
        assert_eq!(err.code(), "PROTOCOL_VIOLATION");
    }

    #[tokio::test(start_paused = true)]
    async fn hung_backend_times_out_at_the_deadline() {
        let backend = Arc::new(
            ScriptedBackend::returning(Ok(ParsedOutcome::NotFound))
                .with_delay(Duration::from_secs(3_600)),
        );
        let orchestrator = orchestrator(backend).await;

        let started = Instant::now();
        let err = orchestrator
            .query("q", QueryOptions::default())
            .await
            .expect_err("timeout");
        assert_eq!(err, QueryError::QueryTimeout { timeout_ms: 60_000 });
        assert!(started.elapsed() <= Duration::from_secs(60) + DEADLINE_GRACE);
        assert_eq!(orchestrator.stats().total_queries, 1);
    }

    #[tokio::test]
    async fn oversized_timeout_saturates_instead_of_panicking() {
        let backend = Arc::new(ScriptedBackend::returning(Ok(ParsedOutcome::Result(
            success_payload(2),
        ))));
        let settings = OrchestratorSettings {
            query_timeout: Duration::MAX,
            ..OrchestratorSettings::default()
        };
        let orchestrator = orchestrator_with(backend, Arc::new(NoopQueryLog), settings).await;

        let result = orchestrator
            .query("speed?", QueryOptions::default())
            .await
            .expect("result");
        assert_eq!(result.sources.len(), 2);

        let now = Instant::now();
        assert!(deadline_after(now, Duration::MAX) > now);
    }

    #[tokio::test]
    async fn every_dispatched_attempt_is_counted() {
        let ok = Arc::new(ScriptedBackend::returning(Ok(ParsedOutcome::Result(
            success_payload(1),
        ))));
        let orchestrator = orchestrator(ok).await;
        for _ in 0..3 {
            orchestrator
                .query("q", QueryOptions::default())
                .await
                .expect("result");
        }
        let stats = orchestrator.stats();
        assert_eq!(stats.total_queries, 3);
        assert_eq!(stats.system_health, SystemHealth::Healthy);

        let failing = Arc::new(ScriptedBackend::returning(Err(BackendError::Protocol(
            "bad".into(),
        ))));
        let failing_orchestrator = self::orchestrator(failing).await;
        let _ = failing_orchestrator
            .query("q", QueryOptions::default())
            .await;
        assert_eq!(failing_orchestrator.stats().total_queries, 1);
    }

    #[tokio::test]
    async fn successful_queries_are_persisted() {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let backend = Arc::new(ScriptedBackend::returning(Ok(ParsedOutcome::Result(
            success_payload(2),
        ))));
        let orchestrator = orchestrator_with(
            backend,
            Arc::new(ChannelLog(sender)),
            OrchestratorSettings::default(),
        )
        .await;

        orchestrator
            .query("What is the speed limit?", QueryOptions::default())
            .await
            .expect("result");
        let entry = tokio::time::timeout(Duration::from_secs(5), receiver.recv())
            .await
            .expect("history written")
            .expect("entry");
        assert_eq!(entry.question, "What is the speed limit?");
        assert_eq!(entry.source_count, 2);
    }

    #[tokio::test]
    async fn persistence_failure_does_not_fail_query() {
        let backend = Arc::new(ScriptedBackend::returning(Ok(ParsedOutcome::Result(
            success_payload(1),
        ))));
        let orchestrator =
            orchestrator_with(backend, Arc::new(FailingLog), OrchestratorSettings::default())
                .await;

        let result = orchestrator.query("q", QueryOptions::default()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn unbounded_by_default() {
        let backend = Arc::new(
            ScriptedBackend::returning(Ok(ParsedOutcome::Result(success_payload(1))))
                .with_delay(Duration::from_millis(200)),
        );
        let orchestrator = Arc::new(orchestrator(Arc::clone(&backend)).await);

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let orchestrator = Arc::clone(&orchestrator);
                tokio::spawn(async move {
                    orchestrator.query("q", QueryOptions::default()).await
                })
            })
            .collect();
        for handle in handles {
            handle.await.expect("join").expect("result");
        }
        assert_eq!(backend.peak.load(Ordering::SeqCst), 6);
        assert_eq!(orchestrator.stats().total_queries, 6);
    }

    #[tokio::test]
    async fn admission_limit_caps_in_flight_queries() {
        let backend = Arc::new(
            ScriptedBackend::returning(Ok(ParsedOutcome::Result(success_payload(1))))
                .with_delay(Duration::from_millis(100)),
        );
        let settings = OrchestratorSettings {
            max_concurrent_queries: Some(2),
            ..OrchestratorSettings::default()
        };
        let orchestrator =
            Arc::new(orchestrator_with(Arc::clone(&backend), Arc::new(NoopQueryLog), settings).await);

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let orchestrator = Arc::clone(&orchestrator);
                tokio::spawn(async move {
                    orchestrator.query("q", QueryOptions::default()).await
                })
            })
            .collect();
        for handle in handles {
            handle.await.expect("join").expect("result");
        }
        assert!(backend.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn stats_report_corpus_information() {
        let backend = Arc::new(ScriptedBackend::returning(Ok(ParsedOutcome::NotFound)));
        let settings = OrchestratorSettings {
            corpus: CorpusInfo {
                total_chunks: 412,
                categories: vec!["licensing".into(), "safety".into()],
            },
            ..OrchestratorSettings::default()
        };
        let orchestrator = orchestrator_with(backend, Arc::new(NoopQueryLog), settings).await;

        let stats = orchestrator.stats();
        assert_eq!(stats.total_chunks, 412);
        assert_eq!(stats.categories, vec!["licensing", "safety"]);
        let json = serde_json::to_value(&stats).expect("stats json");
        assert_eq!(json["systemHealth"], "healthy");
        assert_eq!(json["averageQueryTime"], 0.0);
    }
}
