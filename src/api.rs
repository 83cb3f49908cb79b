//! HTTP surface for the MTO driving-regulations assistant.
//!
//! This module exposes a compact Axum router:
//!
//! - `POST /api/rag/query` – Answer a question about Ontario driving rules. Accepts
//!   `{ "question": string, "options": { "maxSources", "includeMetadata", "temperature" } }` and
//!   returns `{ "success": true, "data": { "answer", "sources", "metadata" } }`.
//! - `GET /api/rag/stats` – Corpus information plus running query statistics.
//! - `GET /api/rag/categories` – Categories the corpus is organised into.
//! - `GET /api/health` – Liveness plus the startup probe result.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! Input validation happens here; the orchestrator trusts what it receives.

use crate::rag::{
    QueryError, QueryMetadata, QueryOptions, RagService, ServiceStats, SourceExcerpt, SystemHealth,
    ValidationError, validate_question,
};
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Build the HTTP router exposing the question-answering surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: RagService + 'static,
{
    Router::new()
        .route("/api/rag/query", post(query::<S>))
        .route("/api/rag/stats", get(get_stats::<S>))
        .route("/api/rag/categories", get(get_categories::<S>))
        .route("/api/health", get(get_health::<S>))
        .route("/commands", get(get_commands))
        .with_state(service)
}

/// Successful response envelope.
#[derive(Serialize)]
struct Envelope<T> {
    success: bool,
    data: T,
}

impl<T> Envelope<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

/// Request body for `POST /api/rag/query`.
#[derive(Deserialize)]
struct QueryRequest {
    /// Question to answer, forwarded exactly as submitted.
    question: String,
    /// Optional per-query options; omitted fields take their defaults.
    #[serde(default)]
    options: QueryOptions,
}

/// Payload of a successful query response.
#[derive(Serialize)]
struct QueryResponse {
    answer: String,
    sources: Vec<SourceExcerpt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<QueryMetadata>,
}

/// Answer a question through the orchestrator.
async fn query<S>(
    State(service): State<Arc<S>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<Envelope<QueryResponse>>, AppError>
where
    S: RagService,
{
    let Json(request) = payload.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    validate_question(&request.question)?;
    request.options.validate()?;

    let include_metadata = request.options.include_metadata;
    let result = service.query(&request.question, request.options).await?;
    Ok(Envelope::ok(QueryResponse {
        answer: result.answer,
        sources: result.sources,
        metadata: include_metadata.then_some(result.metadata),
    }))
}

/// Return corpus information and running statistics.
async fn get_stats<S>(State(service): State<Arc<S>>) -> Json<Envelope<ServiceStats>>
where
    S: RagService,
{
    Envelope::ok(service.stats())
}

/// Return the corpus categories.
async fn get_categories<S>(State(service): State<Arc<S>>) -> Json<Envelope<Vec<String>>>
where
    S: RagService,
{
    Envelope::ok(service.stats().categories)
}

/// Response body for `GET /api/health`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    system_health: SystemHealth,
}

async fn get_health<S>(State(service): State<Arc<S>>) -> Json<Envelope<HealthResponse>>
where
    S: RagService,
{
    let system_health = service.stats().system_health;
    Envelope::ok(HealthResponse {
        status: match system_health {
            SystemHealth::Healthy => "ok",
            SystemHealth::Unhealthy => "degraded",
        },
        system_health,
    })
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "query",
                method: "POST",
                path: "/api/rag/query",
                description: "Answer a question about Ontario driving rules from the MTO handbook. Response returns { \"success\": true, \"data\": { \"answer\", \"sources\", \"metadata\" } }.",
                request_example: Some(json!({
                    "question": "What is the speed limit on highways in Ontario?",
                    "options": {
                        "maxSources": 5,
                        "includeMetadata": true,
                        "temperature": 0.1
                    }
                })),
            },
            CommandDescriptor {
                name: "stats",
                method: "GET",
                path: "/api/rag/stats",
                description: "Return corpus size, categories, query count, average query time and system health.",
                request_example: None,
            },
            CommandDescriptor {
                name: "categories",
                method: "GET",
                path: "/api/rag/categories",
                description: "Return the categories the handbook corpus is organised into.",
                request_example: None,
            },
            CommandDescriptor {
                name: "health",
                method: "GET",
                path: "/api/health",
                description: "Report liveness and whether the answering backend passed its startup probe.",
                request_example: None,
            },
        ],
    })
}

enum AppError {
    Validation(String),
    Query(QueryError),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Query(QueryError::ServiceNotInitialized) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Query(QueryError::QueryTimeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            Self::Query(
                QueryError::ProtocolViolation(_) | QueryError::ExternalBackendError { .. },
            ) => StatusCode::BAD_GATEWAY,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Query(err) => err.code(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let message = match &self {
            Self::Validation(message) => message.clone(),
            Self::Query(err) => err.to_string(),
        };
        let body = json!({
            "success": false,
            "error": { "code": code, "message": message }
        });
        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(inner: ValidationError) -> Self {
        Self::Validation(inner.to_string())
    }
}

impl From<QueryError> for AppError {
    fn from(inner: QueryError) -> Self {
        Self::Query(inner)
    }
}
