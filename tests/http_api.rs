//! HTTP router wired to a real orchestrator over the keyword backend.

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use mto_rag::{
    api::create_router,
    rag::{
        CorpusInfo, OrchestratorSettings, QueryOrchestrator, backend::MockKeywordBackend,
        history::{JsonlQueryLog, NoopQueryLog, QueryLog},
    },
    stats::RunningStatistics,
};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn app() -> Router {
    app_with_history(Arc::new(NoopQueryLog)).await
}

async fn app_with_history(history: Arc<dyn QueryLog>) -> Router {
    let orchestrator = QueryOrchestrator::initialize(
        Arc::new(MockKeywordBackend::new()),
        history,
        Arc::new(RunningStatistics::new()),
        OrchestratorSettings {
            corpus: CorpusInfo {
                total_chunks: 5,
                categories: vec!["licensing".into(), "speed_limits".into()],
            },
            ..OrchestratorSettings::default()
        },
    )
    .await;
    create_router(Arc::new(orchestrator))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("router response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    (status, serde_json::from_slice(&body).expect("json body"))
}

fn query_request(body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/rag/query")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

#[tokio::test]
async fn query_then_stats_reflects_the_attempt() {
    let app = app().await;

    let (status, json) = send(
        &app,
        query_request(json!({ "question": "What is the speed limit on highways in Ontario?" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    let sources = json["data"]["sources"].as_array().expect("sources");
    assert!(!sources.is_empty() && sources.len() <= 5);
    assert_eq!(json["data"]["metadata"]["category"], "speed_limits");
    assert!(json["data"]["metadata"]["queryTimeMs"].as_f64().is_some());

    let (status, json) = send(&app, get_request("/api/rag/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["totalQueries"], 1);
    assert_eq!(json["data"]["totalChunks"], 5);
    assert!(json["data"]["averageQueryTime"].as_f64().expect("average") >= 0.0);
    assert_eq!(json["data"]["systemHealth"], "healthy");
}

#[tokio::test]
async fn rejected_questions_are_not_counted() {
    let app = app().await;

    let (status, json) = send(&app, query_request(json!({ "question": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");

    let (_, json) = send(&app, get_request("/api/rag/stats")).await;
    assert_eq!(json["data"]["totalQueries"], 0);
    assert_eq!(json["data"]["averageQueryTime"], 0.0);
}

#[tokio::test]
async fn categories_come_from_corpus_settings() {
    let app = app().await;
    let (status, json) = send(&app, get_request("/api/rag/categories")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"], json!(["licensing", "speed_limits"]));
}

fn scratch_file(label: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("mto-rag-http-{label}-{}", uuid::Uuid::new_v4()))
        .join("history.jsonl")
}

#[tokio::test]
async fn padded_question_is_persisted_as_submitted() {
    let path = scratch_file("padded");
    let app = app_with_history(Arc::new(JsonlQueryLog::new(&path))).await;
    let submitted = "  What is the speed limit?\n";

    let (status, _) = send(&app, query_request(json!({ "question": submitted }))).await;
    assert_eq!(status, StatusCode::OK);

    let mut contents = String::new();
    for _ in 0..50 {
        contents = tokio::fs::read_to_string(&path).await.unwrap_or_default();
        if !contents.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    if let Some(dir) = path.parent() {
        let _ = tokio::fs::remove_dir_all(dir).await;
    }

    let entry: Value = serde_json::from_str(contents.lines().next().expect("history line"))
        .expect("json line");
    assert_eq!(entry["question"], submitted);
}
