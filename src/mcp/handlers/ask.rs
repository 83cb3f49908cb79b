//! MCP handler for the question-answering tool.

use std::sync::Arc;

use crate::{
    mcp::format::to_structured,
    rag::{QueryOptions, RagService, validate_question},
};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, JsonObject},
};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use super::parse_arguments;

/// Request payload accepted by the `ask` tool.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct AskToolRequest {
    /// Question about Ontario driving rules, e.g. "How do I get my G1 licence?".
    #[schemars(length(min = 1, max = 1000))]
    pub(crate) question: String,
    /// Maximum number of handbook excerpts to return (defaults to 5).
    #[serde(default)]
    #[schemars(range(min = 1, max = 10))]
    pub(crate) max_sources: Option<usize>,
}

/// Handle the `ask` tool by running the question through the orchestrator.
pub(crate) async fn handle_ask(
    service: &Arc<dyn RagService>,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let args: AskToolRequest = parse_arguments(arguments)?;
    validate_question(&args.question)
        .map_err(|err| McpError::invalid_params(err.to_string(), None))?;

    let defaults = QueryOptions::default();
    let options = QueryOptions {
        max_sources: args.max_sources.unwrap_or(defaults.max_sources),
        ..defaults
    };
    options
        .validate()
        .map_err(|err| McpError::invalid_params(err.to_string(), None))?;

    let result = service.query(&args.question, options).await.map_err(|err| {
        McpError::internal_error(err.to_string(), Some(json!({ "code": err.code() })))
    })?;

    Ok(CallToolResult::structured(to_structured(&result)?))
}
