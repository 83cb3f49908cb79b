//! Formatting helpers shared across MCP handlers and resources.

use rmcp::{ErrorData as McpError, model::ResourceContents};
use serde::Serialize;
use serde_json::Value;

pub(crate) const APPLICATION_JSON: &str = "application/json";

/// Categories snapshot returned by the `categories` resource.
#[derive(Debug, Serialize)]
pub(crate) struct CategoriesSnapshot {
    /// Corpus categories in configured order.
    pub(crate) categories: Vec<String>,
}

/// Serialize a value to JSON, falling back to compact formatting on error.
pub(crate) fn serialize_json<T: Serialize>(value: &T, context_uri: &str) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|error| {
        tracing::warn!(uri = context_uri, %error, "Failed to serialize JSON prettily");
        serde_json::to_string(value).unwrap_or_else(|_| "{}".into())
    })
}

/// Convert a tool payload into a JSON value for structured results.
pub(crate) fn to_structured<T: Serialize>(value: &T) -> Result<Value, McpError> {
    serde_json::to_value(value)
        .map_err(|err| McpError::internal_error(format!("Failed to encode result: {err}"), None))
}

/// Build JSON resource contents for MCP resource responses.
pub(crate) fn json_resource_contents(uri: &str, text: String) -> ResourceContents {
    ResourceContents::TextResourceContents {
        uri: uri.to_string(),
        mime_type: Some(APPLICATION_JSON.into()),
        text,
        meta: None,
    }
}
