//! Handler for the stats tool.

use std::sync::Arc;

use crate::{mcp::format::to_structured, rag::RagService};
use rmcp::{ErrorData as McpError, model::CallToolResult};

/// Handle the `stats` tool, returning corpus information and query counters.
pub(crate) async fn handle_stats(
    service: &Arc<dyn RagService>,
) -> Result<CallToolResult, McpError> {
    let stats = service.stats();
    Ok(CallToolResult::structured(to_structured(&stats)?))
}
