//! MCP server entrypoint (stdio transport).
//!
//! Launches an MCP server that exposes the driving-rules assistant's tools and resources over
//! stdio. It shares all runtime configuration with the HTTP binary; console logs go to stderr so
//! stdout carries protocol frames only.
use anyhow::{Context, Result};
use mto_rag::{
    config,
    logging::{self, LogTarget},
    mcp::MtoRagMcpServer,
    rag::QueryOrchestrator,
};
use rmcp::{service::ServiceExt, transport::stdio};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    config::init_config();
    logging::init_tracing_with(LogTarget::StderrAndFile);
    config::get_config().log_summary();

    let orchestrator = Arc::new(QueryOrchestrator::from_config(config::get_config()).await);
    let server = MtoRagMcpServer::new(orchestrator);

    let service = server
        .serve(stdio())
        .await
        .context("failed to start MCP server over stdio")?;

    service
        .waiting()
        .await
        .context("MCP server terminated unexpectedly")?;

    Ok(())
}
