//! Model Context Protocol (MCP) integration for the MTO assistant.
//!
//! This module wires the query orchestrator into an MCP server so editors and agent hosts can ask
//! driving-rule questions over stdio. The surface area consists of:
//!
//! - Tools: `ask` (answer a question with handbook excerpts) and `stats`.
//! - Resources: `mcp://categories`.
//!
//! Handlers, schemas, and formatting helpers are kept in focused submodules.

mod format;
pub mod handlers;
mod registry;
mod schemas;
mod server;

pub use server::MtoRagMcpServer;
