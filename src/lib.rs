#![deny(missing_docs)]

//! Core library for the MTO driving-regulations assistant.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Structured logging and tracing setup.
pub mod logging;
/// Model Context Protocol server implementation.
pub mod mcp;
/// Question answering: orchestrator, backends, protocol and history.
pub mod rag;
/// Running query statistics.
pub mod stats;
