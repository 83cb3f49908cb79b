//! MCP server bootstrap and request dispatch.

use std::{borrow::Cow, sync::Arc};

use crate::{
    mcp::{
        format::{CategoriesSnapshot, json_resource_contents, serialize_json},
        handlers::{ask::handle_ask, stats::handle_stats},
        registry, schemas,
    },
    rag::RagService,
};
use rmcp::{
    ErrorData as McpError,
    handler::server::ServerHandler,
    model::{
        AnnotateAble, CallToolRequestParam, CallToolResult, ListResourcesResult, ListToolsResult,
        RawResource, ReadResourceRequestParam, ReadResourceResult, Resource, ServerCapabilities,
        ServerInfo, Tool, ToolAnnotations,
    },
};

const CATEGORIES_URI: &str = "mcp://categories";

/// MCP server exposing the driving-rules assistant.
#[derive(Clone)]
pub struct MtoRagMcpServer {
    service: Arc<dyn RagService>,
    registry: Arc<registry::Registry>,
}

impl MtoRagMcpServer {
    /// Create a new MCP server answering through `service`.
    pub fn new(service: Arc<dyn RagService>) -> Self {
        let mut registry = registry::Registry::default();
        registry.register_resource(CATEGORIES_URI, resource_categories);

        registry.register_tool("ask", tool_ask);
        registry.register_tool("stats", tool_stats);

        Self {
            service,
            registry: Arc::new(registry),
        }
    }

    fn describe_tools(&self) -> Vec<Tool> {
        vec![
            Tool {
                name: Cow::Borrowed("ask"),
                title: Some("Ask the MTO Handbook".to_string()),
                description: Some(Cow::Borrowed(
                    "Answer a question about Ontario driving rules (licensing, speed limits, highway driving, school buses, alcohol) with supporting handbook excerpts.",
                )),
                input_schema: Arc::new(schemas::ask_input_schema()),
                output_schema: None,
                annotations: Some(
                    ToolAnnotations::with_title("Ask the MTO Handbook")
                        .read_only(true)
                        .idempotent(true)
                        .open_world(false),
                ),
                icons: None,
            },
            Tool {
                name: Cow::Borrowed("stats"),
                title: Some("Service Statistics".to_string()),
                description: Some(Cow::Borrowed(
                    "Report corpus size, categories, query count, average query time and backend health.",
                )),
                input_schema: Arc::new(schemas::empty_object_schema()),
                output_schema: None,
                annotations: Some(
                    ToolAnnotations::with_title("Service Statistics")
                        .read_only(true)
                        .idempotent(true)
                        .open_world(false),
                ),
                icons: None,
            },
        ]
    }

    fn describe_resources(&self) -> Vec<Resource> {
        let mut categories = RawResource::new(CATEGORIES_URI, "categories");
        categories.description = Some("Categories the handbook corpus is organised into".into());

        vec![categories.no_annotation()]
    }
}

fn resource_categories(
    server: &MtoRagMcpServer,
    _request: ReadResourceRequestParam,
) -> registry::ResourceFuture {
    let payload = CategoriesSnapshot {
        categories: server.service.stats().categories,
    };
    Box::pin(async move {
        Ok(ReadResourceResult {
            contents: vec![json_resource_contents(
                CATEGORIES_URI,
                serialize_json(&payload, CATEGORIES_URI),
            )],
        })
    })
}

fn tool_ask(server: &MtoRagMcpServer, request: CallToolRequestParam) -> registry::ToolFuture {
    let service = server.service.clone();
    Box::pin(async move { handle_ask(&service, request.arguments).await })
}

fn tool_stats(server: &MtoRagMcpServer, _request: CallToolRequestParam) -> registry::ToolFuture {
    let service = server.service.clone();
    Box::pin(async move { handle_stats(&service).await })
}

impl ServerHandler for MtoRagMcpServer {
    fn get_info(&self) -> ServerInfo {
        let mut implementation = rmcp::model::Implementation::from_build_env();
        implementation.name = "mto-rag".to_string();
        implementation.title = Some("MTO Driving Rules Assistant".to_string());
        implementation.version = env!("CARGO_PKG_VERSION").to_string();

        ServerInfo {
            capabilities: ServerCapabilities::builder()
                .enable_resources()
                .enable_tools()
                .build(),
            server_info: implementation,
            instructions: Some(
                "Use `ask` for questions about Ontario driving rules from the Official MTO Driver's Handbook; answers include page-referenced excerpts. Read mcp://categories to see which topics the corpus covers.".into(),
            ),
            ..ServerInfo::default()
        }
    }

    fn list_resources(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, McpError>> + Send + '_ {
        let resources = self.describe_resources();
        std::future::ready(Ok(ListResourcesResult::with_all_items(resources)))
    }

    fn list_tools(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools = self.describe_tools();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ReadResourceResult, McpError>> + Send + '_ {
        async move {
            if let Some(handler) = self.registry.resources.get(request.uri.as_str()) {
                return handler(self, request).await;
            }

            Err(McpError::invalid_params(
                format!("Unknown resource URI: {}", request.uri),
                None,
            ))
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            if let Some(handler) = self.registry.tools.get(request.name.as_ref()) {
                return handler(self, request).await;
            }

            Err(McpError::invalid_params(
                format!("Unknown tool: {}", request.name),
                None,
            ))
        }
    }
}
