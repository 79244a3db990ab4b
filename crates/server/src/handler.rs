//! MCP server handler implementation.
//!
//! Routes tool calls to the implementations in [`crate::tools`].
use crate::tools::{
    DatasetLoadParams,
    cache::{CacheClearParams, CacheMetaParams, clear_impl, list_impl, meta_impl, purge_impl, status_impl},
    load_impl,
};

use dsync_core::{AppConfig, Loader};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use std::sync::Arc;

/// The main MCP server handler for dsync.
#[derive(Clone)]
pub struct DsyncServer {
    tool_router: ToolRouter<Self>,
    config: Arc<AppConfig>,
    loader: Loader,
}

#[tool_router]
impl DsyncServer {
    pub fn new(config: Arc<AppConfig>, loader: Loader) -> Self {
        Self { tool_router: Self::tool_router(), config, loader }
    }

    #[tool(
        description = "Load a dataset through the local cache and ingest it. Serves a valid cached copy without touching the network; on fetch failure falls back to any stored copy, marked stale."
    )]
    async fn dataset_load(&self, params: Parameters<DatasetLoadParams>) -> Result<CallToolResult, McpError> {
        load_impl(&self.config, &self.loader, params.0).await
    }

    #[tool(description = "Current cache status: state, source and timestamp of the last delivered payload, staleness, last error.")]
    async fn cache_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(self.loader.cache())
    }

    #[tool(description = "Stored metadata for one dataset URL (timestamps, size, validator) and whether it is still valid.")]
    async fn cache_meta(&self, params: Parameters<CacheMetaParams>) -> Result<CallToolResult, McpError> {
        meta_impl(self.loader.cache(), params.0).await
    }

    #[tool(description = "Delete the stored entry for a URL, or every entry in the collection when no URL is given.")]
    async fn cache_clear(&self, params: Parameters<CacheClearParams>) -> Result<CallToolResult, McpError> {
        clear_impl(self.loader.cache(), params.0).await
    }

    #[tool(description = "Delete every entry whose TTL has elapsed. Returns the number deleted.")]
    async fn cache_purge(&self) -> Result<CallToolResult, McpError> {
        purge_impl(self.loader.cache()).await
    }

    #[tool(description = "List stored entries (metadata only, most recent first) with aggregate stats.")]
    async fn cache_list(&self) -> Result<CallToolResult, McpError> {
        list_impl(self.loader.cache()).await
    }
}

impl ServerHandler for DsyncServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "dsync".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Local cache for remote datasets. Use dataset_load to fetch and ingest; cache_* tools inspect and maintain the store."
                    .into(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
