//! The aggregating MCP server exposing every mounted upstream.
use std::{collections::HashSet, future::Future, sync::Arc, time::Duration};

use rmcp::{
    handler::server::ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, ErrorData, GetPromptRequestParam, GetPromptResult,
        ListPromptsResult, ListResourceTemplatesResult, ListResourcesResult, ListToolsResult,
        PaginatedRequestParam, Prompt, ReadResourceRequestParam, ReadResourceResult, Resource,
        ResourceTemplate, ServerCapabilities, ServerInfo, Tool,
    },
    service::{RequestContext, RoleServer},
};
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::{errors, upstream::UpstreamServer};
use crate::lib::errors::MountError;

/// Default name announced to MCP clients.
pub const DEFAULT_SERVER_NAME: &str = "mcp-compose";
/// Deadline for one upstream list or refresh during aggregation.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Composite server; cheap to clone, clones share the mounted servers.
///
/// When two mounts expose the same public name, the most recently mounted wins.
#[derive(Clone)]
pub struct CompositeServer {
    name: Arc<str>,
    instructions: Option<Arc<str>>,
    request_timeout: Duration,
    mounts: Arc<RwLock<Vec<Arc<UpstreamServer>>>>,
}

impl Default for CompositeServer {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER_NAME)
    }
}

impl CompositeServer {
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            instructions: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            mounts: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(Arc::from(instructions.into()));
        self
    }

    /// Upstreams slower than `timeout` are skipped in aggregated listings.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    /// Register a connected upstream. Names must be unique.
    pub async fn mount(&self, upstream: UpstreamServer) -> Result<(), MountError> {
        let mut mounts = self.mounts.write().await;
        if mounts.iter().any(|mounted| mounted.name() == upstream.name()) {
            return Err(MountError::Duplicate {
                name: upstream.name().to_string(),
            });
        }
        info!(
            target: "mcp_compose::proxy",
            server = upstream.name(),
            prefix = upstream.namespace().prefix().unwrap_or(""),
            transport = upstream.transport(),
            "Registered mounted server"
        );
        mounts.push(Arc::new(upstream));
        Ok(())
    }

    /// Remove and shut down a mounted server. Returns false if it was not mounted.
    pub async fn unmount(&self, name: &str) -> bool {
        let removed = {
            let mut mounts = self.mounts.write().await;
            let position = mounts.iter().position(|mounted| mounted.name() == name);
            position.map(|index| mounts.remove(index))
        };
        match removed {
            Some(upstream) => {
                upstream.shutdown().await;
                true
            }
            None => false,
        }
    }

    /// Names of mounted servers in mount order.
    pub async fn mounted_names(&self) -> Vec<String> {
        self.mounts
            .read()
            .await
            .iter()
            .map(|mounted| mounted.name().to_string())
            .collect()
    }

    /// Shut down every mounted server.
    pub async fn shutdown(&self) {
        let mounts = std::mem::take(&mut *self.mounts.write().await);
        for upstream in mounts {
            upstream.shutdown().await;
        }
    }

    /// Mounted servers, newest first. The lock is released before any upstream request.
    async fn newest_first(&self) -> Vec<Arc<UpstreamServer>> {
        let mut mounts = self.mounts.read().await.clone();
        mounts.reverse();
        mounts
    }

    async fn refresh_all(&self) {
        for upstream in self.newest_first().await {
            let refreshed = self
                .bounded(&upstream, "refresh", upstream.refresh_catalog())
                .await;
            if let Err(err) = refreshed {
                warn!(
                    target: "mcp_compose::proxy",
                    server = upstream.name(),
                    error = %err.message,
                    "Failed to refresh upstream catalog"
                );
            }
        }
    }

    pub async fn tools(&self) -> Vec<Tool> {
        let mut groups = Vec::new();
        for upstream in self.newest_first().await {
            match self
                .bounded(&upstream, "tools/list", upstream.list_tools())
                .await
            {
                Ok(tools) => groups.push(tools),
                Err(err) => log_list_failure(&upstream, "tools/list", &err),
            }
        }
        shadow_older(groups, |tool: &Tool| tool.name.to_string())
    }

    pub async fn prompts(&self) -> Vec<Prompt> {
        let mut groups = Vec::new();
        for upstream in self.newest_first().await {
            match self
                .bounded(&upstream, "prompts/list", upstream.list_prompts())
                .await
            {
                Ok(prompts) => groups.push(prompts),
                Err(err) => log_list_failure(&upstream, "prompts/list", &err),
            }
        }
        shadow_older(groups, |prompt: &Prompt| prompt.name.clone())
    }

    pub async fn resources(&self) -> Vec<Resource> {
        let mut groups = Vec::new();
        for upstream in self.newest_first().await {
            match self
                .bounded(&upstream, "resources/list", upstream.list_resources())
                .await
            {
                Ok(resources) => groups.push(resources),
                Err(err) => log_list_failure(&upstream, "resources/list", &err),
            }
        }
        shadow_older(groups, |resource: &Resource| resource.raw.uri.clone())
    }

    pub async fn resource_templates(&self) -> Vec<ResourceTemplate> {
        let mut groups = Vec::new();
        for upstream in self.newest_first().await {
            match self
                .bounded(&upstream, "resources/templates/list", upstream.list_resource_templates())
                .await
            {
                Ok(templates) => groups.push(templates),
                Err(err) => log_list_failure(&upstream, "resources/templates/list", &err),
            }
        }
        shadow_older(groups, |template: &ResourceTemplate| {
            template.raw.uri_template.clone()
        })
    }

    /// Await one upstream request, giving up after `request_timeout`.
    async fn bounded<T>(
        &self,
        upstream: &UpstreamServer,
        method: &'static str,
        request: impl Future<Output = Result<T, ErrorData>>,
    ) -> Result<T, ErrorData> {
        tokio::time::timeout(self.request_timeout, request)
            .await
            .unwrap_or_else(|_| {
                Err(errors::upstream_timeout(
                    upstream.name(),
                    method,
                    self.request_timeout,
                ))
            })
    }

    async fn route_tool(&self, name: &str) -> Option<(Arc<UpstreamServer>, String)> {
        for upstream in self.newest_first().await {
            if let Some(upstream_name) = upstream.resolve_tool(name).await {
                return Some((upstream, upstream_name));
            }
        }
        None
    }

    async fn route_prompt(&self, name: &str) -> Option<(Arc<UpstreamServer>, String)> {
        for upstream in self.newest_first().await {
            if let Some(upstream_name) = upstream.resolve_prompt(name).await {
                return Some((upstream, upstream_name));
            }
        }
        None
    }

    async fn route_resource(&self, uri: &str) -> Option<(Arc<UpstreamServer>, String)> {
        for upstream in self.newest_first().await {
            if let Some(upstream_uri) = upstream.resolve_resource(uri).await {
                return Some((upstream, upstream_uri));
            }
        }
        None
    }

    /// Forward a tool call to the server owning `request.name`.
    pub async fn call(&self, request: CallToolRequestParam) -> Result<CallToolResult, ErrorData> {
        let route = match self.route_tool(&request.name).await {
            Some(route) => Some(route),
            None => {
                self.refresh_all().await;
                self.route_tool(&request.name).await
            }
        };
        let Some((upstream, upstream_name)) = route else {
            return Err(errors::unknown_tool(
                &request.name,
                &self.mounted_names().await,
            ));
        };
        upstream.call_tool(upstream_name, request.arguments).await
    }

    /// Forward a prompt request to the server owning `request.name`.
    pub async fn prompt(&self, request: GetPromptRequestParam) -> Result<GetPromptResult, ErrorData> {
        let route = match self.route_prompt(&request.name).await {
            Some(route) => Some(route),
            None => {
                self.refresh_all().await;
                self.route_prompt(&request.name).await
            }
        };
        let Some((upstream, upstream_name)) = route else {
            return Err(errors::unknown_prompt(
                &request.name,
                &self.mounted_names().await,
            ));
        };
        upstream.get_prompt(upstream_name, request.arguments).await
    }

    /// Forward a resource read to the server owning `request.uri`.
    pub async fn read(
        &self,
        request: ReadResourceRequestParam,
    ) -> Result<ReadResourceResult, ErrorData> {
        let route = match self.route_resource(&request.uri).await {
            Some(route) => Some(route),
            None => {
                self.refresh_all().await;
                self.route_resource(&request.uri).await
            }
        };
        let Some((upstream, upstream_uri)) = route else {
            return Err(errors::unknown_resource(
                &request.uri,
                &self.mounted_names().await,
            ));
        };
        upstream.read_resource(upstream_uri).await
    }
}

fn log_list_failure(upstream: &UpstreamServer, method: &'static str, err: &ErrorData) {
    warn!(
        target: "mcp_compose::proxy",
        server = upstream.name(),
        method,
        error = %err.message,
        "Skipping server in aggregated listing"
    );
}

/// Flatten groups given newest first into mount order, dropping names shadowed by newer mounts.
fn shadow_older<T>(groups: Vec<Vec<T>>, key: impl Fn(&T) -> String) -> Vec<T> {
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(groups.len());
    for group in groups {
        let visible = group
            .into_iter()
            .filter(|item| seen.insert(key(item)))
            .collect::<Vec<_>>();
        kept.push(visible);
    }
    kept.into_iter().rev().flatten().collect()
}

impl ServerHandler for CompositeServer {
    fn get_info(&self) -> ServerInfo {
        let mut info = ServerInfo {
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_prompts()
                .enable_resources()
                .build(),
            instructions: self.instructions.as_deref().map(str::to_string),
            ..ServerInfo::default()
        };
        info.server_info.name = self.name.to_string();
        info.server_info.version = env!("CARGO_PKG_VERSION").to_string();
        info
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(self.tools().await))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        self.call(request).await
    }

    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, ErrorData> {
        Ok(ListPromptsResult::with_all_items(self.prompts().await))
    }

    async fn get_prompt(
        &self,
        request: GetPromptRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, ErrorData> {
        self.prompt(request).await
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        Ok(ListResourcesResult::with_all_items(self.resources().await))
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, ErrorData> {
        Ok(ListResourceTemplatesResult::with_all_items(
            self.resource_templates().await,
        ))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        self.read(request).await
    }
}
