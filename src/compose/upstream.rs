//! A single upstream MCP server mounted into the composite.
use rmcp::{
    model::{
        CallToolRequestParam, CallToolResult, ErrorData, GetPromptRequestParam, GetPromptResult,
        JsonObject, Prompt, ReadResourceRequestParam, ReadResourceResult, Resource,
        ResourceTemplate, ServerCapabilities, Tool,
    },
    service::{Peer, RoleClient, RunningService},
    transport::{IntoTransport, StreamableHttpClientTransport, TokioChildProcess},
    ServiceExt,
};
use tokio::sync::{Mutex, RwLock};

use super::{errors::upstream_error, namespace::Namespace, uri_template};
use crate::{lib::errors::MountError, mcp_config::LaunchPlan};

/// Upstream inventory, stored with upstream (unprefixed) names.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub tools: Vec<Tool>,
    pub prompts: Vec<Prompt>,
    pub resources: Vec<Resource>,
    pub resource_templates: Vec<ResourceTemplate>,
}

/// Item counts reported after a mount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CatalogCounts {
    pub tools: usize,
    pub prompts: usize,
    pub resources: usize,
    pub resource_templates: usize,
}

impl Catalog {
    pub fn counts(&self) -> CatalogCounts {
        CatalogCounts {
            tools: self.tools.len(),
            prompts: self.prompts.len(),
            resources: self.resources.len(),
            resource_templates: self.resource_templates.len(),
        }
    }
}

/// Connected upstream server plus its cached catalog.
pub struct UpstreamServer {
    name: String,
    namespace: Namespace,
    transport: &'static str,
    peer: Peer<RoleClient>,
    service: Mutex<Option<RunningService<RoleClient, ()>>>,
    capabilities: ServerCapabilities,
    catalog: RwLock<Catalog>,
}

impl std::fmt::Debug for UpstreamServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamServer")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("transport", &self.transport)
            .field("service", &"<MCP Service>")
            .finish()
    }
}

impl UpstreamServer {
    /// Spawn or dial the server described by `plan` and load its catalog.
    pub async fn connect(
        name: &str,
        plan: &LaunchPlan,
        namespace: Namespace,
    ) -> Result<Self, MountError> {
        match (plan, plan.command()) {
            (_, Some(command)) => {
                let transport =
                    TokioChildProcess::new(command).map_err(|source| MountError::Spawn {
                        name: name.to_string(),
                        source,
                    })?;
                Self::connect_with(name, namespace, plan.transport_label(), transport).await
            }
            (LaunchPlan::Remote { url }, None) => {
                let transport = StreamableHttpClientTransport::from_uri(url.clone());
                Self::connect_with(name, namespace, plan.transport_label(), transport).await
            }
            (LaunchPlan::Stdio { .. }, None) => Err(MountError::Initialize {
                name: name.to_string(),
                message: "stdio plan produced no command".into(),
            }),
        }
    }

    /// Run the MCP handshake over an arbitrary client transport.
    pub async fn connect_with<T, E, A>(
        name: &str,
        namespace: Namespace,
        transport_label: &'static str,
        transport: T,
    ) -> Result<Self, MountError>
    where
        T: IntoTransport<RoleClient, E, A>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let service = ().serve(transport).await.map_err(|err| MountError::Initialize {
            name: name.to_string(),
            message: err.to_string(),
        })?;
        let capabilities = service
            .peer_info()
            .map(|info| info.capabilities.clone())
            .unwrap_or_default();
        let upstream = Self {
            name: name.to_string(),
            namespace,
            transport: transport_label,
            peer: service.peer().clone(),
            service: Mutex::new(Some(service)),
            capabilities,
            catalog: RwLock::new(Catalog::default()),
        };
        upstream
            .refresh_catalog()
            .await
            .map_err(|err| MountError::Catalog {
                name: name.to_string(),
                message: err.message.to_string(),
            })?;
        Ok(upstream)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn transport(&self) -> &'static str {
        self.transport
    }

    pub async fn catalog(&self) -> Catalog {
        self.catalog.read().await.clone()
    }

    /// Re-read every advertised list from the upstream.
    pub async fn refresh_catalog(&self) -> Result<CatalogCounts, ErrorData> {
        let catalog = Catalog {
            tools: self.fetch_tools().await?,
            prompts: self.fetch_prompts().await?,
            resources: self.fetch_resources().await?,
            resource_templates: self.fetch_resource_templates().await?,
        };
        let counts = catalog.counts();
        *self.catalog.write().await = catalog;
        Ok(counts)
    }

    async fn fetch_tools(&self) -> Result<Vec<Tool>, ErrorData> {
        if self.capabilities.tools.is_none() {
            return Ok(Vec::new());
        }
        self.peer
            .list_all_tools()
            .await
            .map_err(|err| upstream_error(&self.name, "tools/list", err))
    }

    async fn fetch_prompts(&self) -> Result<Vec<Prompt>, ErrorData> {
        if self.capabilities.prompts.is_none() {
            return Ok(Vec::new());
        }
        self.peer
            .list_all_prompts()
            .await
            .map_err(|err| upstream_error(&self.name, "prompts/list", err))
    }

    async fn fetch_resources(&self) -> Result<Vec<Resource>, ErrorData> {
        if self.capabilities.resources.is_none() {
            return Ok(Vec::new());
        }
        self.peer
            .list_all_resources()
            .await
            .map_err(|err| upstream_error(&self.name, "resources/list", err))
    }

    async fn fetch_resource_templates(&self) -> Result<Vec<ResourceTemplate>, ErrorData> {
        if self.capabilities.resources.is_none() {
            return Ok(Vec::new());
        }
        self.peer
            .list_all_resource_templates()
            .await
            .map_err(|err| upstream_error(&self.name, "resources/templates/list", err))
    }

    /// Live tool list with public names.
    pub async fn list_tools(&self) -> Result<Vec<Tool>, ErrorData> {
        let tools = self.fetch_tools().await?;
        self.catalog.write().await.tools = tools.clone();
        Ok(tools
            .into_iter()
            .map(|mut tool| {
                tool.name = self.namespace.apply_name(&tool.name).into();
                tool
            })
            .collect())
    }

    /// Live prompt list with public names.
    pub async fn list_prompts(&self) -> Result<Vec<Prompt>, ErrorData> {
        let prompts = self.fetch_prompts().await?;
        self.catalog.write().await.prompts = prompts.clone();
        Ok(prompts
            .into_iter()
            .map(|mut prompt| {
                prompt.name = self.namespace.apply_name(&prompt.name);
                prompt
            })
            .collect())
    }

    /// Live resource list with public URIs.
    pub async fn list_resources(&self) -> Result<Vec<Resource>, ErrorData> {
        let resources = self.fetch_resources().await?;
        self.catalog.write().await.resources = resources.clone();
        Ok(resources
            .into_iter()
            .map(|mut resource| {
                resource.raw.uri = self.namespace.apply_uri(&resource.raw.uri);
                resource
            })
            .collect())
    }

    /// Live resource template list with public URI templates.
    pub async fn list_resource_templates(&self) -> Result<Vec<ResourceTemplate>, ErrorData> {
        let templates = self.fetch_resource_templates().await?;
        self.catalog.write().await.resource_templates = templates.clone();
        Ok(templates
            .into_iter()
            .map(|mut template| {
                template.raw.uri_template = self.namespace.apply_uri(&template.raw.uri_template);
                template
            })
            .collect())
    }

    /// Upstream tool name for a public name this server can serve.
    pub async fn resolve_tool(&self, public: &str) -> Option<String> {
        let upstream = self.namespace.strip_name(public)?;
        let catalog = self.catalog.read().await;
        catalog
            .tools
            .iter()
            .any(|tool| tool.name == upstream)
            .then(|| upstream.to_string())
    }

    /// Upstream prompt name for a public name this server can serve.
    pub async fn resolve_prompt(&self, public: &str) -> Option<String> {
        let upstream = self.namespace.strip_name(public)?;
        let catalog = self.catalog.read().await;
        catalog
            .prompts
            .iter()
            .any(|prompt| prompt.name == upstream)
            .then(|| upstream.to_string())
    }

    /// Upstream URI for a public URI matching a resource or template of this server.
    pub async fn resolve_resource(&self, public: &str) -> Option<String> {
        let upstream = self.namespace.strip_uri(public)?;
        let catalog = self.catalog.read().await;
        let known = catalog
            .resources
            .iter()
            .any(|resource| resource.raw.uri == upstream)
            || catalog
                .resource_templates
                .iter()
                .any(|template| uri_template::matches(&template.raw.uri_template, &upstream));
        known.then_some(upstream)
    }

    pub async fn call_tool(
        &self,
        upstream_name: String,
        arguments: Option<JsonObject>,
    ) -> Result<CallToolResult, ErrorData> {
        tracing::debug!(
            target: "mcp_compose::proxy",
            server = %self.name,
            tool = %upstream_name,
            "Forwarding tool call"
        );
        self.peer
            .call_tool(CallToolRequestParam {
                name: upstream_name.into(),
                arguments,
            })
            .await
            .map_err(|err| upstream_error(&self.name, "tools/call", err))
    }

    pub async fn get_prompt(
        &self,
        upstream_name: String,
        arguments: Option<JsonObject>,
    ) -> Result<GetPromptResult, ErrorData> {
        self.peer
            .get_prompt(GetPromptRequestParam {
                name: upstream_name,
                arguments,
            })
            .await
            .map_err(|err| upstream_error(&self.name, "prompts/get", err))
    }

    pub async fn read_resource(&self, upstream_uri: String) -> Result<ReadResourceResult, ErrorData> {
        self.peer
            .read_resource(ReadResourceRequestParam { uri: upstream_uri })
            .await
            .map_err(|err| upstream_error(&self.name, "resources/read", err))
    }

    /// Close the client session; child processes are terminated with it.
    pub async fn shutdown(&self) {
        if let Some(service) = self.service.lock().await.take() {
            if let Err(err) = service.cancel().await {
                tracing::warn!(
                    target: "mcp_compose::proxy",
                    server = %self.name,
                    error = %err,
                    "Error while shutting down upstream server"
                );
            }
        }
    }
}
