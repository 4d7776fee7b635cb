use std::{
    io,
    path::PathBuf,
    process::Stdio,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use anyhow::{Context, Result};
use mcp_compose::compose::{Namespace, UpstreamServer};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters, ServerHandler},
    model::{
        AnnotateAble, CallToolResult, Content, ErrorData, GetPromptRequestParam, GetPromptResult,
        ListPromptsResult, ListResourceTemplatesResult, ListResourcesResult, ListToolsResult,
        PaginatedRequestParam, Prompt, PromptMessage, PromptMessageRole, RawResource,
        ReadResourceRequestParam, ReadResourceResult, ResourceContents, ResourceTemplate,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_handler, tool_router, ServiceExt,
};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, ReadBuf},
    process::{Child, ChildStdin, ChildStdout, Command},
    task::JoinHandle,
};

pub const BINARY_PATH: &str = env!("CARGO_BIN_EXE_mcp-compose");

/// Spawn `mcp-compose <args>` with piped stdio, as an MCP client would.
pub async fn spawn_compose_process(
    args: &[&str],
) -> Result<(Child, ChildIoBridge, Option<JoinHandle<()>>)> {
    let mut command = Command::new(BINARY_PATH);
    command
        .args(args)
        .env_remove("MCP_COMPOSE_SETTINGS")
        .stdout(Stdio::piped())
        .stdin(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    let mut child = command.spawn().context("failed to spawn mcp-compose")?;
    let stdout = child.stdout.take().context("child stdout")?;
    let stdin = child.stdin.take().context("child stdin")?;
    let bridge = ChildIoBridge::new(stdout, stdin);
    let stderr_handle = child.stderr.take().map(|mut stderr| {
        tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
        })
    });
    Ok((child, bridge, stderr_handle))
}

pub fn fixture(relative: &str) -> String {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    root.join(relative).display().to_string()
}

/// `mcp.json` text with one stdio server that is this binary serving `inner_spec`.
pub fn nested_config(server_name: &str, inner_spec: &str) -> String {
    json!({
        "mcpServers": {
            server_name: {
                "command": BINARY_PATH,
                "args": ["run", inner_spec]
            }
        }
    })
    .to_string()
}

pub struct ChildIoBridge {
    stdout: ChildStdout,
    stdin: ChildStdin,
}

impl ChildIoBridge {
    pub fn new(stdout: ChildStdout, stdin: ChildStdin) -> Self {
        Self { stdout, stdin }
    }
}

impl AsyncRead for ChildIoBridge {
    fn poll_read(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> std::task::Poll<io::Result<()>> {
        std::pin::Pin::new(&mut self.stdout).poll_read(cx, buf)
    }
}

impl AsyncWrite for ChildIoBridge {
    fn poll_write(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        data: &[u8],
    ) -> std::task::Poll<io::Result<usize>> {
        std::pin::Pin::new(&mut self.stdin).poll_write(cx, data)
    }

    fn poll_flush(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<io::Result<()>> {
        std::pin::Pin::new(&mut self.stdin).poll_flush(cx)
    }

    fn poll_shutdown(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<io::Result<()>> {
        std::pin::Pin::new(&mut self.stdin).poll_shutdown(cx)
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EchoRequest {
    /// Text to echo back.
    pub text: String,
}

/// Small upstream server exposing one tool, prompt, resource and template.
///
/// Every response carries `label` so tests can tell which mount answered.
#[derive(Clone)]
pub struct FixtureServer {
    label: &'static str,
    tool_router: ToolRouter<Self>,
}

impl FixtureServer {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router(router = tool_router)]
impl FixtureServer {
    #[tool(name = "echo", description = "Echo text prefixed with the server label")]
    async fn echo(
        &self,
        Parameters(request): Parameters<EchoRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        Ok(CallToolResult::success(vec![Content::text(format!(
            "{}:{}",
            self.label, request.text
        ))]))
    }

    #[tool(name = "fail", description = "Always fails with invalid params")]
    async fn fail(&self) -> Result<CallToolResult, ErrorData> {
        Err(ErrorData::invalid_params(
            format!("{} refuses", self.label),
            Some(json!({"label": self.label})),
        ))
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for FixtureServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_prompts()
                .enable_resources()
                .build(),
            ..ServerInfo::default()
        }
    }

    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, ErrorData> {
        Ok(ListPromptsResult::with_all_items(vec![Prompt::new(
            "greet",
            Some("Greeting from the fixture"),
            None,
        )]))
    }

    async fn get_prompt(
        &self,
        request: GetPromptRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, ErrorData> {
        if request.name != "greet" {
            return Err(ErrorData::invalid_params("unknown prompt", None));
        }
        Ok(GetPromptResult {
            description: None,
            messages: vec![PromptMessage::new_text(
                PromptMessageRole::User,
                format!("hello from {}", self.label),
            )],
        })
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        Ok(ListResourcesResult::with_all_items(vec![
            RawResource::new("data://info", "info").no_annotation(),
        ]))
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, ErrorData> {
        let template: ResourceTemplate = serde_json::from_value(json!({
            "uriTemplate": "data://items/{id}",
            "name": "item"
        }))
        .map_err(|err| ErrorData::internal_error(err.to_string(), None))?;
        Ok(ListResourceTemplatesResult::with_all_items(vec![template]))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        let body = if request.uri == "data://info" {
            format!("{} info", self.label)
        } else if let Some(id) = request.uri.strip_prefix("data://items/") {
            format!("{} item {id}", self.label)
        } else {
            return Err(ErrorData::resource_not_found("no such resource", None));
        };
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(body, request.uri)],
        })
    }
}

/// Server that answers its first `tools/list` and never answers again.
#[derive(Clone, Default)]
pub struct StalledServer {
    listings: Arc<AtomicUsize>,
}

impl ServerHandler for StalledServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..ServerInfo::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        if self.listings.fetch_add(1, Ordering::SeqCst) > 0 {
            std::future::pending::<()>().await;
        }
        Ok(ListToolsResult::with_all_items(Vec::new()))
    }
}

/// Mount-ready upstream connected to an in-process `FixtureServer`.
pub async fn connect_fixture(name: &'static str, prefixed: bool) -> Result<UpstreamServer> {
    connect_handler(name, prefixed, FixtureServer::new(name)).await
}

/// Mount-ready upstream that stalls on every listing after the mount.
pub async fn connect_stalled(name: &'static str) -> Result<UpstreamServer> {
    connect_handler(name, true, StalledServer::default()).await
}

async fn connect_handler<S>(name: &'static str, prefixed: bool, handler: S) -> Result<UpstreamServer>
where
    S: ServerHandler,
{
    let (client_io, server_io) = tokio::io::duplex(16 * 1024);
    tokio::spawn(async move {
        if let Ok(running) = handler.serve(server_io).await {
            let _ = running.waiting().await;
        }
    });
    let namespace = Namespace::new(prefixed.then(|| name.to_string()));
    let upstream = UpstreamServer::connect_with(name, namespace, "memory", client_io)
        .await
        .with_context(|| format!("failed to connect upstream `{name}`"))?;
    Ok(upstream)
}
