//! Telemetry initialization and mount span helpers.

use std::time::Instant;

use anyhow::Result;
use serde::Serialize;
use tracing::{info, info_span, warn, Span};
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize `tracing` and format developer logs.
///
/// Logs always go to stderr: in stdio mode stdout carries the MCP transport.
pub fn init_tracing() -> Result<()> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to initialize tracing: {err}"))
}

/// Span helper recording the start and finish of one upstream mount.
pub struct MountSpan {
    span: Span,
    started_at: Instant,
    server: String,
}

impl MountSpan {
    /// Start a mount span.
    pub fn start(server: &str, transport: &'static str) -> Self {
        let span = info_span!(
            target: "mcp_compose::mount",
            "mount_server",
            server,
            transport
        );
        Self {
            span,
            started_at: Instant::now(),
            server: server.to_string(),
        }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.started_at.elapsed().as_millis()
    }

    /// Close the span after a successful mount.
    pub fn mounted(self, tools: usize, prompts: usize, resources: usize, templates: usize) {
        let elapsed_ms = self.elapsed_ms();
        let _entered = self.span.enter();
        info!(
            target: "mcp_compose::mount",
            server = %self.server,
            status = "mounted",
            tools,
            prompts,
            resources,
            resource_templates = templates,
            elapsed_ms,
            "Mounted MCP server"
        );
    }

    /// Close the span after a failed mount.
    pub fn failed(self, error: &dyn std::fmt::Display) {
        let elapsed_ms = self.elapsed_ms();
        let _entered = self.span.enter();
        warn!(
            target: "mcp_compose::mount",
            server = %self.server,
            status = "failed",
            error = %error,
            elapsed_ms,
            "Failed to mount MCP server"
        );
    }
}

/// Payload for logging the composite runtime state as structured telemetry.
#[derive(Debug, Serialize)]
pub struct RuntimeModeTelemetry<'a> {
    pub transport: &'a str,
    pub host: Option<&'a str>,
    pub port: Option<u16>,
    pub server_spec: &'a str,
    pub mounted_servers: &'a [String],
    pub failed_servers: usize,
    pub launch_args: &'a [String],
}

/// Emit runtime mode to `tracing`.
pub fn emit_runtime_mode(telemetry: &RuntimeModeTelemetry<'_>) {
    info!(
        target: "mcp_compose::runtime",
        transport = telemetry.transport,
        host = telemetry.host.unwrap_or(""),
        port = telemetry.port.unwrap_or_default(),
        server_spec = telemetry.server_spec,
        mounted_servers = ?telemetry.mounted_servers,
        failed_servers = telemetry.failed_servers,
        launch_args = ?telemetry.launch_args,
        "Started composite MCP server"
    );
}
