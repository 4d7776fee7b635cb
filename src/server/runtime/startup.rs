use std::{net::SocketAddr, process::ExitCode};

use anyhow::{Context, Error};
use rmcp::ServiceExt;
use serde_json::json;
use tokio::{
    net::{TcpListener, TcpStream},
    task::JoinSet,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    cli::{LaunchProfile, ServerSpec, TransportMode},
    compose::{
        mount_config_into_server_concurrent, CompositeServer, MountOptions, MountReport,
        DEFAULT_SERVER_NAME,
    },
    lib::{
        errors::{ErrorCategory, MountError, COMPOSE_MOUNT_FAILED_ERROR},
        telemetry::{emit_runtime_mode, RuntimeModeTelemetry},
    },
    server::{config::ServerSection, guard, runtime::build_instructions},
};

pub const COMPOSE_MOUNT_FAILED_EXIT_CODE: u8 = 45;

/// Bundles a runtime error message with an exit code and optional structured error data.
#[derive(Debug)]
pub struct RuntimeExit {
    message: String,
    exit_code: ExitCode,
    error_data: Option<rmcp::model::ErrorData>,
}

impl RuntimeExit {
    pub fn structured(error: rmcp::model::ErrorData, exit_code: ExitCode) -> Self {
        Self {
            message: error.message.to_string(),
            exit_code,
            error_data: Some(error),
        }
    }

    pub fn from_error(err: impl Into<Error>) -> Self {
        let err = err.into();
        Self {
            message: format!("{err:?}"),
            exit_code: ExitCode::FAILURE,
            error_data: None,
        }
    }

    pub fn report(self) -> ExitCode {
        if let Some(data) = self.error_data {
            if let Ok(serialized) = serde_json::to_string(&data) {
                eprintln!("{serialized}");
            } else {
                eprintln!("{}", data.message);
            }
        } else {
            eprintln!("{}", self.message);
        }
        self.exit_code
    }

    pub fn exit_code(&self) -> ExitCode {
        self.exit_code
    }

    pub fn error_data(&self) -> Option<&rmcp::model::ErrorData> {
        self.error_data.as_ref()
    }
}

/// Map a mounting failure to the structured `COMPOSE_MOUNT_FAILED` exit (code 45).
pub fn mount_failure_exit(err: &MountError) -> RuntimeExit {
    let failed = match err {
        MountError::AllMountsFailed { failed } => failed.clone(),
        other => vec![other.to_string()],
    };
    let built = COMPOSE_MOUNT_FAILED_ERROR
        .builder()
        .retryable(false)
        .category(ErrorCategory::Internal)
        .details(json!({
            "server": err.server_name(),
            "reason": err.to_string(),
            "failed": failed
        }))
        .with_exit_code_value(COMPOSE_MOUNT_FAILED_EXIT_CODE)
        .build();
    match built {
        Ok(data) => RuntimeExit::structured(data, ExitCode::from(COMPOSE_MOUNT_FAILED_EXIT_CODE)),
        Err(builder_err) => RuntimeExit::from_error(builder_err),
    }
}

/// Load the configuration behind `spec` and mount it into a fresh composite server.
pub async fn build_composite(
    spec: &ServerSpec,
    options: &MountOptions,
) -> Result<(CompositeServer, MountReport), RuntimeExit> {
    let config = spec
        .load_config()
        .with_context(|| format!("failed to load server spec `{}`", spec.to_arg()))
        .map_err(RuntimeExit::from_error)?;
    if config.is_empty() {
        warn!(
            target: "mcp_compose::runtime",
            server_spec = %spec.to_arg(),
            "No MCP servers configured; serving an empty composite"
        );
    }

    let instructions = build_instructions(&spec.to_arg(), &config, options);
    let server = CompositeServer::new(DEFAULT_SERVER_NAME)
        .with_instructions(instructions)
        .with_request_timeout(options.timeout);
    let report = mount_config_into_server_concurrent(&config, &server, options)
        .await
        .map_err(|err| mount_failure_exit(&err))?;
    Ok((server, report))
}

/// Start the composite server and select stdio/TCP based on the launch profile.
pub async fn run_server(profile: LaunchProfile) -> Result<(), RuntimeExit> {
    guard::ensure_invoked_via_mcp_client(&profile)?;

    let (server, report) = build_composite(&profile.spec, &profile.mount).await?;
    let server_spec = profile.spec.to_arg();
    let mounted = report.succeeded();
    let tcp = profile.transport == TransportMode::Tcp;
    emit_runtime_mode(&RuntimeModeTelemetry {
        transport: profile.transport.as_str(),
        host: tcp.then_some(profile.settings.server.host.as_str()),
        port: tcp.then_some(profile.settings.server.port),
        server_spec: &server_spec,
        mounted_servers: &mounted,
        failed_servers: report.failures().len(),
        launch_args: &profile.launch_args,
    });

    let result = match profile.transport {
        TransportMode::Stdio => run_stdio(server.clone()).await,
        TransportMode::Tcp => run_tcp(server.clone(), &profile.settings.server).await,
    };
    server.shutdown().await;
    result
}

async fn run_stdio(server: CompositeServer) -> Result<(), RuntimeExit> {
    let running = server
        .serve(rmcp::transport::stdio())
        .await
        .map_err(RuntimeExit::from_error)?;
    running.waiting().await.map_err(RuntimeExit::from_error)?;
    Ok(())
}

async fn run_tcp(server: CompositeServer, section: &ServerSection) -> Result<(), RuntimeExit> {
    let addr = format!("{}:{}", section.host, section.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind TCP port {addr}"))
        .map_err(RuntimeExit::from_error)?;
    info!(
        target: "mcp_compose::runtime",
        transport = "tcp",
        bind_addr = %addr,
        "Started listening in TCP mode"
    );

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!(target: "mcp_compose::runtime", "Received Ctrl-C; stopping TCP listener");
            signal.cancel();
        }
    });

    let mut sessions = JoinSet::new();
    let outcome = loop {
        tokio::select! {
            _ = shutdown.cancelled() => break Ok(()),
            accepted = listener.accept() => {
                let (stream, peer) = match accepted
                    .with_context(|| format!("failed to accept TCP connection ({addr})"))
                {
                    Ok(accepted) => accepted,
                    Err(err) => break Err(RuntimeExit::from_error(err)),
                };
                sessions.spawn(serve_session(
                    server.clone(),
                    stream,
                    peer,
                    shutdown.child_token(),
                ));
            }
            Some(_) = sessions.join_next(), if !sessions.is_empty() => {}
        }
    };

    shutdown.cancel();
    while sessions.join_next().await.is_some() {}
    outcome
}

async fn serve_session(
    server: CompositeServer,
    stream: TcpStream,
    peer: SocketAddr,
    cancel: CancellationToken,
) {
    let session_id = Uuid::new_v4();
    info!(
        target: "mcp_compose::runtime",
        peer = %peer,
        session_id = %session_id,
        "Accepted connection from MCP client"
    );
    let running = match server.serve_with_ct(stream, cancel).await {
        Ok(running) => running,
        Err(err) => {
            warn!(
                target: "mcp_compose::runtime",
                peer = %peer,
                session_id = %session_id,
                error = %err,
                "MCP handshake failed"
            );
            return;
        }
    };
    match running.waiting().await {
        Ok(reason) => info!(
            target: "mcp_compose::runtime",
            peer = %peer,
            session_id = %session_id,
            reason = ?reason,
            "MCP session closed"
        ),
        Err(err) => warn!(
            target: "mcp_compose::runtime",
            peer = %peer,
            session_id = %session_id,
            error = %err,
            "MCP session ended abnormally"
        ),
    }
}
