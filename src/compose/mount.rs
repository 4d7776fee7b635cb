//! Mounting the servers of an `McpConfig` into a composite server.
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use tokio::{sync::Semaphore, task::JoinSet};
use tracing::Instrument;

use super::{
    composite::CompositeServer,
    namespace::Namespace,
    report::{MountOutcome, MountReport},
    upstream::{CatalogCounts, UpstreamServer},
};
use crate::{
    lib::{errors::MountError, telemetry::MountSpan},
    mcp_config::{McpConfig, ServerDescriptor},
};

pub const DEFAULT_MAX_CONCURRENT: usize = 10;
pub const DEFAULT_MOUNT_TIMEOUT: Duration = Duration::from_secs(30);

/// Label used for failures whose server could not be identified.
const UNKNOWN_SERVER: &str = "unknown";

/// Knobs controlling how configured servers are mounted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountOptions {
    /// Prefix tools, prompts and resources with the server name.
    pub name_as_prefix: bool,
    /// Upper bound on mounts in flight (concurrent mounting only).
    pub max_concurrent: usize,
    /// Abort on the first failure instead of mounting what works.
    pub fail_fast: bool,
    /// Deadline for spawning, handshaking and listing one server.
    pub timeout: Duration,
}

impl Default for MountOptions {
    fn default() -> Self {
        Self {
            name_as_prefix: true,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            fail_fast: false,
            timeout: DEFAULT_MOUNT_TIMEOUT,
        }
    }
}

/// Create a composite and mount `config` into it one server at a time.
pub async fn composite_server_from_config(
    config: &McpConfig,
    options: &MountOptions,
) -> Result<(CompositeServer, MountReport), MountError> {
    let server = CompositeServer::default();
    let report = mount_config_into_server(config, &server, options).await?;
    Ok((server, report))
}

/// Create a composite and mount `config` into it with bounded concurrency.
pub async fn composite_server_from_config_concurrent(
    config: &McpConfig,
    options: &MountOptions,
) -> Result<(CompositeServer, MountReport), MountError> {
    let server = CompositeServer::default();
    let report = mount_config_into_server_concurrent(config, &server, options).await?;
    Ok((server, report))
}

/// Mount servers sequentially in configuration order; the first failure is returned.
pub async fn mount_config_into_server(
    config: &McpConfig,
    server: &CompositeServer,
    options: &MountOptions,
) -> Result<MountReport, MountError> {
    let mut report = MountReport::default();
    for (name, descriptor) in &config.mcp_servers {
        let attempt = attempt_mount(name, descriptor, config.base_dir(), options).await;
        match attempt.result {
            Ok((upstream, counts)) => {
                let prefix = upstream.namespace().prefix().map(str::to_string);
                server.mount(upstream).await?;
                report.push(MountOutcome::mounted(
                    name,
                    prefix.as_deref(),
                    attempt.transport,
                    attempt.elapsed_ms,
                    counts,
                ));
            }
            Err(err) => return Err(err),
        }
    }
    report.log_summary();
    Ok(report)
}

/// Mount servers with at most `options.max_concurrent` in flight.
///
/// With `fail_fast` the first failure cancels the remaining mounts and nothing
/// from this call stays mounted. Otherwise failures are reported and working
/// servers are mounted, unless every server failed.
pub async fn mount_config_into_server_concurrent(
    config: &McpConfig,
    server: &CompositeServer,
    options: &MountOptions,
) -> Result<MountReport, MountError> {
    let semaphore = Arc::new(Semaphore::new(options.max_concurrent.max(1)));
    let base_dir = config.base_dir().map(Path::to_path_buf);
    let mut tasks = JoinSet::new();

    for (index, (name, descriptor)) in config.mcp_servers.iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let name = name.clone();
        let descriptor = descriptor.clone();
        let base_dir: Option<PathBuf> = base_dir.clone();
        let options = options.clone();
        tasks.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(err) => {
                    return (
                        index,
                        Attempt {
                            name: name.clone(),
                            transport: descriptor.transport_label(),
                            elapsed_ms: 0,
                            result: Err(MountError::Task {
                                message: err.to_string(),
                            }),
                        },
                    )
                }
            };
            let attempt = attempt_mount(&name, &descriptor, base_dir.as_deref(), &options).await;
            (index, attempt)
        });
    }

    let mut attempts = Vec::with_capacity(config.len());
    let mut orphaned = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((
                _,
                Attempt {
                    result: Err(err), ..
                },
            )) if options.fail_fast => {
                tasks.abort_all();
                shutdown_attempts(attempts).await;
                return Err(err);
            }
            Ok((index, attempt)) => attempts.push((index, attempt)),
            Err(join_err) => {
                if options.fail_fast {
                    tasks.abort_all();
                    shutdown_attempts(attempts).await;
                    return Err(MountError::Task {
                        message: join_err.to_string(),
                    });
                }
                orphaned.push(MountOutcome::failed(
                    UNKNOWN_SERVER,
                    "unknown",
                    0,
                    join_err.to_string(),
                ));
            }
        }
    }

    attempts.sort_by_key(|(index, _)| *index);
    let mut report = MountReport::default();
    for (_, attempt) in attempts {
        match attempt.result {
            Ok((upstream, counts)) => {
                let prefix = upstream.namespace().prefix().map(str::to_string);
                match server.mount(upstream).await {
                    Ok(()) => report.push(MountOutcome::mounted(
                        &attempt.name,
                        prefix.as_deref(),
                        attempt.transport,
                        attempt.elapsed_ms,
                        counts,
                    )),
                    Err(err) => report.push(MountOutcome::failed(
                        &attempt.name,
                        attempt.transport,
                        attempt.elapsed_ms,
                        err.to_string(),
                    )),
                }
            }
            Err(err) => report.push(MountOutcome::failed(
                &attempt.name,
                attempt.transport,
                attempt.elapsed_ms,
                err.to_string(),
            )),
        }
    }
    for outcome in orphaned {
        report.push(outcome);
    }

    report.log_summary();
    if report.all_failed() {
        return Err(MountError::AllMountsFailed {
            failed: report.failures(),
        });
    }
    Ok(report)
}

struct Attempt {
    name: String,
    transport: &'static str,
    elapsed_ms: u64,
    result: Result<(UpstreamServer, CatalogCounts), MountError>,
}

async fn attempt_mount(
    name: &str,
    descriptor: &ServerDescriptor,
    base_dir: Option<&Path>,
    options: &MountOptions,
) -> Attempt {
    let transport = descriptor.transport_label();
    let span = MountSpan::start(name, transport);
    let result = connect_server(name, descriptor, base_dir, options)
        .instrument(span.span().clone())
        .await;
    let elapsed_ms = u64::try_from(span.elapsed_ms()).unwrap_or(u64::MAX);
    let result = match result {
        Ok(upstream) => {
            let counts = upstream.catalog().await.counts();
            span.mounted(
                counts.tools,
                counts.prompts,
                counts.resources,
                counts.resource_templates,
            );
            Ok((upstream, counts))
        }
        Err(err) => {
            span.failed(&err);
            Err(err)
        }
    };
    Attempt {
        name: name.to_string(),
        transport,
        elapsed_ms,
        result,
    }
}

async fn connect_server(
    name: &str,
    descriptor: &ServerDescriptor,
    base_dir: Option<&Path>,
    options: &MountOptions,
) -> Result<UpstreamServer, MountError> {
    let plan = descriptor
        .launch_plan(name, base_dir)
        .map_err(|source| MountError::Launch {
            name: name.to_string(),
            source,
        })?;
    let namespace = Namespace::new(options.name_as_prefix.then(|| name.to_string()));
    tokio::time::timeout(
        options.timeout,
        UpstreamServer::connect(name, &plan, namespace),
    )
    .await
    .map_err(|_| MountError::Timeout {
        name: name.to_string(),
        timeout_secs: options.timeout.as_secs(),
    })?
}

async fn shutdown_attempts(attempts: Vec<(usize, Attempt)>) {
    for (_, attempt) in attempts {
        if let Ok((upstream, _)) = attempt.result {
            upstream.shutdown().await;
        }
    }
}
