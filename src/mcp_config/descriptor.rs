//! Server launch descriptors (`mcpServers.<name>`) and their resolved launch plans.
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::lib::{errors::McpConfigError, paths};

/// Transport named by the optional `transport` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    Stdio,
    Http,
    StreamableHttp,
    Sse,
}

impl TransportKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Stdio => "stdio",
            TransportKind::Http => "http",
            TransportKind::StreamableHttp => "streamable-http",
            TransportKind::Sse => "sse",
        }
    }
}

/// A locally spawned server speaking MCP over stdin/stdout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StdioServer {
    /// Executable path or name looked up on `PATH`.
    pub command: String,
    /// Arguments passed to the executable, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Extra environment variables added on top of the inherited environment.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    /// Working directory; relative paths resolve against the config file directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<TransportKind>,
}

/// A remote server reached over streamable HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RemoteServer {
    /// `http://` or `https://` endpoint of the server.
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<TransportKind>,
}

/// Server launch descriptor. The variant is chosen by the presence of `command` or `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ServerDescriptor {
    Stdio(StdioServer),
    Remote(RemoteServer),
}

/// Fully resolved instructions for connecting to one upstream server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchPlan {
    Stdio {
        program: String,
        args: Vec<String>,
        env: BTreeMap<String, String>,
        cwd: Option<PathBuf>,
    },
    Remote {
        url: String,
    },
}

impl LaunchPlan {
    pub const fn transport_label(&self) -> &'static str {
        match self {
            LaunchPlan::Stdio { .. } => "stdio",
            LaunchPlan::Remote { .. } => "streamable-http",
        }
    }

    /// Build the child process command for stdio plans.
    pub fn command(&self) -> Option<Command> {
        match self {
            LaunchPlan::Stdio {
                program,
                args,
                env,
                cwd,
            } => {
                let mut command = Command::new(program);
                command.args(args).envs(env);
                if let Some(cwd) = cwd {
                    command.current_dir(cwd);
                }
                command.kill_on_drop(true);
                Some(command)
            }
            LaunchPlan::Remote { .. } => None,
        }
    }
}

impl ServerDescriptor {
    pub fn stdio(command: impl Into<String>, args: Vec<String>) -> Self {
        ServerDescriptor::Stdio(StdioServer {
            command: command.into(),
            args,
            env: BTreeMap::new(),
            cwd: None,
            transport: None,
        })
    }

    pub fn remote(url: impl Into<String>) -> Self {
        ServerDescriptor::Remote(RemoteServer {
            url: url.into(),
            transport: None,
        })
    }

    pub const fn transport_label(&self) -> &'static str {
        match self {
            ServerDescriptor::Stdio(_) => "stdio",
            ServerDescriptor::Remote(_) => "streamable-http",
        }
    }

    /// Check static constraints that do not depend on the environment.
    pub fn validate(&self, name: &str) -> Result<(), McpConfigError> {
        match self {
            ServerDescriptor::Stdio(server) => {
                if server.command.trim().is_empty() {
                    return Err(invalid(name, "command", "command cannot be empty"));
                }
                match server.transport {
                    None | Some(TransportKind::Stdio) => Ok(()),
                    Some(other) => Err(invalid(
                        name,
                        "transport",
                        format!(
                            "`{}` requires `url`; command-based servers only support `stdio`",
                            other.as_str()
                        ),
                    )),
                }
            }
            ServerDescriptor::Remote(server) => {
                validate_url(name, &server.url)?;
                match server.transport {
                    None | Some(TransportKind::Http) | Some(TransportKind::StreamableHttp) => Ok(()),
                    Some(TransportKind::Sse) => Err(invalid(
                        name,
                        "transport",
                        "the SSE transport is not supported; use streamable HTTP",
                    )),
                    Some(TransportKind::Stdio) => Err(invalid(
                        name,
                        "transport",
                        "`stdio` requires `command` instead of `url`",
                    )),
                }
            }
        }
    }

    /// Resolve environment references and relative paths into a launch plan.
    pub fn launch_plan(
        &self,
        name: &str,
        base_dir: Option<&Path>,
    ) -> Result<LaunchPlan, McpConfigError> {
        self.validate(name)?;
        match self {
            ServerDescriptor::Stdio(server) => {
                let program = expand_value(name, &server.command)?;
                let args = server
                    .args
                    .iter()
                    .map(|arg| expand_value(name, arg))
                    .collect::<Result<Vec<_>, _>>()?;
                let env = server
                    .env
                    .iter()
                    .map(|(key, value)| Ok((key.clone(), expand_value(name, value)?)))
                    .collect::<Result<BTreeMap<_, _>, McpConfigError>>()?;
                let cwd = match &server.cwd {
                    Some(cwd) => {
                        let expanded = PathBuf::from(expand_value(name, &cwd.to_string_lossy())?);
                        Some(match base_dir {
                            Some(base) => paths::resolve_against(base, &expanded),
                            None => expanded,
                        })
                    }
                    None => None,
                };
                Ok(LaunchPlan::Stdio {
                    program,
                    args,
                    env,
                    cwd,
                })
            }
            ServerDescriptor::Remote(server) => {
                let url = expand_value(name, &server.url)?;
                check_url(name, &url)?;
                Ok(LaunchPlan::Remote { url })
            }
        }
    }
}

fn expand_value(name: &str, value: &str) -> Result<String, McpConfigError> {
    paths::expand(value).map_err(|message| McpConfigError::Expand {
        name: name.to_string(),
        value: value.to_string(),
        message,
    })
}

fn validate_url(name: &str, raw: &str) -> Result<(), McpConfigError> {
    // Variables are resolved at launch; only literal URLs can be checked up front.
    if raw.contains('$') {
        return Ok(());
    }
    check_url(name, raw)
}

fn check_url(name: &str, raw: &str) -> Result<(), McpConfigError> {
    let parsed =
        url::Url::parse(raw).map_err(|err| invalid(name, "url", format!("{raw}: {err}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(
            name,
            "url",
            format!("unsupported scheme `{other}`; use http or https"),
        )),
    }
}

fn invalid(name: &str, field: &'static str, message: impl Into<String>) -> McpConfigError {
    McpConfigError::InvalidServer {
        name: name.to_string(),
        field,
        message: message.into(),
    }
}
