//! LaunchProfile, server spec parsing, and settings resolution.
use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use clap::ValueEnum;

use crate::{
    compose::MountOptions,
    lib::{errors::McpConfigError, paths},
    mcp_config::McpConfig,
    server::config::ComposeSettings,
};

/// MCP transport mode.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum TransportMode {
    Stdio,
    Tcp,
}

impl TransportMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Stdio => "stdio",
            TransportMode::Tcp => "tcp",
        }
    }
}

/// What `run`, `dev` and `inspect` serve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerSpec {
    /// A remote server proxied as-is.
    Url(String),
    /// An `mcp.json` file, optionally narrowed to one server.
    Config {
        path: PathBuf,
        server: Option<String>,
    },
}

impl ServerSpec {
    /// Parse `URL`, `path:server` or `path`. Relative paths resolve against the current directory.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(anyhow!("server spec cannot be empty"));
        }
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return Ok(ServerSpec::Url(trimmed.to_string()));
        }

        let (path, server) = split_server_suffix(trimmed);
        let path = paths::absolutize(Path::new(path))
            .context("failed to obtain current directory")?;
        Ok(ServerSpec::Config {
            path,
            server: server.map(str::to_string),
        })
    }

    /// Load the configuration this spec designates.
    pub fn load_config(&self) -> Result<McpConfig, McpConfigError> {
        match self {
            ServerSpec::Url(url) => McpConfig::single_remote(url),
            ServerSpec::Config { path, server } => {
                let config = McpConfig::load(path)?;
                match server {
                    Some(name) => config.select(name),
                    None => Ok(config),
                }
            }
        }
    }

    /// A single designated server is exposed under its own names.
    pub fn is_single_server(&self) -> bool {
        matches!(
            self,
            ServerSpec::Url(_) | ServerSpec::Config { server: Some(_), .. }
        )
    }

    /// Canonical form, used when re-launching this binary.
    pub fn to_arg(&self) -> String {
        match self {
            ServerSpec::Url(url) => url.clone(),
            ServerSpec::Config { path, server } => match server {
                Some(server) => format!("{}:{server}", path.display()),
                None => path.display().to_string(),
            },
        }
    }
}

/// Split `path:server`, leaving drive letters (`C:\...`) and plain paths alone.
fn split_server_suffix(raw: &str) -> (&str, Option<&str>) {
    let Some((path, server)) = raw.rsplit_once(':') else {
        return (raw, None);
    };
    let is_drive_letter = path.len() == 1 && path.chars().all(|c| c.is_ascii_alphabetic());
    let looks_like_name = !server.is_empty() && !server.contains(['/', '\\']);
    if path.is_empty() || is_drive_letter || !looks_like_name {
        return (raw, None);
    }
    (path, Some(server))
}

/// Mount flags given on the command line; `None` keeps the settings value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MountOverrides {
    pub no_prefix: bool,
    pub fail_fast: bool,
    pub max_concurrent: Option<usize>,
}

impl MountOverrides {
    pub fn apply(&self, mut options: MountOptions, spec: &ServerSpec) -> MountOptions {
        if self.no_prefix || spec.is_single_server() {
            options.name_as_prefix = false;
        }
        if self.fail_fast {
            options.fail_fast = true;
        }
        if let Some(max) = self.max_concurrent {
            options.max_concurrent = max.max(1);
        }
        options
    }
}

/// Resolved launch profile for `run`.
#[derive(Debug, Clone)]
pub struct LaunchProfile {
    pub spec: ServerSpec,
    pub transport: TransportMode,
    pub settings: ComposeSettings,
    pub mount: MountOptions,
    pub launch_args: Vec<String>,
}

/// Build launch arguments suitable for reproduction/logging.
pub fn build_launch_args(
    transport: TransportMode,
    spec: &ServerSpec,
    settings_path: Option<&Path>,
) -> Vec<String> {
    let mut args = vec![
        "run".to_string(),
        spec.to_arg(),
        format!("--transport={}", transport.as_str()),
    ];
    if let Some(path) = settings_path {
        args.push(format!("--settings={}", path.display()));
    }
    args
}

/// Resolve settings in the order: CLI override → env var → default file.
pub fn resolve_settings(override_path: Option<PathBuf>) -> Result<ComposeSettings> {
    let override_path = match override_path {
        Some(path) => Some(paths::absolutize(&path).context("failed to obtain current directory")?),
        None => None,
    };
    ComposeSettings::resolve(override_path).map_err(anyhow::Error::new)
}

/// Path of the running executable, used for re-launch commands.
pub fn current_executable() -> Result<PathBuf> {
    env::current_exe().context("failed to locate the mcp-compose executable")
}
