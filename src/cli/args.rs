//! CLI argument definitions and `LaunchProfile` construction.
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};

use super::{
    build_launch_args, resolve_settings, LaunchProfile, MountOverrides, ServerSpec, TransportMode,
};

/// Parsed command intent from CLI.
#[derive(Debug, Clone)]
pub enum ParsedCommand {
    Version(VersionArgs),
    RunServer(LaunchProfile),
    Dev(DevArgs),
    Inspect(InspectArgs, LaunchProfile),
    Cli(CliCommand),
}

/// Command-line arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mcp-compose",
    author,
    version,
    about = "Compose several MCP servers into one (for Cursor / Inspector)",
    long_about = None
)]
pub struct CliArgs {
    /// Path to compose.toml (overrides MCP_COMPOSE_SETTINGS).
    #[arg(long = "settings", global = true)]
    pub settings_override: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print version information.
    Version(VersionArgs),
    /// Serve the composite server over stdio or TCP.
    Run(RunArgs),
    /// Open the composite server in the MCP Inspector.
    Dev(DevArgs),
    /// Write a JSON report of the composite catalog.
    Inspect(InspectArgs),
    #[command(flatten)]
    Cli(CliCommand),
}

/// Utility commands that print a payload and exit.
#[derive(Debug, Clone, Subcommand)]
pub enum CliCommand {
    /// Add this server to a Cursor `mcp.json`.
    Install(InstallArgs),
    /// Remove a server entry from a Cursor `mcp.json`.
    Uninstall(UninstallArgs),
    /// Print the JSON Schema of `mcp.json`.
    Schema,
}

#[derive(Debug, Clone, Default, Args)]
pub struct VersionArgs {
    /// Print as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

/// Arguments shared by commands that mount a server spec.
#[derive(Debug, Clone, Args)]
pub struct MountArgs {
    /// `mcp.json` path, `path:server`, or an http(s) URL.
    pub server_spec: String,
    /// Expose names without the `<server>_` prefix.
    #[arg(long, default_value_t = false)]
    pub no_prefix: bool,
    /// Abort on the first server that fails to mount.
    #[arg(long, default_value_t = false)]
    pub fail_fast: bool,
    /// Upper bound on servers mounted at once.
    #[arg(long)]
    pub max_concurrent: Option<usize>,
}

impl MountArgs {
    fn overrides(&self) -> MountOverrides {
        MountOverrides {
            no_prefix: self.no_prefix,
            fail_fast: self.fail_fast,
            max_concurrent: self.max_concurrent,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub mount: MountArgs,
    /// Select stdio (default) or tcp.
    #[arg(long, value_enum, default_value_t = TransportMode::Stdio)]
    pub transport: TransportMode,
}

#[derive(Debug, Clone, Args)]
pub struct DevArgs {
    #[command(flatten)]
    pub mount: MountArgs,
    /// Inspector package version (defaults to latest).
    #[arg(long)]
    pub inspector_version: Option<String>,
    /// Port for the Inspector UI (CLIENT_PORT).
    #[arg(long)]
    pub ui_port: Option<u16>,
    /// Port for the Inspector proxy (SERVER_PORT).
    #[arg(long)]
    pub server_port: Option<u16>,
    #[arg(skip)]
    pub settings_override: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct InspectArgs {
    #[command(flatten)]
    pub mount: MountArgs,
    /// Report destination.
    #[arg(short, long, default_value = "server-info.json")]
    pub output: PathBuf,
}

/// Which `mcp.json` the install commands edit.
#[derive(Debug, Clone, Default, Args)]
pub struct TargetArgs {
    /// Edit this file.
    #[arg(long, conflicts_with = "workspace")]
    pub file: Option<PathBuf>,
    /// Edit `<DIR>/.cursor/mcp.json`.
    #[arg(long, value_name = "DIR")]
    pub workspace: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct InstallArgs {
    /// Entry name in `mcpServers`.
    pub name: String,
    /// `mcp.json` path, `path:server`, or an http(s) URL.
    pub server_spec: String,
    #[command(flatten)]
    pub target: TargetArgs,
    /// Environment for the launched server (KEY=VALUE, repeatable).
    #[arg(long = "env", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,
    /// Overwrite an existing entry.
    #[arg(long, default_value_t = false)]
    pub force: bool,
    /// Show the planned entry without touching files.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Args)]
pub struct UninstallArgs {
    /// Entry name in `mcpServers`.
    pub name: String,
    #[command(flatten)]
    pub target: TargetArgs,
}

fn parse_env_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}

impl CliArgs {
    /// Parse CLI args into server launch mode or utility command mode.
    pub fn into_command(self) -> Result<ParsedCommand> {
        let settings_override = self.settings_override;
        match self.command {
            Command::Version(args) => Ok(ParsedCommand::Version(args)),
            Command::Run(args) => {
                let profile = build_profile(&args.mount, args.transport, settings_override)?;
                Ok(ParsedCommand::RunServer(profile))
            }
            Command::Dev(mut args) => {
                ServerSpec::parse(&args.mount.server_spec)?;
                args.settings_override = settings_override;
                Ok(ParsedCommand::Dev(args))
            }
            Command::Inspect(args) => {
                let profile = build_profile(&args.mount, TransportMode::Stdio, settings_override)?;
                Ok(ParsedCommand::Inspect(args, profile))
            }
            Command::Cli(command) => {
                validate_command(&command)?;
                Ok(ParsedCommand::Cli(command))
            }
        }
    }
}

/// Build a `LaunchProfile` from mount arguments, settings and the environment.
fn build_profile(
    mount: &MountArgs,
    transport: TransportMode,
    settings_override: Option<PathBuf>,
) -> Result<LaunchProfile> {
    let spec = ServerSpec::parse(&mount.server_spec)?;
    let settings = resolve_settings(settings_override)?;
    let options = mount.overrides().apply(settings.mount.clone(), &spec);
    let launch_args = build_launch_args(transport, &spec, settings.source_path.as_deref());

    Ok(LaunchProfile {
        spec,
        transport,
        settings,
        mount: options,
        launch_args,
    })
}

fn validate_command(command: &CliCommand) -> Result<()> {
    use crate::mcp_config::validate_server_name;

    match command {
        CliCommand::Install(args) => {
            validate_server_name(&args.name).map_err(|err| anyhow!(err))?;
            let spec = ServerSpec::parse(&args.server_spec)?;
            if matches!(spec, ServerSpec::Url(_)) && !args.env.is_empty() {
                return Err(anyhow!(
                    "--env applies to launched servers only; `{}` is a remote URL",
                    args.server_spec
                ));
            }
        }
        CliCommand::Uninstall(args) => {
            validate_server_name(&args.name).map_err(|err| anyhow!(err))?;
        }
        CliCommand::Schema => {}
    }

    Ok(())
}
