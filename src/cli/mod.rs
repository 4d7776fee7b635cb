//! CLI entrypoint module structure.
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use rmcp::model::ProtocolVersion;
use serde_json::{json, Map, Value};

use crate::{
    lib::{
        fs::{
            install_server_entry, remove_server_entry, resolve_cursor_config_path,
            workspace_config_path, EntryInstallStatus, EntryRemoveStatus,
        },
        paths,
    },
    mcp_config::McpConfig,
};

pub mod args;
pub mod dev;
pub mod inspect;
pub mod profile;

pub use args::{
    CliArgs, CliCommand, Command, DevArgs, InspectArgs, InstallArgs, MountArgs, ParsedCommand,
    RunArgs, TargetArgs, UninstallArgs, VersionArgs,
};
pub use profile::{
    build_launch_args, current_executable, resolve_settings, LaunchProfile, MountOverrides,
    ServerSpec, TransportMode,
};

/// Execute CLI command mode and return a user-facing result payload.
pub fn execute_cli_command(command: CliCommand) -> Result<String> {
    match command {
        CliCommand::Install(args) => {
            let path = resolve_target_path(&args.target)?;
            let spec = ServerSpec::parse(&args.server_spec)?;
            let entry = build_server_entry(&spec, &current_executable()?, &args.env);
            install_entry_at(&path, &args.name, entry, args.force, args.dry_run)
        }
        CliCommand::Uninstall(args) => {
            let path = resolve_target_path(&args.target)?;
            uninstall_entry_at(&path, &args.name)
        }
        CliCommand::Schema => Ok(serde_json::to_string_pretty(&McpConfig::json_schema())?),
    }
}

/// Version text, or JSON with `--json`.
pub fn render_version(args: &VersionArgs) -> Result<String> {
    let protocol = serde_json::to_value(ProtocolVersion::LATEST)?
        .as_str()
        .map(str::to_string)
        .unwrap_or_default();
    let platform = format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH);
    if args.json {
        let payload = json!({
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "mcp_protocol_version": protocol,
            "platform": platform
        });
        return Ok(serde_json::to_string_pretty(&payload)?);
    }
    Ok(format!(
        "{name} {version}\nMCP protocol: {protocol}\nPlatform: {platform}",
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
    ))
}

/// `--file`, then `--workspace`, then the user-wide Cursor configuration.
fn resolve_target_path(target: &TargetArgs) -> Result<PathBuf> {
    if let Some(file) = target.file.as_deref() {
        return paths::absolutize(file).context("failed to obtain current directory");
    }
    if let Some(workspace) = target.workspace.as_deref() {
        let workspace =
            paths::absolutize(workspace).context("failed to obtain current directory")?;
        return Ok(workspace_config_path(&workspace));
    }
    resolve_cursor_config_path().map_err(|message| anyhow!(message))
}

/// Entry launching this binary for file specs, or pointing at the URL directly.
fn build_server_entry(spec: &ServerSpec, executable: &Path, env: &[(String, String)]) -> Value {
    match spec {
        ServerSpec::Url(url) => json!({ "url": url }),
        ServerSpec::Config { .. } => {
            let mut entry = Map::new();
            entry.insert("command".into(), json!(executable.display().to_string()));
            entry.insert("args".into(), json!(["run", spec.to_arg()]));
            if !env.is_empty() {
                let env: Map<String, Value> = env
                    .iter()
                    .map(|(key, value)| (key.clone(), json!(value)))
                    .collect();
                entry.insert("env".into(), Value::Object(env));
            }
            Value::Object(entry)
        }
    }
}

/// Install an entry and format a JSON response payload.
fn install_entry_at(
    path: &Path,
    name: &str,
    entry: Value,
    force: bool,
    dry_run: bool,
) -> Result<String> {
    let status = install_server_entry(path, name, entry.clone(), force, dry_run)
        .with_context(|| format!("failed to install `{name}` into {}", path.display()))?;

    let message = match status {
        EntryInstallStatus::Planned => "dry-run: no files were modified",
        EntryInstallStatus::Installed => "server entry installed",
        EntryInstallStatus::SkippedExisting => {
            "server entry already exists; re-run with --force to overwrite"
        }
    };

    let payload = json!({
        "status": status.as_str(),
        "name": name,
        "config_path": path.display().to_string(),
        "entry": entry,
        "message": message
    });

    Ok(serde_json::to_string_pretty(&payload)?)
}

/// Remove an entry and format a JSON response payload.
fn uninstall_entry_at(path: &Path, name: &str) -> Result<String> {
    let status = remove_server_entry(path, name)
        .with_context(|| format!("failed to remove `{name}` from {}", path.display()))?;

    let message = match status {
        EntryRemoveStatus::Removed => "server entry removed",
        EntryRemoveStatus::NotFound => "server entry not found",
    };

    let payload = json!({
        "status": status.as_str(),
        "name": name,
        "config_path": path.display().to_string(),
        "message": message
    });

    Ok(serde_json::to_string_pretty(&payload)?)
}
