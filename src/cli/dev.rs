//! `dev`: run the composite behind the MCP Inspector.
use std::{path::Path, process::ExitStatus};

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::info;

use super::{args::DevArgs, ServerSpec};

pub const INSPECTOR_PACKAGE: &str = "@modelcontextprotocol/inspector";
const UI_PORT_ENV: &str = "CLIENT_PORT";
const SERVER_PORT_ENV: &str = "SERVER_PORT";

/// Fully resolved inspector invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectorCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl InspectorCommand {
    fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).envs(self.env.iter().cloned());
        command
    }
}

/// Build `npx @modelcontextprotocol/inspector[@version] <exe> run <spec> [mount flags]`.
pub fn build_inspector_command(
    executable: &Path,
    spec: &ServerSpec,
    args: &DevArgs,
) -> InspectorCommand {
    let program = if cfg!(windows) { "npx.cmd" } else { "npx" }.to_string();
    let package = match args.inspector_version.as_deref() {
        Some(version) if !version.trim().is_empty() => format!("{INSPECTOR_PACKAGE}@{version}"),
        _ => INSPECTOR_PACKAGE.to_string(),
    };

    let mut command_args = vec![
        package,
        executable.display().to_string(),
        "run".to_string(),
        spec.to_arg(),
    ];
    if args.mount.no_prefix {
        command_args.push("--no-prefix".to_string());
    }
    if args.mount.fail_fast {
        command_args.push("--fail-fast".to_string());
    }
    if let Some(max) = args.mount.max_concurrent {
        command_args.push(format!("--max-concurrent={max}"));
    }
    if let Some(settings) = args.settings_override.as_deref() {
        command_args.push(format!("--settings={}", settings.display()));
    }

    let mut env = Vec::new();
    if let Some(port) = args.ui_port {
        env.push((UI_PORT_ENV.to_string(), port.to_string()));
    }
    if let Some(port) = args.server_port {
        env.push((SERVER_PORT_ENV.to_string(), port.to_string()));
    }

    InspectorCommand {
        program,
        args: command_args,
        env,
    }
}

/// Launch the inspector and wait for it to exit.
pub async fn run_dev(args: &DevArgs, executable: &Path) -> Result<ExitStatus> {
    let spec = ServerSpec::parse(&args.mount.server_spec)?;
    let inspector = build_inspector_command(executable, &spec, args);
    info!(
        target: "mcp_compose::cli",
        program = %inspector.program,
        args = ?inspector.args,
        env = ?inspector.env,
        "Starting MCP Inspector"
    );

    let status = inspector
        .to_command()
        .status()
        .await
        .with_context(|| {
            format!(
                "failed to start `{}`; install Node.js so that npx is available",
                inspector.program
            )
        })?;
    info!(
        target: "mcp_compose::cli",
        status = %status,
        "MCP Inspector exited"
    );
    Ok(status)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::cli::MountArgs;

    fn dev_args() -> DevArgs {
        DevArgs {
            mount: MountArgs {
                server_spec: "/etc/mcp.json:docs".into(),
                no_prefix: false,
                fail_fast: false,
                max_concurrent: None,
            },
            inspector_version: None,
            ui_port: None,
            server_port: None,
            settings_override: None,
        }
    }

    #[test]
    fn inspector_runs_this_binary_with_the_spec() {
        let spec = ServerSpec::parse("/etc/mcp.json:docs").expect("spec parses");
        let command =
            build_inspector_command(Path::new("/usr/bin/mcp-compose"), &spec, &dev_args());

        assert_eq!(
            command.args,
            vec![
                INSPECTOR_PACKAGE,
                "/usr/bin/mcp-compose",
                "run",
                "/etc/mcp.json:docs"
            ]
        );
        assert!(command.env.is_empty());
    }

    #[test]
    fn mount_flags_reach_the_run_child() {
        let spec = ServerSpec::parse("/etc/mcp.json").expect("spec parses");
        let mut args = dev_args();
        args.mount.no_prefix = true;
        args.mount.fail_fast = true;
        args.mount.max_concurrent = Some(3);
        args.settings_override = Some(PathBuf::from("/etc/compose.toml"));
        let command = build_inspector_command(Path::new("mcp-compose"), &spec, &args);

        assert_eq!(
            &command.args[1..],
            [
                "mcp-compose",
                "run",
                "/etc/mcp.json",
                "--no-prefix",
                "--fail-fast",
                "--max-concurrent=3",
                "--settings=/etc/compose.toml"
            ]
        );
    }

    #[test]
    fn version_ports_and_settings_are_forwarded() {
        let spec = ServerSpec::parse("https://example.com/mcp").expect("spec parses");
        let args = DevArgs {
            inspector_version: Some("0.16.2".into()),
            ui_port: Some(6274),
            server_port: Some(6277),
            settings_override: Some(PathBuf::from("/etc/compose.toml")),
            ..dev_args()
        };
        let command = build_inspector_command(Path::new("mcp-compose"), &spec, &args);

        assert_eq!(command.args[0], "@modelcontextprotocol/inspector@0.16.2");
        assert_eq!(command.args[3], "https://example.com/mcp");
        assert_eq!(command.args[4], "--settings=/etc/compose.toml");
        assert_eq!(
            command.env,
            vec![
                ("CLIENT_PORT".to_string(), "6274".to_string()),
                ("SERVER_PORT".to_string(), "6277".to_string())
            ]
        );
    }
}
