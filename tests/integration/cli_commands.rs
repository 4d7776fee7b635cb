use std::process::{Command, Output};

use anyhow::{Context, Result};
use serde_json::Value;
use tempfile::tempdir;

use crate::common::{fixture, nested_config, BINARY_PATH};

fn run_cli(args: &[&str]) -> Result<Output> {
    Command::new(BINARY_PATH)
        .args(args)
        .env_remove("MCP_COMPOSE_SETTINGS")
        .output()
        .context("failed to run mcp-compose")
}

fn stdout_json(output: &Output) -> Result<Value> {
    serde_json::from_slice(&output.stdout).with_context(|| {
        format!(
            "stdout is not JSON: {}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

#[test]
fn version_json_names_the_package() -> Result<()> {
    let output = run_cli(&["version", "--json"])?;
    assert!(output.status.success(), "{output:?}");
    let value = stdout_json(&output)?;
    assert_eq!(value["name"], "mcp-compose");
    assert!(value["platform"].as_str().is_some_and(|p| p.contains('-')));
    Ok(())
}

#[test]
fn schema_describes_mcp_servers() -> Result<()> {
    let output = run_cli(&["schema"])?;
    assert!(output.status.success(), "{output:?}");
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("mcpServers"), "{text}");
    Ok(())
}

#[test]
fn inspect_writes_a_report_for_nested_servers() -> Result<()> {
    let temp = tempdir()?;
    let config_path = temp.path().join("mcp.json");
    std::fs::write(
        &config_path,
        nested_config("inner", &fixture("tests/fixtures/empty_mcp.json")),
    )?;
    let report_path = temp.path().join("reports").join("server-info.json");

    let output = run_cli(&[
        "inspect",
        &config_path.display().to_string(),
        "-o",
        &report_path.display().to_string(),
    ])?;
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(stdout_json(&output)?["status"], "written");

    let report: Value = serde_json::from_str(&std::fs::read_to_string(&report_path)?)?;
    assert_eq!(report["server"]["name"], "mcp-compose");
    assert_eq!(report["mounts"][0]["name"], "inner");
    assert_eq!(report["mounts"][0]["status"], "mounted");
    assert_eq!(report["mounts"][0]["prefix"], "inner");
    assert!(report["tools"].as_array().is_some_and(Vec::is_empty));
    Ok(())
}

#[test]
fn inspect_fails_with_mount_failure_code() -> Result<()> {
    let temp = tempdir()?;
    let report_path = temp.path().join("server-info.json");
    let output = run_cli(&[
        "inspect",
        &fixture("tests/fixtures/broken_mcp.json"),
        "-o",
        &report_path.display().to_string(),
    ])?;
    assert_eq!(output.status.code(), Some(45), "{output:?}");
    assert!(!report_path.exists());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("COMPOSE_MOUNT_FAILED"), "{stderr}");
    Ok(())
}

#[test]
fn install_and_uninstall_edit_the_target_file() -> Result<()> {
    let temp = tempdir()?;
    let target = temp.path().join("mcp.json");
    let target_arg = target.display().to_string();
    let spec = fixture("tests/fixtures/empty_mcp.json");

    let output = run_cli(&[
        "install", "compose", &spec, "--file", &target_arg, "--env", "MODE=test",
    ])?;
    assert!(output.status.success(), "{output:?}");
    assert_eq!(stdout_json(&output)?["status"], "installed");

    let written: Value = serde_json::from_str(&std::fs::read_to_string(&target)?)?;
    let entry = &written["mcpServers"]["compose"];
    assert_eq!(entry["args"][0], "run");
    assert_eq!(entry["args"][1], spec.as_str());
    assert_eq!(entry["env"]["MODE"], "test");

    let output = run_cli(&["install", "compose", &spec, "--file", &target_arg])?;
    assert_eq!(stdout_json(&output)?["status"], "skipped_existing");

    let output = run_cli(&["uninstall", "compose", "--file", &target_arg])?;
    assert_eq!(stdout_json(&output)?["status"], "removed");

    let output = run_cli(&["uninstall", "compose", "--file", &target_arg])?;
    assert!(output.status.success(), "{output:?}");
    assert_eq!(stdout_json(&output)?["status"], "not_found");
    Ok(())
}

#[test]
fn workspace_install_dry_run_leaves_no_files() -> Result<()> {
    let temp = tempdir()?;
    let output = run_cli(&[
        "install",
        "remote",
        "https://example.com/mcp",
        "--workspace",
        &temp.path().display().to_string(),
        "--dry-run",
    ])?;
    assert!(output.status.success(), "{output:?}");
    let payload = stdout_json(&output)?;
    assert_eq!(payload["status"], "planned");
    assert_eq!(payload["entry"]["url"], "https://example.com/mcp");
    assert!(!temp.path().join(".cursor").exists());
    Ok(())
}
