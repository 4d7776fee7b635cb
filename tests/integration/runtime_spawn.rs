use std::{
    process::{Command as StdCommand, Stdio},
    time::Duration,
};

use anyhow::Result;
use rmcp::{model::ClientInfo, serve_client};
use tempfile::tempdir;
use tokio::time::timeout;

use crate::common::{fixture, nested_config, spawn_compose_process, BINARY_PATH};

#[tokio::test]
async fn client_spawn_serves_an_empty_composite() -> Result<()> {
    let spec = fixture("tests/fixtures/empty_mcp.json");
    let (mut child, transport, stderr_task) = spawn_compose_process(&["run", &spec]).await?;

    let client = serve_client(ClientInfo::default(), transport).await?;
    let info = client.peer_info().expect("server info after handshake");
    assert_eq!(info.server_info.name, "mcp-compose");
    let tools = client.list_all_tools().await?;
    assert!(tools.is_empty(), "no servers configured: {tools:?}");

    client.cancel().await?;
    let status = timeout(Duration::from_secs(5), child.wait()).await??;
    assert!(
        status.success(),
        "server should exit cleanly but exit status was {status:?}"
    );
    if let Some(handle) = stderr_task {
        let _ = handle.await;
    }
    Ok(())
}

#[tokio::test]
async fn nested_composite_mounts_a_stdio_server() -> Result<()> {
    let temp = tempdir()?;
    let config_path = temp.path().join("mcp.json");
    std::fs::write(
        &config_path,
        nested_config("inner", &fixture("tests/fixtures/empty_mcp.json")),
    )?;
    let spec = config_path.display().to_string();
    let (mut child, transport, stderr_task) =
        spawn_compose_process(&["run", &spec, "--fail-fast"]).await?;

    let client = serve_client(ClientInfo::default(), transport).await?;
    let info = client.peer_info().expect("server info after handshake");
    let instructions = info.instructions.clone().unwrap_or_default();
    assert!(instructions.contains("inner"), "{instructions}");
    assert!(client.list_all_tools().await?.is_empty());

    client.cancel().await?;
    let status = timeout(Duration::from_secs(10), child.wait()).await??;
    assert!(status.success(), "exit status was {status:?}");
    if let Some(handle) = stderr_task {
        let _ = handle.await;
    }
    Ok(())
}

#[tokio::test]
async fn unmountable_config_exits_with_mount_failure() -> Result<()> {
    let spec = fixture("tests/fixtures/broken_mcp.json");
    let (mut child, _transport, stderr_task) = spawn_compose_process(&["run", &spec]).await?;

    let status = timeout(Duration::from_secs(10), child.wait()).await??;
    assert_eq!(
        status.code(),
        Some(45),
        "COMPOSE_MOUNT_FAILED exit code (45) expected, got {status:?}"
    );
    if let Some(handle) = stderr_task {
        let _ = handle.await;
    }
    Ok(())
}

#[test]
fn direct_execution_requires_mcp_client() {
    use std::io::IsTerminal;
    if !std::io::stdin().is_terminal() || !std::io::stdout().is_terminal() {
        eprintln!("Skipping MCP_CLIENT_REQUIRED test because stdio is not a TTY");
        return;
    }
    let status = StdCommand::new(BINARY_PATH)
        .args(["run", &fixture("tests/fixtures/empty_mcp.json")])
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .stdin(Stdio::inherit())
        .status()
        .expect("process should start");
    assert_eq!(
        status.code(),
        Some(44),
        "MCP_CLIENT_REQUIRED exit code (44) expected, got {status:?}"
    );
}
