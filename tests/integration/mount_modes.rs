use anyhow::Result;
use mcp_compose::{
    compose::{mount_config_into_server_concurrent, CompositeServer, MountOptions},
    mcp_config::McpConfig,
};
use serde_json::json;

use crate::common::{fixture, BINARY_PATH};

/// `good` is this binary serving an empty config; `bad` cannot be spawned.
fn mixed_config() -> Result<McpConfig> {
    let document = json!({
        "mcpServers": {
            "bad": { "command": "/nonexistent/mcp-compose-test/bad" },
            "good": {
                "command": BINARY_PATH,
                "args": ["run", fixture("tests/fixtures/empty_mcp.json")]
            }
        }
    });
    Ok(McpConfig::from_json_str(&document.to_string())?)
}

#[tokio::test]
async fn graceful_mount_keeps_working_servers_and_reports_failures() -> Result<()> {
    let server = CompositeServer::default();
    let report =
        mount_config_into_server_concurrent(&mixed_config()?, &server, &MountOptions::default())
            .await?;

    assert_eq!(server.mounted_names().await, vec!["good"]);
    assert_eq!(report.succeeded(), vec!["good"]);
    let failures = report.failures();
    assert_eq!(failures.len(), 1, "{failures:?}");
    assert!(failures[0].starts_with("bad: "), "{failures:?}");

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn fail_fast_mount_leaves_nothing_mounted() -> Result<()> {
    let server = CompositeServer::default();
    let options = MountOptions {
        fail_fast: true,
        ..MountOptions::default()
    };
    let err = mount_config_into_server_concurrent(&mixed_config()?, &server, &options)
        .await
        .expect_err("the broken server aborts the whole mount");

    assert_eq!(err.server_name(), Some("bad"));
    assert!(server.mounted_names().await.is_empty());
    Ok(())
}
