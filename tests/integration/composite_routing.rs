use std::time::Duration;

use anyhow::Result;
use mcp_compose::compose::CompositeServer;
use rmcp::{
    model::{
        CallToolRequestParam, ClientInfo, ErrorCode, GetPromptRequestParam,
        ReadResourceRequestParam, ResourceContents,
    },
    serve_client, ServiceExt,
};
use serde_json::{json, Map, Value};
use tokio::time::timeout;

use crate::common::{connect_fixture, connect_stalled};

fn echo_request(name: &str, text: &str) -> CallToolRequestParam {
    let mut arguments = Map::new();
    arguments.insert("text".into(), Value::String(text.into()));
    CallToolRequestParam {
        name: name.to_string().into(),
        arguments: Some(arguments),
    }
}

fn first_text(result: &rmcp::model::CallToolResult) -> String {
    result
        .content
        .first()
        .and_then(|content| content.as_text())
        .map(|text| text.text.clone())
        .unwrap_or_default()
}

async fn prefixed_pair() -> Result<CompositeServer> {
    let server = CompositeServer::default();
    server.mount(connect_fixture("weather", true).await?).await?;
    server.mount(connect_fixture("notes", true).await?).await?;
    Ok(server)
}

#[tokio::test]
async fn prefixed_mounts_expose_namespaced_catalog() -> Result<()> {
    let server = prefixed_pair().await?;

    let tools: Vec<String> = server
        .tools()
        .await
        .into_iter()
        .map(|tool| tool.name.to_string())
        .collect();
    for expected in ["weather_echo", "weather_fail", "notes_echo", "notes_fail"] {
        assert!(tools.iter().any(|name| name == expected), "{tools:?}");
    }
    assert!(!tools.iter().any(|name| name == "echo"), "{tools:?}");

    let prompts: Vec<String> = server
        .prompts()
        .await
        .into_iter()
        .map(|prompt| prompt.name)
        .collect();
    assert_eq!(prompts, vec!["weather_greet", "notes_greet"]);

    let resources: Vec<String> = server
        .resources()
        .await
        .into_iter()
        .map(|resource| resource.raw.uri.clone())
        .collect();
    assert_eq!(resources, vec!["data://weather/info", "data://notes/info"]);

    let templates: Vec<String> = server
        .resource_templates()
        .await
        .into_iter()
        .map(|template| template.raw.uri_template.clone())
        .collect();
    assert_eq!(
        templates,
        vec!["data://weather/items/{id}", "data://notes/items/{id}"]
    );

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn requests_are_routed_to_the_owning_mount() -> Result<()> {
    let server = prefixed_pair().await?;

    let result = server.call(echo_request("notes_echo", "hi")).await?;
    assert_eq!(first_text(&result), "notes:hi");
    let result = server.call(echo_request("weather_echo", "hi")).await?;
    assert_eq!(first_text(&result), "weather:hi");

    let prompt = server
        .prompt(GetPromptRequestParam {
            name: "weather_greet".into(),
            arguments: None,
        })
        .await?;
    assert_eq!(prompt.messages.len(), 1);

    let read = server
        .read(ReadResourceRequestParam {
            uri: "data://notes/info".into(),
        })
        .await?;
    match &read.contents[0] {
        ResourceContents::TextResourceContents { text, uri, .. } => {
            assert_eq!(text, "notes info");
            assert_eq!(uri, "data://info");
        }
        other => panic!("unexpected contents: {other:?}"),
    }

    let read = server
        .read(ReadResourceRequestParam {
            uri: "data://weather/items/7".into(),
        })
        .await?;
    match &read.contents[0] {
        ResourceContents::TextResourceContents { text, .. } => {
            assert_eq!(text, "weather item 7");
        }
        other => panic!("unexpected contents: {other:?}"),
    }

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn newest_mount_wins_unprefixed_collisions() -> Result<()> {
    let server = CompositeServer::default();
    server.mount(connect_fixture("first", false).await?).await?;
    server.mount(connect_fixture("second", false).await?).await?;

    let echo_tools = server
        .tools()
        .await
        .into_iter()
        .filter(|tool| tool.name == "echo")
        .count();
    assert_eq!(echo_tools, 1);

    let result = server.call(echo_request("echo", "x")).await?;
    assert_eq!(first_text(&result), "second:x");

    assert!(server.unmount("second").await);
    let result = server.call(echo_request("echo", "x")).await?;
    assert_eq!(first_text(&result), "first:x");

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn unknown_names_and_upstream_errors_are_reported() -> Result<()> {
    let server = prefixed_pair().await?;

    let err = server
        .call(echo_request("echo", "unprefixed"))
        .await
        .expect_err("unprefixed name does not match a prefixed mount");
    assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    let data = err.data.expect("structured data");
    assert_eq!(data["code"], "UNKNOWN_TOOL");

    let err = server
        .read(ReadResourceRequestParam {
            uri: "data://elsewhere/info".into(),
        })
        .await
        .expect_err("unknown prefix");
    assert_eq!(err.code, ErrorCode::RESOURCE_NOT_FOUND);

    let err = server
        .call(CallToolRequestParam {
            name: "weather_fail".into(),
            arguments: None,
        })
        .await
        .expect_err("upstream refuses");
    assert_eq!(err.message, "weather refuses");
    assert_eq!(err.data, Some(json!({"label": "weather"})));

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn stalled_upstream_is_skipped_after_the_request_timeout() -> Result<()> {
    let server = CompositeServer::default().with_request_timeout(Duration::from_millis(300));
    server.mount(connect_fixture("weather", true).await?).await?;
    server.mount(connect_stalled("stuck").await?).await?;

    let tools: Vec<String> = timeout(Duration::from_secs(5), server.tools())
        .await?
        .into_iter()
        .map(|tool| tool.name.to_string())
        .collect();
    assert!(tools.iter().any(|name| name == "weather_echo"), "{tools:?}");

    let err = timeout(
        Duration::from_secs(5),
        server.call(echo_request("nowhere_echo", "x")),
    )
    .await?
    .expect_err("no mount owns the tool");
    let data = err.data.expect("structured data");
    assert_eq!(data["code"], "UNKNOWN_TOOL");

    let result = timeout(
        Duration::from_secs(5),
        server.call(echo_request("weather_echo", "still here")),
    )
    .await??;
    assert_eq!(first_text(&result), "weather:still here");

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn duplicate_mount_names_are_rejected() -> Result<()> {
    let server = CompositeServer::default();
    server.mount(connect_fixture("docs", true).await?).await?;
    let duplicate = connect_fixture("docs", true).await?;
    assert!(server.mount(duplicate).await.is_err());
    assert_eq!(server.mounted_names().await, vec!["docs"]);
    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn composite_serves_mcp_clients() -> Result<()> {
    let server = prefixed_pair().await?.with_instructions("fixture composite");
    let (client_io, server_io) = tokio::io::duplex(16 * 1024);
    let serving = server.clone();
    tokio::spawn(async move {
        if let Ok(running) = serving.serve(server_io).await {
            let _ = running.waiting().await;
        }
    });

    let client = serve_client(ClientInfo::default(), client_io).await?;
    let info = client.peer_info().expect("server info after handshake");
    assert_eq!(info.server_info.name, "mcp-compose");
    assert_eq!(info.instructions.as_deref(), Some("fixture composite"));

    let tools = client.list_all_tools().await?;
    assert!(tools.iter().any(|tool| tool.name == "notes_echo"));
    let result = client.call_tool(echo_request("notes_echo", "wire")).await?;
    assert_eq!(first_text(&result), "notes:wire");

    client.cancel().await?;
    server.shutdown().await;
    Ok(())
}
