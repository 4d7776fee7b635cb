//! `inspect`: write the composite catalog and mount report as JSON.
use std::{fs, path::Path};

use anyhow::Context;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use super::LaunchProfile;
use crate::{
    compose::{CompositeServer, MountOutcome, MountReport},
    server::runtime::{build_composite, RuntimeExit},
};

#[derive(Debug, Serialize)]
pub struct InspectReport {
    pub server: ServerSummary,
    pub generated_at: String,
    pub mounts: Vec<MountOutcome>,
    pub tools: Vec<ToolSummary>,
    pub prompts: Vec<PromptSummary>,
    pub resources: Vec<ResourceSummary>,
    pub resource_templates: Vec<ResourceTemplateSummary>,
}

#[derive(Debug, Serialize)]
pub struct ServerSummary {
    pub name: String,
    pub version: String,
    pub instructions: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ToolSummary {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Value,
}

#[derive(Debug, Serialize)]
pub struct PromptSummary {
    pub name: String,
    pub description: Option<String>,
    pub arguments: Value,
}

#[derive(Debug, Serialize)]
pub struct ResourceSummary {
    pub uri: String,
    pub name: String,
    pub mime_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResourceTemplateSummary {
    pub uri_template: String,
    pub name: String,
}

/// Snapshot the public catalog of `server`.
pub async fn collect_report(server: &CompositeServer, mounts: MountReport) -> InspectReport {
    let tools = server
        .tools()
        .await
        .into_iter()
        .map(|tool| ToolSummary {
            name: tool.name.to_string(),
            description: tool.description.as_deref().map(str::to_string),
            input_schema: Value::Object((*tool.input_schema).clone()),
        })
        .collect();
    let prompts = server
        .prompts()
        .await
        .into_iter()
        .map(|prompt| PromptSummary {
            arguments: json!(prompt.arguments.unwrap_or_default()),
            name: prompt.name,
            description: prompt.description,
        })
        .collect();
    let resources = server
        .resources()
        .await
        .into_iter()
        .map(|resource| ResourceSummary {
            uri: resource.raw.uri,
            name: resource.raw.name,
            mime_type: resource.raw.mime_type,
        })
        .collect();
    let resource_templates = server
        .resource_templates()
        .await
        .into_iter()
        .map(|template| ResourceTemplateSummary {
            uri_template: template.raw.uri_template,
            name: template.raw.name,
        })
        .collect();

    InspectReport {
        server: ServerSummary {
            name: server.name().to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            instructions: server.instructions().map(str::to_string),
        },
        generated_at: Utc::now().to_rfc3339(),
        mounts: mounts.outcomes,
        tools,
        prompts,
        resources,
        resource_templates,
    }
}

/// Build the composite for `profile`, write the report to `output` and return a status payload.
pub async fn run_inspect(profile: &LaunchProfile, output: &Path) -> Result<String, RuntimeExit> {
    let (server, mounts) = build_composite(&profile.spec, &profile.mount).await?;
    let report = collect_report(&server, mounts).await;
    server.shutdown().await;

    let rendered = serde_json::to_string_pretty(&report).map_err(RuntimeExit::from_error)?;
    if let Some(parent) = output.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))
            .map_err(RuntimeExit::from_error)?;
    }
    fs::write(output, rendered)
        .with_context(|| format!("failed to write inspect report {}", output.display()))
        .map_err(RuntimeExit::from_error)?;

    let mounted = report
        .mounts
        .iter()
        .filter(|outcome| outcome.error.is_none())
        .count();
    info!(
        target: "mcp_compose::cli",
        path = %output.display(),
        tools = report.tools.len(),
        mounted,
        "Wrote inspect report"
    );

    let payload = json!({
        "status": "written",
        "path": output.display().to_string(),
        "mounted": mounted,
        "failed": report.mounts.len() - mounted,
        "tools": report.tools.len(),
        "prompts": report.prompts.len(),
        "resources": report.resources.len(),
        "resource_templates": report.resource_templates.len()
    });
    serde_json::to_string_pretty(&payload).map_err(RuntimeExit::from_error)
}
