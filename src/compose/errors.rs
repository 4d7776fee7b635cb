//! Centralized error-to-ErrorData mapping for the composite server.
use std::time::Duration;

use rmcp::{model::ErrorData, service::ServiceError};
use serde_json::json;

use crate::lib::errors::{
    ErrorCategory, ToolErrorDescriptor, UNKNOWN_PROMPT_ERROR, UNKNOWN_RESOURCE_ERROR,
    UNKNOWN_TOOL_ERROR, UPSTREAM_REQUEST_FAILED_ERROR,
};

fn build(
    descriptor: &ToolErrorDescriptor,
    category: ErrorCategory,
    retryable: bool,
    details: serde_json::Value,
) -> ErrorData {
    descriptor
        .builder()
        .retryable(retryable)
        .category(category)
        .details(details)
        .build()
        .unwrap_or_else(|err| ErrorData::internal_error(err.to_string(), None))
}

pub fn unknown_tool(name: &str, mounted: &[String]) -> ErrorData {
    build(
        &UNKNOWN_TOOL_ERROR,
        ErrorCategory::InvalidParams,
        false,
        json!({ "name": name, "mounted_servers": mounted }),
    )
}

pub fn unknown_prompt(name: &str, mounted: &[String]) -> ErrorData {
    build(
        &UNKNOWN_PROMPT_ERROR,
        ErrorCategory::InvalidParams,
        false,
        json!({ "name": name, "mounted_servers": mounted }),
    )
}

pub fn unknown_resource(uri: &str, mounted: &[String]) -> ErrorData {
    build(
        &UNKNOWN_RESOURCE_ERROR,
        ErrorCategory::ResourceNotFound,
        false,
        json!({ "uri": uri, "mounted_servers": mounted }),
    )
}

/// Forward upstream protocol errors untouched; wrap transport failures.
pub fn upstream_error(server: &str, method: &'static str, err: ServiceError) -> ErrorData {
    match err {
        ServiceError::McpError(data) => data,
        other => {
            tracing::warn!(
                target: "mcp_compose::proxy",
                server,
                method,
                error = %other,
                "Upstream request failed"
            );
            UPSTREAM_REQUEST_FAILED_ERROR
                .builder()
                .retryable(true)
                .category(ErrorCategory::Internal)
                .details(json!({ "method": method, "reason": other.to_string() }))
                .with_context_field("server", json!(server))
                .build()
                .unwrap_or_else(|err| ErrorData::internal_error(err.to_string(), None))
        }
    }
}

/// An upstream did not answer within the aggregation deadline.
pub fn upstream_timeout(server: &str, method: &'static str, timeout: Duration) -> ErrorData {
    UPSTREAM_REQUEST_FAILED_ERROR
        .builder()
        .retryable(true)
        .category(ErrorCategory::Internal)
        .details(json!({
            "method": method,
            "reason": format!("no answer within {} ms", timeout.as_millis())
        }))
        .with_context_field("server", json!(server))
        .build()
        .unwrap_or_else(|err| ErrorData::internal_error(err.to_string(), None))
}
